use std::fmt;

use crate::{Error, Result};
use crate::KeyID;

/// A key's fingerprint.
///
/// V4 fingerprints are the SHA-1 hash of a 21-byte synthetic header
/// (`0x99`, the packet's big-endian length, then the public key
/// packet body). See [Section 12.2 of RFC 4880].
///
/// [Section 12.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-12.2
#[non_exhaustive]
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    /// A version 4 fingerprint, i.e. a 20-byte SHA-1 hash.
    V4([u8; 20]),
    /// A fingerprint in an unknown format, or a different length.
    Invalid(Box<[u8]>),
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", crate::fmt::hex::encode_pretty(self.as_bytes()))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

impl Fingerprint {
    /// Creates a V4 fingerprint from a 20-byte digest.
    pub fn from_bytes(raw: &[u8]) -> Self {
        if raw.len() == 20 {
            let mut fp = [0; 20];
            fp.copy_from_slice(raw);
            Fingerprint::V4(fp)
        } else {
            Fingerprint::Invalid(raw.to_vec().into_boxed_slice())
        }
    }

    /// Returns the raw bytes of this fingerprint.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Fingerprint::V4(fp) => fp,
            Fingerprint::Invalid(fp) => fp,
        }
    }

    /// Returns the raw bytes of this fingerprint.
    ///
    /// Alias of [`Self::as_bytes`] for symmetry with [`KeyID::as_slice`].
    pub fn as_slice(&self) -> &[u8] {
        self.as_bytes()
    }

    /// Returns the fingerprint as an uppercase hex string, with no
    /// grouping.
    pub fn to_hex(&self) -> String {
        crate::fmt::hex::encode(self.as_bytes())
    }

    /// Converts this fingerprint to a `KeyID`.
    ///
    /// A V4 key ID is the low 8 bytes of the V4 fingerprint.
    pub fn to_keyid(&self) -> KeyID {
        match self {
            Fingerprint::V4(fp) => KeyID::from_bytes(&fp[12..]),
            Fingerprint::Invalid(fp) => KeyID::from_bytes(fp),
        }
    }

    /// Parses a fingerprint out of its commonly-printed hex form,
    /// accepting embedded whitespace (e.g. `"8F17 7771 18A3 3DDA 9BA4  8E62 AACB 3243 6300 52D9"`).
    pub fn from_hex(s: &str) -> Result<Self> {
        let hex: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if hex.len() % 2 != 0 {
            return Err(Error::InvalidArgument("odd number of hex digits".into()).into());
        }
        let mut raw = Vec::with_capacity(hex.len() / 2);
        let bytes = hex.as_bytes();
        for chunk in bytes.chunks(2) {
            let byte = u8::from_str_radix(std::str::from_utf8(chunk).unwrap(), 16)
                .map_err(|_| Error::InvalidArgument("invalid hex digit".into()))?;
            raw.push(byte);
        }
        Ok(Self::from_bytes(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4_to_keyid() {
        let fp = Fingerprint::from_bytes(&[
            0x8F, 0x17, 0x77, 0x71, 0x18, 0xA3, 0x3D, 0xDA, 0x9B, 0xA4,
            0x8E, 0x62, 0xAA, 0xCB, 0x32, 0x43, 0x63, 0x00, 0x52, 0xD9,
        ]);
        assert_eq!(fp.to_keyid(),
            KeyID::from_bytes(&[0xAA, 0xCB, 0x32, 0x43, 0x63, 0x00, 0x52, 0xD9]));
    }

    #[test]
    fn parses_hex_with_whitespace() {
        let fp = Fingerprint::from_hex(
            "8F17 7771 18A3 3DDA 9BA4  8E62 AACB 3243 6300 52D9").unwrap();
        assert!(matches!(fp, Fingerprint::V4(_)));
    }
}
