use std::fmt;

use crate::Fingerprint;

/// A key's Key ID, the low 64 bits of a V4 fingerprint.
///
/// See [Section 12.2 of RFC 4880].
///
/// [Section 12.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-12.2
#[non_exhaustive]
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum KeyID {
    /// A 8-byte Key ID.
    V4([u8; 8]),
    /// A Key ID in an unknown format, or a different length.
    Invalid(Box<[u8]>),
}

impl fmt::Display for KeyID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", crate::fmt::hex::encode_pretty(self.as_bytes()))
    }
}

impl fmt::Debug for KeyID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "KeyID({})", self)
    }
}

impl From<Fingerprint> for KeyID {
    fn from(fp: Fingerprint) -> Self {
        fp.to_keyid()
    }
}

impl KeyID {
    /// The wildcard Key ID, used when the recipient of a PKESK packet
    /// is intentionally not disclosed.
    pub fn wildcard() -> Self {
        KeyID::V4([0; 8])
    }

    /// Creates a Key ID from its raw bytes.
    pub fn from_bytes(raw: &[u8]) -> Self {
        if raw.len() == 8 {
            let mut id = [0; 8];
            id.copy_from_slice(raw);
            KeyID::V4(id)
        } else {
            KeyID::Invalid(raw.to_vec().into_boxed_slice())
        }
    }

    /// Returns the raw bytes of this Key ID.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            KeyID::V4(id) => id,
            KeyID::Invalid(id) => id,
        }
    }

    /// Returns whether this is the wildcard Key ID.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, KeyID::V4([0, 0, 0, 0, 0, 0, 0, 0]))
    }

    /// Returns the raw bytes of this Key ID.
    ///
    /// Alias of [`Self::as_bytes`] for symmetry with [`Fingerprint::as_slice`].
    pub fn as_slice(&self) -> &[u8] {
        self.as_bytes()
    }

    /// Returns the Key ID as an uppercase hex string, with no grouping.
    pub fn to_hex(&self) -> String {
        crate::fmt::hex::encode(self.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_is_all_zero() {
        assert!(KeyID::wildcard().is_wildcard());
        assert!(!KeyID::from_bytes(&[1, 0, 0, 0, 0, 0, 0, 0]).is_wildcard());
    }
}
