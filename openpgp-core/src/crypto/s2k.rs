//! String-to-key (S2K) specifiers, [Section 3.7 of RFC 4880].
//!
//! S2K specifiers describe how a passphrase is converted into a
//! symmetric key. They appear in symmetric-key encrypted session key
//! packets and in the encrypted half of secret key packets.
//!
//! [Section 3.7 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.7

use std::io::{self, Read, Write};

use crate::{Error, Result};
use crate::crypto::Protected;
use crate::types::HashAlgorithm;

/// A string-to-key specifier.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum S2K {
    /// Simple S2K: the passphrase is hashed directly.
    Simple {
        /// Hash algorithm to use.
        hash: HashAlgorithm,
    },
    /// Salted S2K: an 8-byte salt is prepended to the passphrase
    /// before hashing.
    Salted {
        /// Hash algorithm to use.
        hash: HashAlgorithm,
        /// Salt value.
        salt: [u8; 8],
    },
    /// Iterated and salted S2K: the salt and passphrase are hashed
    /// repeatedly to slow down brute-force attacks.
    IteratedSalted {
        /// Hash algorithm to use.
        hash: HashAlgorithm,
        /// Salt value.
        salt: [u8; 8],
        /// Number of bytes to hash, encoded by [`Self::decode_count`]
        /// from the wire octet.
        count: usize,
    },
    /// An unknown S2K method.
    Unknown {
        /// The S2K type octet.
        tag: u8,
        /// The remaining, opaque parameters.
        parameters: Box<[u8]>,
    },
}

impl S2K {
    /// Decodes the one-octet iteration count into the number of bytes
    /// to be hashed, per [Section 3.7.1.3 of RFC 4880].
    ///
    /// [Section 3.7.1.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.7.1.3
    pub fn decode_count(c: u8) -> usize {
        (16 + (c as usize & 0x0F)) << ((c as usize >> 4) + 6)
    }

    /// Encodes a byte count into the nearest representable one-octet
    /// iteration count, rounding up.
    pub fn encode_count(count: usize) -> u8 {
        for c in 0..=255u8 {
            if Self::decode_count(c) >= count {
                return c;
            }
        }
        255
    }

    /// Returns the hash algorithm used by this S2K, if any.
    pub fn hash_algo(&self) -> Option<HashAlgorithm> {
        match self {
            S2K::Simple { hash } | S2K::Salted { hash, .. }
                | S2K::IteratedSalted { hash, .. } => Some(*hash),
            S2K::Unknown { .. } => None,
        }
    }

    /// Derives a key of `key_size` bytes from `passphrase`.
    pub fn derive_key(&self, passphrase: &[u8], key_size: usize) -> Result<Protected> {
        let hash = self.hash_algo()
            .ok_or_else(|| Error::InvalidOperation(
                "cannot derive a key from an unknown S2K method".into()))?;

        let mut key = Vec::with_capacity(key_size);
        let mut round = 0u32;
        while key.len() < key_size {
            let mut ctx = hash.context()?;

            // Each round is preceded by `round` zero octets, per
            // Section 3.7.1 of RFC 4880.
            if round > 0 {
                ctx.update(vec![0u8; round as usize]);
            }

            match self {
                S2K::Simple { .. } => {
                    ctx.update(passphrase);
                }
                S2K::Salted { salt, .. } => {
                    ctx.update(&salt[..]);
                    ctx.update(passphrase);
                }
                S2K::IteratedSalted { salt, count, .. } => {
                    let mut data = Vec::with_capacity(salt.len() + passphrase.len());
                    data.extend_from_slice(&salt[..]);
                    data.extend_from_slice(passphrase);
                    if data.is_empty() {
                        return Err(Error::InvalidOperation(
                            "empty passphrase".into()).into());
                    }
                    let mut remaining = *count;
                    while remaining > 0 {
                        let n = remaining.min(data.len());
                        ctx.update(&data[..n]);
                        remaining -= n;
                    }
                }
                S2K::Unknown { .. } => unreachable!("handled above"),
            }

            let mut digest = vec![0u8; ctx.digest_size()];
            ctx.digest(&mut digest);
            key.extend_from_slice(&digest);
            round += 1;
        }
        key.truncate(key_size);
        Ok(key.into())
    }

    /// Parses an S2K specifier from `data`.
    pub(crate) fn parse(mut data: impl Read) -> Result<Self> {
        let mut tag = [0u8; 1];
        data.read_exact(&mut tag).map_err(io_to_malformed)?;

        Ok(match tag[0] {
            0 => {
                let hash = read_hash_algo(&mut data)?;
                S2K::Simple { hash }
            }
            1 => {
                let hash = read_hash_algo(&mut data)?;
                let salt = read_salt(&mut data)?;
                S2K::Salted { hash, salt }
            }
            3 => {
                let hash = read_hash_algo(&mut data)?;
                let salt = read_salt(&mut data)?;
                let mut c = [0u8; 1];
                data.read_exact(&mut c).map_err(io_to_malformed)?;
                S2K::IteratedSalted { hash, salt, count: Self::decode_count(c[0]) }
            }
            t => {
                let mut parameters = Vec::new();
                data.read_to_end(&mut parameters).map_err(io_to_malformed)?;
                S2K::Unknown { tag: t, parameters: parameters.into_boxed_slice() }
            }
        })
    }
}

fn io_to_malformed(e: io::Error) -> Error {
    Error::Malformed(format!("truncated S2K specifier: {}", e))
}

fn read_hash_algo(data: &mut impl Read) -> Result<HashAlgorithm> {
    let mut b = [0u8; 1];
    data.read_exact(&mut b).map_err(io_to_malformed)?;
    Ok(HashAlgorithm::from(b[0]))
}

fn read_salt(data: &mut impl Read) -> Result<[u8; 8]> {
    let mut salt = [0u8; 8];
    data.read_exact(&mut salt).map_err(io_to_malformed)?;
    Ok(salt)
}

impl crate::serialize::Marshal for S2K {
    fn serialize(&self, sink: &mut dyn Write) -> Result<()> {
        match self {
            S2K::Simple { hash } => {
                sink.write_all(&[0, u8::from(*hash)])?;
            }
            S2K::Salted { hash, salt } => {
                sink.write_all(&[1, u8::from(*hash)])?;
                sink.write_all(salt)?;
            }
            S2K::IteratedSalted { hash, salt, count } => {
                sink.write_all(&[3, u8::from(*hash)])?;
                sink.write_all(salt)?;
                sink.write_all(&[Self::encode_count(*count)])?;
            }
            S2K::Unknown { tag, parameters } => {
                sink.write_all(&[*tag])?;
                sink.write_all(parameters)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_roundtrips_to_at_least_the_requested_size() {
        for c in 0..=255u8 {
            let count = S2K::decode_count(c);
            assert_eq!(S2K::decode_count(S2K::encode_count(count)), count);
        }
    }

    #[test]
    fn simple_derivation_is_deterministic() {
        let s2k = S2K::Simple { hash: HashAlgorithm::SHA256 };
        let a = s2k.derive_key(b"hunter2", 16).unwrap();
        let b = s2k.derive_key(b"hunter2", 16).unwrap();
        assert_eq!(a.as_ref(), b.as_ref());
    }

    #[test]
    fn salted_derivation_depends_on_salt() {
        let a = S2K::Salted { hash: HashAlgorithm::SHA256, salt: [1; 8] }
            .derive_key(b"hunter2", 16).unwrap();
        let b = S2K::Salted { hash: HashAlgorithm::SHA256, salt: [2; 8] }
            .derive_key(b"hunter2", 16).unwrap();
        assert_ne!(a.as_ref(), b.as_ref());
    }

    #[test]
    fn iterated_derivation_uses_requested_byte_count() {
        let s2k = S2K::IteratedSalted {
            hash: HashAlgorithm::SHA256,
            salt: [7; 8],
            count: 65536,
        };
        let key = s2k.derive_key(b"hunter2", 32).unwrap();
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn parse_simple_roundtrips() {
        use crate::serialize::MarshalInto;
        let s2k = S2K::Simple { hash: HashAlgorithm::SHA1 };
        let bytes = s2k.to_vec().unwrap();
        let parsed = S2K::parse(&bytes[..]).unwrap();
        assert_eq!(s2k, parsed);
    }
}
