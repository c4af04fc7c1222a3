//! Data types for OpenPGP packet contents.
//!
//! This module collects the small, `Copy`-able metadata types that
//! packet bodies are built from: algorithm identifiers, timestamps,
//! and the various bitfields defined by RFC 4880.

use std::fmt;
use std::time::{SystemTime, Duration as StdDuration, UNIX_EPOCH};

#[cfg(any(test, feature = "quickcheck"))]
use quickcheck::{Arbitrary, Gen};

mod server_preferences;
pub use self::server_preferences::KeyServerPreferences;

/// Trims trailing zero bytes from `v`, returning the original length.
///
/// Used by the various bitfield types (key flags, features, ...) so
/// that semantic equality ignores trailing padding while the padded
/// length can still be reproduced on serialization.
pub(crate) fn bitfield_remove_padding(v: &mut Vec<u8>) -> usize {
    let len = v.len();
    while v.last() == Some(&0) {
        v.pop();
    }
    len
}

/// The OpenPGP packet tag.
///
/// Identifies the type of a packet. See [Section 4.3 of RFC 4880].
///
/// [Section 4.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.3
#[non_exhaustive]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tag {
    /// Reserved Packet Tag.
    Reserved,
    /// Public-Key Encrypted Session Key Packet.
    PKESK,
    /// Signature Packet.
    Signature,
    /// Symmetric-Key Encrypted Session Key Packet.
    SKESK,
    /// One-Pass Signature Packet.
    OnePassSig,
    /// Secret-Key Packet.
    SecretKey,
    /// Public-Key Packet.
    PublicKey,
    /// Secret-Subkey Packet.
    SecretSubkey,
    /// Compressed Data Packet.
    CompressedData,
    /// Symmetrically Encrypted Data Packet.
    SED,
    /// Marker Packet.
    Marker,
    /// Literal Data Packet.
    Literal,
    /// Trust Packet.
    Trust,
    /// User ID Packet.
    UserID,
    /// Public-Subkey Packet.
    PublicSubkey,
    /// User Attribute Packet.
    UserAttribute,
    /// Symmetrically Encrypted and Integrity Protected Data Packet.
    SEIP,
    /// Modification Detection Code Packet.
    MDC,
    /// AEAD Encrypted Data Packet.
    AED,
    /// Unassigned/unknown tag.
    Unknown(u8),
    /// Experimental/private tag (60-63).
    Private(u8),
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_string())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Tag::Reserved => "Reserved",
            Tag::PKESK => "PKESK",
            Tag::Signature => "Signature",
            Tag::SKESK => "SKESK",
            Tag::OnePassSig => "OnePassSig",
            Tag::SecretKey => "SecretKey",
            Tag::PublicKey => "PublicKey",
            Tag::SecretSubkey => "SecretSubkey",
            Tag::CompressedData => "CompressedData",
            Tag::SED => "SED",
            Tag::Marker => "Marker",
            Tag::Literal => "Literal",
            Tag::Trust => "Trust",
            Tag::UserID => "UserID",
            Tag::PublicSubkey => "PublicSubkey",
            Tag::UserAttribute => "UserAttribute",
            Tag::SEIP => "SEIP",
            Tag::MDC => "MDC",
            Tag::AED => "AED",
            Tag::Unknown(u) => return write!(f, "Unknown({})", u),
            Tag::Private(u) => return write!(f, "Private({})", u),
        })
    }
}

impl From<u8> for Tag {
    fn from(u: u8) -> Self {
        match u {
            0 => Tag::Reserved,
            1 => Tag::PKESK,
            2 => Tag::Signature,
            3 => Tag::SKESK,
            4 => Tag::OnePassSig,
            5 => Tag::SecretKey,
            6 => Tag::PublicKey,
            7 => Tag::SecretSubkey,
            8 => Tag::CompressedData,
            9 => Tag::SED,
            10 => Tag::Marker,
            11 => Tag::Literal,
            12 => Tag::Trust,
            13 => Tag::UserID,
            14 => Tag::PublicSubkey,
            17 => Tag::UserAttribute,
            18 => Tag::SEIP,
            19 => Tag::MDC,
            20 => Tag::AED,
            60..=63 => Tag::Private(u),
            _ => Tag::Unknown(u),
        }
    }
}

impl From<Tag> for u8 {
    fn from(t: Tag) -> Self {
        match t {
            Tag::Reserved => 0,
            Tag::PKESK => 1,
            Tag::Signature => 2,
            Tag::SKESK => 3,
            Tag::OnePassSig => 4,
            Tag::SecretKey => 5,
            Tag::PublicKey => 6,
            Tag::SecretSubkey => 7,
            Tag::CompressedData => 8,
            Tag::SED => 9,
            Tag::Marker => 10,
            Tag::Literal => 11,
            Tag::Trust => 12,
            Tag::UserID => 13,
            Tag::PublicSubkey => 14,
            Tag::UserAttribute => 17,
            Tag::SEIP => 18,
            Tag::MDC => 19,
            Tag::AED => 20,
            Tag::Unknown(u) => u,
            Tag::Private(u) => u,
        }
    }
}

#[cfg(any(test, feature = "quickcheck"))]
impl Arbitrary for Tag {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        Tag::from(u8::arbitrary(g))
    }
}

macro_rules! algorithm_enum {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $( $(#[$iv:meta])* $variant:ident => $val:expr, )*
        }
        $unknown:ident, $private:ident
    ) => {
        $(#[$outer])*
        #[non_exhaustive]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $( $(#[$iv])* $variant, )*
            /// Unassigned algorithm number.
            $unknown(u8),
            /// Private/experimental algorithm number.
            $private(u8),
        }

        impl From<u8> for $name {
            fn from(u: u8) -> Self {
                match u {
                    $( $val => $name::$variant, )*
                    100..=110 => $name::$private(u),
                    _ => $name::$unknown(u),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(a: $name) -> Self {
                match a {
                    $( $name::$variant => $val, )*
                    $name::$unknown(u) => u,
                    $name::$private(u) => u,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                match self {
                    $( $name::$variant => write!(f, stringify!($variant)), )*
                    $name::$unknown(u) => write!(f, "Unknown({})", u),
                    $name::$private(u) => write!(f, "Private({})", u),
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Display::fmt(self, f)
            }
        }

        #[cfg(any(test, feature = "quickcheck"))]
        impl Arbitrary for $name {
            fn arbitrary<G: Gen>(g: &mut G) -> Self {
                $name::from(u8::arbitrary(g))
            }
        }
    }
}

algorithm_enum! {
    /// The public key algorithms as defined in [Section 9.1 of RFC 4880].
    ///
    /// [Section 9.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-9.1
    pub enum PublicKeyAlgorithm {
        /// RSA (Encrypt or Sign).
        RSAEncryptSign => 1,
        /// RSA (Encrypt only).
        RSAEncrypt => 2,
        /// RSA (Sign only).
        RSASign => 3,
        /// ElGamal (Encrypt only).
        ElGamalEncrypt => 16,
        /// DSA (Digital Signature Algorithm).
        DSA => 17,
        /// Elliptic curve DH.
        ECDH => 18,
        /// Elliptic curve DSA.
        ECDSA => 19,
        /// ElGamal (Encrypt or Sign).
        ElGamalEncryptSign => 20,
        /// "Twisted" Edwards curve DSA.
        EdDSA => 22,
    }
    Unknown, Private
}

impl PublicKeyAlgorithm {
    /// Returns whether this algorithm can be used for signing.
    pub fn for_signing(self) -> bool {
        matches!(self,
            PublicKeyAlgorithm::RSAEncryptSign
                | PublicKeyAlgorithm::RSASign
                | PublicKeyAlgorithm::DSA
                | PublicKeyAlgorithm::ElGamalEncryptSign
                | PublicKeyAlgorithm::ECDSA
                | PublicKeyAlgorithm::EdDSA)
    }

    /// Returns whether this algorithm can be used for encryption.
    pub fn for_encryption(self) -> bool {
        matches!(self,
            PublicKeyAlgorithm::RSAEncryptSign
                | PublicKeyAlgorithm::RSAEncrypt
                | PublicKeyAlgorithm::ElGamalEncrypt
                | PublicKeyAlgorithm::ElGamalEncryptSign
                | PublicKeyAlgorithm::ECDH)
    }
}

algorithm_enum! {
    /// The symmetric-key algorithms as defined in [Section 9.2 of RFC 4880].
    ///
    /// [Section 9.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-9.2
    pub enum SymmetricAlgorithm {
        /// Plaintext or unencrypted data.
        Unencrypted => 0,
        /// IDEA.
        IDEA => 1,
        /// 3-DES.
        TripleDES => 2,
        /// CAST5.
        CAST5 => 3,
        /// Blowfish.
        Blowfish => 4,
        /// AES with 128-bit key.
        AES128 => 7,
        /// AES with 192-bit key.
        AES192 => 8,
        /// AES with 256-bit key.
        AES256 => 9,
        /// Twofish with 256-bit key.
        Twofish => 10,
        /// Camellia with 128-bit key.
        Camellia128 => 11,
        /// Camellia with 192-bit key.
        Camellia192 => 12,
        /// Camellia with 256-bit key.
        Camellia256 => 13,
    }
    Unknown, Private
}

impl SymmetricAlgorithm {
    /// Returns the key size in bytes, if known.
    pub fn key_size(self) -> crate::Result<usize> {
        use SymmetricAlgorithm::*;
        match self {
            IDEA | TripleDES | CAST5 | Blowfish => Ok(16),
            AES128 | Camellia128 => Ok(16),
            AES192 | Camellia192 => Ok(24),
            AES256 | Twofish | Camellia256 => Ok(32),
            _ => Err(Error::UnsupportedAlgorithm(format!("symmetric algorithm {:?}", self)).into()),
        }
    }

    /// Returns the block size in bytes, if known.
    pub fn block_size(self) -> crate::Result<usize> {
        use SymmetricAlgorithm::*;
        match self {
            IDEA | TripleDES | CAST5 | Blowfish => Ok(8),
            AES128 | AES192 | AES256 | Twofish
                | Camellia128 | Camellia192 | Camellia256 => Ok(16),
            _ => Err(Error::UnsupportedAlgorithm(format!("symmetric algorithm {:?}", self)).into()),
        }
    }
}

algorithm_enum! {
    /// The hash algorithms as defined in [Section 9.4 of RFC 4880].
    ///
    /// [Section 9.4 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-9.4
    pub enum HashAlgorithm {
        /// SHA-1.
        SHA1 => 2,
        /// RIPE-MD/160.
        RipeMD => 3,
        /// SHA-256.
        SHA256 => 8,
        /// SHA-384.
        SHA384 => 9,
        /// SHA-512.
        SHA512 => 10,
        /// SHA-224.
        SHA224 => 11,
        /// MD5.
        MD5 => 1,
    }
    Unknown, Private
}

algorithm_enum! {
    /// The compression algorithms as defined in [Section 9.3 of RFC 4880].
    ///
    /// [Section 9.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-9.3
    pub enum CompressionAlgorithm {
        /// Uncompressed.
        Uncompressed => 0,
        /// Deflate-compressed (RFC 1951).
        Zip => 1,
        /// Zlib-compressed (RFC 1950).
        Zlib => 2,
        /// BZip2-compressed.
        BZip2 => 3,
    }
    Unknown, Private
}

algorithm_enum! {
    /// The AEAD algorithms, as defined in the crypto refresh draft.
    pub enum AEADAlgorithm {
        /// EAX mode.
        EAX => 1,
        /// OCB mode.
        OCB => 2,
    }
    Unknown, Private
}

algorithm_enum! {
    /// The signature type, as defined in [Section 5.2.1 of RFC 4880].
    ///
    /// [Section 5.2.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.1
    pub enum SignatureType {
        /// Signature of a binary document.
        Binary => 0x00,
        /// Signature of a canonical text document.
        Text => 0x01,
        /// Standalone signature.
        Standalone => 0x02,
        /// Generic certification of a User ID and Public-Key packet.
        GenericCertification => 0x10,
        /// Persona certification of a User ID and Public-Key packet.
        PersonaCertification => 0x11,
        /// Casual certification of a User ID and Public-Key packet.
        CasualCertification => 0x12,
        /// Positive certification of a User ID and Public-Key packet.
        PositiveCertification => 0x13,
        /// Subkey Binding Signature.
        SubkeyBinding => 0x18,
        /// Primary Key Binding Signature.
        PrimaryKeyBinding => 0x19,
        /// Signature directly on a key.
        DirectKey => 0x1F,
        /// Key revocation signature.
        KeyRevocation => 0x20,
        /// Subkey revocation signature.
        SubkeyRevocation => 0x28,
        /// Certification revocation signature.
        CertificationRevocation => 0x30,
        /// Timestamp signature.
        Timestamp => 0x40,
        /// Third-Party Confirmation signature.
        Confirmation => 0x50,
    }
    Unknown, Private
}

algorithm_enum! {
    /// Elliptic curve identifiers, from RFC 4880bis and [RFC 6637].
    ///
    /// [RFC 6637]: https://tools.ietf.org/html/rfc6637
    pub enum ReasonForRevocation {
        /// No reason specified.
        Unspecified => 0,
        /// Key is superseded.
        KeySuperseded => 1,
        /// Key material has been compromised.
        KeyCompromised => 2,
        /// Key is retired and no longer used.
        KeyRetired => 3,
        /// The User ID is no longer valid.
        UIDRetired => 32,
    }
    Unknown, Private
}

/// Elliptic curve identifiers.
///
/// See [Section 9.2 of RFC 6637] and the crypto refresh draft.
///
/// [Section 9.2 of RFC 6637]: https://tools.ietf.org/html/rfc6637#section-9.2
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Curve {
    /// NIST curve P-256.
    NistP256,
    /// NIST curve P-384.
    NistP384,
    /// NIST curve P-521.
    NistP521,
    /// Curve25519, for ECDH only.
    Cv25519,
    /// Curve25519, for EdDSA only.
    Ed25519,
    /// Unknown curve, given by its OID.
    Unknown(Box<[u8]>),
}

impl Curve {
    /// Returns the OID of this curve.
    pub fn oid(&self) -> &[u8] {
        match self {
            Curve::NistP256 => &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07],
            Curve::NistP384 => &[0x2B, 0x81, 0x04, 0x00, 0x22],
            Curve::NistP521 => &[0x2B, 0x81, 0x04, 0x00, 0x23],
            Curve::Cv25519 => &[0x2B, 0x06, 0x01, 0x04, 0x01, 0x97, 0x55, 0x01, 0x05, 0x01],
            Curve::Ed25519 => &[0x2B, 0x06, 0x01, 0x04, 0x01, 0xDA, 0x47, 0x0F, 0x01],
            Curve::Unknown(oid) => oid,
        }
    }

    /// Parses a curve from its OID.
    pub fn from_oid(oid: &[u8]) -> Self {
        match oid {
            [0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07] => Curve::NistP256,
            [0x2B, 0x81, 0x04, 0x00, 0x22] => Curve::NistP384,
            [0x2B, 0x81, 0x04, 0x00, 0x23] => Curve::NistP521,
            [0x2B, 0x06, 0x01, 0x04, 0x01, 0x97, 0x55, 0x01, 0x05, 0x01] => Curve::Cv25519,
            [0x2B, 0x06, 0x01, 0x04, 0x01, 0xDA, 0x47, 0x0F, 0x01] => Curve::Ed25519,
            _ => Curve::Unknown(oid.to_vec().into_boxed_slice()),
        }
    }

    /// Returns the length, in bits, of the field for this curve, if known.
    pub fn bits(&self) -> crate::Result<usize> {
        match self {
            Curve::NistP256 => Ok(256),
            Curve::NistP384 => Ok(384),
            Curve::NistP521 => Ok(521),
            Curve::Cv25519 | Curve::Ed25519 => Ok(256),
            Curve::Unknown(_) =>
                Err(Error::UnsupportedAlgorithm(format!("elliptic curve {:?}", self.clone())).into()),
        }
    }

    /// Returns the length, in bytes, of a native point encoding for this
    /// curve, if known.
    pub fn len(&self) -> crate::Result<usize> {
        match self {
            Curve::Cv25519 | Curve::Ed25519 => Ok(32),
            _ => Err(Error::UnsupportedAlgorithm(format!("elliptic curve {:?}", self.clone())).into()),
        }
    }
}

#[cfg(any(test, feature = "quickcheck"))]
impl Arbitrary for Curve {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        match u8::arbitrary(g) % 5 {
            0 => Curve::NistP256,
            1 => Curve::NistP384,
            2 => Curve::NistP521,
            3 => Curve::Cv25519,
            _ => Curve::Ed25519,
        }
    }
}

/// A timestamp, as used in packet bodies.
///
/// OpenPGP timestamps are seconds since the Unix epoch, stored as an
/// unsigned 32-bit integer. `0` means "not set" in most contexts.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u32);

impl Timestamp {
    /// Returns the current time.
    pub fn now() -> Self {
        Timestamp(
            SystemTime::now().duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as u32)
                .unwrap_or(0))
    }

    /// Converts to the wire representation.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for Timestamp {
    fn from(t: u32) -> Self { Timestamp(t) }
}

impl From<Timestamp> for u32 {
    fn from(t: Timestamp) -> Self { t.0 }
}

impl TryFrom<SystemTime> for Timestamp {
    type Error = crate::Error;

    fn try_from(t: SystemTime) -> std::result::Result<Self, Self::Error> {
        let secs = t.duration_since(UNIX_EPOCH)
            .map_err(|_| crate::Error::InvalidArgument(
                "time is before the Unix epoch".into()))?
            .as_secs();
        if secs > u32::MAX as u64 {
            return Err(crate::Error::InvalidArgument(
                "time does not fit in a 32-bit timestamp".into()));
        }
        Ok(Timestamp(secs as u32))
    }
}

impl From<Timestamp> for SystemTime {
    fn from(t: Timestamp) -> Self {
        UNIX_EPOCH + StdDuration::from_secs(t.0 as u64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

#[cfg(any(test, feature = "quickcheck"))]
impl Arbitrary for Timestamp {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        Timestamp(u32::arbitrary(g))
    }
}

/// A duration, in seconds, as used by key/signature expirations.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Duration(u32);

impl Duration {
    /// Returns the number of seconds.
    pub fn as_secs(self) -> u32 { self.0 }
}

impl From<u32> for Duration {
    fn from(v: u32) -> Self { Duration(v) }
}

impl From<Duration> for u32 {
    fn from(v: Duration) -> Self { v.0 }
}

#[cfg(any(test, feature = "quickcheck"))]
impl Arbitrary for Duration {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        Duration(u32::arbitrary(g))
    }
}

macro_rules! bitfield {
    ($(#[$outer:meta])* pub struct $name:ident { $( $(#[$fm:meta])* $getter:ident / $setter:ident = $mask:expr, )* }) => {
        $(#[$outer])*
        #[derive(Clone, Default)]
        pub struct $name {
            bits: Box<[u8]>,
            pad_to: usize,
        }

        impl $name {
            /// Creates a new instance from `bits`.
            pub fn new<B: AsRef<[u8]>>(bits: B) -> Self {
                let mut v = Vec::from(bits.as_ref());
                let pad_to = crate::types::bitfield_remove_padding(&mut v);
                $name { bits: v.into_boxed_slice(), pad_to }
            }

            /// Returns the raw bytes, including padding.
            pub(crate) fn to_vec(&self) -> Vec<u8> {
                let mut v = self.bits.clone().into_vec();
                for _ in v.len()..self.pad_to { v.push(0); }
                v
            }

            fn get(&self, byte: usize, mask: u8) -> bool {
                self.bits.get(byte).map(|b| b & mask != 0).unwrap_or(false)
            }

            fn set(mut self, byte: usize, mask: u8, v: bool) -> Self {
                let mut bits = self.bits.into_vec();
                while bits.len() <= byte { bits.push(0); }
                if v { bits[byte] |= mask; } else { bits[byte] &= !mask; }
                self.bits = bits.into_boxed_slice();
                self
            }

            $(
                $(#[$fm])*
                pub fn $getter(&self) -> bool {
                    self.get($mask >> 8, ($mask & 0xff) as u8)
                }

                #[allow(missing_docs)]
                pub fn $setter(self, v: bool) -> Self {
                    self.set($mask >> 8, ($mask & 0xff) as u8, v)
                }
            )*
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool { self.bits == other.bits }
        }
        impl Eq for $name {}

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name),
                    self.bits.iter().map(|b| format!("{:02x}", b))
                        .collect::<String>())
            }
        }

        #[cfg(any(test, feature = "quickcheck"))]
        impl Arbitrary for $name {
            fn arbitrary<G: Gen>(g: &mut G) -> Self {
                Self::new(Vec::arbitrary(g))
            }
        }
    }
}

bitfield! {
    /// Describes how a key may be used, [Section 5.2.3.21 of RFC 4880].
    ///
    /// [Section 5.2.3.21 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.21
    pub struct KeyFlags {
        /// Key may certify other keys.
        for_certification / set_certification = 0x01,
        /// Key may sign data.
        for_signing / set_signing = 0x02,
        /// Key may encrypt communications.
        for_transport_encryption / set_transport_encryption = 0x04,
        /// Key may encrypt storage.
        for_storage_encryption / set_storage_encryption = 0x08,
        /// Private component may have been split.
        is_split_key / set_split_key = 0x10,
        /// Key may be used for authentication.
        for_authentication / set_authentication = 0x20,
        /// Private component may be in possession of more than one person.
        is_group_key / set_group_key = 0x80,
    }
}

bitfield! {
    /// Describes features supported by an implementation, [Section 5.2.3.24].
    pub struct Features {
        /// Modification Detection (packets MDC, SEIP) is supported.
        supports_mdc / set_mdc = 0x01,
        /// AEAD Encrypted Data Packet is supported.
        supports_aead / set_aead = 0x02,
    }
}

/// A recipient for a key server-side revocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevocationKey {
    class: u8,
    pk_algo: PublicKeyAlgorithm,
    fingerprint: crate::Fingerprint,
}

impl RevocationKey {
    /// Creates a new revocation key designation.
    pub fn new(pk_algo: PublicKeyAlgorithm, fingerprint: crate::Fingerprint,
               sensitive: bool)
        -> Self
    {
        RevocationKey {
            class: 0x80 | if sensitive { 0x40 } else { 0 },
            pk_algo,
            fingerprint,
        }
    }

    /// Returns whether this designation is sensitive.
    pub fn sensitive(&self) -> bool {
        self.class & 0x40 != 0
    }

    /// Returns the designated key's algorithm.
    pub fn revoker(&self) -> (PublicKeyAlgorithm, &crate::Fingerprint) {
        (self.pk_algo, &self.fingerprint)
    }
}
