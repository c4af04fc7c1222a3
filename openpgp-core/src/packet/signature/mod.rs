//! Types for signature packets.
//!
//! See [Section 5.2 of RFC 4880] for details.
//!
//!   [Section 5.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::SystemTime;

use crate::{Error, Result, Packet, KeyID, Fingerprint};
use crate::crypto::hash::{Context, Hash};
use crate::crypto::{mpi, Signer};
use crate::packet;
use crate::packet::key::{self, Key, PublicKey, SubordinateRole};
use crate::packet::{UserID, UserAttribute};
use crate::packet::signature::subpacket::{
    Subpacket, SubpacketArea, SubpacketAreas, SubpacketTag, SubpacketValue,
};
use crate::parse::Parse;
use crate::serialize::{Marshal, MarshalInto};
use crate::types::{HashAlgorithm, KeyFlags, PublicKeyAlgorithm, SignatureType, Timestamp};

pub mod subpacket;

const TRACE: bool = false;

/// Depth to which [`ArbitraryBounded`] impls recurse when generating
/// fuzzing/proptest input.
///
/// Signature subpackets can embed whole signatures (`Embedded
/// Signature`), which can themselves carry subpackets; without a
/// bound, `quickcheck::Arbitrary` generation would not terminate.
#[cfg(any(test, feature = "quickcheck"))]
pub(crate) const DEFAULT_ARBITRARY_LEVELS: usize = 2;

/// Like [`quickcheck::Arbitrary`], but with an explicit recursion
/// bound.
///
/// Implemented by types that are or contain [`subpacket::Subpacket`]s,
/// so that generation of deeply nested embedded signatures terminates.
#[cfg(any(test, feature = "quickcheck"))]
pub(crate) trait ArbitraryBounded {
    /// Generates an arbitrary value, recursing at most `depth` times
    /// into self-similar substructure.
    fn arbitrary_bounded<G: quickcheck::Gen>(g: &mut G, depth: usize) -> Self;
}

/// Bridges an [`ArbitraryBounded`] impl to `quickcheck::Arbitrary` by
/// seeding the recursion with [`DEFAULT_ARBITRARY_LEVELS`].
#[cfg(any(test, feature = "quickcheck"))]
macro_rules! impl_arbitrary_with_bound {
    ($typ:ty) => {
        impl quickcheck::Arbitrary for $typ {
            fn arbitrary<G: quickcheck::Gen>(g: &mut G) -> Self {
                <$typ as crate::packet::signature::ArbitraryBounded>
                    ::arbitrary_bounded(
                        g, crate::packet::signature::DEFAULT_ARBITRARY_LEVELS)
            }
        }
    };
}

#[cfg(any(test, feature = "quickcheck"))]
pub(crate) use impl_arbitrary_with_bound;

/// The scalar fields of a signature packet, shared by the builder and
/// by [`Signature4`].
///
/// This is the part of a version 4 signature that is covered by the
/// hash: the version, type, and algorithm octets, plus the hashed and
/// unhashed subpacket areas. [`Signature4`] adds the hash prefix, the
/// MPIs, and bookkeeping that lives outside the signed data.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SignatureFields {
    /// Version of the signature packet. Must be 4.
    pub(crate) version: u8,
    /// Type of signature.
    pub(crate) typ: SignatureType,
    /// Public-key algorithm used for this signature.
    pub(crate) pk_algo: PublicKeyAlgorithm,
    /// Hash algorithm used to compute the signature.
    pub(crate) hash_algo: HashAlgorithm,
    /// Hashed and unhashed subpacket areas.
    pub(crate) areas: SubpacketAreas,
}

impl Deref for SignatureFields {
    type Target = SubpacketAreas;

    fn deref(&self) -> &Self::Target {
        &self.areas
    }
}

impl DerefMut for SignatureFields {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.areas
    }
}

impl SignatureFields {
    /// Gets the version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Gets the signature type.
    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    /// Gets the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Gets the hash algorithm.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }
}

/// Holds a version 4 signature packet.
///
/// Version 4 is the form introduced by RFC 4880 and used by every
/// signature this crate creates; see [Section 5.2.3 of RFC 4880] for
/// the subpacket-based format.
///
///   [Section 5.2.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3
#[derive(Clone)]
pub struct Signature4 {
    /// CTB packet header fields.
    pub(crate) common: packet::Common,

    /// Fields as configured using the builder.
    pub(crate) fields: SignatureFields,

    /// Lower 16 bits of the signed hash value.
    pub(crate) hash_prefix: [u8; 2],
    /// Signature MPIs.
    pub(crate) mpis: mpi::Signature,

    /// When used in conjunction with a one-pass signature, this is the
    /// hash computed over the enclosed message.
    pub(crate) computed_hash: Option<(HashAlgorithm, Vec<u8>)>,

    /// Signature level.
    ///
    /// A level of 0 indicates that the signature is directly over the
    /// data, a level of 1 means that the signature is a notarization
    /// over all level 0 signatures and the data, and so on.
    pub(crate) level: usize,
}

impl fmt::Debug for Signature4 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let issuer = if let Some(fp) = self.issuer_fingerprint() {
            fp.to_string()
        } else if let Some(id) = self.issuer() {
            id.to_string()
        } else {
            "Unknown".to_string()
        };

        f.debug_struct("Signature4")
            .field("version", &self.version())
            .field("typ", &self.typ())
            .field("issuer", &issuer)
            .field("pk_algo", &self.pk_algo())
            .field("hash_algo", &self.hash_algo())
            .field("hashed_area", self.hashed_area())
            .field("unhashed_area", self.unhashed_area())
            .field("hash_prefix", &self.hash_prefix)
            .field("computed_hash", &self.computed_hash.as_ref().map(|(a, _)| a))
            .field("level", &self.level)
            .field("mpis", &self.mpis)
            .finish()
    }
}

impl PartialEq for Signature4 {
    fn eq(&self, other: &Signature4) -> bool {
        // The cached hash is not part of the packet's identity, and
        // comparing the serialized bytes sidesteps having to keep
        // this impl in sync with every field we add.
        if self.mpis != other.mpis {
            return false;
        }
        self.to_vec().unwrap_or_default() == other.to_vec().unwrap_or_default()
    }
}

impl Eq for Signature4 {}

impl std::hash::Hash for Signature4 {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.fields.hash(state);
        self.mpis.hash(state);
    }
}

impl Signature4 {
    /// Gets the hash prefix.
    pub fn hash_prefix(&self) -> &[u8; 2] {
        &self.hash_prefix
    }

    /// Sets the hash prefix.
    pub fn set_hash_prefix(&mut self, prefix: [u8; 2]) {
        self.hash_prefix = prefix;
    }

    /// Gets the signature packet's MPIs.
    pub fn mpis(&self) -> &mpi::Signature {
        &self.mpis
    }

    /// Sets the signature packet's MPIs.
    pub fn set_mpis(&mut self, mpis: mpi::Signature) {
        self.mpis = mpis;
    }

    /// Gets the computed hash value.
    pub fn computed_hash(&self) -> Option<&(HashAlgorithm, Vec<u8>)> {
        self.computed_hash.as_ref()
    }

    /// Sets the computed hash value.
    pub fn set_computed_hash(&mut self, hash: Option<(HashAlgorithm, Vec<u8>)>) {
        self.computed_hash = hash;
    }

    /// Gets the signature level.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Sets the signature level.
    pub fn set_level(&mut self, level: usize) {
        self.level = level;
    }

    /// Gets the issuer.
    ///
    /// Prefers the issuer fingerprint to the issuer key ID, which may
    /// be stored in the unhashed area.
    pub fn get_issuer(&self) -> Option<KeyID> {
        self.issuer_fingerprint().map(Fingerprint::to_keyid)
            .or_else(|| self.issuer().cloned())
    }
}

/// Holds a version 3 signature packet.
///
/// Version 3 signatures predate the subpacket mechanism: the signed
/// data is just the type octet and the creation time, and the issuer
/// key ID is a fixed field rather than a subpacket. See [Section
/// 5.2.2 of RFC 4880].
///
///   [Section 5.2.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.2
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature3 {
    pub(crate) common: packet::Common,
    pub(crate) typ: SignatureType,
    pub(crate) creation_time: Timestamp,
    pub(crate) issuer: KeyID,
    pub(crate) pk_algo: PublicKeyAlgorithm,
    pub(crate) hash_algo: HashAlgorithm,
    pub(crate) hash_prefix: [u8; 2],
    pub(crate) mpis: mpi::Signature,
}

impl Signature3 {
    /// Gets the version.
    pub fn version(&self) -> u8 {
        3
    }

    /// Gets the signature type.
    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    /// Gets the signature's creation time.
    pub fn creation_time(&self) -> Timestamp {
        self.creation_time
    }

    /// Gets the issuer key ID.
    pub fn issuer(&self) -> &KeyID {
        &self.issuer
    }

    /// Gets the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Gets the hash algorithm.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    /// Gets the hash prefix.
    pub fn hash_prefix(&self) -> &[u8; 2] {
        &self.hash_prefix
    }

    /// Gets the signature packet's MPIs.
    pub fn mpis(&self) -> &mpi::Signature {
        &self.mpis
    }
}

/// Holds a signature packet.
///
/// Signature packets are used both for certification purposes as
/// well as for document signing purposes. See [Section 5.2 of RFC
/// 4880] for details.
///
/// Most signatures encountered in the wild are version 4; version 3
/// survives in some legacy certificates and detached signatures.
///
///   [Section 5.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Signature {
    /// Version 3 signature packet.
    V3(Signature3),
    /// Version 4 signature packet.
    V4(Signature4),
}

impl Deref for Signature {
    type Target = Signature4;

    /// Gives access to the version 4 subpacket API.
    ///
    /// # Panics
    ///
    /// Panics if the signature is [`Signature::V3`]. Version 3
    /// signatures have no subpacket areas, so most of `Signature4`'s
    /// API does not apply to them; callers that need to handle both
    /// versions uniformly should use the inherent methods on
    /// `Signature` instead, which dispatch correctly on both variants.
    fn deref(&self) -> &Self::Target {
        match self {
            Signature::V4(sig) => sig,
            Signature::V3(_) => panic!(
                "version 3 signatures have no subpacket areas"),
        }
    }
}

impl Signature {
    /// Gets the version.
    pub fn version(&self) -> u8 {
        match self {
            Signature::V3(sig) => sig.version(),
            Signature::V4(sig) => sig.version(),
        }
    }

    /// Gets the signature type.
    pub fn typ(&self) -> SignatureType {
        match self {
            Signature::V3(sig) => sig.typ(),
            Signature::V4(sig) => sig.typ(),
        }
    }

    /// Gets the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        match self {
            Signature::V3(sig) => sig.pk_algo(),
            Signature::V4(sig) => sig.pk_algo(),
        }
    }

    /// Gets the hash algorithm.
    pub fn hash_algo(&self) -> HashAlgorithm {
        match self {
            Signature::V3(sig) => sig.hash_algo(),
            Signature::V4(sig) => sig.hash_algo(),
        }
    }

    /// Gets the hash prefix.
    pub fn hash_prefix(&self) -> &[u8; 2] {
        match self {
            Signature::V3(sig) => sig.hash_prefix(),
            Signature::V4(sig) => sig.hash_prefix(),
        }
    }

    /// Gets the signature packet's MPIs.
    pub fn mpis(&self) -> &mpi::Signature {
        match self {
            Signature::V3(sig) => sig.mpis(),
            Signature::V4(sig) => sig.mpis(),
        }
    }

    /// Gets the computed hash value.
    pub fn computed_hash(&self) -> Option<&(HashAlgorithm, Vec<u8>)> {
        match self {
            Signature::V3(_) => None,
            Signature::V4(sig) => sig.computed_hash(),
        }
    }

    /// Sets the computed hash value.
    ///
    /// No-op on version 3 signatures, which don't cache it.
    pub fn set_computed_hash(&mut self, hash: Option<(HashAlgorithm, Vec<u8>)>) {
        if let Signature::V4(sig) = self {
            sig.set_computed_hash(hash);
        }
    }

    /// Gets the signature level.
    ///
    /// A level of 0 indicates that the signature is directly over the
    /// data, a level of 1 means that the signature is a notarization
    /// over all level 0 signatures and the data, and so on.
    pub fn level(&self) -> usize {
        match self {
            Signature::V3(_) => 0,
            Signature::V4(sig) => sig.level(),
        }
    }

    /// Sets the signature level.
    ///
    /// No-op on version 3 signatures, which don't carry one.
    pub fn set_level(&mut self, level: usize) {
        if let Signature::V4(sig) = self {
            sig.set_level(level);
        }
    }

    /// Gets the issuer.
    ///
    /// For version 4 signatures, prefers the issuer fingerprint to
    /// the issuer key ID, which may be stored in the unhashed area.
    pub fn get_issuer(&self) -> Option<KeyID> {
        match self {
            Signature::V3(sig) => Some(sig.issuer().clone()),
            Signature::V4(sig) => sig.get_issuer(),
        }
    }

    /// Verifies the signature against `hash`.
    pub fn verify_hash<P, R>(&self, key: &Key<P, R>, hash_algo: HashAlgorithm,
                              hash: &[u8]) -> Result<bool>
        where P: key::KeyParts,
              R: key::KeyRole,
    {
        match crate::crypto::asymmetric::verify(
            key.mpis(), hash_algo, hash, self.mpis())
        {
            Ok(()) => Ok(true),
            Err(Error::BadCrypto(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Returns whether `key` made the signature.
    ///
    /// This function does not check whether `key` can make valid
    /// signatures; it is up to the caller to make sure the key is not
    /// revoked, not expired, has a valid self-signature, has a
    /// subkey binding signature (if appropriate), has the signing
    /// capability, etc.
    pub fn verify<P, R>(&self, key: &Key<P, R>) -> Result<bool>
        where P: key::KeyParts,
              R: key::KeyRole,
    {
        if !(self.typ() == SignatureType::Binary
             || self.typ() == SignatureType::Text
             || self.typ() == SignatureType::Standalone) {
            return Err(Error::UnsupportedAlgorithm(format!("signature type {:?}", self.typ())));
        }

        if let Some((hash_algo, hash)) = self.computed_hash() {
            self.verify_hash(key, *hash_algo, hash)
        } else {
            Err(Error::BadCrypto("hash not computed".into()))
        }
    }

    /// Verifies the primary key binding.
    ///
    /// `self` is the direct-key signature, `signer` is the key that
    /// allegedly made the signature, and `pk` is the primary key. For
    /// a self-signature, `signer` and `pk` are the same key.
    pub fn verify_primary_key_binding<P, R>(&self, signer: &Key<P, R>,
                                             pk: &PublicKey) -> Result<bool>
        where P: key::KeyParts,
              R: key::KeyRole,
    {
        if self.typ() != SignatureType::DirectKey {
            return Err(Error::UnsupportedAlgorithm(format!("signature type {:?}", self.typ())));
        }

        let hash = self.primary_key_binding_hash(pk)?;
        self.verify_hash(signer, self.hash_algo(), &hash)
    }

    /// Verifies the primary key revocation certificate.
    ///
    /// `self` is the revocation certificate, `signer` is the key that
    /// allegedly made the signature, and `pk` is the primary key. For
    /// a self-revocation, `signer` and `pk` are the same key.
    pub fn verify_primary_key_revocation<P, R>(&self, signer: &Key<P, R>,
                                                pk: &PublicKey) -> Result<bool>
        where P: key::KeyParts,
              R: key::KeyRole,
    {
        if self.typ() != SignatureType::KeyRevocation {
            return Err(Error::UnsupportedAlgorithm(format!("signature type {:?}", self.typ())));
        }

        let hash = self.primary_key_binding_hash(pk)?;
        self.verify_hash(signer, self.hash_algo(), &hash)
    }

    /// Verifies the subkey binding.
    ///
    /// `self` is the subkey binding signature, `signer` is the key
    /// that allegedly made the signature, `pk` is the primary key,
    /// and `subkey` is the subkey. For a self-signature, `signer` and
    /// `pk` are the same key.
    ///
    /// If the signature indicates that this is a signing-capable
    /// subkey, the embedded primary key binding signature (the "back
    /// signature") is also verified; if it is missing or does not
    /// verify, this function returns `Ok(false)`.
    pub fn verify_subkey_binding<P, R, P2>(
        &self, signer: &Key<P, R>, pk: &PublicKey,
        subkey: &Key<P2, SubordinateRole>,
    ) -> Result<bool>
        where P: key::KeyParts,
              R: key::KeyRole,
              P2: key::KeyParts,
    {
        if self.typ() != SignatureType::SubkeyBinding {
            return Err(Error::UnsupportedAlgorithm(format!("signature type {:?}", self.typ())));
        }

        let hash = self.subkey_binding_hash(pk, subkey)?;
        if !self.verify_hash(signer, self.hash_algo(), &hash)? {
            return Ok(false);
        }

        let signing_capable = self.key_flags()
            .map(|f| f.for_signing())
            .unwrap_or(false);
        if !signing_capable {
            // No backsig required.
            return Ok(true);
        }

        let mut backsig_ok = false;
        if let Some(backsig) = self.embedded_signature() {
            if backsig.typ() != SignatureType::PrimaryKeyBinding {
                return Err(Error::UnsupportedAlgorithm(format!("signature type {:?}", backsig.typ())));
            }

            // We can't use backsig.verify_subkey_binding, since the
            // back signature is over (pk, subkey), not (pk, subkey's
            // subkey).
            let hash = backsig.subkey_binding_hash(pk, subkey)?;
            match backsig.verify_hash(subkey, backsig.hash_algo(), &hash) {
                Ok(true) => {
                    if TRACE {
                        eprintln!("{} / {}: backsig is good",
                                  pk.keyid(), subkey.keyid());
                    }
                    backsig_ok = true;
                }
                Ok(false) => {
                    if TRACE {
                        eprintln!("{} / {}: backsig is bad",
                                  pk.keyid(), subkey.keyid());
                    }
                }
                Err(err) => {
                    if TRACE {
                        eprintln!("{} / {}: error validating backsig: {}",
                                  pk.keyid(), subkey.keyid(), err);
                    }
                }
            }
        }

        Ok(backsig_ok)
    }

    /// Verifies the subkey revocation.
    ///
    /// `self` is the subkey revocation certificate, `signer` is the
    /// key that allegedly made the signature, `pk` is the primary
    /// key, and `subkey` is the subkey. For a self-revocation,
    /// `signer` and `pk` are the same key.
    pub fn verify_subkey_revocation<P, R, P2>(
        &self, signer: &Key<P, R>, pk: &PublicKey,
        subkey: &Key<P2, SubordinateRole>,
    ) -> Result<bool>
        where P: key::KeyParts,
              R: key::KeyRole,
              P2: key::KeyParts,
    {
        if self.typ() != SignatureType::SubkeyRevocation {
            return Err(Error::UnsupportedAlgorithm(format!("signature type {:?}", self.typ())));
        }

        let hash = self.subkey_binding_hash(pk, subkey)?;
        self.verify_hash(signer, self.hash_algo(), &hash)
    }

    /// Verifies the user ID binding.
    ///
    /// `self` is the user ID binding signature, `signer` is the key
    /// that allegedly made the signature, `pk` is the primary key,
    /// and `userid` is the user ID. For a self-signature, `signer`
    /// and `pk` are the same key.
    pub fn verify_userid_binding<P, R>(&self, signer: &Key<P, R>,
                                        pk: &PublicKey,
                                        userid: &UserID) -> Result<bool>
        where P: key::KeyParts,
              R: key::KeyRole,
    {
        if !matches!(self.typ(),
                      SignatureType::GenericCertification
                      | SignatureType::PersonaCertification
                      | SignatureType::CasualCertification
                      | SignatureType::PositiveCertification) {
            return Err(Error::UnsupportedAlgorithm(format!("signature type {:?}", self.typ())));
        }

        let hash = self.userid_binding_hash(pk, userid)?;
        self.verify_hash(signer, self.hash_algo(), &hash)
    }

    /// Verifies the user ID revocation certificate.
    ///
    /// `self` is the revocation certificate, `signer` is the key that
    /// allegedly made the signature, `pk` is the primary key, and
    /// `userid` is the user ID. For a self-revocation, `signer` and
    /// `pk` are the same key.
    pub fn verify_userid_revocation<P, R>(&self, signer: &Key<P, R>,
                                           pk: &PublicKey,
                                           userid: &UserID) -> Result<bool>
        where P: key::KeyParts,
              R: key::KeyRole,
    {
        if self.typ() != SignatureType::CertificationRevocation {
            return Err(Error::UnsupportedAlgorithm(format!("signature type {:?}", self.typ())));
        }

        let hash = self.userid_binding_hash(pk, userid)?;
        self.verify_hash(signer, self.hash_algo(), &hash)
    }

    /// Verifies the user attribute binding.
    ///
    /// `self` is the user attribute binding signature, `signer` is
    /// the key that allegedly made the signature, `pk` is the primary
    /// key, and `ua` is the user attribute. For a self-signature,
    /// `signer` and `pk` are the same key.
    pub fn verify_user_attribute_binding<P, R>(&self, signer: &Key<P, R>,
                                                pk: &PublicKey,
                                                ua: &UserAttribute)
        -> Result<bool>
        where P: key::KeyParts,
              R: key::KeyRole,
    {
        if !matches!(self.typ(),
                      SignatureType::GenericCertification
                      | SignatureType::PersonaCertification
                      | SignatureType::CasualCertification
                      | SignatureType::PositiveCertification) {
            return Err(Error::UnsupportedAlgorithm(format!("signature type {:?}", self.typ())));
        }

        let hash = self.user_attribute_binding_hash(pk, ua)?;
        self.verify_hash(signer, self.hash_algo(), &hash)
    }

    /// Verifies the user attribute revocation certificate.
    ///
    /// `self` is the revocation certificate, `signer` is the key that
    /// allegedly made the signature, `pk` is the primary key, and
    /// `ua` is the user attribute. For a self-revocation, `signer`
    /// and `pk` are the same key.
    pub fn verify_user_attribute_revocation<P, R>(&self, signer: &Key<P, R>,
                                                   pk: &PublicKey,
                                                   ua: &UserAttribute)
        -> Result<bool>
        where P: key::KeyParts,
              R: key::KeyRole,
    {
        if self.typ() != SignatureType::CertificationRevocation {
            return Err(Error::UnsupportedAlgorithm(format!("signature type {:?}", self.typ())));
        }

        let hash = self.user_attribute_binding_hash(pk, ua)?;
        self.verify_hash(signer, self.hash_algo(), &hash)
    }

    /// Converts the `Signature` to a `Packet`.
    pub fn to_packet(self) -> Packet {
        Packet::Signature(self)
    }
}

impl From<Signature> for Packet {
    fn from(s: Signature) -> Self {
        s.to_packet()
    }
}

/// Builds a signature packet.
///
/// This is the mutable precursor to a [`Signature`]: the fluent
/// subpacket setters live in [`subpacket`] and return `Self` so they
/// can be chained, finishing with [`SignatureBuilder::sign_hash`]
/// to produce the finished, signed [`Signature`].
#[derive(Clone, Hash, PartialEq, Eq, Debug)]
pub struct SignatureBuilder {
    pub(crate) version: u8,
    pub(crate) typ: SignatureType,
    pub(crate) pk_algo: PublicKeyAlgorithm,
    pub(crate) hash_algo: HashAlgorithm,
    pub(crate) hashed_area: SubpacketArea,
    pub(crate) unhashed_area: SubpacketArea,
    pub(crate) overrode_creation_time: bool,
}

impl SignatureBuilder {
    /// Returns a new `SignatureBuilder` for a signature of type `typ`.
    pub fn new(typ: SignatureType) -> Self {
        SignatureBuilder {
            version: 4,
            typ,
            pk_algo: PublicKeyAlgorithm::Unknown(0),
            hash_algo: HashAlgorithm::Unknown(0),
            hashed_area: SubpacketArea::default(),
            unhashed_area: SubpacketArea::default(),
            overrode_creation_time: false,
        }
    }

    /// Sets the signature type.
    pub fn set_type(mut self, typ: SignatureType) -> Self {
        self.typ = typ;
        self
    }

    /// Gets the signature type.
    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    /// Gets the public key algorithm, if set.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Gets the hash algorithm, if set.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    /// Gets a reference to the hashed area.
    pub fn hashed_area(&self) -> &SubpacketArea {
        &self.hashed_area
    }

    /// Gets a mutable reference to the hashed area.
    pub fn hashed_area_mut(&mut self) -> &mut SubpacketArea {
        &mut self.hashed_area
    }

    /// Gets a reference to the unhashed area.
    pub fn unhashed_area(&self) -> &SubpacketArea {
        &self.unhashed_area
    }

    /// Gets a mutable reference to the unhashed area.
    pub fn unhashed_area_mut(&mut self) -> &mut SubpacketArea {
        &mut self.unhashed_area
    }

    /// Returns the signature creation time, if set.
    pub fn signature_creation_time(&self) -> Option<SystemTime> {
        self.hashed_area.signature_creation_time()
    }

    fn subpacket(&self, tag: SubpacketTag) -> Option<&Subpacket> {
        self.hashed_area.lookup(tag)
            .or_else(|| self.unhashed_area.lookup(tag))
    }

    /// Returns the value of the Issuer subpacket, if present in
    /// either area.
    pub fn issuer(&self) -> Option<&KeyID> {
        match self.subpacket(SubpacketTag::Issuer).map(Subpacket::value) {
            Some(SubpacketValue::Issuer(id)) => Some(id),
            _ => None,
        }
    }

    /// Returns the value of the Issuer Fingerprint subpacket, if
    /// present in either area.
    pub fn issuer_fingerprint(&self) -> Option<&Fingerprint> {
        match self.subpacket(SubpacketTag::IssuerFingerprint).map(Subpacket::value) {
            Some(SubpacketValue::IssuerFingerprint(fp)) => Some(fp),
            _ => None,
        }
    }

    /// Signs `hash` using `signer`, finishing the signature.
    ///
    /// The signature's public-key algorithm field is set to the
    /// algorithm used by `signer`; the hash-algorithm field is set to
    /// `hash`'s algorithm.
    ///
    /// Unless [`SignatureBuilder::set_signature_creation_time`] (or
    /// one of its siblings) was already called, the current time is
    /// recorded as the signature's creation time. Unless an `Issuer`
    /// or `Issuer Fingerprint` subpacket is already present, both are
    /// added to the unhashed area, identifying `signer`.
    pub fn sign_hash<S>(mut self, signer: &mut S, mut hash: Context)
        -> Result<Signature>
        where S: Signer,
    {
        self.pk_algo = signer.public().pk_algo();
        self.hash_algo = hash.algo();

        if !self.overrode_creation_time {
            self = self.set_signature_creation_time(SystemTime::now())?;
        }

        if self.issuer().is_none() && self.issuer_fingerprint().is_none() {
            self.unhashed_area.add(Subpacket::new(
                SubpacketValue::Issuer(signer.public().keyid()), false)?)?;
            self.unhashed_area.add(Subpacket::new(
                SubpacketValue::IssuerFingerprint(signer.public().fingerprint()),
                false)?)?;
        }

        let fields = SignatureFields {
            version: self.version,
            typ: self.typ,
            pk_algo: self.pk_algo,
            hash_algo: self.hash_algo,
            areas: SubpacketAreas::new(self.hashed_area, self.unhashed_area),
        };

        fields.hash(&mut hash);
        let mut digest = vec![0u8; hash.digest_size()];
        hash.digest(&mut digest);

        let mpis = signer.sign(self.hash_algo, &digest)?;

        Ok(Signature::V4(Signature4 {
            common: Default::default(),
            fields,
            hash_prefix: [digest[0], digest[1]],
            mpis,
            computed_hash: Some((self.hash_algo, digest)),
            level: 0,
        }))
    }
}

impl From<Signature> for SignatureBuilder {
    fn from(sig: Signature) -> Self {
        match sig {
            Signature::V4(sig) => SignatureBuilder {
                version: sig.fields.version,
                typ: sig.fields.typ,
                pk_algo: sig.fields.pk_algo,
                hash_algo: sig.fields.hash_algo,
                hashed_area: sig.fields.areas.hashed_area().clone(),
                unhashed_area: sig.fields.areas.unhashed_area().clone(),
                overrode_creation_time: true,
            },
            Signature::V3(sig) => SignatureBuilder {
                version: 4,
                typ: sig.typ,
                pk_algo: sig.pk_algo,
                hash_algo: sig.hash_algo,
                hashed_area: SubpacketArea::default(),
                unhashed_area: SubpacketArea::default(),
                overrode_creation_time: false,
            },
        }
    }
}

fn parse_v4_prefix(data: &[u8]) -> Result<(SignatureFields, usize)> {
    if data.len() < 5 {
        return Err(Error::Malformed("truncated signature packet".into()));
    }

    let typ = SignatureType::from(data[1]);
    let pk_algo = PublicKeyAlgorithm::from(data[2]);
    let hash_algo = HashAlgorithm::from(data[3]);

    let mut pos = 4;
    let hashed_len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
    pos += 2;
    if data.len() < pos + hashed_len {
        return Err(Error::Malformed("truncated hashed subpacket area".into()));
    }
    let hashed_area = SubpacketArea::from_bytes(&data[pos..pos + hashed_len])?;
    pos += hashed_len;

    if data.len() < pos + 2 {
        return Err(Error::Malformed("truncated signature packet".into()));
    }
    let unhashed_len = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
    pos += 2;
    if data.len() < pos + unhashed_len {
        return Err(Error::Malformed("truncated unhashed subpacket area".into()));
    }
    let unhashed_area = SubpacketArea::from_bytes(&data[pos..pos + unhashed_len])?;
    pos += unhashed_len;

    Ok((SignatureFields {
        version: 4,
        typ,
        pk_algo,
        hash_algo,
        areas: SubpacketAreas::new(hashed_area, unhashed_area),
    }, pos))
}

impl Marshal for SignatureFields {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        sink.write_all(&[self.version, self.typ.into(), self.pk_algo.into(),
                          self.hash_algo.into()])?;

        let hashed = self.hashed_area().to_vec()?;
        sink.write_all(&(hashed.len() as u16).to_be_bytes())?;
        sink.write_all(&hashed)?;

        let unhashed = self.unhashed_area().to_vec()?;
        sink.write_all(&(unhashed.len() as u16).to_be_bytes())?;
        sink.write_all(&unhashed)?;

        Ok(())
    }
}

impl Marshal for Signature4 {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        self.fields.serialize(sink)?;
        sink.write_all(&self.hash_prefix)?;
        self.mpis.serialize(sink)
    }
}

impl<'a> Parse<'a, Signature4> for Signature4 {
    fn from_bytes(data: &'a [u8]) -> Result<Self> {
        let (fields, mut pos) = parse_v4_prefix(data)?;

        if data.len() < pos + 2 {
            return Err(Error::Malformed("truncated signature hash prefix".into()));
        }
        let hash_prefix = [data[pos], data[pos + 1]];
        pos += 2;

        let mpis = mpi::Signature::parse(fields.pk_algo, data[pos..].to_vec())?;

        Ok(Signature4 {
            common: Default::default(),
            fields,
            hash_prefix,
            mpis,
            computed_hash: None,
            level: 0,
        })
    }
}

impl Marshal for Signature3 {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        sink.write_all(&[3, 5, self.typ.into()])?;
        sink.write_all(&u32::from(self.creation_time).to_be_bytes())?;
        sink.write_all(self.issuer.as_bytes())?;
        sink.write_all(&[self.pk_algo.into(), self.hash_algo.into()])?;
        sink.write_all(&self.hash_prefix)?;
        self.mpis.serialize(sink)
    }
}

impl<'a> Parse<'a, Signature3> for Signature3 {
    fn from_bytes(data: &'a [u8]) -> Result<Self> {
        // 1 version + 1 hashed-material length (always 5, historical
        // artifact) + 1 type + 4 creation time + 8 issuer key ID + 1
        // pk_algo + 1 hash_algo + 2 hash prefix = 19 bytes of fixed
        // fields, followed by the MPIs.
        if data.len() < 19 {
            return Err(Error::Malformed("truncated signature packet".into()));
        }
        if data[1] != 5 {
            return Err(Error::Malformed(
                "version 3 signature has unexpected hashed material length".into()));
        }

        let typ = SignatureType::from(data[2]);
        let creation_time = Timestamp::from(
            u32::from_be_bytes([data[3], data[4], data[5], data[6]]));
        let issuer = KeyID::from_bytes(&data[7..15]);
        let pk_algo = PublicKeyAlgorithm::from(data[15]);
        let hash_algo = HashAlgorithm::from(data[16]);
        let hash_prefix = [data[17], data[18]];
        let mpis = mpi::Signature::parse(pk_algo, data[19..].to_vec())?;

        Ok(Signature3 {
            common: Default::default(),
            typ,
            creation_time,
            issuer,
            pk_algo,
            hash_algo,
            hash_prefix,
            mpis,
        })
    }
}

impl Marshal for Signature {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        match self {
            Signature::V3(sig) => sig.serialize(sink),
            Signature::V4(sig) => sig.serialize(sink),
        }
    }
}

impl<'a> Parse<'a, Signature> for Signature {
    fn from_bytes(data: &'a [u8]) -> Result<Self> {
        match data.first() {
            Some(3) => Ok(Signature::V3(Signature3::from_bytes(data)?)),
            Some(4) => Ok(Signature::V4(Signature4::from_bytes(data)?)),
            Some(v) => Err(Error::Malformed(
                format!("unsupported signature version {}", v))),
            None => Err(Error::Malformed("empty signature packet".into())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::packet::key::{Key4, SecretParts, UnspecifiedRole};
    use crate::types::Curve;

    fn signing_keypair() -> key::KeyPair {
        let key4 = Key4::<SecretParts, UnspecifiedRole>::generate_ecc(true, Curve::Ed25519)
            .unwrap();
        let key: key::Key<SecretParts, UnspecifiedRole> = key4.into();
        key.into_keypair().unwrap()
    }

    #[test]
    fn sign_verify() {
        let mut keypair = signing_keypair();
        let hash_algo = HashAlgorithm::SHA512;

        let sig = SignatureBuilder::new(SignatureType::Binary)
            .sign_hash(&mut keypair, hash_algo.context().unwrap())
            .unwrap();

        assert_eq!(sig.typ(), SignatureType::Binary);
        assert_eq!(sig.pk_algo(), keypair.public().pk_algo());
        assert_eq!(sig.get_issuer().as_ref(), Some(&keypair.public().keyid()));

        let (algo, digest) = sig.computed_hash().unwrap().clone();
        assert!(sig.verify_hash(keypair.public(), algo, &digest).unwrap());

        let mut bad_digest = digest.clone();
        bad_digest[0] ^= 0xff;
        assert!(!sig.verify_hash(keypair.public(), algo, &bad_digest).unwrap());
    }

    #[test]
    fn sign_verify_roundtrip() {
        let mut keypair = signing_keypair();
        let sig = SignatureBuilder::new(SignatureType::Binary)
            .sign_hash(&mut keypair, HashAlgorithm::SHA512.context().unwrap())
            .unwrap();

        let bytes = sig.to_vec().unwrap();
        let parsed = Signature::from_bytes(&bytes).unwrap();
        assert_eq!(sig.mpis(), parsed.mpis());
        assert_eq!(sig.typ(), parsed.typ());
        assert_eq!(sig.hash_prefix(), parsed.hash_prefix());
    }

    #[test]
    fn issuer_default() {
        let mut keypair = signing_keypair();
        let sig = SignatureBuilder::new(SignatureType::Binary)
            .sign_hash(&mut keypair, HashAlgorithm::SHA512.context().unwrap())
            .unwrap();

        assert!(sig.issuer().is_some());
        assert!(sig.issuer_fingerprint().is_some());
    }

    #[test]
    fn explicit_issuer_suppresses_fingerprint_default() {
        let mut keypair = signing_keypair();
        let explicit = KeyID::from_bytes(&[0xAA; 8]);
        let sig = SignatureBuilder::new(SignatureType::Binary)
            .set_issuer(explicit.clone()).unwrap()
            .sign_hash(&mut keypair, HashAlgorithm::SHA512.context().unwrap())
            .unwrap();

        assert_eq!(sig.issuer(), Some(&explicit));
        assert!(sig.issuer_fingerprint().is_none());
    }
}
