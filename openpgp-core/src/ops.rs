//! High-level sign/verify/encrypt/decrypt entry points.
//!
//! The rest of the crate exposes the packet-level building blocks
//! (`parse`, `serialize::stream`, `armor`); this module wires them
//! together into the handful of primitives most callers actually
//! reach for, mirroring the shape of a typical OpenPGP front end:
//! `sign_buf`, `sign_file`, `verify`, `encrypt`, `decrypt`,
//! `clearsign`, `dearmor`.
//!
//! ```
//! use openpgp_core::ops;
//! use openpgp_core::packet::key::{Key4, SecretParts, UnspecifiedRole};
//! use openpgp_core::types::Curve;
//!
//! # fn main() -> openpgp_core::Result<()> {
//! let key4 = Key4::<SecretParts, UnspecifiedRole>::generate_ecc(true, Curve::Ed25519)?;
//! let key: openpgp_core::packet::key::Key<SecretParts, UnspecifiedRole> = key4.into();
//! let keypair = key.into_keypair()?;
//! let public = keypair.public().clone();
//!
//! let signed = ops::sign_buf(keypair, b"ship it")?;
//! let result = ops::verify(&signed, &[public])?;
//! assert!(result.is_valid());
//! # Ok(())
//! # }
//! ```

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::armor::{self, Kind, Reader, ReaderMode, Writer};
use crate::crypto::hash::Hash as _;
use crate::crypto;
use crate::crypto::symmetric;
use crate::packet::key::{Key, PublicParts, UnspecifiedRole};
use crate::packet::{DataFormat, Signature, SignatureBuilder};
use crate::parse::{parse_packets, Parse};
use crate::serialize::stream::{
    Encryptor, EncryptionMode, LiteralWriter, Message, Signer,
};
use crate::serialize::Marshal;
use crate::types::{HashAlgorithm, SignatureType, SymmetricAlgorithm};
use crate::{Error, Message as ValidatedMessage, Packet, Result};

/// Signs `plaintext` as a binary, one-pass-signed OpenPGP message.
///
/// The result is a `OnePassSig`/`Literal`/`Signature` packet sequence,
/// the same shape [`crate::serialize::stream::Signer`] builds; this is
/// just that assembly with the bookkeeping done for the caller.
pub fn sign_buf(signer: impl crypto::Signer + Send + Sync, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let message = Message::new(&mut buf);
        let message = Signer::new(message, signer).build()?;
        let mut message = LiteralWriter::new(message).format(DataFormat::Binary).build()?;
        message.write_all(plaintext)?;
        message.finalize()?;
    }
    Ok(buf)
}

/// Reads `path` and signs its contents as by [`sign_buf`].
pub fn sign_file(signer: impl crypto::Signer + Send + Sync, path: &Path) -> Result<Vec<u8>> {
    let plaintext = fs::read(path)?;
    sign_buf(signer, &plaintext)
}

/// The outcome of [`verify`]ing a message against a set of candidate
/// certificates.
///
/// Mirrors the three-way split a consumer needs: a signature's issuer
/// may match none of the supplied keys (`unknown`), match one but fail
/// the cryptographic check (`invalid`), or match and verify
/// (`valid`). A cryptographic failure is therefore always
/// distinguishable from "I don't have this signer's key."
#[derive(Debug, Default)]
pub struct VerificationResult {
    /// Signatures that verified against one of the supplied keys.
    pub valid: Vec<Signature>,
    /// Signatures whose issuer matched a supplied key, but the
    /// cryptographic check failed.
    pub invalid: Vec<Signature>,
    /// Signatures whose issuer did not match any supplied key.
    pub unknown: Vec<Signature>,
}

impl VerificationResult {
    /// Whether the message carried at least one signature that
    /// verified against a supplied key.
    ///
    /// Does not by itself mean the message is trustworthy -- the
    /// caller is still responsible for deciding whether the signing
    /// key is one they trust.
    pub fn is_valid(&self) -> bool {
        !self.valid.is_empty()
    }
}

fn classify_signature(sig: &Signature, certs: &[Key<PublicParts, UnspecifiedRole>],
                       result: &mut VerificationResult) {
    let issuer = sig.get_issuer();
    let key = issuer.as_ref().and_then(|id| certs.iter().find(|k| &k.keyid() == id));
    match key {
        Some(key) => match sig.verify(key) {
            Ok(true) => result.valid.push(sig.clone()),
            Ok(false) | Err(_) => result.invalid.push(sig.clone()),
        },
        None => result.unknown.push(sig.clone()),
    }
}

/// Verifies every signature packet in `data`, a binary (not armored)
/// OpenPGP message, against `certs`.
///
/// Returns `Ok` whenever `data` parses as a structurally valid
/// message, even if none of its signatures verify -- callers check
/// [`VerificationResult::is_valid`], not just the outer `Result`, to
/// tell a genuinely unsigned/unverifiable message from a parse
/// failure.
pub fn verify(data: &[u8], certs: &[Key<PublicParts, UnspecifiedRole>])
    -> Result<VerificationResult>
{
    let message = ValidatedMessage::from_bytes(data)?;
    let mut result = VerificationResult::default();
    for packet in message.descendants() {
        if let Packet::Signature(sig) = packet {
            classify_signature(sig, certs, &mut result);
        }
    }
    Ok(result)
}

/// Verifies a detached `signature` over `data` against `certs`.
pub fn verify_detached(data: &[u8], signature: &[u8],
                        certs: &[Key<PublicParts, UnspecifiedRole>])
    -> Result<VerificationResult>
{
    let packets = parse_packets(signature, 0)?;
    let mut result = VerificationResult::default();
    for packet in &packets {
        if let Packet::Signature(sig) = packet {
            let mut hash = sig.hash_algo().context()?;
            hash.update(data);
            let mut sig = sig.clone();
            sig.hash(&mut hash);
            let mut digest = vec![0u8; hash.digest_size()];
            hash.digest(&mut digest);
            sig.set_computed_hash(Some((sig.hash_algo(), digest)));
            classify_signature(&sig, certs, &mut result);
        }
    }
    Ok(result)
}

/// Number of bytes the session-key S2K iteration count aims to hash;
/// see [`Encryptor`]'s identical constant.
const DEFAULT_S2K_BYTES: usize = 1 << 16;

/// Encrypts `plaintext` to a password, producing a binary SEIP
/// message preceded by its SKESK packet.
pub fn encrypt(password: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let message = Message::new(&mut buf);
        let message = Encryptor::new(message, EncryptionMode::ForTransport)
            .add_password(password)
            .build()?;
        let mut message = LiteralWriter::new(message).format(DataFormat::Binary).build()?;
        message.write_all(plaintext)?;
        message.finalize()?;
    }
    Ok(buf)
}

/// Decrypts a password-encrypted binary OpenPGP message produced by
/// [`encrypt`] (or any conforming SKESK+SEIPv1 producer).
///
/// There is no streaming decryption reader in this crate (see
/// `serialize::stream`'s design notes): the SEIP container's CFB/MDC
/// framing is undone directly here, the same construction
/// `serialize::stream::Encryptor` writes.
pub fn decrypt(password: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let packets = parse_packets(data, 0)?;

    let skesk = packets.iter().find_map(|p| match p {
        Packet::SKESK(s) => Some(s),
        _ => None,
    }).ok_or_else(|| Error::Malformed("no SKESK packet found".into()))?;

    let seip = packets.iter().find_map(|p| match p {
        Packet::SEIP(crate::packet::SEIP::V1(s)) => Some(s),
        _ => None,
    }).ok_or_else(|| Error::Malformed("no SEIP packet found".into()))?;

    let (algo, session_key) = skesk.decrypt(password)?;
    let block_size = algo.block_size()?;
    let ciphertext = seip.body();
    if ciphertext.len() < block_size + 2 {
        return Err(Error::Malformed("SEIP body shorter than one cipher block".into()));
    }

    let mut cipher = symmetric::Context::new(algo, session_key.as_ref())?;
    let mut iv = vec![0u8; block_size];
    let mut prefix = vec![0u8; block_size + 2];
    cipher.decrypt(&mut iv, &ciphertext[..block_size + 2], &mut prefix)?;
    if prefix[block_size - 2] != prefix[block_size]
        || prefix[block_size - 1] != prefix[block_size + 1]
    {
        return Err(Error::BadCrypto("SEIP quick-check bytes do not match".into()));
    }

    let rest = &ciphertext[block_size + 2..];
    let mut decrypted = vec![0u8; rest.len()];
    cipher.decrypt(&mut iv, rest, &mut decrypted)?;
    if decrypted.len() < 22 {
        return Err(Error::Malformed("SEIP plaintext too short to hold an MDC".into()));
    }

    let mdc_start = decrypted.len() - 22;
    if decrypted[mdc_start..mdc_start + 2] != [0xD3, 0x14] {
        return Err(Error::BadCrypto("missing MDC packet header".into()));
    }

    let mut hash = HashAlgorithm::SHA1.context()?;
    hash.update(&prefix);
    hash.update(&decrypted[..mdc_start + 2]);
    let mut digest = [0u8; 20];
    hash.digest(&mut digest[..]);
    if decrypted[mdc_start + 2..] != digest[..] {
        return Err(Error::BadCrypto("MDC digest does not match decrypted content".into()));
    }

    let inner = parse_packets(&decrypted[..mdc_start], 0)?;
    inner.iter().find_map(|p| match p {
        Packet::Literal(l) => Some(l.body().to_vec()),
        _ => None,
    }).ok_or_else(|| Error::Malformed("no literal data packet inside SEIP container".into()))
}

/// Overrides the symmetric algorithm [`encrypt`] uses (default
/// AES-256); exposed separately since [`encrypt`]'s signature already
/// covers the common case.
pub fn encrypt_with_algo(password: &[u8], plaintext: &[u8], algo: SymmetricAlgorithm)
    -> Result<Vec<u8>>
{
    let mut buf = Vec::new();
    {
        let message = Message::new(&mut buf);
        let message = Encryptor::new(message, EncryptionMode::ForTransport)
            .add_password(password)
            .sym_algo(algo)
            .build()?;
        let mut message = LiteralWriter::new(message).format(DataFormat::Binary).build()?;
        message.write_all(plaintext)?;
        message.finalize()?;
    }
    Ok(buf)
}

/// Produces a Cleartext Signature Framework message: `text` framed
/// per RFC 4880 §7 followed by an armored detached signature over it.
///
/// The signature covers [`armor::cleartext::signed_text`]'s
/// normalization of `text` (trailing whitespace stripped per line,
/// `\r\n` line endings), not `text`'s raw bytes, matching what every
/// other cleartext-signing implementation computes.
pub fn clearsign(mut signer: impl crypto::Signer + Send + Sync, text: &[u8]) -> Result<Vec<u8>> {
    let hash_algo = HashAlgorithm::SHA512;

    let mut hash = hash_algo.context()?;
    hash.update(&armor::cleartext::signed_text(text));

    let sig = SignatureBuilder::new(SignatureType::Text)
        .sign_hash(&mut signer, hash)?;
    let packet: Packet = sig.into();
    let mut sig_bytes = Vec::new();
    packet.serialize(&mut sig_bytes)?;

    let mut out = Vec::new();
    armor::cleartext::write(&mut out, hash_algo, text)?;
    let mut writer = Writer::new(&mut out, Kind::Signature)?;
    writer.write_all(&sig_bytes)?;
    writer.finalize()?;
    Ok(out)
}

/// Strips an ASCII-armor envelope of any [`Kind`], returning the
/// decoded binary body.
///
/// Cleartext-signed messages (`Kind::SignedMessage`) are not handled
/// here -- they have no single binary body to return, since the
/// framed text and the trailing signature armor are two distinct
/// pieces. Use [`armor::cleartext::split`] for those.
pub fn dearmor(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = Reader::new(data, ReaderMode::VeryTolerant);
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Verifies a Cleartext Signature Framework message produced by
/// [`clearsign`] (or any conforming producer) against `certs`.
pub fn verify_clearsigned(data: &[u8], certs: &[Key<PublicParts, UnspecifiedRole>])
    -> Result<VerificationResult>
{
    let parts = armor::cleartext::split(data)?;
    let signed_text = armor::cleartext::signed_text(&parts.text);

    let mut sig_reader = Reader::new(&parts.signature_armor[..],
                                      ReaderMode::Tolerant(Some(Kind::Signature)));
    let mut sig_bytes = Vec::new();
    sig_reader.read_to_end(&mut sig_bytes)?;

    verify_detached(&signed_text, &sig_bytes, certs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::key::{Key4, SecretParts};
    use crate::types::Curve;

    fn fresh_keypair() -> (crate::packet::key::KeyPair, Key<PublicParts, UnspecifiedRole>) {
        let key4 = Key4::<SecretParts, UnspecifiedRole>::generate_ecc(true, Curve::Ed25519)
            .unwrap();
        let key: Key<SecretParts, UnspecifiedRole> = key4.into();
        let keypair = key.into_keypair().unwrap();
        let public = keypair.public().clone();
        (keypair, public)
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let (keypair, public) = fresh_keypair();
        let signed = sign_buf(keypair, b"ship it").unwrap();
        let result = verify(&signed, &[public]).unwrap();
        assert!(result.is_valid());
        assert!(result.invalid.is_empty());
        assert!(result.unknown.is_empty());
    }

    #[test]
    fn verify_with_wrong_key_reports_unknown() {
        let (keypair, _public) = fresh_keypair();
        let (_other_keypair, other_public) = fresh_keypair();
        let signed = sign_buf(keypair, b"ship it").unwrap();
        let result = verify(&signed, &[other_public]).unwrap();
        assert!(!result.is_valid());
        assert_eq!(result.unknown.len(), 1);
    }

    #[test]
    fn encrypt_and_decrypt_round_trip() {
        let password = b"correct horse battery staple";
        let ciphertext = encrypt(password, b"the eagle lands at midnight").unwrap();
        let plaintext = decrypt(password, &ciphertext).unwrap();
        assert_eq!(plaintext, b"the eagle lands at midnight");
    }

    #[test]
    fn decrypt_with_wrong_password_fails() {
        let ciphertext = encrypt(b"right password", b"secret").unwrap();
        assert!(decrypt(b"wrong password", &ciphertext).is_err());
    }

    #[test]
    fn clearsign_round_trip_verifies() {
        let (keypair, public) = fresh_keypair();
        let armored = clearsign(keypair, b"line one\nline two").unwrap();
        assert!(armored.starts_with(b"-----BEGIN PGP SIGNED MESSAGE-----"));
        let result = verify_clearsigned(&armored, &[public]).unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn dearmor_strips_envelope() {
        let mut armored = Vec::new();
        {
            let mut writer = Writer::new(&mut armored, Kind::File).unwrap();
            writer.write_all(b"Hello world!").unwrap();
            writer.finalize().unwrap();
        }
        let body = dearmor(&armored).unwrap();
        assert_eq!(body, b"Hello world!");
    }
}
