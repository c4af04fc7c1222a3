//! Round-trips a handful of representative OpenPGP artifacts through
//! every level this crate offers -- bare `Packet`, a `PacketPile`, and
//! a structurally validated `Message` -- checking that serializing and
//! re-parsing always reproduces the original value.
//!
//! There is no bundled corpus of third-party `.pgp`/`.asc` fixtures
//! here; the artifacts below are built with the crate's own producers
//! (`ops::sign_buf`, `ops::encrypt`, `packet::Literal`, ...) so the
//! test exercises the same code paths a real caller would.

use openpgp_core::{Message, Packet, PacketPile};
use openpgp_core::ops;
use openpgp_core::packet::{DataFormat, Literal, UserID};
use openpgp_core::packet::key::{Key4, Key, SecretParts, UnspecifiedRole};
use openpgp_core::parse::Parse;
use openpgp_core::serialize::{Marshal, MarshalInto};
use openpgp_core::types::Curve;

/// Builds each artifact this test exercises: a name plus its
/// serialized bytes.
fn artifacts() -> Vec<(&'static str, Vec<u8>)> {
    let mut out = Vec::new();

    let mut literal = Literal::new(DataFormat::Binary);
    literal.set_body(b"a literal data packet".to_vec());
    let packet: Packet = literal.into();
    out.push(("literal packet", packet.to_vec().unwrap()));

    let userid: Packet = UserID::from(b"Alice <alice@example.org>".to_vec()).into();
    out.push(("user id packet", userid.to_vec().unwrap()));

    let key4 = Key4::<SecretParts, UnspecifiedRole>::generate_ecc(true, Curve::Ed25519).unwrap();
    let key: Key<SecretParts, UnspecifiedRole> = key4.into();
    let keypair = key.into_keypair().unwrap();
    let signed = ops::sign_buf(keypair, b"a one-pass signed message").unwrap();
    out.push(("signed message", signed));

    let encrypted = ops::encrypt(b"hunter2", b"a password-encrypted message").unwrap();
    out.push(("encrypted message", encrypted));

    out
}

#[test]
fn packet_roundtrip() {
    for (name, bytes) in artifacts() {
        // Re-derive the individual top-level packets so single-packet
        // artifacts (the literal and the user id) round-trip through
        // `Packet::from_bytes`/`Packet::serialize` directly.
        let pile = PacketPile::from_bytes(&bytes).unwrap();
        for p in pile.children() {
            let mut v = Vec::new();
            p.serialize(&mut v).unwrap();
            let q = Packet::from_bytes(&v)
                .unwrap_or_else(|e| panic!("{name}: reparsing a packet failed: {e}"));
            assert_eq!(p, &q, "{name}: packet roundtrip changed the packet");

            let w = p.to_vec().unwrap();
            assert_eq!(v, w, "{name}: Marshal and MarshalInto disagree");
        }
    }
}

#[test]
fn packet_pile_roundtrip() {
    for (name, bytes) in artifacts() {
        let pile = PacketPile::from_bytes(&bytes).unwrap();

        let mut v = Vec::new();
        pile.serialize(&mut v).unwrap();
        let reparsed = PacketPile::from_bytes(&v)
            .unwrap_or_else(|e| panic!("{name}: reparsing a packet pile failed: {e}"));

        assert_eq!(pile.len(), reparsed.len(), "{name}: packet count changed");
        for (p, q) in pile.children().zip(reparsed.children()) {
            assert_eq!(p, q, "{name}: packet pile roundtrip changed a packet");
        }
    }
}

#[test]
fn message_roundtrip() {
    for (name, bytes) in artifacts() {
        let message = match Message::from_bytes(&bytes) {
            Ok(message) => message,
            // A bare literal or user id packet doesn't parse back as
            // a structurally valid message on its own; only the
            // signed and encrypted artifacts above do.
            Err(_) => continue,
        };

        let mut v = Vec::new();
        message.serialize(&mut v).unwrap();
        let reparsed = Message::from_bytes(&v)
            .unwrap_or_else(|e| panic!("{name}: reparsing a message failed: {e}"));
        assert_eq!(message, reparsed, "{name}: message roundtrip changed the message");

        let w = message.to_vec().unwrap();
        assert_eq!(v, w, "{name}: Marshal and MarshalInto disagree on {name}");
    }
}
