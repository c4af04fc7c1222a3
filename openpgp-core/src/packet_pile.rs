//! A `PacketPile` is a tree of packets, with the tree structure
//! following the containment relationships defined by [Section 4.3 of
//! RFC 4880]: a compressed data, SEIP, or AED packet's children are
//! the packets its decrypted/decompressed content parses into.
//!
//!   [Section 4.3 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.3

use std::fmt;

use crate::{Error, Packet, PacketPile, Result};
use crate::packet::Container;
use crate::parse::{parse_packets, Parse};
use crate::serialize::Marshal;

impl fmt::Debug for PacketPile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PacketPile")
            .field("packets", &self.top_level.children_ref())
            .finish()
    }
}

impl From<Vec<Packet>> for PacketPile {
    fn from(p: Vec<Packet>) -> Self {
        PacketPile { top_level: Container::from(p) }
    }
}

impl From<Packet> for PacketPile {
    fn from(p: Packet) -> Self {
        Self::from(vec![p])
    }
}

impl<'a> Parse<'a, PacketPile> for PacketPile {
    /// Deserializes the OpenPGP message stored in the provided buffer.
    ///
    /// The whole message is buffered in memory; use
    /// [`crate::parse::PacketParser`] directly for a streaming
    /// alternative.
    fn from_bytes(data: &'a [u8]) -> Result<PacketPile> {
        Ok(PacketPile::from(parse_packets(data, 0)?))
    }
}

impl Marshal for PacketPile {
    fn serialize(&self, sink: &mut dyn std::io::Write) -> Result<()> {
        for packet in self.top_level.children_ref() {
            packet.serialize(sink)?;
        }
        Ok(())
    }
}

impl PacketPile {
    /// Pretty prints the message to stderr.
    ///
    /// Primarily intended for debugging.
    pub fn pretty_print(&self) {
        self.top_level.pretty_print(0);
    }

    /// Returns an iterator over the top-level packets.
    pub fn children(&self) -> impl Iterator<Item = &Packet> {
        self.top_level.children()
    }

    /// Returns an iterator over all of the packet pile's packets, in
    /// depth-first order.
    pub fn descendants(&self) -> crate::packet::Iter<'_> {
        self.top_level.descendants()
    }

    /// Returns the number of top-level packets.
    pub fn len(&self) -> usize {
        self.top_level.children_ref().len()
    }

    /// Returns whether the packet pile contains no packets.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a reference to the packet at the location described by
    /// `pathspec`.
    ///
    /// `pathspec` is a slice of the form `[ 0, 1, 2 ]`.  Each element
    /// is the index of a packet in a container.  Thus, `[ 1, 0, 2 ]`
    /// means: the third child of the first child of the second
    /// top-level packet.
    ///
    /// The path `[]` returns `None`; there is no packet at the root.
    pub fn path_ref(&self, pathspec: &[usize]) -> Option<&Packet> {
        let mut packet: Option<&Packet> = None;
        let mut siblings = self.top_level.children_ref();

        for &i in pathspec {
            let p = siblings.get(i)?;
            packet = Some(p);
            siblings = p.container_ref()
                .map(Container::children_ref)
                .unwrap_or(&[]);
        }

        packet
    }

    /// Returns a mutable reference to the packet at the location
    /// described by `pathspec`.
    ///
    /// See [`PacketPile::path_ref`] for the path specification.
    pub fn path_ref_mut(&mut self, pathspec: &[usize]) -> Option<&mut Packet> {
        let mut siblings = self.top_level.children_mut();

        for (level, &i) in pathspec.iter().enumerate() {
            if i >= siblings.len() {
                return None;
            }
            if level == pathspec.len() - 1 {
                return Some(&mut siblings[i]);
            }
            siblings = siblings[i].container_mut()?.children_mut();
        }

        None
    }

    /// Replaces `count` packets at the location described by
    /// `pathspec` with `packets`, returning the removed packets.
    ///
    /// The number of packets removed need not match the number
    /// inserted. Returns `Error::InvalidArgument` if the path doesn't
    /// address an existing run of `count` packets.
    pub fn replace(&mut self, pathspec: &[usize], count: usize,
                    mut packets: Vec<Packet>)
        -> Result<Vec<Packet>>
    {
        let mut siblings = self.top_level.children_mut();

        for (level, &i) in pathspec.iter().enumerate() {
            if level == pathspec.len() - 1 {
                if i + count > siblings.len() {
                    return Err(Error::InvalidArgument(
                        "index out of range".into()));
                }

                let old = siblings.drain(i..i + count).collect::<Vec<_>>();
                let mut tail = siblings.drain(i..).collect::<Vec<_>>();
                siblings.append(&mut packets);
                siblings.append(&mut tail);
                return Ok(old);
            }

            if i >= siblings.len() {
                return Err(Error::InvalidArgument(
                    "index out of range".into()));
            }

            siblings = siblings[i].container_mut()
                .ok_or_else(|| Error::InvalidArgument(
                    "index out of range".into()))?
                .children_mut();
        }

        Err(Error::InvalidArgument("index out of range".into()))
    }
}
