//! Packet header encoding and decoding: tags and the three length
//! formats (old-format fixed-width, new-format variable-width, and
//! new-format partial-body chunking).

use crate::{Error, Result};
use crate::types::Tag;

/// A decoded packet length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyLength {
    /// The packet's body is exactly this many bytes.
    Full(u32),
    /// The packet's body is the next `u32` bytes, followed by
    /// another length (partial-body chunking; new format only).
    Partial(u32),
    /// The packet's body runs until the underlying reader hits EOF
    /// (old-format "indeterminate length" only).
    Indeterminate,
}

/// A decoded packet header: its tag and body length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    /// The packet's tag.
    pub tag: Tag,
    /// The packet's body length.
    pub length: BodyLength,
}

impl Header {
    /// Parses a single packet header from the start of `data`,
    /// returning the header and the number of bytes it occupied.
    pub(crate) fn parse(data: &[u8]) -> Result<(Self, usize)> {
        let ptag = *data.first()
            .ok_or_else(|| Error::Malformed("empty input".into()))?;

        if ptag & 0x80 == 0 {
            return Err(Error::Malformed(
                "packet tag's high bit is not set".into()).into());
        }

        if ptag & 0x40 != 0 {
            // New format.
            let tag = Tag::from(ptag & 0x3F);
            let (length, len_bytes) = Self::parse_new_format_length(&data[1..])?;
            Ok((Header { tag, length }, 1 + len_bytes))
        } else {
            // Old format.
            let tag = Tag::from((ptag & 0x3C) >> 2);
            let length_type = ptag & 0x03;
            let rest = &data[1..];
            let (length, len_bytes) = match length_type {
                0 => {
                    let b = *rest.first()
                        .ok_or_else(|| Error::Malformed("truncated header".into()))?;
                    (BodyLength::Full(b as u32), 1)
                }
                1 => {
                    if rest.len() < 2 {
                        return Err(Error::Malformed("truncated header".into()).into());
                    }
                    (BodyLength::Full(u16::from_be_bytes([rest[0], rest[1]]) as u32), 2)
                }
                2 => {
                    if rest.len() < 4 {
                        return Err(Error::Malformed("truncated header".into()).into());
                    }
                    (BodyLength::Full(u32::from_be_bytes(
                        [rest[0], rest[1], rest[2], rest[3]])), 4)
                }
                3 => (BodyLength::Indeterminate, 0),
                _ => unreachable!(),
            };
            Ok((Header { tag, length }, 1 + len_bytes))
        }
    }

    /// Parses just a new-format length field (used directly by tests
    /// that exercise the encoder/decoder round trip).
    pub(crate) fn parse_new_format_length(data: &[u8]) -> Result<(BodyLength, usize)> {
        let b0 = *data.first()
            .ok_or_else(|| Error::Malformed("truncated length".into()))?;
        match b0 {
            0..=191 => Ok((BodyLength::Full(b0 as u32), 1)),
            192..=223 => {
                let b1 = *data.get(1)
                    .ok_or_else(|| Error::Malformed("truncated length".into()))?;
                let len = ((b0 as u32 - 192) << 8) + b1 as u32 + 192;
                Ok((BodyLength::Full(len), 2))
            }
            224..=254 => {
                let power = b0 & 0x1F;
                Ok((BodyLength::Partial(1u32 << power), 1))
            }
            255 => {
                if data.len() < 5 {
                    return Err(Error::Malformed("truncated length".into()).into());
                }
                let len = u32::from_be_bytes([data[1], data[2], data[3], data[4]]);
                Ok((BodyLength::Full(len), 5))
            }
        }
    }
}

impl BodyLength {
    /// Parses a standalone new-format length (no leading tag octet),
    /// as used by signature subpacket lengths.
    pub(crate) fn parse_new_format(data: &[u8]) -> Result<Self> {
        Header::parse_new_format_length(data).map(|(l, _)| l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn old_format_roundtrip() {
        let header = [0x98, 0x05]; // old format, tag 6 (public key), 1-byte length
        let (h, consumed) = Header::parse(&header).unwrap();
        assert_eq!(h.tag, Tag::PublicKey);
        assert_eq!(h.length, BodyLength::Full(5));
        assert_eq!(consumed, 2);
    }

    #[test]
    fn new_format_boundaries() {
        for &(len, expect_bytes) in &[
            (0u32, 1usize), (191, 1), (192, 2), (223 + 192 * 0 + 191, 2),
            (8383, 2), (8384, 5), (1 << 20, 5),
        ] {
            let mut buf = vec![0xC2u8]; // new format, tag 2 (signature)
            crate::serialize::write_length(&mut buf, len as usize).unwrap();
            let (h, consumed) = Header::parse(&buf).unwrap();
            assert_eq!(h.tag, Tag::Signature);
            assert_eq!(h.length, BodyLength::Full(len));
            assert_eq!(consumed, 1 + expect_bytes);
        }
    }

    #[test]
    fn partial_body_length() {
        let buf = [0xC2u8, 224]; // partial length, 2^0 = 1 byte
        let (h, _) = Header::parse(&buf).unwrap();
        assert_eq!(h.length, BodyLength::Partial(1));

        let buf = [0xC2u8, 254]; // 2^30
        let (h, _) = Header::parse(&buf).unwrap();
        assert_eq!(h.length, BodyLength::Partial(1 << 30));
    }

    #[test]
    fn indeterminate_length() {
        let buf = [0x9B]; // old format, tag 6, length-type 3
        let (h, consumed) = Header::parse(&buf).unwrap();
        assert_eq!(h.length, BodyLength::Indeterminate);
        assert_eq!(consumed, 1);
    }
}
