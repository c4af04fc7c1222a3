//! Formatting helpers for debug output.

/// Encodes `bytes` as hex, either contiguous or grouped into 4-byte
/// chunks (`pretty`), for use in `Debug` impls.
pub fn to_hex(bytes: &[u8], pretty: bool) -> String {
    if pretty {
        hex::encode_pretty(bytes)
    } else {
        hex::encode(bytes)
    }
}

/// Hex encoding used for `Debug` impls throughout the crate.
pub mod hex {
    /// Encodes `bytes` as a contiguous lowercase hex string.
    pub fn encode<B: AsRef<[u8]>>(bytes: B) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02X}", b)).collect()
    }

    /// Encodes `bytes` as hex, grouped into 4-byte chunks separated by
    /// spaces, the way fingerprints and Key IDs are conventionally
    /// displayed.
    pub fn encode_pretty<B: AsRef<[u8]>>(bytes: B) -> String {
        let hex = encode(bytes);
        hex.as_bytes()
            .chunks(4)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
