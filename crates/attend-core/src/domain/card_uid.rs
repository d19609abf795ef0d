//! Card UID normalization.
//!
//! A tapped NFC card reports its unique identifier as a short byte string
//! (4, 7 or 10 bytes for ISO 14443-A cards).  The UI and the member table
//! never see raw bytes; they see the canonical display form:
//!
//! ```text
//! [0x04, 0xA3, 0x9F]  →  "04 A3 9F"
//! ```
//!
//! Each byte becomes two uppercase hex digits and bytes are separated by a
//! single space.  There is no leading or trailing whitespace, and an empty
//! UID becomes the empty string.  No validation is applied: whatever the
//! reader returned is forwarded as-is.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw UID bytes as read from a card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CardUid(Vec<u8>);

impl CardUid {
    /// Wraps raw UID bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns `true` when the reader reported no UID bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the canonical display string (see [`format_uid`]).
    pub fn to_display_string(&self) -> String {
        format_uid(&self.0)
    }
}

impl From<Vec<u8>> for CardUid {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for CardUid {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_uid(&self.0))
    }
}

/// Formats raw UID bytes as uppercase, space-separated hex pairs.
///
/// # Example
///
/// ```rust
/// use attend_core::format_uid;
///
/// assert_eq!(format_uid(&[0x04, 0xA3, 0x9F]), "04 A3 9F");
/// assert_eq!(format_uid(&[]), "");
/// ```
pub fn format_uid(bytes: &[u8]) -> String {
    // Two digits per byte plus one separator between bytes.
    let mut out = String::with_capacity(bytes.len().saturating_mul(3));
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push(HEX_UPPER[(byte >> 4) as usize] as char);
        out.push(HEX_UPPER[(byte & 0x0F) as usize] as char);
    }
    out
}

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";
