//! Packet delimiters.
//!
//! Client and server must agree on all three bytes. The defaults match the
//! controller function blocks the simulator talks to.

use std::fmt;
use std::str::FromStr;

use crate::error::{FrameError, Result};

/// Marks the first byte of a packet.
pub const START_OF_PACKET: u8 = b'*';

/// Separates command from data, and terminates the data field.
pub const FIELD_SEPARATOR: u8 = b'|';

/// Marks the last byte of a packet.
pub const END_OF_PACKET: u8 = b'&';

/// The three delimiter bytes of the wire syntax
/// `START command FIELD_SEP data FIELD_SEP END`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    start: u8,
    field_separator: u8,
    end: u8,
}

impl Delimiters {
    /// `*`, `|`, `&`.
    pub const DEFAULT: Self = Self {
        start: START_OF_PACKET,
        field_separator: FIELD_SEPARATOR,
        end: END_OF_PACKET,
    };

    /// Build a delimiter set. All three must be distinct, printable ASCII.
    pub fn new(start: u8, field_separator: u8, end: u8) -> Result<Self> {
        for (name, byte) in [
            ("start", start),
            ("field separator", field_separator),
            ("end", end),
        ] {
            if !byte.is_ascii_graphic() {
                return Err(FrameError::InvalidDelimiters(format!(
                    "{name} delimiter 0x{byte:02x} is not printable ASCII"
                )));
            }
        }
        if start == field_separator || start == end || field_separator == end {
            return Err(FrameError::InvalidDelimiters(
                "start, field separator and end must be distinct".to_string(),
            ));
        }
        Ok(Self {
            start,
            field_separator,
            end,
        })
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn field_separator(&self) -> u8 {
        self.field_separator
    }

    pub fn end(&self) -> u8 {
        self.end
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Parses the three delimiters written in wire order, e.g. `"*|&"`.
impl FromStr for Delimiters {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.as_bytes() {
            [start, sep, end] => Self::new(*start, *sep, *end),
            _ => Err(FrameError::InvalidDelimiters(format!(
                "expected three delimiter characters, got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for Delimiters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.start as char, self.field_separator as char, self.end as char
        )
    }
}
