//! Byte order of multi-byte fields.
//!
//! Industrial protocols such as S7 and Modbus put multi-byte values on the
//! wire most significant byte first, which is the default here. A buffer can
//! be switched to little-endian for protocols or vendor extensions that store
//! values least significant byte first.
//!
//! Byte order only affects fields whose width is a whole number of bytes
//! (16, 24, ..., 64 bits). Bit-fields are always read most significant bit
//! first.
//!
//! # Example
//!
//! ```
//! use plc_spi::ByteOrder;
//!
//! assert_eq!(ByteOrder::default(), ByteOrder::BigEndian);
//! assert_eq!(ByteOrder::LittleEndian.apply(0x1234, 16), 0x3412);
//! assert_eq!(ByteOrder::LittleEndian.apply(0x1234, 12), 0x1234);
//! ```

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Order in which the bytes of a multi-byte field appear in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ByteOrder {
    /// Most significant byte first (network order).
    #[default]
    BigEndian,
    /// Least significant byte first.
    LittleEndian,
}

impl ByteOrder {
    /// Returns the byte order of the compilation target.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_spi::ByteOrder;
    ///
    /// let order = ByteOrder::native();
    /// assert_eq!(order == ByteOrder::LittleEndian, cfg!(target_endian = "little"));
    /// ```
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    /// Converts between the stream order and the logical value of a
    /// `num_bits` wide field.
    ///
    /// For little-endian fields whose width is a multiple of 8, the low
    /// `num_bits / 8` bytes of `value` are reversed. Everything else passes
    /// through unchanged. The conversion is its own inverse, so the same call
    /// serves reads and writes.
    pub fn apply(self, value: u64, num_bits: u8) -> u64 {
        match self {
            ByteOrder::LittleEndian if num_bits > 8 && num_bits <= 64 && num_bits % 8 == 0 => {
                value.swap_bytes() >> (64 - u32::from(num_bits))
            }
            _ => value,
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ByteOrder::BigEndian => "big-endian",
            ByteOrder::LittleEndian => "little-endian",
        };
        write!(f, "{}", name)
    }
}
