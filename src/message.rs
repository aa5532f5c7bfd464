//! The seam between protocol codec glue and the buffers.
//!
//! Each protocol message type implements [`Message`] by reading or writing
//! its fields in protocol order. The same field list drives
//! [`length_in_bits`](Message::length_in_bits), which sizes the write buffer
//! before serialization. [`to_bytes`](Message::to_bytes) checks that the two
//! agree.
//!
//! # Example
//!
//! ```
//! use plc_spi::{Message, ReadBuffer, Result, WriteBuffer};
//!
//! /// TPKT header (RFC 1006) without payload.
//! #[derive(Debug, PartialEq)]
//! struct Tpkt {
//!     version: u8,
//!     length: u16,
//! }
//!
//! impl Message for Tpkt {
//!     fn length_in_bits(&self) -> u32 {
//!         8 + 8 + 16
//!     }
//!
//!     fn serialize(&self, buffer: &mut WriteBuffer) -> Result<()> {
//!         buffer.write_unsigned_byte(8, self.version)?;
//!         buffer.write_unsigned_byte(8, 0)?;
//!         buffer.write_unsigned_short(16, self.length)
//!     }
//!
//!     fn parse(buffer: &mut ReadBuffer<'_>) -> Result<Self> {
//!         let version = buffer.read_unsigned_byte(8)?;
//!         buffer.read_unsigned_byte(8)?;
//!         let length = buffer.read_unsigned_short(16)?;
//!         Ok(Self { version, length })
//!     }
//! }
//!
//! let tpkt = Tpkt { version: 3, length: 22 };
//! let bytes = tpkt.to_bytes()?;
//! assert_eq!(bytes, vec![0x03, 0x00, 0x00, 0x16]);
//! assert_eq!(Tpkt::from_bytes(&bytes)?, tpkt);
//! # Ok::<(), plc_spi::SpiError>(())
//! ```

use tracing::warn;

use crate::error::{Result, SpiError};
use crate::read_buffer::ReadBuffer;
use crate::utils::format_bytes;
use crate::write_buffer::WriteBuffer;

/// A protocol message that can be parsed from and serialized to a bit stream.
pub trait Message: Sized {
    /// Returns the serialized size in bits, computed from the same fields
    /// and conditions [`serialize`](Self::serialize) writes.
    fn length_in_bits(&self) -> u32;

    /// Writes every field in protocol order.
    fn serialize(&self, buffer: &mut WriteBuffer) -> Result<()>;

    /// Reads every field in protocol order.
    fn parse(buffer: &mut ReadBuffer<'_>) -> Result<Self>;

    /// Returns the serialized size in whole bytes.
    fn length_in_bytes(&self) -> u32 {
        self.length_in_bits().div_ceil(8)
    }

    /// Serializes into a freshly allocated buffer sized by
    /// [`length_in_bits`](Self::length_in_bits).
    ///
    /// # Errors
    ///
    /// Propagates any field error, and returns `LengthMismatch` if the
    /// serializer wrote fewer bits than declared.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let declared = self.length_in_bits();
        let mut buffer = WriteBuffer::with_length_in_bits(declared)?;
        self.serialize(&mut buffer)?;
        into_checked_bytes(buffer, declared)
    }

    /// Parses a message from the start of `data`. Trailing bytes are ignored.
    fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::parse(&mut ReadBuffer::new(data))
    }
}

/// Hands out the bytes of a buffer filled by a serializer that declared
/// `declared_bits` up front, or `LengthMismatch` if it wrote a different
/// number of bits.
pub(crate) fn into_checked_bytes(buffer: WriteBuffer, declared_bits: u32) -> Result<Vec<u8>> {
    let written = buffer.cursor().position_in_bits();
    if written != u64::from(declared_bits) {
        warn!(
            declared = declared_bits,
            written,
            bytes = %format_bytes(buffer.data()),
            "serializer disagrees with its length-in-bits"
        );
        return Err(SpiError::length_mismatch(u64::from(declared_bits), written));
    }
    Ok(buffer.into_data())
}
