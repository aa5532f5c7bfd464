//! # PLC SPI
//!
//! Bit-precise read and write buffers for industrial protocol codecs such as
//! S7, Modbus and MQTT.
//!
//! This is a **codec-only** library: no sockets, connection handling or
//! protocol state machines. Protocol glue reads and writes fields in
//! protocol order; the buffers take care of bit alignment, byte order, sign
//! extension and range checking.
//!
//! ## Features
//!
//! - **Bit-level fields** - any width from 1 to 64 bits, at any bit offset
//! - **Two's complement** - signed fields are sign-extended to their container
//! - **Byte order** - big-endian by default, little-endian per buffer
//! - **Floats** - IEEE-754 single and double, half-precision decoding
//! - **No panics** - all errors returned as `Result<T, SpiError>`
//! - **Length-in-bits** - [`Message`] and [`FieldPlan`] size write buffers from
//!   the same field list they serialize
//!
//! ## Quick Start
//!
//! ```
//! use plc_spi::{ReadBuffer, WriteBuffer};
//!
//! fn main() -> plc_spi::Result<()> {
//!     // Write a 3-bit field, a 13-bit field and a 16-bit field
//!     let mut writer = WriteBuffer::new(4)?;
//!     writer.write_unsigned_byte(3, 0b101)?;
//!     writer.write_unsigned_short(13, 0x1ABC)?;
//!     writer.write_signed_short(16, -2)?;
//!     let bytes = writer.into_data();
//!     assert_eq!(bytes, vec![0xBA, 0xBC, 0xFF, 0xFE]);
//!
//!     // Read them back in the same order
//!     let mut reader = ReadBuffer::new(&bytes);
//!     assert_eq!(reader.read_unsigned_byte(3)?, 0b101);
//!     assert_eq!(reader.read_unsigned_short(13)?, 0x1ABC);
//!     assert_eq!(reader.read_signed_short(16)?, -2);
//!     assert!(!reader.has_more(1));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Primitives
//!
//! | Read | Write | Width (bits) |
//! |------|-------|:------------:|
//! | [`ReadBuffer::read_bit`] | [`WriteBuffer::write_bit`] | 1 |
//! | `read_unsigned_byte` / `read_signed_byte` | `write_unsigned_byte` / `write_signed_byte` | 0-8 |
//! | `read_unsigned_short` / `read_signed_short` | `write_unsigned_short` / `write_signed_short` | 0-16 |
//! | `read_unsigned_int` / `read_signed_int` | `write_unsigned_int` / `write_signed_int` | 0-32 |
//! | `read_unsigned_long` / `read_signed_long` | `write_unsigned_long` / `write_signed_long` | 0-64 |
//! | `read_float` | `write_float` | 16 (read only), 32 |
//! | `read_double` | `write_double` | 64 |
//! | `read_string` | `write_string` | multiple of 8 |
//!
//! Bits are consumed most significant first. A field may start at any bit
//! offset and cross any number of byte boundaries.
//!
//! ## Error Handling
//!
//! ```
//! use plc_spi::{ReadBuffer, SpiError};
//!
//! let data = [0x01, 0x02];
//! let mut buffer = ReadBuffer::new(&data);
//!
//! match buffer.read_unsigned_int(24) {
//!     Ok(value) => println!("value = {}", value),
//!     Err(SpiError::OutOfRange { requested_bits, remaining_bits }) => {
//!         println!("need {} bits, only {} left", requested_bits, remaining_bits);
//!     }
//!     Err(e) => println!("Error: {}", e),
//! }
//!
//! // A failed read leaves the cursor untouched
//! assert_eq!(buffer.pos(), 0);
//! ```
//!
//! ## Configuration
//!
//! ```
//! use plc_spi::{ByteOrder, ReadBuffer, WriteBuffer};
//!
//! let reader = ReadBuffer::new(&[0x34, 0x12]).with_byte_order(ByteOrder::LittleEndian);
//! let writer = WriteBuffer::with_length_in_bits(16)?.with_byte_order(ByteOrder::LittleEndian);
//! # Ok::<(), plc_spi::SpiError>(())
//! ```
//!
//! ## Design Philosophy
//!
//! 1. Fields are read and written strictly in order; there is no random access
//! 2. Every buffer is owned by exactly one parse or serialize operation
//! 3. A failed primitive fails the whole message; there are no partial results
//! 4. Range checks run before any state changes

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod byte_order;
mod cursor;
mod error;
mod field;
mod message;
mod read_buffer;
pub mod utils;
mod write_buffer;

// Public re-exports
pub use byte_order::ByteOrder;
pub use cursor::BitCursor;
pub use error::{Result, SpiError};
pub use field::{FieldKind, FieldPlan, FieldValue};
pub use message::Message;
pub use read_buffer::ReadBuffer;
pub use utils::BIT_MASKS;
pub use write_buffer::WriteBuffer;
