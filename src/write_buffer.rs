//! Cursor-based bit-field writer.
//!
//! A [`WriteBuffer`] owns a zero-filled byte array sized up front, usually
//! from a length-in-bits pass over the fields about to be written. Fields are
//! OR-ed into place, so the buffer never has to clear bits and never grows.
//!
//! # Example
//!
//! ```
//! use plc_spi::WriteBuffer;
//!
//! // COTP TPDU code (4 bits) and credit (4 bits), then a 16-bit reference
//! let mut buffer = WriteBuffer::new(3)?;
//! buffer.write_unsigned_byte(4, 0x0E)?;
//! buffer.write_unsigned_byte(4, 0x00)?;
//! buffer.write_unsigned_short(16, 0x0001)?;
//!
//! assert_eq!(buffer.into_data(), vec![0xE0, 0x00, 0x01]);
//! # Ok::<(), plc_spi::SpiError>(())
//! ```

use tracing::trace;

use crate::byte_order::ByteOrder;
use crate::cursor::{checked_position, copy_from_cursor, BitCursor};
use crate::error::{try_alloc_zeroed, Result, SpiError};
use crate::utils::{bit_mask, check_width, low_bits};

/// Sequential writer into an owned, pre-sized byte array.
#[derive(Debug, Clone)]
pub struct WriteBuffer {
    data: Vec<u8>,
    cursor: BitCursor,
    byte_order: ByteOrder,
}

impl WriteBuffer {
    /// Allocates a zero-filled buffer of `length_bytes` bytes.
    ///
    /// # Errors
    ///
    /// Returns `NoMemory` if the allocation fails.
    pub fn new(length_bytes: u16) -> Result<Self> {
        let data = try_alloc_zeroed(usize::from(length_bytes))?;
        trace!(length = length_bytes, "created write buffer");
        Ok(Self {
            data,
            cursor: BitCursor::default(),
            byte_order: ByteOrder::default(),
        })
    }

    /// Allocates a buffer large enough for `length_in_bits` bits, rounded up
    /// to whole bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if more than `u16::MAX` bytes would be
    /// needed and `NoMemory` if the allocation fails.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_spi::WriteBuffer;
    ///
    /// let buffer = WriteBuffer::with_length_in_bits(12)?;
    /// assert_eq!(buffer.total_bytes(), 2);
    /// # Ok::<(), plc_spi::SpiError>(())
    /// ```
    pub fn with_length_in_bits(length_in_bits: u32) -> Result<Self> {
        let length_bytes = u16::try_from(length_in_bits.div_ceil(8)).map_err(|_| {
            SpiError::invalid_argument(
                "length_in_bits",
                format!("{} bits do not fit in a write buffer", length_in_bits),
            )
        })?;
        Self::new(length_bytes)
    }

    /// Sets the byte order used for multi-byte fields.
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Returns the byte order used for multi-byte fields.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Returns the bytes written so far, including unwritten zero bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the buffer and hands the byte array to the caller.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the current byte offset.
    pub fn pos(&self) -> u32 {
        self.cursor.byte
    }

    /// Returns the current bit offset within the current byte.
    pub fn pos_bit(&self) -> u8 {
        self.cursor.bit
    }

    /// Returns the full cursor.
    pub fn cursor(&self) -> BitCursor {
        self.cursor
    }

    /// Returns the allocated length in bytes.
    pub fn total_bytes(&self) -> u32 {
        self.data.len() as u32
    }

    /// Returns how many bits can still be written.
    pub fn remaining_bits(&self) -> u64 {
        self.cursor.remaining_bits(self.total_bytes())
    }

    /// Moves the cursor to an arbitrary position.
    ///
    /// Meant for tests and diagnostics. Bits already set are not cleared.
    pub fn set_position(&mut self, byte: u32, bit: u8) -> Result<()> {
        self.cursor = checked_position(byte, bit, self.total_bytes())?;
        Ok(())
    }

    /// Copies `end_byte - start_byte` bytes starting at the current cursor
    /// byte. Same semantics as [`ReadBuffer::get_bytes`](crate::ReadBuffer::get_bytes).
    pub fn get_bytes(&self, start_byte: u32, end_byte: u32) -> Result<Vec<u8>> {
        copy_from_cursor(&self.data, self.cursor, start_byte, end_byte)
    }

    /// Writes a single bit. A `false` bit only advances the cursor.
    pub fn write_bit(&mut self, value: bool) -> Result<()> {
        self.write_unsigned_bits_internal(1, u64::from(value))
    }

    /// Writes the low `num_bits` (at most 8) of `value`.
    pub fn write_unsigned_byte(&mut self, num_bits: u8, value: u8) -> Result<()> {
        check_width(num_bits, 8, "write_unsigned_byte")?;
        self.write_unsigned_bits_internal(num_bits, u64::from(value))
    }

    /// Writes the low `num_bits` (at most 16) of `value`.
    pub fn write_unsigned_short(&mut self, num_bits: u8, value: u16) -> Result<()> {
        check_width(num_bits, 16, "write_unsigned_short")?;
        self.write_unsigned_bits_internal(num_bits, u64::from(value))
    }

    /// Writes the low `num_bits` (at most 32) of `value`.
    pub fn write_unsigned_int(&mut self, num_bits: u8, value: u32) -> Result<()> {
        check_width(num_bits, 32, "write_unsigned_int")?;
        self.write_unsigned_bits_internal(num_bits, u64::from(value))
    }

    /// Writes the low `num_bits` (at most 64) of `value`.
    pub fn write_unsigned_long(&mut self, num_bits: u8, value: u64) -> Result<()> {
        check_width(num_bits, 64, "write_unsigned_long")?;
        self.write_unsigned_bits_internal(num_bits, value)
    }

    /// Writes `value` as a `num_bits` wide two's-complement field.
    pub fn write_signed_byte(&mut self, num_bits: u8, value: i8) -> Result<()> {
        self.write_unsigned_byte(num_bits, value as u8)
    }

    /// Writes `value` as a `num_bits` wide two's-complement field.
    pub fn write_signed_short(&mut self, num_bits: u8, value: i16) -> Result<()> {
        self.write_unsigned_short(num_bits, value as u16)
    }

    /// Writes `value` as a `num_bits` wide two's-complement field.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_spi::WriteBuffer;
    ///
    /// let mut buffer = WriteBuffer::new(4)?;
    /// buffer.write_unsigned_byte(4, 0x0F)?;
    /// buffer.write_signed_int(28, -42)?;
    /// assert_eq!(buffer.data(), &[0xFF, 0xFF, 0xFF, 0xD6]);
    /// # Ok::<(), plc_spi::SpiError>(())
    /// ```
    pub fn write_signed_int(&mut self, num_bits: u8, value: i32) -> Result<()> {
        self.write_unsigned_int(num_bits, value as u32)
    }

    /// Writes `value` as a `num_bits` wide two's-complement field.
    pub fn write_signed_long(&mut self, num_bits: u8, value: i64) -> Result<()> {
        self.write_unsigned_long(num_bits, value as u64)
    }

    /// Writes a 32-bit IEEE-754 float.
    ///
    /// # Errors
    ///
    /// Half-precision (16 bits) is not supported and returns
    /// `NotImplemented`; other widths return `InvalidArgument`.
    pub fn write_float(&mut self, num_bits: u8, value: f32) -> Result<()> {
        match num_bits {
            32 => self.write_unsigned_int(32, value.to_bits()),
            16 => Err(SpiError::not_implemented("16-bit float write")),
            _ => Err(SpiError::invalid_argument(
                "num_bits",
                format!("float width must be 32, got {}", num_bits),
            )),
        }
    }

    /// Writes a 64-bit IEEE-754 double.
    ///
    /// # Errors
    ///
    /// Any width other than 64 returns `NotImplemented`.
    pub fn write_double(&mut self, num_bits: u8, value: f64) -> Result<()> {
        if num_bits != 64 {
            return Err(SpiError::not_implemented(format!(
                "{}-bit double write",
                num_bits
            )));
        }
        self.write_unsigned_long(64, value.to_bits())
    }

    /// Writes `num_bits / 8` bytes of `value`, one byte per character.
    ///
    /// Both `"UTF-8"` and `"UTF-16"` are accepted as encoding tags and
    /// produce the same one-byte-per-character output. Shorter values are
    /// padded with zero bytes, longer values are truncated. Nothing is
    /// written if any check fails.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for an unknown encoding tag or a character above
    ///   `U+00FF`
    /// - `OutOfRange` if the string does not fit in the remaining space
    ///
    /// # Example
    ///
    /// ```
    /// use plc_spi::WriteBuffer;
    ///
    /// let mut buffer = WriteBuffer::new(4)?;
    /// buffer.write_string(32, "UTF-8", "Hurz")?;
    /// assert_eq!(buffer.data(), b"Hurz");
    /// # Ok::<(), plc_spi::SpiError>(())
    /// ```
    pub fn write_string(&mut self, num_bits: u32, encoding: &str, value: &str) -> Result<()> {
        if !encoding.eq_ignore_ascii_case("UTF-8") && !encoding.eq_ignore_ascii_case("UTF-16") {
            return Err(SpiError::invalid_argument(
                "encoding",
                format!("unsupported string encoding '{}'", encoding),
            ));
        }
        let remaining = self.remaining_bits();
        let requested = u64::from(num_bits / 8) * 8;
        if remaining < requested {
            trace!(requested, remaining, "string does not fit in write buffer");
            return Err(SpiError::out_of_range(requested, remaining));
        }

        let num_bytes = (num_bits / 8) as usize;
        let mut chars = value.chars();
        let mut bytes = Vec::with_capacity(num_bytes);
        for _ in 0..num_bytes {
            let c = chars.next().unwrap_or('\0');
            let byte = u8::try_from(c).map_err(|_| {
                SpiError::invalid_argument(
                    "value",
                    format!("character {:?} does not fit in one byte", c),
                )
            })?;
            bytes.push(byte);
        }
        for byte in bytes {
            self.write_unsigned_bits_internal(8, u64::from(byte))?;
        }
        Ok(())
    }

    /// Writes the low `num_bits` (at most 64) of `value` after applying the
    /// buffer byte order.
    fn write_unsigned_bits_internal(&mut self, num_bits: u8, value: u64) -> Result<()> {
        check_width(num_bits, 64, "write")?;
        if num_bits == 0 {
            return Ok(());
        }
        let remaining = self.remaining_bits();
        if remaining < u64::from(num_bits) {
            trace!(
                requested = num_bits,
                remaining,
                byte = self.cursor.byte,
                bit = self.cursor.bit,
                "write past end of buffer"
            );
            return Err(SpiError::out_of_range(u64::from(num_bits), remaining));
        }

        let value = self
            .byte_order
            .apply(value & low_bits(num_bits), num_bits);
        let bit = self.cursor.bit;

        if bit == 0 && num_bits % 8 == 0 {
            let num_bytes = usize::from(num_bits / 8);
            let pos = self.cursor.byte as usize;
            let bytes = value.to_be_bytes();
            for (dst, src) in self.data[pos..pos + num_bytes]
                .iter_mut()
                .zip(&bytes[8 - num_bytes..])
            {
                *dst |= *src;
            }
            self.cursor.advance(u32::from(num_bits));
        } else if 8 - bit >= num_bits {
            self.write_unsigned_byte_internal(num_bits, value as u8);
        } else {
            // Two cursors: `pending` counts the bits of `value` not yet
            // written (consumed from the most significant end), while the
            // buffer cursor tracks the destination. Each step moves both by
            // however many bits are left in the current destination byte.
            let mut pending = num_bits;
            while pending > 0 {
                let take = (8 - self.cursor.bit).min(pending);
                let chunk = (value >> (pending - take)) & low_bits(take);
                self.write_unsigned_byte_internal(take, chunk as u8);
                pending -= take;
            }
        }
        Ok(())
    }

    /// ORs the low `num_bits` of `value` into the current byte at the
    /// current bit offset and advances the cursor. The bits must fit in the
    /// current byte.
    fn write_unsigned_byte_internal(&mut self, num_bits: u8, value: u8) {
        let bit = self.cursor.bit;
        let shift = 8 - bit - num_bits;
        let pos = self.cursor.byte as usize;
        self.data[pos] |= (value << shift) & bit_mask(num_bits, bit);
        self.cursor.advance(u32::from(num_bits));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReadBuffer;

    #[test]
    fn test_new_buffer_is_zeroed() {
        let buffer = WriteBuffer::new(4).unwrap();
        assert_eq!(buffer.data(), &[0, 0, 0, 0]);
        assert_eq!(buffer.pos(), 0);
        assert_eq!(buffer.remaining_bits(), 32);
    }

    #[test]
    fn test_with_length_in_bits_rounds_up() {
        assert_eq!(WriteBuffer::with_length_in_bits(0).unwrap().total_bytes(), 0);
        assert_eq!(WriteBuffer::with_length_in_bits(8).unwrap().total_bytes(), 1);
        assert_eq!(WriteBuffer::with_length_in_bits(9).unwrap().total_bytes(), 2);
        assert!(matches!(
            WriteBuffer::with_length_in_bits(u32::MAX),
            Err(SpiError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_write_bits() {
        let mut buffer = WriteBuffer::new(1).unwrap();
        buffer.write_bit(true).unwrap();
        buffer.write_bit(false).unwrap();
        buffer.write_bit(true).unwrap();
        assert_eq!(buffer.data(), &[0b1010_0000]);
        assert_eq!(buffer.pos_bit(), 3);
    }

    #[test]
    fn test_write_crossing_byte_boundary() {
        let mut buffer = WriteBuffer::new(2).unwrap();
        buffer.write_unsigned_byte(5, 0b10111).unwrap();
        buffer.write_unsigned_byte(6, 19).unwrap();
        buffer.write_unsigned_byte(4, 10).unwrap();
        buffer.write_bit(true).unwrap();
        assert_eq!(buffer.into_data(), vec![0xBA, 0x75]);
    }

    #[test]
    fn test_write_aligned_whole_bytes() {
        let mut buffer = WriteBuffer::new(8).unwrap();
        buffer.write_unsigned_short(16, 0x1234).unwrap();
        buffer.write_unsigned_int(24, 0x56_789A).unwrap();
        buffer.write_unsigned_long(24, 0xBC_DEF0).unwrap();
        assert_eq!(
            buffer.data(),
            &[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0]
        );
    }

    #[test]
    fn test_write_spanning_three_bytes() {
        let mut buffer = WriteBuffer::new(3).unwrap();
        buffer.write_unsigned_byte(2, 0b11).unwrap();
        buffer.write_unsigned_int(20, 0xD_A970).unwrap();
        buffer.write_unsigned_byte(2, 0b11).unwrap();
        assert_eq!(buffer.data(), &[0b1111_0110, 0b1010_0101, 0b1100_0011]);
    }

    #[test]
    fn test_write_wide_unaligned_long() {
        let mut buffer = WriteBuffer::new(9).unwrap();
        buffer.write_unsigned_byte(4, 0).unwrap();
        buffer.write_unsigned_long(64, u64::MAX).unwrap();
        assert_eq!(
            buffer.data(),
            &[0x0F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xF0]
        );
    }

    #[test]
    fn test_write_masks_high_bits() {
        let mut buffer = WriteBuffer::new(1).unwrap();
        buffer.write_unsigned_byte(3, 0xFF).unwrap();
        assert_eq!(buffer.data(), &[0b1110_0000]);
    }

    #[test]
    fn test_write_signed_values() {
        let mut buffer = WriteBuffer::new(5).unwrap();
        buffer.write_signed_int(32, -42).unwrap();
        buffer.write_signed_byte(3, -1).unwrap();
        buffer.write_signed_byte(5, 7).unwrap();
        assert_eq!(buffer.data(), &[0xFF, 0xFF, 0xFF, 0xD6, 0b1110_0111]);

        let mut buffer = WriteBuffer::new(10).unwrap();
        buffer.write_signed_short(16, i16::MIN).unwrap();
        buffer.write_signed_long(64, -2).unwrap();
        assert_eq!(
            buffer.data(),
            &[0x80, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]
        );
    }

    #[test]
    fn test_write_float_and_double() {
        let mut buffer = WriteBuffer::new(12).unwrap();
        buffer.write_float(32, std::f32::consts::PI).unwrap();
        buffer.write_double(64, 1.5).unwrap();
        assert_eq!(&buffer.data()[..4], &[0x40, 0x49, 0x0F, 0xDB]);
        assert_eq!(&buffer.data()[4..], &1.5f64.to_be_bytes());
    }

    #[test]
    fn test_write_half_float_not_implemented() {
        let mut buffer = WriteBuffer::new(4).unwrap();
        assert!(matches!(
            buffer.write_float(16, 1.0),
            Err(SpiError::NotImplemented { .. })
        ));
        assert!(matches!(
            buffer.write_float(24, 1.0),
            Err(SpiError::InvalidArgument { .. })
        ));
        assert!(matches!(
            buffer.write_double(32, 1.0),
            Err(SpiError::NotImplemented { .. })
        ));
        assert_eq!(buffer.pos(), 0);
    }

    #[test]
    fn test_write_string() {
        let mut buffer = WriteBuffer::new(6).unwrap();
        buffer.write_string(32, "UTF-8", "Hurz").unwrap();
        buffer.write_string(16, "UTF-16", "A").unwrap();
        assert_eq!(buffer.data(), &[0x48, 0x75, 0x72, 0x7A, 0x41, 0x00]);
    }

    #[test]
    fn test_write_string_truncates() {
        let mut buffer = WriteBuffer::new(2).unwrap();
        buffer.write_string(16, "utf-8", "Hello").unwrap();
        assert_eq!(buffer.data(), b"He");
    }

    #[test]
    fn test_write_string_errors() {
        let mut buffer = WriteBuffer::new(2).unwrap();
        assert!(matches!(
            buffer.write_string(16, "ASCII", "Hi"),
            Err(SpiError::InvalidArgument { .. })
        ));
        assert!(matches!(
            buffer.write_string(16, "UTF-8", "\u{20AC}"),
            Err(SpiError::InvalidArgument { .. })
        ));
        assert!(buffer
            .write_string(24, "UTF-8", "abc")
            .unwrap_err()
            .is_out_of_range());
        assert_eq!(buffer.data(), &[0, 0]);
        assert_eq!(buffer.pos(), 0);
    }

    #[test]
    fn test_write_string_wider_than_buffer() {
        let mut buffer = WriteBuffer::new(4).unwrap();
        let err = buffer.write_string(u32::MAX, "UTF-8", "").unwrap_err();
        assert_eq!(err, SpiError::out_of_range(u64::from(u32::MAX / 8) * 8, 32));
        assert_eq!(buffer.pos(), 0);
    }

    #[test]
    fn test_write_past_end() {
        let mut buffer = WriteBuffer::new(1).unwrap();
        buffer.write_unsigned_byte(5, 0x1F).unwrap();
        let err = buffer.write_unsigned_byte(4, 0).unwrap_err();
        assert_eq!(err, SpiError::out_of_range(4, 3));
        assert_eq!(buffer.cursor(), BitCursor::new(0, 5));
        buffer.write_unsigned_byte(3, 0b101).unwrap();
        assert_eq!(buffer.data(), &[0xFD]);
        assert!(buffer.write_bit(true).is_err());
    }

    #[test]
    fn test_width_larger_than_container() {
        let mut buffer = WriteBuffer::new(8).unwrap();
        assert!(matches!(
            buffer.write_unsigned_byte(9, 0),
            Err(SpiError::InvalidArgument { .. })
        ));
        assert!(matches!(
            buffer.write_signed_int(33, 0),
            Err(SpiError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_little_endian_writes() {
        let mut buffer = WriteBuffer::new(6)
            .unwrap()
            .with_byte_order(ByteOrder::LittleEndian);
        buffer.write_unsigned_int(32, 0x1234_5678).unwrap();
        buffer.write_signed_short(16, -2).unwrap();
        assert_eq!(buffer.data(), &[0x78, 0x56, 0x34, 0x12, 0xFE, 0xFF]);
    }

    #[test]
    fn test_get_bytes_and_set_position() {
        let mut buffer = WriteBuffer::new(4).unwrap();
        buffer.write_unsigned_int(32, 0x0102_0304).unwrap();
        buffer.set_position(1, 0).unwrap();
        assert_eq!(buffer.get_bytes(0, 2).unwrap(), vec![0x02, 0x03]);
        assert!(buffer.set_position(4, 1).is_err());
    }

    #[test]
    fn test_write_then_read_mixed_fields() {
        let mut buffer = WriteBuffer::new(8).unwrap();
        buffer.write_bit(true).unwrap();
        buffer.write_unsigned_short(11, 0x5A5).unwrap();
        buffer.write_signed_int(19, -70_000).unwrap();
        buffer.write_unsigned_long(33, 0x1_2345_6789).unwrap();
        let data = buffer.into_data();

        let mut reader = ReadBuffer::new(&data);
        assert!(reader.read_bit().unwrap());
        assert_eq!(reader.read_unsigned_short(11).unwrap(), 0x5A5);
        assert_eq!(reader.read_signed_int(19).unwrap(), -70_000);
        assert_eq!(reader.read_unsigned_long(33).unwrap(), 0x1_2345_6789);
        assert!(reader.is_exhausted());
    }
}
