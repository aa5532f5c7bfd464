//! Cursor-based bit-field reader.
//!
//! A [`ReadBuffer`] borrows a received frame and hands out fields of any
//! width from 1 to 64 bits, in the order the protocol defines them. Fields do
//! not need to be byte aligned: a 6-bit field may start in the middle of one
//! byte and end in the next.
//!
//! Every read either succeeds and advances the cursor by exactly the field
//! width, or fails and leaves the cursor where it was.
//!
//! # Example
//!
//! ```
//! use plc_spi::ReadBuffer;
//!
//! // TPKT header: version, reserved, length
//! let frame = [0x03, 0x00, 0x00, 0x16];
//! let mut buffer = ReadBuffer::new(&frame);
//!
//! assert_eq!(buffer.read_unsigned_byte(8)?, 0x03);
//! assert_eq!(buffer.read_unsigned_byte(8)?, 0x00);
//! assert_eq!(buffer.read_unsigned_short(16)?, 22);
//! assert!(!buffer.has_more(1));
//! # Ok::<(), plc_spi::SpiError>(())
//! ```

use tracing::trace;

use crate::byte_order::ByteOrder;
use crate::cursor::{checked_position, copy_from_cursor, BitCursor};
use crate::error::{Result, SpiError};
use crate::utils::{bit_mask, check_width, decode_half, fill_sign};

/// Sequential reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ReadBuffer<'a> {
    data: &'a [u8],
    cursor: BitCursor,
    byte_order: ByteOrder,
}

impl<'a> ReadBuffer<'a> {
    /// Creates a reader positioned at the first bit of `data`.
    ///
    /// The slice is borrowed for the lifetime of the reader; the caller keeps
    /// ownership. Multi-byte fields are read big-endian unless changed with
    /// [`with_byte_order`](Self::with_byte_order).
    pub fn new(data: &'a [u8]) -> Self {
        let data = &data[..data.len().min(u32::MAX as usize)];
        trace!(length = data.len(), "created read buffer");
        Self {
            data,
            cursor: BitCursor::default(),
            byte_order: ByteOrder::default(),
        }
    }

    /// Sets the byte order used for multi-byte fields.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_spi::{ByteOrder, ReadBuffer};
    ///
    /// let mut buffer = ReadBuffer::new(&[0x34, 0x12]).with_byte_order(ByteOrder::LittleEndian);
    /// assert_eq!(buffer.read_unsigned_short(16)?, 0x1234);
    /// # Ok::<(), plc_spi::SpiError>(())
    /// ```
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Returns the byte order used for multi-byte fields.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
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

    /// Returns the length of the underlying data in bytes.
    pub fn total_bytes(&self) -> u32 {
        self.data.len() as u32
    }

    /// Returns how many bits are left to read.
    pub fn remaining_bits(&self) -> u64 {
        self.cursor.remaining_bits(self.total_bytes())
    }

    /// Returns whether every bit has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.remaining_bits() == 0
    }

    /// Returns whether at least `num_bits` bits are left to read.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_spi::ReadBuffer;
    ///
    /// let buffer = ReadBuffer::new(&[0x12, 0x34, 0x56, 0x78]);
    /// assert!(buffer.has_more(32));
    /// assert!(!buffer.has_more(33));
    /// ```
    pub fn has_more(&self, num_bits: u16) -> bool {
        self.remaining_bits() >= u64::from(num_bits)
    }

    /// Moves the cursor to an arbitrary position.
    ///
    /// This bypasses the sequential contract of the buffer and is meant for
    /// tests and diagnostics.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `bit > 7` and `OutOfRange` if the
    /// position lies past the end of the data.
    pub fn set_position(&mut self, byte: u32, bit: u8) -> Result<()> {
        self.cursor = checked_position(byte, bit, self.total_bytes())?;
        Ok(())
    }

    /// Copies `end_byte - start_byte` bytes starting at the current cursor
    /// byte, without moving the cursor.
    ///
    /// `start_byte` is not an absolute offset: only the difference between
    /// the two arguments matters.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `end_byte < start_byte`
    /// - `OutOfRange` if `end_byte` exceeds the data length, or the copy
    ///   would run past the end of the data
    /// - `NoMemory` if the result cannot be allocated
    ///
    /// # Example
    ///
    /// ```
    /// use plc_spi::ReadBuffer;
    ///
    /// let mut buffer = ReadBuffer::new(&[0x01, 0x02, 0x03, 0x04]);
    /// buffer.read_unsigned_byte(8)?;
    /// assert_eq!(buffer.get_bytes(0, 2)?, vec![0x02, 0x03]);
    /// assert_eq!(buffer.pos(), 1);
    /// # Ok::<(), plc_spi::SpiError>(())
    /// ```
    pub fn get_bytes(&self, start_byte: u32, end_byte: u32) -> Result<Vec<u8>> {
        copy_from_cursor(self.data, self.cursor, start_byte, end_byte)
    }

    /// Returns the byte `offset_in_bytes` bytes after the current cursor byte
    /// without moving the cursor.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the byte lies past the end of the data.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_spi::ReadBuffer;
    ///
    /// let buffer = ReadBuffer::new(&[0x32, 0x01, 0x00]);
    /// assert_eq!(buffer.peek_byte(1)?, 0x01);
    /// assert_eq!(buffer.peek_byte(1)?, 0x01);
    /// assert!(buffer.peek_byte(3).is_err());
    /// # Ok::<(), plc_spi::SpiError>(())
    /// ```
    pub fn peek_byte(&self, offset_in_bytes: u32) -> Result<u8> {
        (self.cursor.byte as usize)
            .checked_add(offset_in_bytes as usize)
            .and_then(|index| self.data.get(index))
            .copied()
            .ok_or_else(|| {
                SpiError::out_of_range(
                    (u64::from(offset_in_bytes) + 1) * 8,
                    self.remaining_bits(),
                )
            })
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_unsigned_bits_internal(1)? == 1)
    }

    /// Reads an unsigned field of up to 8 bits.
    pub fn read_unsigned_byte(&mut self, num_bits: u8) -> Result<u8> {
        check_width(num_bits, 8, "read_unsigned_byte")?;
        Ok(self.read_unsigned_bits_internal(num_bits)? as u8)
    }

    /// Reads an unsigned field of up to 16 bits.
    pub fn read_unsigned_short(&mut self, num_bits: u8) -> Result<u16> {
        check_width(num_bits, 16, "read_unsigned_short")?;
        Ok(self.read_unsigned_bits_internal(num_bits)? as u16)
    }

    /// Reads an unsigned field of up to 32 bits.
    pub fn read_unsigned_int(&mut self, num_bits: u8) -> Result<u32> {
        check_width(num_bits, 32, "read_unsigned_int")?;
        Ok(self.read_unsigned_bits_internal(num_bits)? as u32)
    }

    /// Reads an unsigned field of up to 64 bits.
    pub fn read_unsigned_long(&mut self, num_bits: u8) -> Result<u64> {
        check_width(num_bits, 64, "read_unsigned_long")?;
        self.read_unsigned_bits_internal(num_bits)
    }

    /// Reads a two's-complement field of up to 8 bits, sign-extended to `i8`.
    pub fn read_signed_byte(&mut self, num_bits: u8) -> Result<i8> {
        check_width(num_bits, 8, "read_signed_byte")?;
        let raw = self.read_unsigned_bits_internal(num_bits)?;
        Ok(fill_sign(raw, num_bits, 8) as u8 as i8)
    }

    /// Reads a two's-complement field of up to 16 bits, sign-extended to `i16`.
    pub fn read_signed_short(&mut self, num_bits: u8) -> Result<i16> {
        check_width(num_bits, 16, "read_signed_short")?;
        let raw = self.read_unsigned_bits_internal(num_bits)?;
        Ok(fill_sign(raw, num_bits, 16) as u16 as i16)
    }

    /// Reads a two's-complement field of up to 32 bits, sign-extended to `i32`.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_spi::ReadBuffer;
    ///
    /// let data = [0xFF, 0xFF, 0xFF, 0xD6, 0x03];
    ///
    /// let mut buffer = ReadBuffer::new(&data);
    /// assert_eq!(buffer.read_signed_int(32)?, -42);
    ///
    /// // The same value as a 28-bit field starting at bit 4.
    /// let mut buffer = ReadBuffer::new(&data);
    /// buffer.read_unsigned_byte(4)?;
    /// assert_eq!(buffer.read_signed_int(28)?, -42);
    /// # Ok::<(), plc_spi::SpiError>(())
    /// ```
    pub fn read_signed_int(&mut self, num_bits: u8) -> Result<i32> {
        check_width(num_bits, 32, "read_signed_int")?;
        let raw = self.read_unsigned_bits_internal(num_bits)?;
        Ok(fill_sign(raw, num_bits, 32) as u32 as i32)
    }

    /// Reads a two's-complement field of up to 64 bits, sign-extended to `i64`.
    pub fn read_signed_long(&mut self, num_bits: u8) -> Result<i64> {
        check_width(num_bits, 64, "read_signed_long")?;
        let raw = self.read_unsigned_bits_internal(num_bits)?;
        Ok(fill_sign(raw, num_bits, 64) as i64)
    }

    /// Reads an IEEE-754 float of 32 bits or a half-precision float of 16 bits.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for any other width and `OutOfRange` if the
    /// data is too short.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_spi::ReadBuffer;
    ///
    /// let data = [0x40, 0x49, 0x0F, 0xDB];
    /// let mut buffer = ReadBuffer::new(&data);
    /// assert_eq!(buffer.read_float(32)?, std::f32::consts::PI);
    /// # Ok::<(), plc_spi::SpiError>(())
    /// ```
    pub fn read_float(&mut self, num_bits: u8) -> Result<f32> {
        match num_bits {
            32 => Ok(f32::from_bits(self.read_unsigned_int(32)?)),
            16 => Ok(decode_half(self.read_unsigned_short(16)?)),
            _ => Err(SpiError::invalid_argument(
                "num_bits",
                format!("float width must be 16 or 32, got {}", num_bits),
            )),
        }
    }

    /// Reads an IEEE-754 double of 64 bits.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for any width other than 64.
    pub fn read_double(&mut self, num_bits: u8) -> Result<f64> {
        if num_bits != 64 {
            return Err(SpiError::invalid_argument(
                "num_bits",
                format!("double width must be 64, got {}", num_bits),
            ));
        }
        Ok(f64::from_bits(self.read_unsigned_long(64)?))
    }

    /// Reads a string of `num_bits / 8` bytes, one character per byte.
    ///
    /// Reading stops early, without an error, when the data runs out. Only
    /// the `"UTF-8"` encoding tag is decoded; any other tag yields an empty
    /// string and leaves the cursor untouched.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_spi::ReadBuffer;
    ///
    /// let mut buffer = ReadBuffer::new(&[0x48, 0x75, 0x72, 0x7A]);
    /// assert_eq!(buffer.read_string(32, "UTF-8")?, "Hurz");
    /// # Ok::<(), plc_spi::SpiError>(())
    /// ```
    pub fn read_string(&mut self, num_bits: u32, encoding: &str) -> Result<String> {
        if !encoding.eq_ignore_ascii_case("UTF-8") {
            trace!(encoding, "string encoding not decoded");
            return Ok(String::new());
        }
        let num_bytes = num_bits / 8;
        let available = self.remaining_bits() / 8;
        let mut value = String::with_capacity(u64::from(num_bytes).min(available) as usize);
        for _ in 0..num_bytes {
            if !self.has_more(8) {
                break;
            }
            value.push(char::from(self.read_unsigned_byte(8)?));
        }
        Ok(value)
    }

    /// Reads `num_bits` (at most 64) as an unsigned value in stream order,
    /// then applies the buffer byte order.
    fn read_unsigned_bits_internal(&mut self, num_bits: u8) -> Result<u64> {
        check_width(num_bits, 64, "read")?;
        if num_bits == 0 {
            return Ok(0);
        }
        let remaining = self.remaining_bits();
        if remaining < u64::from(num_bits) {
            trace!(
                requested = num_bits,
                remaining,
                byte = self.cursor.byte,
                bit = self.cursor.bit,
                "read past end of buffer"
            );
            return Err(SpiError::out_of_range(u64::from(num_bits), remaining));
        }

        let pos = self.cursor.byte as usize;
        let bit = self.cursor.bit;
        let raw = if bit == 0 && num_bits % 8 == 0 {
            let num_bytes = usize::from(num_bits / 8);
            self.data[pos..pos + num_bytes]
                .iter()
                .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte))
        } else if 8 - bit >= num_bits {
            let byte = self.data[pos] & bit_mask(num_bits, bit);
            u64::from(byte >> (8 - bit - num_bits))
        } else {
            self.read_spanning(pos, bit, num_bits)
        };

        self.cursor.advance(u32::from(num_bits));
        Ok(self.byte_order.apply(raw, num_bits))
    }

    /// Reads a field that starts at `bit` of byte `pos` and runs into at
    /// least one following byte.
    ///
    /// The result is assembled right-aligned into an 8-byte big-endian
    /// scratch array. Each output byte takes the bits left over from the
    /// previous source byte, shifted up by the number of bits the field
    /// takes from its last source byte, and fills the gap from the next
    /// source byte. When the first and last partial bytes together carry
    /// more than 8 bits, the surplus goes into its own leading output byte.
    fn read_spanning(&self, pos: usize, bit: u8, num_bits: u8) -> u64 {
        let first_bits = 8 - bit;
        let rest = num_bits - first_bits;
        let middle_bytes = usize::from(rest / 8);
        let last_bits = rest % 8;

        let mut out = [0u8; 8];
        let mut dst = out.len() - usize::from(num_bits.div_ceil(8));

        let mut fragment = u16::from(self.data[pos] & bit_mask(first_bits, bit));
        let mut fragment_bits = first_bits;
        if first_bits + last_bits > 8 {
            let excess_bits = first_bits + last_bits - 8;
            out[dst] = (fragment >> (fragment_bits - excess_bits)) as u8;
            dst += 1;
            fragment_bits -= excess_bits;
            fragment &= (1u16 << fragment_bits) - 1;
        }

        let tail_mask = (1u16 << (8 - last_bits)) - 1;
        for &src in &self.data[pos + 1..pos + 1 + middle_bytes] {
            let src = u16::from(src);
            out[dst] = ((fragment << last_bits) | (src >> (8 - last_bits))) as u8;
            dst += 1;
            fragment = src & tail_mask;
        }

        out[dst] = if last_bits > 0 {
            let src = u16::from(self.data[pos + 1 + middle_bytes]);
            ((fragment << last_bits) | (src >> (8 - last_bits))) as u8
        } else {
            fragment as u8
        };

        u64::from_be_bytes(out)
    }
}
