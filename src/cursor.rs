//! Byte and bit position inside a buffer.

use crate::error::{try_copy, Result, SpiError};

/// Position of the next unread (or unwritten) bit.
///
/// `bit` counts from the most significant bit of the byte at `byte` and is
/// always in `0..=7`. A cursor only ever moves forward during normal use.
///
/// # Example
///
/// ```
/// use plc_spi::BitCursor;
///
/// let mut cursor = BitCursor::default();
/// cursor.advance(13);
/// assert_eq!(cursor.byte, 1);
/// assert_eq!(cursor.bit, 5);
/// assert_eq!(cursor.position_in_bits(), 13);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BitCursor {
    /// Byte offset from the start of the buffer.
    pub byte: u32,
    /// Bit offset within the current byte (0 = most significant bit).
    pub bit: u8,
}

impl BitCursor {
    /// Creates a cursor at the given position.
    pub fn new(byte: u32, bit: u8) -> Self {
        Self { byte, bit }
    }

    /// Returns the absolute position in bits.
    pub fn position_in_bits(self) -> u64 {
        u64::from(self.byte) * 8 + u64::from(self.bit)
    }

    /// Returns whether the cursor sits on a byte boundary.
    pub fn is_byte_aligned(self) -> bool {
        self.bit == 0
    }

    /// Moves the cursor forward by `num_bits`, rolling over into the next
    /// byte whenever the bit offset reaches 8.
    pub fn advance(&mut self, num_bits: u32) {
        let total = u32::from(self.bit) + num_bits;
        self.byte += total / 8;
        self.bit = (total % 8) as u8;
    }

    /// Returns how many bits lie between the cursor and the end of a buffer
    /// of `length` bytes. Saturates at zero.
    pub(crate) fn remaining_bits(self, length: u32) -> u64 {
        (u64::from(length) * 8).saturating_sub(self.position_in_bits())
    }
}

/// Copies `end_byte - start_byte` bytes starting at the cursor's byte.
///
/// `start_byte` and `end_byte` only determine the length of the copy; the
/// copy itself always begins at the cursor.
pub(crate) fn copy_from_cursor(
    data: &[u8],
    cursor: BitCursor,
    start_byte: u32,
    end_byte: u32,
) -> Result<Vec<u8>> {
    if end_byte < start_byte {
        return Err(SpiError::invalid_argument(
            "end_byte",
            format!("{} is less than start_byte {}", end_byte, start_byte),
        ));
    }
    let length = data.len() as u64;
    if u64::from(end_byte) > length {
        return Err(SpiError::out_of_range(
            u64::from(end_byte) * 8,
            length * 8,
        ));
    }
    let from = u64::from(cursor.byte);
    let num_bytes = u64::from(end_byte - start_byte);
    if from + num_bytes > length {
        return Err(SpiError::out_of_range(
            num_bytes * 8,
            length.saturating_sub(from) * 8,
        ));
    }
    try_copy(&data[from as usize..(from + num_bytes) as usize])
}

/// Validates a cursor override against a buffer of `length` bytes.
pub(crate) fn checked_position(byte: u32, bit: u8, length: u32) -> Result<BitCursor> {
    if bit > 7 {
        return Err(SpiError::invalid_argument(
            "bit",
            format!("bit offset {} is not in 0..=7", bit),
        ));
    }
    if byte > length || (byte == length && bit != 0) {
        let cursor = BitCursor::new(byte, bit);
        return Err(SpiError::out_of_range(
            cursor.position_in_bits(),
            u64::from(length) * 8,
        ));
    }
    Ok(BitCursor::new(byte, bit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_default() {
        let cursor = BitCursor::default();
        assert_eq!(cursor, BitCursor::new(0, 0));
        assert!(cursor.is_byte_aligned());
    }

    #[test]
    fn test_advance_within_byte() {
        let mut cursor = BitCursor::default();
        cursor.advance(3);
        assert_eq!(cursor, BitCursor::new(0, 3));
        assert!(!cursor.is_byte_aligned());
        cursor.advance(5);
        assert_eq!(cursor, BitCursor::new(1, 0));
    }

    #[test]
    fn test_advance_across_bytes() {
        let mut cursor = BitCursor::new(2, 6);
        cursor.advance(19);
        assert_eq!(cursor, BitCursor::new(5, 1));
        assert_eq!(cursor.position_in_bits(), 41);
    }

    #[test]
    fn test_remaining_bits() {
        assert_eq!(BitCursor::new(0, 0).remaining_bits(4), 32);
        assert_eq!(BitCursor::new(3, 2).remaining_bits(4), 6);
        assert_eq!(BitCursor::new(4, 0).remaining_bits(4), 0);
        assert_eq!(BitCursor::new(0, 0).remaining_bits(0), 0);
    }

    #[test]
    fn test_copy_from_cursor_is_cursor_relative() {
        let data = [1, 2, 3, 4, 5];
        let copied = copy_from_cursor(&data, BitCursor::new(2, 0), 0, 2).unwrap();
        assert_eq!(copied, vec![3, 4]);
        let copied = copy_from_cursor(&data, BitCursor::new(0, 0), 3, 5).unwrap();
        assert_eq!(copied, vec![1, 2]);
    }

    #[test]
    fn test_copy_from_cursor_errors() {
        let data = [1, 2, 3];
        let err = copy_from_cursor(&data, BitCursor::default(), 2, 1).unwrap_err();
        assert!(matches!(err, SpiError::InvalidArgument { .. }));

        let err = copy_from_cursor(&data, BitCursor::default(), 0, 4).unwrap_err();
        assert!(err.is_out_of_range());

        let err = copy_from_cursor(&data, BitCursor::new(2, 0), 0, 2).unwrap_err();
        assert!(err.is_out_of_range());
    }

    #[test]
    fn test_checked_position() {
        assert_eq!(checked_position(2, 3, 4).unwrap(), BitCursor::new(2, 3));
        assert_eq!(checked_position(4, 0, 4).unwrap(), BitCursor::new(4, 0));
        assert!(checked_position(4, 1, 4).unwrap_err().is_out_of_range());
        assert!(checked_position(5, 0, 4).unwrap_err().is_out_of_range());
        assert!(matches!(
            checked_position(0, 8, 4).unwrap_err(),
            SpiError::InvalidArgument { .. }
        ));
    }
}
