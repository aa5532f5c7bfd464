//! Bit-mask table and numeric helpers shared by both buffers.
//!
//! Bits inside a byte are numbered from the most significant one: bit 0 is
//! `0x80`, bit 7 is `0x01`. This is the order in which the buffers consume
//! and produce bits.
//!
//! # Example
//!
//! ```
//! use plc_spi::utils::{bit_mask, fill_sign, format_bytes};
//!
//! // 3 bits starting at bit 2
//! assert_eq!(bit_mask(3, 2), 0b0011_1000);
//!
//! // 4-bit value 0b1010 is -6 in two's complement
//! assert_eq!(fill_sign(0b1010, 4, 8) as u8 as i8, -6);
//!
//! assert_eq!(format_bytes(&[0x03, 0x00, 0x00, 0x16]), "03 00 00 16");
//! ```

use half::f16;

use crate::error::{Result, SpiError};

const fn build_bit_masks() -> [[u8; 8]; 8] {
    let mut table = [[0u8; 8]; 8];
    let mut num_bits = 1;
    while num_bits <= 8 {
        let mut start_bit = 0;
        while start_bit + num_bits <= 8 {
            let high = 0xFFu8 >> start_bit;
            let low = 0xFFu8 << (8 - start_bit - num_bits);
            table[num_bits - 1][start_bit] = high & low;
            start_bit += 1;
        }
        num_bits += 1;
    }
    table
}

/// Masks isolating `row + 1` bits starting at bit `column` of a byte.
///
/// Combinations running past the end of the byte are zero.
pub const BIT_MASKS: [[u8; 8]; 8] = build_bit_masks();

/// Returns the mask isolating `num_bits` bits starting at `start_bit`.
///
/// Returns 0 for combinations that do not fit in one byte.
///
/// # Example
///
/// ```
/// use plc_spi::utils::bit_mask;
///
/// assert_eq!(bit_mask(1, 0), 0b1000_0000);
/// assert_eq!(bit_mask(8, 0), 0xFF);
/// assert_eq!(bit_mask(4, 6), 0);
/// ```
#[inline]
pub fn bit_mask(num_bits: u8, start_bit: u8) -> u8 {
    if num_bits == 0 || num_bits > 8 || start_bit > 7 {
        return 0;
    }
    BIT_MASKS[(num_bits - 1) as usize][start_bit as usize]
}

/// Returns a value with the low `num_bits` bits set.
#[inline]
pub(crate) fn low_bits(num_bits: u8) -> u64 {
    if num_bits >= 64 {
        u64::MAX
    } else {
        (1u64 << num_bits) - 1
    }
}

/// Rejects widths wider than the target container.
pub(crate) fn check_width(num_bits: u8, container_bits: u8, operation: &str) -> Result<()> {
    if num_bits > container_bits {
        return Err(SpiError::invalid_argument(
            "num_bits",
            format!(
                "{} supports at most {} bits, got {}",
                operation, container_bits, num_bits
            ),
        ));
    }
    Ok(())
}

/// Sign-extends the low `num_bits` of `value` up to `container_bits`.
///
/// If bit `num_bits - 1` is set, every bit from `num_bits` up to the
/// container width is set; otherwise those bits are cleared. Bits above the
/// container are always cleared, so the result can be cast straight to the
/// unsigned container type and reinterpreted as signed.
///
/// # Example
///
/// ```
/// use plc_spi::utils::fill_sign;
///
/// assert_eq!(fill_sign(0x0FFF_FFD6, 28, 32) as u32 as i32, -42);
/// assert_eq!(fill_sign(0x7F, 8, 16), 0x7F);
/// assert_eq!(fill_sign(0xFF80, 7, 16), 0x0000);
/// ```
pub fn fill_sign(value: u64, num_bits: u8, container_bits: u8) -> u64 {
    let container = low_bits(container_bits);
    if num_bits == 0 {
        return 0;
    }
    if num_bits >= container_bits {
        return value & container;
    }
    let payload = low_bits(num_bits);
    let sign_bit = 1u64 << (num_bits - 1);
    if value & sign_bit != 0 {
        (value | !payload) & container
    } else {
        value & payload
    }
}

/// Decodes an IEEE-754 half-precision bit pattern.
///
/// Subnormals, infinities and NaN follow the standard: the value is
/// `(-1)^sign * 2^(exponent - 15) * (1 + fraction / 1024)` for normal numbers.
///
/// # Example
///
/// ```
/// use plc_spi::utils::decode_half;
///
/// assert_eq!(decode_half(0x3C00), 1.0);
/// assert_eq!(decode_half(0xC000), -2.0);
/// assert!(decode_half(0x7C00).is_infinite());
/// assert!(decode_half(0x7E00).is_nan());
/// ```
pub fn decode_half(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

/// Formats bytes as space-separated upper-case hex.
pub fn format_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_mask_table_rows() {
        assert_eq!(
            BIT_MASKS[0],
            [0x80, 0x40, 0x20, 0x10, 0x08, 0x04, 0x02, 0x01]
        );
        assert_eq!(BIT_MASKS[2][2], 0b0011_1000);
        assert_eq!(BIT_MASKS[7], [0xFF, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(BIT_MASKS[3][4], 0x0F);
    }

    #[test]
    fn test_bit_mask_table_invalid_entries_are_zero() {
        for num_bits in 1..=8usize {
            for start_bit in 0..8usize {
                let mask = BIT_MASKS[num_bits - 1][start_bit];
                if num_bits + start_bit > 8 {
                    assert_eq!(mask, 0);
                } else {
                    assert_eq!(mask.count_ones() as usize, num_bits);
                    assert_eq!(mask.leading_zeros() as usize, start_bit);
                }
            }
        }
    }

    #[test]
    fn test_bit_mask_out_of_table() {
        assert_eq!(bit_mask(0, 0), 0);
        assert_eq!(bit_mask(9, 0), 0);
        assert_eq!(bit_mask(1, 8), 0);
    }

    #[test]
    fn test_low_bits() {
        assert_eq!(low_bits(0), 0);
        assert_eq!(low_bits(3), 0b111);
        assert_eq!(low_bits(64), u64::MAX);
    }

    #[test]
    fn test_check_width() {
        assert!(check_width(8, 8, "read_unsigned_byte").is_ok());
        assert!(check_width(0, 16, "read_unsigned_short").is_ok());
        let err = check_width(9, 8, "read_unsigned_byte").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid argument 'num_bits': read_unsigned_byte supports at most 8 bits, got 9"
        );
    }

    #[test]
    fn test_fill_sign_negative() {
        assert_eq!(fill_sign(0b101, 3, 8), 0xFD);
        assert_eq!(fill_sign(0x8000, 16, 32) as u32 as i32, -32768);
        assert_eq!(fill_sign(0x8000, 16, 16) as u16 as i16, i16::MIN);
        assert_eq!(fill_sign(1, 1, 64) as i64, -1);
    }

    #[test]
    fn test_fill_sign_clears_garbage() {
        // Bits above the field are cleared when the sign bit is clear.
        assert_eq!(fill_sign(0xF3, 4, 8), 0x03);
        assert_eq!(fill_sign(u64::MAX, 8, 64), u64::MAX);
        assert_eq!(fill_sign(0x1_0000_0042, 32, 32), 0x42);
    }

    #[test]
    fn test_decode_half_normal() {
        assert_eq!(decode_half(0x4049), 2.142578125);
        assert_eq!(decode_half(0x3555), 0.333_251_953_125);
        assert_eq!(decode_half(0x0000), 0.0);
        assert!(decode_half(0x8000).is_sign_negative());
    }

    #[test]
    fn test_decode_half_subnormal() {
        assert_eq!(decode_half(0x0001), 2f32.powi(-24));
        assert_eq!(decode_half(0x03FF), 1023.0 * 2f32.powi(-24));
    }

    #[test]
    fn test_decode_half_special() {
        assert_eq!(decode_half(0x7C00), f32::INFINITY);
        assert_eq!(decode_half(0xFC00), f32::NEG_INFINITY);
        assert!(decode_half(0x7C01).is_nan());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(&[]), "");
        assert_eq!(format_bytes(&[0xAB, 0x01]), "AB 01");
    }
}
