//! Data-driven field plans.
//!
//! A [`FieldPlan`] describes a message as an ordered list of field kinds and
//! widths. It gives codec glue that does not need a dedicated struct a way
//! to parse a frame into [`FieldValue`]s and write them back, and it computes
//! the length-in-bits from the same list that drives parsing.
//!
//! # Example
//!
//! ```
//! use plc_spi::{FieldKind, FieldPlan, FieldValue};
//!
//! // COTP data TPDU: length, TPDU code (4 bits), credit (4 bits), EOT + number
//! let plan = FieldPlan::new(vec![
//!     FieldKind::Unsigned(8),
//!     FieldKind::Unsigned(4),
//!     FieldKind::Unsigned(4),
//!     FieldKind::Bit,
//!     FieldKind::Unsigned(7),
//! ]);
//! assert_eq!(plan.length_in_bits(), 24);
//!
//! let values = plan.parse_bytes(&[0x02, 0xF0, 0x80])?;
//! assert_eq!(values[1], FieldValue::Unsigned(0x0F));
//! assert_eq!(values[3], FieldValue::Bit(true));
//! assert_eq!(plan.to_bytes(&values)?, vec![0x02, 0xF0, 0x80]);
//! # Ok::<(), plc_spi::SpiError>(())
//! ```

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpiError};
use crate::message::into_checked_bytes;
use crate::read_buffer::ReadBuffer;
use crate::write_buffer::WriteBuffer;

/// Kind and width of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FieldKind {
    /// A single bit.
    Bit,
    /// An unsigned integer of 1 to 64 bits.
    Unsigned(u8),
    /// A two's-complement integer of 1 to 64 bits.
    Signed(u8),
    /// An IEEE-754 float of 16 (read only) or 32 bits.
    Float(u8),
    /// An IEEE-754 double of 64 bits.
    Double,
    /// A one-byte-per-character string of the given width in bits. The
    /// width must be a whole number of bytes.
    String(u32),
}

/// A parsed field value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FieldValue {
    /// Value of a [`FieldKind::Bit`].
    Bit(bool),
    /// Value of a [`FieldKind::Unsigned`].
    Unsigned(u64),
    /// Value of a [`FieldKind::Signed`].
    Signed(i64),
    /// Value of a [`FieldKind::Float`].
    Float(f32),
    /// Value of a [`FieldKind::Double`].
    Double(f64),
    /// Value of a [`FieldKind::String`].
    String(String),
}

const STRING_ENCODING: &str = "UTF-8";

impl FieldKind {
    /// Returns the width of the field in bits.
    pub fn length_in_bits(self) -> u32 {
        match self {
            FieldKind::Bit => 1,
            FieldKind::Unsigned(bits) | FieldKind::Signed(bits) | FieldKind::Float(bits) => {
                u32::from(bits)
            }
            FieldKind::Double => 64,
            FieldKind::String(bits) => bits,
        }
    }

    /// Reads one field of this kind.
    ///
    /// Integers go through the narrowest primitive that holds the width.
    pub fn read(self, buffer: &mut ReadBuffer<'_>) -> Result<FieldValue> {
        let value = match self {
            FieldKind::Bit => FieldValue::Bit(buffer.read_bit()?),
            FieldKind::Unsigned(bits) => FieldValue::Unsigned(match bits {
                0..=8 => u64::from(buffer.read_unsigned_byte(bits)?),
                9..=16 => u64::from(buffer.read_unsigned_short(bits)?),
                17..=32 => u64::from(buffer.read_unsigned_int(bits)?),
                _ => buffer.read_unsigned_long(bits)?,
            }),
            FieldKind::Signed(bits) => FieldValue::Signed(match bits {
                0..=8 => i64::from(buffer.read_signed_byte(bits)?),
                9..=16 => i64::from(buffer.read_signed_short(bits)?),
                17..=32 => i64::from(buffer.read_signed_int(bits)?),
                _ => buffer.read_signed_long(bits)?,
            }),
            FieldKind::Float(bits) => FieldValue::Float(buffer.read_float(bits)?),
            FieldKind::Double => FieldValue::Double(buffer.read_double(64)?),
            FieldKind::String(bits) => {
                check_string_width(bits)?;
                // A short string is an error here, unlike a bare read_string.
                let remaining = buffer.remaining_bits();
                if remaining < u64::from(bits) {
                    return Err(SpiError::out_of_range(u64::from(bits), remaining));
                }
                FieldValue::String(buffer.read_string(bits, STRING_ENCODING)?)
            }
        };
        Ok(value)
    }

    /// Writes `value` as one field of this kind.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the value variant does not match the
    /// kind, plus any error of the underlying primitive.
    pub fn write(self, buffer: &mut WriteBuffer, value: &FieldValue) -> Result<()> {
        match (self, value) {
            (FieldKind::Bit, FieldValue::Bit(v)) => buffer.write_bit(*v),
            (FieldKind::Unsigned(bits), FieldValue::Unsigned(v)) => match bits {
                0..=8 => buffer.write_unsigned_byte(bits, *v as u8),
                9..=16 => buffer.write_unsigned_short(bits, *v as u16),
                17..=32 => buffer.write_unsigned_int(bits, *v as u32),
                _ => buffer.write_unsigned_long(bits, *v),
            },
            (FieldKind::Signed(bits), FieldValue::Signed(v)) => match bits {
                0..=8 => buffer.write_signed_byte(bits, *v as i8),
                9..=16 => buffer.write_signed_short(bits, *v as i16),
                17..=32 => buffer.write_signed_int(bits, *v as i32),
                _ => buffer.write_signed_long(bits, *v),
            },
            (FieldKind::Float(bits), FieldValue::Float(v)) => buffer.write_float(bits, *v),
            (FieldKind::Double, FieldValue::Double(v)) => buffer.write_double(64, *v),
            (FieldKind::String(bits), FieldValue::String(v)) => {
                check_string_width(bits)?;
                buffer.write_string(bits, STRING_ENCODING, v)
            }
            (kind, value) => Err(SpiError::invalid_argument(
                "value",
                format!("{:?} does not match field kind {}", value, kind),
            )),
        }
    }
}

fn check_string_width(bits: u32) -> Result<()> {
    if bits % 8 != 0 {
        return Err(SpiError::invalid_argument(
            "bits",
            format!("string width must be a multiple of 8, got {}", bits),
        ));
    }
    Ok(())
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Bit => write!(f, "bit"),
            FieldKind::Unsigned(bits) => write!(f, "uint{}", bits),
            FieldKind::Signed(bits) => write!(f, "int{}", bits),
            FieldKind::Float(bits) => write!(f, "float{}", bits),
            FieldKind::Double => write!(f, "float64"),
            FieldKind::String(bits) => write!(f, "string{}", bits),
        }
    }
}

/// An ordered list of fields making up one message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldPlan {
    fields: Vec<FieldKind>,
}

impl FieldPlan {
    /// Creates a plan from fields in protocol order.
    pub fn new(fields: Vec<FieldKind>) -> Self {
        Self { fields }
    }

    /// Returns the fields in protocol order.
    pub fn fields(&self) -> &[FieldKind] {
        &self.fields
    }

    /// Returns the total width of all fields in bits.
    pub fn length_in_bits(&self) -> u32 {
        self.fields.iter().map(|kind| kind.length_in_bits()).sum()
    }

    /// Reads every field in order. Fails as a whole if any field fails.
    pub fn parse(&self, buffer: &mut ReadBuffer<'_>) -> Result<Vec<FieldValue>> {
        self.fields.iter().map(|kind| kind.read(buffer)).collect()
    }

    /// Parses the fields from the start of `data`.
    pub fn parse_bytes(&self, data: &[u8]) -> Result<Vec<FieldValue>> {
        self.parse(&mut ReadBuffer::new(data))
    }

    /// Writes one value per field, in order.
    ///
    /// # Errors
    ///
    /// Returns `NullValue` if fewer values than fields are given and
    /// `InvalidArgument` if more are given.
    pub fn serialize(&self, buffer: &mut WriteBuffer, values: &[FieldValue]) -> Result<()> {
        if values.len() > self.fields.len() {
            return Err(SpiError::invalid_argument(
                "values",
                format!(
                    "{} values for a plan of {} fields",
                    values.len(),
                    self.fields.len()
                ),
            ));
        }
        for (index, kind) in self.fields.iter().enumerate() {
            let value = values.get(index).ok_or_else(|| {
                SpiError::null_value(format!("value for field {} ({})", index, kind))
            })?;
            kind.write(buffer, value)?;
        }
        Ok(())
    }

    /// Serializes `values` into a buffer sized by [`length_in_bits`](Self::length_in_bits).
    ///
    /// # Errors
    ///
    /// Propagates any field error, and returns `LengthMismatch` if the
    /// fields wrote a different number of bits than the plan declares.
    pub fn to_bytes(&self, values: &[FieldValue]) -> Result<Vec<u8>> {
        let declared = self.length_in_bits();
        let mut buffer = WriteBuffer::with_length_in_bits(declared)?;
        self.serialize(&mut buffer, values)?;
        into_checked_bytes(buffer, declared)
    }
}

impl From<Vec<FieldKind>> for FieldPlan {
    fn from(fields: Vec<FieldKind>) -> Self {
        Self::new(fields)
    }
}
