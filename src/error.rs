//! Error types for the bit-stream codec.

use std::collections::TryReserveError;
use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, SpiError>;

/// Errors that can occur while reading from or writing to a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpiError {
    /// The requested bit span exceeds what is left in the buffer.
    #[error("Out of range: requested {requested_bits} bits, {remaining_bits} remaining")]
    OutOfRange {
        /// Number of bits the operation needed.
        requested_bits: u64,
        /// Number of bits still available behind the cursor.
        remaining_bits: u64,
    },

    /// A required value was absent.
    #[error("Null value: {what}")]
    NullValue {
        /// Description of the missing value.
        what: String,
    },

    /// Malformed range or unsupported width/encoding tag.
    #[error("Invalid argument '{parameter}': {reason}")]
    InvalidArgument {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// Allocation of a buffer or result failed.
    #[error("Out of memory: could not allocate {requested_bytes} bytes")]
    NoMemory {
        /// Size of the allocation that failed.
        requested_bytes: usize,
    },

    /// A recognized code path that has no implementation.
    #[error("Not implemented: {feature}")]
    NotImplemented {
        /// The unsupported feature.
        feature: String,
    },

    /// A serializer wrote a different number of bits than it declared.
    #[error("Length mismatch: declared {declared_bits} bits, wrote {written_bits}")]
    LengthMismatch {
        /// Bits reported by the length-in-bits pass.
        declared_bits: u64,
        /// Bits actually written by the serializer.
        written_bits: u64,
    },
}

impl SpiError {
    /// Creates a new `OutOfRange` error.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_spi::SpiError;
    ///
    /// let err = SpiError::out_of_range(16, 8);
    /// assert_eq!(err.to_string(), "Out of range: requested 16 bits, 8 remaining");
    /// ```
    pub fn out_of_range(requested_bits: u64, remaining_bits: u64) -> Self {
        Self::OutOfRange {
            requested_bits,
            remaining_bits,
        }
    }

    /// Creates a new `NullValue` error.
    pub fn null_value(what: impl Into<String>) -> Self {
        Self::NullValue { what: what.into() }
    }

    /// Creates a new `InvalidArgument` error.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_spi::SpiError;
    ///
    /// let err = SpiError::invalid_argument("num_bits", "must be 32 or 16");
    /// ```
    pub fn invalid_argument(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `NoMemory` error.
    pub fn no_memory(requested_bytes: usize) -> Self {
        Self::NoMemory { requested_bytes }
    }

    /// Creates a new `NotImplemented` error.
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Creates a new `LengthMismatch` error.
    pub fn length_mismatch(declared_bits: u64, written_bits: u64) -> Self {
        Self::LengthMismatch {
            declared_bits,
            written_bits,
        }
    }

    /// Returns whether this error means the buffer ran out of room.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }
}

/// Allocates a zero-filled byte vector, reporting allocation failure as `NoMemory`.
pub(crate) fn try_alloc_zeroed(len: usize) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_: TryReserveError| SpiError::no_memory(len))?;
    data.resize(len, 0);
    Ok(data)
}

/// Copies a byte slice into a new vector, reporting allocation failure as `NoMemory`.
pub(crate) fn try_copy(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(bytes.len())
        .map_err(|_: TryReserveError| SpiError::no_memory(bytes.len()))?;
    data.extend_from_slice(bytes);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_display() {
        let err = SpiError::out_of_range(72, 0);
        assert_eq!(err.to_string(), "Out of range: requested 72 bits, 0 remaining");
        assert!(err.is_out_of_range());
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = SpiError::invalid_argument("end_byte", "must not be less than start_byte");
        assert_eq!(
            err.to_string(),
            "Invalid argument 'end_byte': must not be less than start_byte"
        );
        assert!(!err.is_out_of_range());
    }

    #[test]
    fn test_not_implemented_display() {
        let err = SpiError::not_implemented("16-bit float write");
        assert_eq!(err.to_string(), "Not implemented: 16-bit float write");
    }

    #[test]
    fn test_length_mismatch_display() {
        let err = SpiError::length_mismatch(24, 16);
        assert_eq!(err.to_string(), "Length mismatch: declared 24 bits, wrote 16");
    }

    #[test]
    fn test_try_alloc_zeroed() {
        let data = try_alloc_zeroed(5).unwrap();
        assert_eq!(data, vec![0; 5]);
        assert!(try_alloc_zeroed(0).unwrap().is_empty());
    }

    #[test]
    fn test_try_copy() {
        assert_eq!(try_copy(&[1, 2, 3]).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_try_alloc_zeroed_too_large() {
        let err = try_alloc_zeroed(usize::MAX).unwrap_err();
        assert_eq!(err, SpiError::no_memory(usize::MAX));
    }
}
