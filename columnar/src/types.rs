//! Physical types supported by the columnar core.
//!
//! Only fixed-width cells are representable; there is no variant for strings, lists, or other
//! nested/variable-width encodings. Dispatching on an unsupported type is a precondition
//! violation, not a panic (see `gpu_runtime::error::Error::UnsupportedType`).

use std::fmt;

/// A physical, fixed-width column encoding.
///
/// `Boolean` and the `Timestamp*` variants are physically stored as their underlying integer
/// width (1 byte and 8 bytes respectively); the distinction only matters to callers that care
/// about logical meaning, not to the partitioning kernels, which only ever look at cell width.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Boolean,
    TimestampSecond,
    TimestampMillisecond,
    TimestampMicrosecond,
    TimestampNanosecond,
}

impl DataType {
    /// Size in bytes of one cell of this type.
    pub fn byte_width(self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 | DataType::Boolean => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64
            | DataType::UInt64
            | DataType::Float64
            | DataType::TimestampSecond
            | DataType::TimestampMillisecond
            | DataType::TimestampMicrosecond
            | DataType::TimestampNanosecond => 8,
        }
    }

    /// Always `true`: every variant here is fixed-width by construction. Kept as a method
    /// (rather than inlined at call sites) so that a future variable-width `DataType` addition
    /// has a single place to change.
    pub fn is_fixed_width(self) -> bool {
        true
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::UInt8 => "uint8",
            DataType::UInt16 => "uint16",
            DataType::UInt32 => "uint32",
            DataType::UInt64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Boolean => "boolean",
            DataType::TimestampSecond => "timestamp[s]",
            DataType::TimestampMillisecond => "timestamp[ms]",
            DataType::TimestampMicrosecond => "timestamp[us]",
            DataType::TimestampNanosecond => "timestamp[ns]",
        };
        f.write_str(s)
    }
}
