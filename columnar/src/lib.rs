//! Minimal fixed-width columnar table model.
//!
//! The hash-partitioning core treats table input and output purely in terms of [`Column`] and
//! [`Table`]: fixed-width, type-erased cell buffers tagged with a [`DataType`]. There is no query
//! engine here, no expressions, no string or nested types, and no on-disk format; a real query
//! engine's column type would be substituted at the boundary where this crate's callers sit.

pub mod column;
pub mod table;
pub mod types;

pub use column::Column;
pub use table::Table;
pub use types::DataType;
