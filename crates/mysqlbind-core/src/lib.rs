//! Core types for mysqlbind.
//!
//! Everything here is independent of the native client library:
//!
//! - `Error` and the error-code classifier
//! - `FieldDescriptor` and field-type codes
//! - `Value`, the converted form of a column
//! - `Converters`, the per-type converter mapping and its defaults
//! - `Row` and the row shapes
//! - Legacy string escaping

pub mod constants;
pub mod convert;
pub mod error;
pub mod escape;
pub mod field;
pub mod row;
pub mod value;

pub use convert::{Converter, ConverterEntry, Converters, converter, passthrough};
pub use error::{ConfigError, ConversionError, DatabaseError, Error, ErrorKind, Result};
pub use escape::{escape_dict, escape_sequence, escape_string, string_literal};
pub use field::{ColumnDescription, FieldDescriptor, FieldType};
pub use row::{ColumnInfo, Row, RowShape};
pub use value::Value;
