//! Field metadata surfaced by the client library.
//!
//! Every column of a result set carries a [`FieldDescriptor`] copied
//! verbatim out of the library's `MYSQL_FIELD` structure. The type code
//! selects the column's converter; the flags refine that choice and are
//! also exposed on their own through `field_flags`.

use crate::constants::BINARY_CHARSET_NR;
use serde::{Deserialize, Serialize};

/// MySQL field type codes.
///
/// These are the `MYSQL_TYPE_*` constants from the MySQL C API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FieldType {
    /// DECIMAL (MYSQL_TYPE_DECIMAL)
    Decimal = 0x00,
    /// TINYINT (MYSQL_TYPE_TINY)
    Tiny = 0x01,
    /// SMALLINT (MYSQL_TYPE_SHORT)
    Short = 0x02,
    /// INT (MYSQL_TYPE_LONG)
    Long = 0x03,
    /// FLOAT (MYSQL_TYPE_FLOAT)
    Float = 0x04,
    /// DOUBLE (MYSQL_TYPE_DOUBLE)
    Double = 0x05,
    /// NULL (MYSQL_TYPE_NULL)
    Null = 0x06,
    /// TIMESTAMP (MYSQL_TYPE_TIMESTAMP)
    Timestamp = 0x07,
    /// BIGINT (MYSQL_TYPE_LONGLONG)
    LongLong = 0x08,
    /// MEDIUMINT (MYSQL_TYPE_INT24)
    Int24 = 0x09,
    /// DATE (MYSQL_TYPE_DATE)
    Date = 0x0A,
    /// TIME (MYSQL_TYPE_TIME)
    Time = 0x0B,
    /// DATETIME (MYSQL_TYPE_DATETIME)
    DateTime = 0x0C,
    /// YEAR (MYSQL_TYPE_YEAR)
    Year = 0x0D,
    /// NEWDATE (MYSQL_TYPE_NEWDATE) - internal use
    NewDate = 0x0E,
    /// VARCHAR (MYSQL_TYPE_VARCHAR)
    VarChar = 0x0F,
    /// BIT (MYSQL_TYPE_BIT)
    Bit = 0x10,
    /// JSON (MYSQL_TYPE_JSON) - MySQL 5.7.8+
    Json = 0xF5,
    /// NEWDECIMAL (MYSQL_TYPE_NEWDECIMAL)
    NewDecimal = 0xF6,
    /// ENUM (MYSQL_TYPE_ENUM)
    Enum = 0xF7,
    /// SET (MYSQL_TYPE_SET)
    Set = 0xF8,
    /// TINYBLOB (MYSQL_TYPE_TINY_BLOB)
    TinyBlob = 0xF9,
    /// MEDIUMBLOB (MYSQL_TYPE_MEDIUM_BLOB)
    MediumBlob = 0xFA,
    /// LONGBLOB (MYSQL_TYPE_LONG_BLOB)
    LongBlob = 0xFB,
    /// BLOB (MYSQL_TYPE_BLOB)
    Blob = 0xFC,
    /// VARCHAR (MYSQL_TYPE_VAR_STRING)
    VarString = 0xFD,
    /// CHAR (MYSQL_TYPE_STRING)
    String = 0xFE,
    /// GEOMETRY (MYSQL_TYPE_GEOMETRY)
    Geometry = 0xFF,
}

impl FieldType {
    /// Parse a field type from its native code, if the code is known.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => FieldType::Decimal,
            0x01 => FieldType::Tiny,
            0x02 => FieldType::Short,
            0x03 => FieldType::Long,
            0x04 => FieldType::Float,
            0x05 => FieldType::Double,
            0x06 => FieldType::Null,
            0x07 => FieldType::Timestamp,
            0x08 => FieldType::LongLong,
            0x09 => FieldType::Int24,
            0x0A => FieldType::Date,
            0x0B => FieldType::Time,
            0x0C => FieldType::DateTime,
            0x0D => FieldType::Year,
            0x0E => FieldType::NewDate,
            0x0F => FieldType::VarChar,
            0x10 => FieldType::Bit,
            0xF5 => FieldType::Json,
            0xF6 => FieldType::NewDecimal,
            0xF7 => FieldType::Enum,
            0xF8 => FieldType::Set,
            0xF9 => FieldType::TinyBlob,
            0xFA => FieldType::MediumBlob,
            0xFB => FieldType::LongBlob,
            0xFC => FieldType::Blob,
            0xFD => FieldType::VarString,
            0xFE => FieldType::String,
            0xFF => FieldType::Geometry,
            _ => return None,
        })
    }

    /// The native code for this type.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Types whose raw column bytes are handed out as bytes rather than
    /// text when no converter applies.
    #[must_use]
    pub const fn is_binary_passthrough(self) -> bool {
        matches!(
            self,
            FieldType::TinyBlob
                | FieldType::MediumBlob
                | FieldType::LongBlob
                | FieldType::Blob
                | FieldType::VarString
                | FieldType::String
                | FieldType::Geometry
                | FieldType::Bit
        )
    }

    /// Check if this is an integer type.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Tiny
                | FieldType::Short
                | FieldType::Long
                | FieldType::LongLong
                | FieldType::Int24
                | FieldType::Year
        )
    }

    /// Check if this is a date/time type.
    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(
            self,
            FieldType::Date
                | FieldType::Time
                | FieldType::DateTime
                | FieldType::Timestamp
                | FieldType::NewDate
        )
    }

    /// Get the SQL type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Decimal | FieldType::NewDecimal => "DECIMAL",
            FieldType::Tiny => "TINYINT",
            FieldType::Short => "SMALLINT",
            FieldType::Long => "INT",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Null => "NULL",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::LongLong => "BIGINT",
            FieldType::Int24 => "MEDIUMINT",
            FieldType::Date | FieldType::NewDate => "DATE",
            FieldType::Time => "TIME",
            FieldType::DateTime => "DATETIME",
            FieldType::Year => "YEAR",
            FieldType::VarChar | FieldType::VarString => "VARCHAR",
            FieldType::Bit => "BIT",
            FieldType::Json => "JSON",
            FieldType::Enum => "ENUM",
            FieldType::Set => "SET",
            FieldType::TinyBlob => "TINYBLOB",
            FieldType::MediumBlob => "MEDIUMBLOB",
            FieldType::LongBlob => "LONGBLOB",
            FieldType::Blob => "BLOB",
            FieldType::String => "CHAR",
            FieldType::Geometry => "GEOMETRY",
        }
    }
}

impl From<FieldType> for u8 {
    fn from(ty: FieldType) -> u8 {
        ty.code()
    }
}

/// Column flags in result set metadata (`*_FLAG` in mysql_com.h).
pub mod flags {
    pub const NOT_NULL: u32 = 1;
    pub const PRI_KEY: u32 = 2;
    pub const UNIQUE_KEY: u32 = 4;
    pub const MULTIPLE_KEY: u32 = 8;
    pub const BLOB: u32 = 16;
    pub const UNSIGNED: u32 = 32;
    pub const ZEROFILL: u32 = 64;
    pub const BINARY: u32 = 128;
    pub const ENUM: u32 = 256;
    pub const AUTO_INCREMENT: u32 = 512;
    pub const TIMESTAMP: u32 = 1024;
    pub const SET: u32 = 2048;
    pub const NO_DEFAULT_VALUE: u32 = 4096;
    pub const ON_UPDATE_NOW: u32 = 8192;
    pub const NUM: u32 = 32768;
}

/// Column metadata for one field of a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Column name (or alias)
    pub name: String,
    /// Original column name
    pub org_name: String,
    /// Table name (or alias); empty for computed columns
    pub table: String,
    /// Original table name
    pub org_table: String,
    /// Database name
    pub db: String,
    /// Native field-type code
    pub type_code: u8,
    /// Declared column width
    pub length: u64,
    /// Widest value in a buffered result set
    pub max_length: u64,
    /// Number of decimals
    pub decimals: u32,
    /// Column flags
    pub flags: u32,
    /// Character set number
    pub charsetnr: u32,
}

impl FieldDescriptor {
    /// A descriptor with the given name and type and everything else empty.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            org_name: name.clone(),
            name,
            table: String::new(),
            org_table: String::new(),
            db: String::new(),
            type_code: field_type.code(),
            length: 0,
            max_length: 0,
            decimals: 0,
            flags: 0,
            charsetnr: 0,
        }
    }

    /// Set the table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self.org_table.clone_from(&self.table);
        self
    }

    /// Set the column flags.
    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Set the character set number.
    pub fn charset(mut self, charsetnr: u32) -> Self {
        self.charsetnr = charsetnr;
        self
    }

    /// Set the declared length.
    pub fn length(mut self, length: u64) -> Self {
        self.length = length;
        self
    }

    /// The decoded field type, if the code is known.
    #[must_use]
    pub fn field_type(&self) -> Option<FieldType> {
        FieldType::from_code(self.type_code)
    }

    /// Flags used for converter selection: BINARY only counts when the
    /// column really uses the binary character set.
    #[must_use]
    pub const fn conversion_flags(&self) -> u32 {
        if self.charsetnr == BINARY_CHARSET_NR {
            self.flags
        } else {
            self.flags & !flags::BINARY
        }
    }

    /// Check if the column is NOT NULL.
    #[must_use]
    pub const fn is_not_null(&self) -> bool {
        self.flags & flags::NOT_NULL != 0
    }

    /// Check if the column is unsigned.
    #[must_use]
    pub const fn is_unsigned(&self) -> bool {
        self.flags & flags::UNSIGNED != 0
    }

    /// Check if the column is binary.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        self.conversion_flags() & flags::BINARY != 0
    }

    /// `table.name`, or just `name` when the column has no table.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.table.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.table, self.name)
        }
    }

    /// The DB-API description tuple for this column.
    #[must_use]
    pub fn describe(&self) -> ColumnDescription {
        ColumnDescription {
            name: self.name.clone(),
            type_code: self.type_code,
            display_size: self.max_length,
            internal_size: self.length,
            precision: self.length,
            scale: self.decimals,
            null_ok: !self.is_not_null(),
        }
    }
}

/// One entry of a result's `describe()` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    pub type_code: u8,
    pub display_size: u64,
    pub internal_size: u64,
    pub precision: u64,
    pub scale: u32,
    pub null_ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_codes() {
        assert_eq!(FieldType::from_code(0x03), Some(FieldType::Long));
        assert_eq!(FieldType::from_code(0xFC), Some(FieldType::Blob));
        assert_eq!(FieldType::from_code(0x11), None);
        assert_eq!(u8::from(FieldType::Geometry), 0xFF);
        for code in 0..=u8::MAX {
            if let Some(ty) = FieldType::from_code(code) {
                assert_eq!(ty.code(), code);
            }
        }
    }

    #[test]
    fn test_type_families() {
        for ty in [FieldType::Tiny, FieldType::Int24, FieldType::LongLong, FieldType::Year] {
            assert!(ty.is_integer(), "{:?}", ty);
            assert!(!ty.is_temporal(), "{:?}", ty);
        }
        for ty in [FieldType::Date, FieldType::NewDate, FieldType::DateTime, FieldType::Time] {
            assert!(ty.is_temporal(), "{:?}", ty);
            assert!(!ty.is_integer(), "{:?}", ty);
        }
        assert!(FieldType::Timestamp.is_temporal());
        assert!(!FieldType::NewDecimal.is_integer());
        assert!(!FieldType::Double.is_integer());
        assert!(!FieldType::VarString.is_temporal());
    }

    #[test]
    fn test_binary_flag_needs_binary_charset() {
        let text = FieldDescriptor::new("name", FieldType::VarString)
            .flags(flags::BINARY | flags::NOT_NULL)
            .charset(33);
        assert!(!text.is_binary());
        assert_eq!(text.conversion_flags(), flags::NOT_NULL);

        let blob = FieldDescriptor::new("data", FieldType::Blob)
            .flags(flags::BINARY | flags::BLOB)
            .charset(BINARY_CHARSET_NR);
        assert!(blob.is_binary());
    }

    #[test]
    fn test_describe() {
        let mut field = FieldDescriptor::new("price", FieldType::NewDecimal)
            .flags(flags::NOT_NULL)
            .length(10);
        field.max_length = 6;
        field.decimals = 2;
        let d = field.describe();
        assert_eq!(d.name, "price");
        assert_eq!(d.type_code, 0xF6);
        assert_eq!(d.display_size, 6);
        assert_eq!(d.internal_size, 10);
        assert_eq!(d.precision, 10);
        assert_eq!(d.scale, 2);
        assert!(!d.null_ok);
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(FieldDescriptor::new("id", FieldType::Long).qualified_name(), "id");
        assert_eq!(
            FieldDescriptor::new("id", FieldType::Long)
                .table("users")
                .qualified_name(),
            "users.id"
        );
    }
}
