//! Error types for mysqlbind operations.
//!
//! Failures reported by the native client library are classified into a
//! fixed set of kinds by [`ErrorKind::classify`], a pure table lookup on
//! the library's numeric error code.

use crate::constants::{cr, er};
use std::fmt;

/// The primary error type for all mysqlbind operations.
#[derive(Debug)]
pub enum Error {
    /// A failure reported by the native client library, or a misuse of
    /// the binding detected before calling into it.
    Database(DatabaseError),
    /// A column converter rejected a value.
    Conversion(ConversionError),
    /// Invalid connection options.
    Config(ConfigError),
}

/// Classification of a [`DatabaseError`].
///
/// Mirrors the generic SQL exception taxonomy: each native error code maps
/// to exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Misuse of the binding itself, or a failure with no error code.
    Interface,
    /// Malformed SQL, unknown tables, wrong schema shape.
    Programming,
    /// Constraint violations (duplicate keys, foreign keys).
    Integrity,
    /// Problems with the processed data (truncation, out of range).
    Data,
    /// Unexpected low-numbered codes; the client library is confused.
    Internal,
    /// Everything else, typically connectivity or server state.
    Operational,
    /// A known operation the server or library does not support.
    NotSupported,
}

#[derive(Debug)]
pub struct DatabaseError {
    pub kind: ErrorKind,
    /// Native error code. 0 when no code was reported, -1 when the client
    /// library was never initialized.
    pub code: i32,
    pub message: String,
    pub sqlstate: Option<String>,
}

#[derive(Debug)]
pub struct ConversionError {
    /// Column name, when the failure happened while fetching a row.
    pub column: Option<String>,
    /// Native field-type code of the column.
    pub field_type: Option<u8>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ErrorKind {
    /// Classify a native error code.
    ///
    /// The priority is: no code, the programming set, the data set, the
    /// integrity set, the not-supported set, then any code below 1000 is
    /// internal and everything else operational.
    pub const fn classify(code: i32) -> Self {
        match code {
            0 => ErrorKind::Interface,
            cr::COMMANDS_OUT_OF_SYNC
            | er::DB_CREATE_EXISTS
            | er::SYNTAX_ERROR
            | er::PARSE_ERROR
            | er::NO_SUCH_TABLE
            | er::WRONG_DB_NAME
            | er::WRONG_TABLE_NAME
            | er::FIELD_SPECIFIED_TWICE
            | er::INVALID_GROUP_FUNC_USE
            | er::UNSUPPORTED_EXTENSION
            | er::TABLE_MUST_HAVE_COLUMNS
            | er::CANT_DO_THIS_DURING_AN_TRANSACTION => ErrorKind::Programming,
            er::WARN_DATA_TRUNCATED
            | er::WARN_NULL_TO_NOTNULL
            | er::WARN_DATA_OUT_OF_RANGE
            | er::NO_DEFAULT
            | er::PRIMARY_CANT_HAVE_NULL
            | er::DATA_TOO_LONG
            | er::DATETIME_FUNCTION_OVERFLOW => ErrorKind::Data,
            er::DUP_ENTRY
            | er::DUP_UNIQUE
            | er::NO_REFERENCED_ROW
            | er::NO_REFERENCED_ROW_2
            | er::ROW_IS_REFERENCED
            | er::ROW_IS_REFERENCED_2
            | er::CANNOT_ADD_FOREIGN
            | er::NO_DEFAULT_FOR_FIELD => ErrorKind::Integrity,
            er::WARNING_NOT_COMPLETE_ROLLBACK
            | er::NOT_SUPPORTED_YET
            | er::FEATURE_DISABLED
            | er::UNKNOWN_STORAGE_ENGINE => ErrorKind::NotSupported,
            c if c < 1000 => ErrorKind::Internal,
            _ => ErrorKind::Operational,
        }
    }

    /// The DB-API class name for this kind.
    pub const fn name(self) -> &'static str {
        match self {
            ErrorKind::Interface => "InterfaceError",
            ErrorKind::Programming => "ProgrammingError",
            ErrorKind::Integrity => "IntegrityError",
            ErrorKind::Data => "DataError",
            ErrorKind::Internal => "InternalError",
            ErrorKind::Operational => "OperationalError",
            ErrorKind::NotSupported => "NotSupportedError",
        }
    }
}

impl DatabaseError {
    /// Build an error from a native failure, classifying its code.
    pub fn from_native(code: i32, message: impl Into<String>, sqlstate: Option<String>) -> Self {
        Self {
            kind: ErrorKind::classify(code),
            code,
            message: message.into(),
            sqlstate: sqlstate.filter(|s| !s.is_empty() && s != "00000"),
        }
    }

    fn with_kind(kind: ErrorKind, code: i32, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            sqlstate: None,
        }
    }

    /// Misuse of the binding (operating on a closed connection, ...).
    pub fn interface(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Interface, 0, message)
    }

    /// A programming mistake caught by the binding.
    pub fn programming(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Programming, 0, message)
    }

    /// An operation the linked client library cannot perform.
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::NotSupported, 0, message)
    }

    /// The client library has not been initialized.
    pub fn not_initialized() -> Self {
        Self::with_kind(ErrorKind::Internal, -1, "server not initialized")
    }
}

impl Error {
    /// The taxonomy kind of this error.
    ///
    /// Converter failures report as [`ErrorKind::Data`]; configuration
    /// problems as [`ErrorKind::Interface`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Database(e) => e.kind,
            Error::Conversion(_) => ErrorKind::Data,
            Error::Config(_) => ErrorKind::Interface,
        }
    }

    /// Native error code, if this error came from the client library.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Database(e) => Some(e.code),
            _ => None,
        }
    }

    /// SQLSTATE reported alongside the error, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Database(e) => e.sqlstate.as_deref(),
            _ => None,
        }
    }

    /// The `(code, message)` pair carried by the error.
    pub fn args(&self) -> (i32, String) {
        match self {
            Error::Database(e) => (e.code, e.message.clone()),
            other => (0, other.to_string()),
        }
    }

    /// Does this error indicate the connection to the server is unusable?
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self.code(),
            Some(
                cr::CONNECTION_ERROR
                    | cr::CONN_HOST_ERROR
                    | cr::SERVER_GONE_ERROR
                    | cr::SERVER_LOST
                    | cr::SERVER_LOST_EXTENDED
            )
        )
    }

    /// Shorthand for a converter failure.
    pub fn conversion(message: impl Into<String>) -> Self {
        Error::Conversion(ConversionError {
            column: None,
            field_type: None,
            message: message.into(),
            source: None,
        })
    }

    /// Shorthand for a configuration failure.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
            source: None,
        })
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(e) => write!(f, "{}", e),
            Error::Conversion(e) => write!(f, "Conversion error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
        }
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sqlstate {
            Some(state) => write!(
                f,
                "{} ({}, SQLSTATE {}): {}",
                self.kind, self.code, state, self.message
            ),
            None => write!(f, "{} ({}): {}", self.kind, self.code, self.message),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.column, self.field_type) {
            (Some(col), Some(ty)) => {
                write!(f, "column '{}' (type {}): {}", col, ty, self.message)
            }
            (Some(col), None) => write!(f, "column '{}': {}", col, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Conversion(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Database(_) => None,
        }
    }
}

impl std::error::Error for DatabaseError {}

impl From<DatabaseError> for Error {
    fn from(err: DatabaseError) -> Self {
        Error::Database(err)
    }
}

impl From<ConversionError> for Error {
    fn from(err: ConversionError) -> Self {
        Error::Conversion(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Result type alias for mysqlbind operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_table_codes() {
        let cases = [
            (0, ErrorKind::Interface),
            (cr::COMMANDS_OUT_OF_SYNC, ErrorKind::Programming),
            (er::PARSE_ERROR, ErrorKind::Programming),
            (er::NO_SUCH_TABLE, ErrorKind::Programming),
            (er::CANT_DO_THIS_DURING_AN_TRANSACTION, ErrorKind::Programming),
            (er::WARN_DATA_TRUNCATED, ErrorKind::Data),
            (er::DATA_TOO_LONG, ErrorKind::Data),
            (er::DUP_ENTRY, ErrorKind::Integrity),
            (er::NO_REFERENCED_ROW_2, ErrorKind::Integrity),
            (er::NO_DEFAULT_FOR_FIELD, ErrorKind::Integrity),
            (er::NOT_SUPPORTED_YET, ErrorKind::NotSupported),
            (er::UNKNOWN_STORAGE_ENGINE, ErrorKind::NotSupported),
            (999, ErrorKind::Internal),
            (-1, ErrorKind::Internal),
            (1045, ErrorKind::Operational),
            (cr::SERVER_GONE_ERROR, ErrorKind::Operational),
        ];
        for (code, kind) in cases {
            assert_eq!(ErrorKind::classify(code), kind, "code {code}");
        }
    }

    #[test]
    fn classification_is_stable() {
        for code in [0, 500, 1062, 1064, 1146, 1264, 1235, 2006, 2014] {
            let first = ErrorKind::classify(code);
            for _ in 0..3 {
                assert_eq!(ErrorKind::classify(code), first);
            }
        }
    }

    #[test]
    fn every_table_code_has_one_kind() {
        let programming = [
            cr::COMMANDS_OUT_OF_SYNC,
            er::DB_CREATE_EXISTS,
            er::SYNTAX_ERROR,
            er::PARSE_ERROR,
            er::NO_SUCH_TABLE,
            er::WRONG_DB_NAME,
            er::WRONG_TABLE_NAME,
            er::FIELD_SPECIFIED_TWICE,
            er::INVALID_GROUP_FUNC_USE,
            er::UNSUPPORTED_EXTENSION,
            er::TABLE_MUST_HAVE_COLUMNS,
            er::CANT_DO_THIS_DURING_AN_TRANSACTION,
        ];
        let integrity = [
            er::DUP_ENTRY,
            er::DUP_UNIQUE,
            er::NO_REFERENCED_ROW,
            er::NO_REFERENCED_ROW_2,
            er::ROW_IS_REFERENCED,
            er::ROW_IS_REFERENCED_2,
            er::CANNOT_ADD_FOREIGN,
            er::NO_DEFAULT_FOR_FIELD,
        ];
        assert!(
            programming
                .iter()
                .all(|c| ErrorKind::classify(*c) == ErrorKind::Programming)
        );
        assert!(
            integrity
                .iter()
                .all(|c| ErrorKind::classify(*c) == ErrorKind::Integrity)
        );
        assert!(programming.iter().all(|c| !integrity.contains(c)));
    }

    #[test]
    fn from_native_keeps_code_and_message() {
        let err = Error::from(DatabaseError::from_native(
            er::DUP_ENTRY,
            "Duplicate entry '1' for key 'PRIMARY'",
            Some("23000".to_string()),
        ));
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert_eq!(err.code(), Some(1062));
        assert_eq!(err.sqlstate(), Some("23000"));
        assert_eq!(
            err.args(),
            (1062, "Duplicate entry '1' for key 'PRIMARY'".to_string())
        );
        assert_eq!(
            err.to_string(),
            "IntegrityError (1062, SQLSTATE 23000): Duplicate entry '1' for key 'PRIMARY'"
        );
    }

    #[test]
    fn empty_sqlstate_is_dropped() {
        let err = DatabaseError::from_native(2006, "MySQL server has gone away", None);
        assert!(err.sqlstate.is_none());
        let err = DatabaseError::from_native(0, "", Some("00000".to_string()));
        assert!(err.sqlstate.is_none());
        assert_eq!(err.kind, ErrorKind::Interface);
    }

    #[test]
    fn non_native_kinds() {
        assert_eq!(Error::conversion("bad int").kind(), ErrorKind::Data);
        assert_eq!(Error::config("bad url").kind(), ErrorKind::Interface);
        assert_eq!(Error::config("bad url").code(), None);
        let err: Error = DatabaseError::not_initialized().into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.code(), Some(-1));
    }

    #[test]
    fn connection_error_codes() {
        let lost: Error =
            DatabaseError::from_native(cr::SERVER_LOST, "Lost connection", None).into();
        assert!(lost.is_connection_error());
        let dup: Error = DatabaseError::from_native(er::DUP_ENTRY, "dup", None).into();
        assert!(!dup.is_connection_error());
    }
}
