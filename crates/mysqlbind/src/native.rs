//! The native client surface.
//!
//! [`Connection`](crate::Connection) and [`QueryResult`](crate::QueryResult)
//! only ever talk to the client library through these traits. The real
//! implementation lives in `libmysql` (feature `libmysql`); tests use the
//! in-memory backend in `fake`.

use crate::config::ConnectOptions;
use mysqlbind_core::{DatabaseError, Error, FieldDescriptor};
use serde::{Deserialize, Serialize};

/// A failure reported by the client library: `mysql_errno`,
/// `mysql_error` and `mysql_sqlstate` captured together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    pub code: i32,
    pub message: String,
    pub sqlstate: Option<String>,
}

impl NativeError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            sqlstate: None,
        }
    }

    pub fn with_sqlstate(mut self, sqlstate: impl Into<String>) -> Self {
        self.sqlstate = Some(sqlstate.into());
        self
    }
}

impl From<NativeError> for DatabaseError {
    fn from(err: NativeError) -> Self {
        DatabaseError::from_native(err.code, err.message, err.sqlstate)
    }
}

impl From<NativeError> for Error {
    fn from(err: NativeError) -> Self {
        Error::Database(err.into())
    }
}

/// Character set details (`MY_CHARSET_INFO`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharsetInfo {
    pub name: String,
    pub collation: String,
    pub comment: Option<String>,
    pub dir: Option<String>,
    pub mbminlen: u32,
    pub mbmaxlen: u32,
}

/// One row as the library hands it out: a slot per column, `None` for
/// SQL NULL, the bytes otherwise.
pub type RawRow = Vec<Option<Vec<u8>>>;

/// A native connection handle.
///
/// Methods map one-to-one onto `mysql_*` calls. Callers serialize access;
/// implementations never see two calls at once.
pub trait NativeClient: Send + Sized + 'static {
    /// The result-set handle this client produces.
    type Result: NativeResult;

    /// Apply `options` and open a connection (`mysql_init`,
    /// `mysql_options`, `mysql_real_connect`).
    fn connect(options: &ConnectOptions) -> Result<Self, Error>;

    /// Release the handle (`mysql_close`). Called at most once.
    fn close(&mut self);

    fn real_query(&mut self, sql: &[u8]) -> Result<(), NativeError>;
    fn send_query(&mut self, sql: &[u8]) -> Result<(), NativeError>;
    fn read_query_result(&mut self) -> Result<(), NativeError>;

    /// `Ok(None)` when the last statement produced no result set.
    fn store_result(&mut self) -> Result<Option<Self::Result>, NativeError>;
    fn use_result(&mut self) -> Result<Option<Self::Result>, NativeError>;

    fn more_results(&self) -> bool;
    /// `Ok(true)` when another result is ready, `Ok(false)` when the
    /// statement list is exhausted.
    fn next_result(&mut self) -> Result<bool, NativeError>;

    fn ping(&mut self) -> Result<(), NativeError>;
    /// Toggle automatic reconnection (`MYSQL_OPT_RECONNECT`).
    fn set_reconnect(&mut self, reconnect: bool) -> Result<(), Error>;

    fn autocommit(&mut self, on: bool) -> Result<(), NativeError>;
    fn commit(&mut self) -> Result<(), NativeError>;
    fn rollback(&mut self) -> Result<(), NativeError>;

    fn select_db(&mut self, db: &str) -> Result<(), NativeError>;
    fn change_user(
        &mut self,
        user: &str,
        password: Option<&str>,
        db: Option<&str>,
    ) -> Result<(), NativeError>;
    fn kill(&mut self, thread_id: u64) -> Result<(), NativeError>;
    fn shutdown(&mut self) -> Result<(), NativeError>;
    fn stat(&mut self) -> Result<String, NativeError>;
    fn dump_debug_info(&mut self) -> Result<(), NativeError>;
    fn set_server_option(&mut self, option: u32) -> Result<(), NativeError>;
    fn set_character_set(&mut self, charset: &str) -> Result<(), NativeError>;
    fn character_set_name(&self) -> String;
    fn character_set_info(&self) -> Result<CharsetInfo, Error>;

    /// `u64::MAX` when the last statement failed.
    fn affected_rows(&self) -> u64;
    fn insert_id(&self) -> u64;
    fn field_count(&self) -> u32;
    fn warning_count(&self) -> u32;
    fn info(&self) -> Option<String>;
    fn sqlstate(&self) -> String;
    fn errno(&self) -> u32;
    fn error(&self) -> String;
    fn thread_id(&self) -> u64;
    fn server_info(&self) -> String;
    fn host_info(&self) -> String;
    fn proto_info(&self) -> u32;
    fn server_status(&self) -> u32;

    /// Charset-aware escape (`mysql_real_escape_string`).
    fn real_escape_string(&self, input: &[u8]) -> Vec<u8>;

    /// Version string of the linked client library.
    fn client_info() -> String;
    /// Version of the linked client library as `major*10000 + minor*100 + patch`.
    fn client_version() -> u64;
    fn thread_safe() -> bool;
}

/// A native result-set handle.
pub trait NativeResult: Send + 'static {
    /// Column metadata, in column order.
    fn fields(&self) -> Vec<FieldDescriptor>;
    /// `Ok(None)` once the result set is exhausted.
    fn fetch_row(&mut self) -> Result<Option<RawRow>, NativeError>;
    /// Rows in a buffered result; rows fetched so far in a streaming one.
    fn num_rows(&self) -> u64;
    /// Position a buffered result on row `row`.
    fn data_seek(&mut self, row: u64);
    /// Index of the next row a buffered result will return.
    fn row_tell(&self) -> u64;
}
