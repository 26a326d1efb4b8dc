//! Numeric constants shared with the MySQL C client library.

/// Client-side error codes (`CR_*`, errmsg.h).
pub mod cr {
    pub const MIN_ERROR: i32 = 2000;
    pub const MAX_ERROR: i32 = 2999;
    pub const UNKNOWN_ERROR: i32 = 2000;
    pub const SOCKET_CREATE_ERROR: i32 = 2001;
    pub const CONNECTION_ERROR: i32 = 2002;
    pub const CONN_HOST_ERROR: i32 = 2003;
    pub const IPSOCK_ERROR: i32 = 2004;
    pub const UNKNOWN_HOST: i32 = 2005;
    pub const SERVER_GONE_ERROR: i32 = 2006;
    pub const VERSION_ERROR: i32 = 2007;
    pub const OUT_OF_MEMORY: i32 = 2008;
    pub const WRONG_HOST_INFO: i32 = 2009;
    pub const LOCALHOST_CONNECTION: i32 = 2010;
    pub const TCP_CONNECTION: i32 = 2011;
    pub const SERVER_HANDSHAKE_ERR: i32 = 2012;
    pub const SERVER_LOST: i32 = 2013;
    pub const COMMANDS_OUT_OF_SYNC: i32 = 2014;
    pub const NAMEDPIPE_CONNECTION: i32 = 2015;
    pub const CANT_READ_CHARSET: i32 = 2019;
    pub const NET_PACKET_TOO_LARGE: i32 = 2020;
    pub const SSL_CONNECTION_ERROR: i32 = 2026;
    pub const MALFORMED_PACKET: i32 = 2027;
    pub const SERVER_LOST_EXTENDED: i32 = 2055;
}

/// Server error codes (`ER_*`, mysqld_error.h) used by the classifier.
pub mod er {
    pub const DB_CREATE_EXISTS: i32 = 1007;
    pub const ACCESS_DENIED_ERROR: i32 = 1045;
    pub const BAD_DB_ERROR: i32 = 1049;
    pub const DUP_ENTRY: i32 = 1062;
    pub const PARSE_ERROR: i32 = 1064;
    pub const WRONG_DB_NAME: i32 = 1102;
    pub const WRONG_TABLE_NAME: i32 = 1103;
    pub const FIELD_SPECIFIED_TWICE: i32 = 1110;
    pub const INVALID_GROUP_FUNC_USE: i32 = 1111;
    pub const UNSUPPORTED_EXTENSION: i32 = 1112;
    pub const TABLE_MUST_HAVE_COLUMNS: i32 = 1113;
    pub const NO_SUCH_TABLE: i32 = 1146;
    pub const SYNTAX_ERROR: i32 = 1149;
    pub const DUP_UNIQUE: i32 = 1169;
    pub const PRIMARY_CANT_HAVE_NULL: i32 = 1171;
    pub const CANT_DO_THIS_DURING_AN_TRANSACTION: i32 = 1179;
    pub const WARNING_NOT_COMPLETE_ROLLBACK: i32 = 1196;
    pub const CANNOT_ADD_FOREIGN: i32 = 1215;
    pub const NO_REFERENCED_ROW: i32 = 1216;
    pub const ROW_IS_REFERENCED: i32 = 1217;
    pub const NO_DEFAULT: i32 = 1230;
    pub const NOT_SUPPORTED_YET: i32 = 1235;
    pub const WARN_NULL_TO_NOTNULL: i32 = 1263;
    pub const WARN_DATA_OUT_OF_RANGE: i32 = 1264;
    pub const WARN_DATA_TRUNCATED: i32 = 1265;
    pub const UNKNOWN_STORAGE_ENGINE: i32 = 1286;
    pub const FEATURE_DISABLED: i32 = 1289;
    pub const NO_DEFAULT_FOR_FIELD: i32 = 1364;
    pub const DATA_TOO_LONG: i32 = 1406;
    pub const DATETIME_FUNCTION_OVERFLOW: i32 = 1441;
    pub const ROW_IS_REFERENCED_2: i32 = 1451;
    pub const NO_REFERENCED_ROW_2: i32 = 1452;
}

/// Client capability flags passed to `mysql_real_connect`.
pub mod client {
    pub const LONG_PASSWORD: u64 = 1;
    pub const FOUND_ROWS: u64 = 2;
    pub const LONG_FLAG: u64 = 4;
    pub const CONNECT_WITH_DB: u64 = 8;
    pub const NO_SCHEMA: u64 = 16;
    pub const COMPRESS: u64 = 32;
    pub const ODBC: u64 = 64;
    pub const LOCAL_FILES: u64 = 128;
    pub const IGNORE_SPACE: u64 = 256;
    pub const PROTOCOL_41: u64 = 512;
    pub const INTERACTIVE: u64 = 1024;
    pub const SSL: u64 = 2048;
    pub const IGNORE_SIGPIPE: u64 = 4096;
    pub const TRANSACTIONS: u64 = 8192;
    pub const SECURE_CONNECTION: u64 = 32768;
    pub const MULTI_STATEMENTS: u64 = 1 << 16;
    pub const MULTI_RESULTS: u64 = 1 << 17;
    pub const PS_MULTI_RESULTS: u64 = 1 << 18;
}

/// Server status bits reported after each command.
pub mod server_status {
    pub const IN_TRANS: u32 = 0x0001;
    pub const AUTOCOMMIT: u32 = 0x0002;
    pub const MORE_RESULTS_EXISTS: u32 = 0x0008;
    pub const NO_GOOD_INDEX_USED: u32 = 0x0010;
    pub const NO_INDEX_USED: u32 = 0x0020;
    pub const CURSOR_EXISTS: u32 = 0x0040;
    pub const LAST_ROW_SENT: u32 = 0x0080;
    pub const DB_DROPPED: u32 = 0x0100;
    pub const NO_BACKSLASH_ESCAPES: u32 = 0x0200;
}

/// Arguments to `mysql_set_server_option`.
pub mod server_option {
    pub const MULTI_STATEMENTS_ON: u32 = 0;
    pub const MULTI_STATEMENTS_OFF: u32 = 1;
}

/// Charset number the server uses for binary (non-text) columns.
pub const BINARY_CHARSET_NR: u32 = 63;

/// Values for the `ssl_mode` connect option (`SSL_MODE_*`).
pub mod ssl_mode {
    pub const DISABLED: u32 = 1;
    pub const PREFERRED: u32 = 2;
    pub const REQUIRED: u32 = 3;
    pub const VERIFY_CA: u32 = 4;
    pub const VERIFY_IDENTITY: u32 = 5;
}
