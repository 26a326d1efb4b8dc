//! Low-level FFI bindings to libmysqlclient.
//!
//! These bindings are manually written to provide full control over the
//! interface. We only expose what the driver calls. Linking is handled by
//! `mysqlclient-sys`.

#![allow(non_camel_case_types)]
#![allow(clippy::upper_case_acronyms)]

use std::ffi::{c_char, c_int, c_uint, c_ulong, c_void};

// Pull in mysqlclient-sys for its link directives only.
use mysqlclient_sys as _;

/// Opaque connection handle.
#[repr(C)]
pub struct MYSQL {
    _private: [u8; 0],
}

/// Opaque result-set handle.
#[repr(C)]
pub struct MYSQL_RES {
    _private: [u8; 0],
}

/// Row: an array of `mysql_num_fields` column pointers.
pub type MYSQL_ROW = *mut *mut c_char;

/// `my_bool` in the 5.x headers, `bool` since 8.0; one byte either way.
pub type my_bool = c_char;

/// Column metadata. The layout is stable since MySQL 4.1.
#[repr(C)]
pub struct MYSQL_FIELD {
    pub name: *mut c_char,
    pub org_name: *mut c_char,
    pub table: *mut c_char,
    pub org_table: *mut c_char,
    pub db: *mut c_char,
    pub catalog: *mut c_char,
    pub def: *mut c_char,
    pub length: c_ulong,
    pub max_length: c_ulong,
    pub name_length: c_uint,
    pub org_name_length: c_uint,
    pub table_length: c_uint,
    pub org_table_length: c_uint,
    pub db_length: c_uint,
    pub catalog_length: c_uint,
    pub def_length: c_uint,
    pub flags: c_uint,
    pub decimals: c_uint,
    pub charsetnr: c_uint,
    pub type_: c_int,
    pub extension: *mut c_void,
}

/// `MY_CHARSET_INFO`.
#[repr(C)]
pub struct MY_CHARSET_INFO {
    pub number: c_uint,
    pub state: c_uint,
    pub csname: *const c_char,
    pub name: *const c_char,
    pub comment: *const c_char,
    pub dir: *const c_char,
    pub mbminlen: c_uint,
    pub mbmaxlen: c_uint,
}

// enum mysql_option; values 0..=13 are the same in every client library
pub const MYSQL_OPT_CONNECT_TIMEOUT: c_int = 0;
pub const MYSQL_OPT_COMPRESS: c_int = 1;
pub const MYSQL_OPT_NAMED_PIPE: c_int = 2;
pub const MYSQL_INIT_COMMAND: c_int = 3;
pub const MYSQL_READ_DEFAULT_FILE: c_int = 4;
pub const MYSQL_READ_DEFAULT_GROUP: c_int = 5;
pub const MYSQL_SET_CHARSET_DIR: c_int = 6;
pub const MYSQL_SET_CHARSET_NAME: c_int = 7;
pub const MYSQL_OPT_LOCAL_INFILE: c_int = 8;
pub const MYSQL_OPT_PROTOCOL: c_int = 9;
pub const MYSQL_SHARED_MEMORY_BASE_NAME: c_int = 10;
pub const MYSQL_OPT_READ_TIMEOUT: c_int = 11;
pub const MYSQL_OPT_WRITE_TIMEOUT: c_int = 12;
/// Read/write timeouts first appeared in 4.1.1.
pub const MIN_TIMEOUT_CLIENT_VERSION: u64 = 40_101;
pub const MYSQL_OPT_USE_RESULT: c_int = 13;

/// Values from the MySQL 8.0+ headers.
pub mod mysql8 {
    use std::ffi::c_int;

    pub const MIN_CLIENT_VERSION: u64 = 80_000;
    pub const MAX_CLIENT_VERSION: u64 = 99_999;

    pub const MYSQL_OPT_RECONNECT: c_int = 15;
    pub const MYSQL_OPT_SSL_KEY: c_int = 19;
    pub const MYSQL_OPT_SSL_CERT: c_int = 20;
    pub const MYSQL_OPT_SSL_CA: c_int = 21;
    pub const MYSQL_OPT_SSL_CAPATH: c_int = 22;
    pub const MYSQL_OPT_SSL_CIPHER: c_int = 23;
    pub const MYSQL_OPT_SSL_MODE: c_int = 35;
}

unsafe extern "C" {
    // Library lifecycle
    pub fn mysql_server_init(
        argc: c_int,
        argv: *mut *mut c_char,
        groups: *mut *mut c_char,
    ) -> c_int;
    pub fn mysql_get_client_info() -> *const c_char;
    pub fn mysql_get_client_version() -> c_ulong;
    pub fn mysql_thread_safe() -> c_uint;

    // Connection lifecycle
    pub fn mysql_init(mysql: *mut MYSQL) -> *mut MYSQL;
    pub fn mysql_options(mysql: *mut MYSQL, option: c_int, arg: *const c_void) -> c_int;
    pub fn mysql_real_connect(
        mysql: *mut MYSQL,
        host: *const c_char,
        user: *const c_char,
        passwd: *const c_char,
        db: *const c_char,
        port: c_uint,
        unix_socket: *const c_char,
        client_flag: c_ulong,
    ) -> *mut MYSQL;
    pub fn mysql_close(mysql: *mut MYSQL);

    // Statements
    pub fn mysql_real_query(mysql: *mut MYSQL, q: *const c_char, length: c_ulong) -> c_int;
    pub fn mysql_send_query(mysql: *mut MYSQL, q: *const c_char, length: c_ulong) -> c_int;
    pub fn mysql_read_query_result(mysql: *mut MYSQL) -> my_bool;
    pub fn mysql_store_result(mysql: *mut MYSQL) -> *mut MYSQL_RES;
    pub fn mysql_use_result(mysql: *mut MYSQL) -> *mut MYSQL_RES;
    pub fn mysql_more_results(mysql: *mut MYSQL) -> my_bool;
    pub fn mysql_next_result(mysql: *mut MYSQL) -> c_int;

    // Session
    pub fn mysql_ping(mysql: *mut MYSQL) -> c_int;
    pub fn mysql_autocommit(mysql: *mut MYSQL, mode: my_bool) -> my_bool;
    pub fn mysql_commit(mysql: *mut MYSQL) -> my_bool;
    pub fn mysql_rollback(mysql: *mut MYSQL) -> my_bool;
    pub fn mysql_select_db(mysql: *mut MYSQL, db: *const c_char) -> c_int;
    pub fn mysql_change_user(
        mysql: *mut MYSQL,
        user: *const c_char,
        passwd: *const c_char,
        db: *const c_char,
    ) -> my_bool;
    pub fn mysql_stat(mysql: *mut MYSQL) -> *const c_char;
    pub fn mysql_dump_debug_info(mysql: *mut MYSQL) -> c_int;
    pub fn mysql_set_server_option(mysql: *mut MYSQL, option: c_int) -> c_int;
    pub fn mysql_set_character_set(mysql: *mut MYSQL, csname: *const c_char) -> c_int;
    pub fn mysql_character_set_name(mysql: *mut MYSQL) -> *const c_char;
    pub fn mysql_get_character_set_info(mysql: *mut MYSQL, charset: *mut MY_CHARSET_INFO);

    // Introspection
    pub fn mysql_affected_rows(mysql: *mut MYSQL) -> u64;
    pub fn mysql_insert_id(mysql: *mut MYSQL) -> u64;
    pub fn mysql_field_count(mysql: *mut MYSQL) -> c_uint;
    pub fn mysql_warning_count(mysql: *mut MYSQL) -> c_uint;
    pub fn mysql_info(mysql: *mut MYSQL) -> *const c_char;
    pub fn mysql_sqlstate(mysql: *mut MYSQL) -> *const c_char;
    pub fn mysql_errno(mysql: *mut MYSQL) -> c_uint;
    pub fn mysql_error(mysql: *mut MYSQL) -> *const c_char;
    pub fn mysql_thread_id(mysql: *mut MYSQL) -> c_ulong;
    pub fn mysql_get_server_info(mysql: *mut MYSQL) -> *const c_char;
    pub fn mysql_get_host_info(mysql: *mut MYSQL) -> *const c_char;
    pub fn mysql_get_proto_info(mysql: *mut MYSQL) -> c_uint;
    pub fn mysql_real_escape_string(
        mysql: *mut MYSQL,
        to: *mut c_char,
        from: *const c_char,
        length: c_ulong,
    ) -> c_ulong;

    // Results
    pub fn mysql_free_result(result: *mut MYSQL_RES);
    pub fn mysql_num_fields(result: *mut MYSQL_RES) -> c_uint;
    pub fn mysql_num_rows(result: *mut MYSQL_RES) -> u64;
    pub fn mysql_fetch_fields(result: *mut MYSQL_RES) -> *mut MYSQL_FIELD;
    pub fn mysql_fetch_row(result: *mut MYSQL_RES) -> MYSQL_ROW;
    pub fn mysql_fetch_lengths(result: *mut MYSQL_RES) -> *mut c_ulong;
    pub fn mysql_data_seek(result: *mut MYSQL_RES, offset: u64);
}
