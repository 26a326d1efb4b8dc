//! The libmysqlclient backend.
//!
//! [`LibMysql`] owns one `MYSQL*` from `mysql_init(NULL)` and maps every
//! [`NativeClient`] method onto the matching `mysql_*` call. All access is
//! serialized by the [`Connection`](crate::Connection) mutex, so none of the
//! calls here race.

#![allow(clippy::cast_possible_truncation)] // c_ulong / c_uint <-> u64 / u32 / usize

use crate::config::{ConnectOptions, SslOptions, timeout_secs};
use crate::ffi;
use crate::native::{CharsetInfo, NativeClient, NativeError, NativeResult, RawRow};
use mysqlbind_core::constants::{cr, server_status};
use mysqlbind_core::{DatabaseError, Error, FieldDescriptor};
use std::ffi::{CStr, CString, c_char, c_int, c_uint, c_ulong, c_void};
use std::ptr;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

static LIBRARY_INIT: Once = Once::new();
static LIBRARY_READY: AtomicBool = AtomicBool::new(false);

/// Run `mysql_server_init` once per process.
fn library_init() -> Result<(), Error> {
    LIBRARY_INIT.call_once(|| {
        // SAFETY: argc 0 with null argv/groups is the documented "no
        // embedded server arguments" form.
        let rc = unsafe { ffi::mysql_server_init(0, ptr::null_mut(), ptr::null_mut()) };
        if rc == 0 {
            LIBRARY_READY.store(true, Ordering::Release);
        } else {
            tracing::error!(rc, "mysql_server_init failed");
        }
    });
    if LIBRARY_READY.load(Ordering::Acquire) {
        Ok(())
    } else {
        Err(DatabaseError::not_initialized().into())
    }
}

/// Copy a C string owned by the library. Null becomes `None`.
///
/// # Safety
///
/// `p` must be null or point at a NUL-terminated string.
unsafe fn opt_string(p: *const c_char) -> Option<String> {
    if p.is_null() {
        None
    } else {
        // SAFETY: non-null and NUL-terminated per the caller.
        Some(unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned())
    }
}

/// Copy `len` bytes of a field-metadata string.
///
/// # Safety
///
/// `p` must be null or valid for `len` bytes.
unsafe fn lossy(p: *const c_char, len: c_uint) -> String {
    if p.is_null() || len == 0 {
        return String::new();
    }
    // SAFETY: valid for `len` bytes per the caller.
    let bytes = unsafe { std::slice::from_raw_parts(p.cast::<u8>(), len as usize) };
    String::from_utf8_lossy(bytes).into_owned()
}

fn c_string(name: &str, value: &str) -> Result<CString, Error> {
    CString::new(value).map_err(|_| Error::config(format!("{} contains a NUL byte", name)))
}

fn opt_c_string(name: &str, value: Option<&str>) -> Result<Option<CString>, Error> {
    value.map(|v| c_string(name, v)).transpose()
}

fn opt_ptr(value: Option<&CString>) -> *const c_char {
    value.map_or(ptr::null(), |c| c.as_ptr())
}

/// Options whose `mysql_option` number changed across client generations
/// are only set when the linked library uses the numbering we know.
fn require_mysql8(what: &str) -> Result<(), Error> {
    let version = LibMysql::client_version();
    if (ffi::mysql8::MIN_CLIENT_VERSION..=ffi::mysql8::MAX_CLIENT_VERSION).contains(&version) {
        Ok(())
    } else {
        Err(DatabaseError::not_supported(format!(
            "{} is not supported by client library version {}",
            what, version
        ))
        .into())
    }
}

fn require_timeouts() -> Result<(), Error> {
    let version = LibMysql::client_version();
    if version >= ffi::MIN_TIMEOUT_CLIENT_VERSION {
        Ok(())
    } else {
        Err(DatabaseError::not_supported(format!(
            "read/write timeouts are not supported by client library version {}",
            version
        ))
        .into())
    }
}

fn double_quotes(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    for &b in input {
        if b == b'\'' {
            out.push(b'\'');
        }
        out.push(b);
    }
    out
}

/// A libmysqlclient connection handle.
pub struct LibMysql {
    handle: *mut ffi::MYSQL,
    closed: bool,
    /// `mysql_*` exposes no server status accessor, so the autocommit bit
    /// is tracked from the session instead.
    autocommit: bool,
}

// SAFETY: a MYSQL handle may move between threads as long as only one
// thread uses it at a time; `Connection` serializes every call.
unsafe impl Send for LibMysql {}

impl LibMysql {
    fn last_error(&self) -> NativeError {
        // SAFETY: `handle` is a live MYSQL from mysql_init.
        unsafe { handle_error(self.handle) }
    }

    fn check(&self, rc: c_int) -> Result<(), NativeError> {
        if rc == 0 { Ok(()) } else { Err(self.last_error()) }
    }

    fn check_bool(&self, rc: ffi::my_bool) -> Result<(), NativeError> {
        if rc == 0 { Ok(()) } else { Err(self.last_error()) }
    }

    /// `mysql_options` with a pointer argument.
    fn set_option(&mut self, name: &str, option: c_int, arg: *const c_void) -> Result<(), Error> {
        // SAFETY: `handle` is live and not yet connected; `arg` points at a
        // value of the type the option expects, or is null for flag options.
        let rc = unsafe { ffi::mysql_options(self.handle, option, arg) };
        if rc == 0 {
            Ok(())
        } else {
            let msg = format!("client library rejected option {}", name);
            Err(DatabaseError::not_supported(msg).into())
        }
    }

    fn set_string_option(&mut self, name: &str, option: c_int, value: &str) -> Result<(), Error> {
        let value = c_string(name, value)?;
        // mysql_options copies string arguments.
        self.set_option(name, option, value.as_ptr().cast())
    }

    fn set_uint_option(&mut self, name: &str, option: c_int, value: c_uint) -> Result<(), Error> {
        self.set_option(name, option, ptr::from_ref(&value).cast())
    }

    fn apply_options(&mut self, options: &ConnectOptions) -> Result<(), Error> {
        if let Some(secs) = timeout_secs("connect_timeout", options.connect_timeout)? {
            self.set_uint_option("connect_timeout", ffi::MYSQL_OPT_CONNECT_TIMEOUT, secs)?;
        }
        if options.read_timeout.is_some() || options.write_timeout.is_some() {
            require_timeouts()?;
        }
        if let Some(secs) = timeout_secs("read_timeout", options.read_timeout)? {
            self.set_uint_option("read_timeout", ffi::MYSQL_OPT_READ_TIMEOUT, secs)?;
        }
        if let Some(secs) = timeout_secs("write_timeout", options.write_timeout)? {
            self.set_uint_option("write_timeout", ffi::MYSQL_OPT_WRITE_TIMEOUT, secs)?;
        }
        if options.compress {
            self.set_option("compress", ffi::MYSQL_OPT_COMPRESS, ptr::null())?;
        }
        if options.named_pipe {
            self.set_option("named_pipe", ffi::MYSQL_OPT_NAMED_PIPE, ptr::null())?;
        }
        if let Some(sql) = &options.init_command {
            self.set_string_option("init_command", ffi::MYSQL_INIT_COMMAND, sql)?;
        }
        if let Some(path) = &options.read_default_file {
            self.set_string_option("read_default_file", ffi::MYSQL_READ_DEFAULT_FILE, path)?;
        }
        if let Some(group) = &options.read_default_group {
            self.set_string_option("read_default_group", ffi::MYSQL_READ_DEFAULT_GROUP, group)?;
        }
        if let Some(charset) = &options.charset {
            self.set_string_option("charset", ffi::MYSQL_SET_CHARSET_NAME, charset)?;
        }
        if let Some(enabled) = options.local_infile {
            let flag = c_uint::from(enabled);
            self.set_uint_option("local_infile", ffi::MYSQL_OPT_LOCAL_INFILE, flag)?;
        }
        if let Some(ssl) = options.ssl.as_ref().filter(|s| !s.is_empty()) {
            self.apply_ssl(ssl)?;
        }
        if let Some(mode) = options.ssl_mode {
            require_mysql8("ssl_mode")?;
            self.set_uint_option("ssl_mode", ffi::mysql8::MYSQL_OPT_SSL_MODE, mode.native())?;
        }
        if let Some(reconnect) = options.reconnect {
            self.set_reconnect(reconnect)?;
        }
        Ok(())
    }

    fn apply_ssl(&mut self, ssl: &SslOptions) -> Result<(), Error> {
        require_mysql8("ssl")?;
        let entries = [
            ("ssl.key", ffi::mysql8::MYSQL_OPT_SSL_KEY, &ssl.key),
            ("ssl.cert", ffi::mysql8::MYSQL_OPT_SSL_CERT, &ssl.cert),
            ("ssl.ca", ffi::mysql8::MYSQL_OPT_SSL_CA, &ssl.ca),
            ("ssl.capath", ffi::mysql8::MYSQL_OPT_SSL_CAPATH, &ssl.capath),
            ("ssl.cipher", ffi::mysql8::MYSQL_OPT_SSL_CIPHER, &ssl.cipher),
        ];
        for (name, option, value) in entries {
            if let Some(value) = value {
                self.set_string_option(name, option, value)?;
            }
        }
        Ok(())
    }

    /// Read `@@autocommit` right after connecting; `init_command` or the
    /// server's `autocommit` variable may have turned it off.
    fn load_autocommit(&mut self) -> Result<(), NativeError> {
        self.real_query(b"SELECT @@autocommit")?;
        let Some(mut res) = self.store_result()? else {
            return Ok(());
        };
        if let Some(row) = res.fetch_row()? {
            self.autocommit = matches!(row.first(), Some(Some(v)) if v.as_slice() != b"0");
        }
        Ok(())
    }

    fn result(&mut self, streaming: bool) -> Result<Option<LibMysqlResult>, NativeError> {
        // SAFETY: `handle` is a live connected MYSQL.
        let res = unsafe {
            if streaming {
                ffi::mysql_use_result(self.handle)
            } else {
                ffi::mysql_store_result(self.handle)
            }
        };
        if !res.is_null() {
            return Ok(Some(LibMysqlResult::new(self.handle, res, streaming)));
        }
        // Null with no columns expected means the statement had no result set.
        // SAFETY: as above.
        if unsafe { ffi::mysql_field_count(self.handle) } == 0 {
            Ok(None)
        } else {
            Err(self.last_error())
        }
    }

    fn string_getter(&self, f: unsafe extern "C" fn(*mut ffi::MYSQL) -> *const c_char) -> String {
        // SAFETY: `handle` is live; the getters return library-owned strings.
        unsafe { opt_string(f(self.handle)) }.unwrap_or_default()
    }
}

impl Drop for LibMysql {
    fn drop(&mut self) {
        if !self.closed {
            self.close();
        }
    }
}

impl NativeClient for LibMysql {
    type Result = LibMysqlResult;

    fn connect(options: &ConnectOptions) -> Result<Self, Error> {
        library_init()?;
        // SAFETY: a null argument asks the library to allocate the handle.
        let handle = unsafe { ffi::mysql_init(ptr::null_mut()) };
        if handle.is_null() {
            let err = DatabaseError::from_native(
                cr::OUT_OF_MEMORY,
                "MySQL client ran out of memory",
                None,
            );
            return Err(err.into());
        }
        // From here on Drop releases the handle on every error path.
        let mut client = LibMysql {
            handle,
            closed: false,
            autocommit: true,
        };
        client.apply_options(options)?;

        let host = opt_c_string("host", options.host.as_deref())?;
        let user = opt_c_string("user", options.user.as_deref())?;
        let password = opt_c_string("password", options.password.as_deref())?;
        let database = opt_c_string("database", options.database.as_deref())?;
        let socket = opt_c_string("unix_socket", options.unix_socket.as_deref())?;

        // SAFETY: every pointer is null or a NUL-terminated string that
        // outlives the call.
        let connected = unsafe {
            ffi::mysql_real_connect(
                client.handle,
                opt_ptr(host.as_ref()),
                opt_ptr(user.as_ref()),
                opt_ptr(password.as_ref()),
                opt_ptr(database.as_ref()),
                c_uint::from(options.port),
                opt_ptr(socket.as_ref()),
                options.capability_flags() as c_ulong,
            )
        };
        if connected.is_null() {
            return Err(client.last_error().into());
        }
        if let Err(err) = client.load_autocommit() {
            tracing::warn!(code = err.code, "could not read @@autocommit; assuming on");
        }
        Ok(client)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        // SAFETY: `handle` came from mysql_init(NULL) and is closed once.
        unsafe { ffi::mysql_close(self.handle) };
        self.handle = ptr::null_mut();
        self.closed = true;
    }

    fn real_query(&mut self, sql: &[u8]) -> Result<(), NativeError> {
        // SAFETY: `sql` is valid for its length; embedded NULs are allowed.
        let rc = unsafe {
            ffi::mysql_real_query(self.handle, sql.as_ptr().cast(), sql.len() as c_ulong)
        };
        self.check(rc)
    }

    fn send_query(&mut self, sql: &[u8]) -> Result<(), NativeError> {
        // SAFETY: as in real_query.
        let rc = unsafe {
            ffi::mysql_send_query(self.handle, sql.as_ptr().cast(), sql.len() as c_ulong)
        };
        self.check(rc)
    }

    fn read_query_result(&mut self) -> Result<(), NativeError> {
        // SAFETY: `handle` is live.
        let rc = unsafe { ffi::mysql_read_query_result(self.handle) };
        self.check_bool(rc)
    }

    fn store_result(&mut self) -> Result<Option<LibMysqlResult>, NativeError> {
        self.result(false)
    }

    fn use_result(&mut self) -> Result<Option<LibMysqlResult>, NativeError> {
        self.result(true)
    }

    fn more_results(&self) -> bool {
        // SAFETY: `handle` is live.
        unsafe { ffi::mysql_more_results(self.handle) != 0 }
    }

    fn next_result(&mut self) -> Result<bool, NativeError> {
        // SAFETY: `handle` is live.
        match unsafe { ffi::mysql_next_result(self.handle) } {
            0 => Ok(true),
            -1 => Ok(false),
            _ => Err(self.last_error()),
        }
    }

    fn ping(&mut self) -> Result<(), NativeError> {
        // SAFETY: `handle` is live.
        let rc = unsafe { ffi::mysql_ping(self.handle) };
        self.check(rc)
    }

    fn set_reconnect(&mut self, reconnect: bool) -> Result<(), Error> {
        require_mysql8("reconnect")?;
        let flag = ffi::my_bool::from(reconnect);
        let arg = ptr::from_ref(&flag).cast();
        self.set_option("reconnect", ffi::mysql8::MYSQL_OPT_RECONNECT, arg)
    }

    fn autocommit(&mut self, on: bool) -> Result<(), NativeError> {
        // SAFETY: `handle` is live.
        let rc = unsafe { ffi::mysql_autocommit(self.handle, ffi::my_bool::from(on)) };
        self.check_bool(rc)?;
        self.autocommit = on;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), NativeError> {
        // SAFETY: `handle` is live.
        let rc = unsafe { ffi::mysql_commit(self.handle) };
        self.check_bool(rc)
    }

    fn rollback(&mut self) -> Result<(), NativeError> {
        // SAFETY: `handle` is live.
        let rc = unsafe { ffi::mysql_rollback(self.handle) };
        self.check_bool(rc)
    }

    fn select_db(&mut self, db: &str) -> Result<(), NativeError> {
        let db = CString::new(db).map_err(|_| {
            NativeError::new(cr::UNKNOWN_ERROR, "database name contains a NUL byte")
        })?;
        // SAFETY: `db` is NUL-terminated and outlives the call.
        let rc = unsafe { ffi::mysql_select_db(self.handle, db.as_ptr()) };
        self.check(rc)
    }

    fn change_user(
        &mut self,
        user: &str,
        password: Option<&str>,
        db: Option<&str>,
    ) -> Result<(), NativeError> {
        let nul =
            |_| NativeError::new(cr::UNKNOWN_ERROR, "change_user argument contains a NUL byte");
        let user = CString::new(user).map_err(nul)?;
        let password = password.map(CString::new).transpose().map_err(nul)?;
        let db = db.map(CString::new).transpose().map_err(nul)?;
        // SAFETY: all pointers are null or NUL-terminated and outlive the call.
        let rc = unsafe {
            ffi::mysql_change_user(
                self.handle,
                user.as_ptr(),
                opt_ptr(password.as_ref()),
                opt_ptr(db.as_ref()),
            )
        };
        self.check_bool(rc)
    }

    fn kill(&mut self, thread_id: u64) -> Result<(), NativeError> {
        // mysql_kill is gone from recent client libraries; KILL is not.
        self.real_query(format!("KILL {}", thread_id).as_bytes())
    }

    fn shutdown(&mut self) -> Result<(), NativeError> {
        self.real_query(b"SHUTDOWN")
    }

    fn stat(&mut self) -> Result<String, NativeError> {
        // SAFETY: `handle` is live.
        match unsafe { opt_string(ffi::mysql_stat(self.handle)) } {
            Some(stat) => Ok(stat),
            None => Err(self.last_error()),
        }
    }

    fn dump_debug_info(&mut self) -> Result<(), NativeError> {
        // SAFETY: `handle` is live.
        let rc = unsafe { ffi::mysql_dump_debug_info(self.handle) };
        self.check(rc)
    }

    fn set_server_option(&mut self, option: u32) -> Result<(), NativeError> {
        let option = c_int::try_from(option).map_err(|_| {
            NativeError::new(cr::UNKNOWN_ERROR, format!("unknown server option {}", option))
        })?;
        // SAFETY: `handle` is live.
        let rc = unsafe { ffi::mysql_set_server_option(self.handle, option) };
        self.check(rc)
    }

    fn set_character_set(&mut self, charset: &str) -> Result<(), NativeError> {
        let charset = CString::new(charset).map_err(|_| {
            NativeError::new(cr::CANT_READ_CHARSET, "character set name contains a NUL byte")
        })?;
        // SAFETY: `charset` is NUL-terminated and outlives the call.
        let rc = unsafe { ffi::mysql_set_character_set(self.handle, charset.as_ptr()) };
        self.check(rc)
    }

    fn character_set_name(&self) -> String {
        self.string_getter(ffi::mysql_character_set_name)
    }

    fn character_set_info(&self) -> Result<CharsetInfo, Error> {
        let mut info = ffi::MY_CHARSET_INFO {
            number: 0,
            state: 0,
            csname: ptr::null(),
            name: ptr::null(),
            comment: ptr::null(),
            dir: ptr::null(),
            mbminlen: 0,
            mbmaxlen: 0,
        };
        // SAFETY: `info` is a properly laid out MY_CHARSET_INFO; the
        // library fills it with pointers to static charset data.
        unsafe {
            ffi::mysql_get_character_set_info(self.handle, &mut info);
            Ok(CharsetInfo {
                name: opt_string(info.csname).unwrap_or_default(),
                collation: opt_string(info.name).unwrap_or_default(),
                comment: opt_string(info.comment).filter(|s| !s.is_empty()),
                dir: opt_string(info.dir).filter(|s| !s.is_empty()),
                mbminlen: info.mbminlen,
                mbmaxlen: info.mbmaxlen,
            })
        }
    }

    fn affected_rows(&self) -> u64 {
        // SAFETY: `handle` is live.
        unsafe { ffi::mysql_affected_rows(self.handle) }
    }

    fn insert_id(&self) -> u64 {
        // SAFETY: `handle` is live.
        unsafe { ffi::mysql_insert_id(self.handle) }
    }

    fn field_count(&self) -> u32 {
        // SAFETY: `handle` is live.
        unsafe { ffi::mysql_field_count(self.handle) }
    }

    fn warning_count(&self) -> u32 {
        // SAFETY: `handle` is live.
        unsafe { ffi::mysql_warning_count(self.handle) }
    }

    fn info(&self) -> Option<String> {
        // SAFETY: `handle` is live.
        unsafe { opt_string(ffi::mysql_info(self.handle)) }
    }

    fn sqlstate(&self) -> String {
        self.string_getter(ffi::mysql_sqlstate)
    }

    fn errno(&self) -> u32 {
        // SAFETY: `handle` is live.
        unsafe { ffi::mysql_errno(self.handle) }
    }

    fn error(&self) -> String {
        self.string_getter(ffi::mysql_error)
    }

    fn thread_id(&self) -> u64 {
        // SAFETY: `handle` is live.
        u64::from(unsafe { ffi::mysql_thread_id(self.handle) })
    }

    fn server_info(&self) -> String {
        self.string_getter(ffi::mysql_get_server_info)
    }

    fn host_info(&self) -> String {
        self.string_getter(ffi::mysql_get_host_info)
    }

    fn proto_info(&self) -> u32 {
        // SAFETY: `handle` is live.
        unsafe { ffi::mysql_get_proto_info(self.handle) }
    }

    /// Only `AUTOCOMMIT` and `MORE_RESULTS_EXISTS` are reported.
    fn server_status(&self) -> u32 {
        let mut status = 0;
        if self.autocommit {
            status |= server_status::AUTOCOMMIT;
        }
        if self.more_results() {
            status |= server_status::MORE_RESULTS_EXISTS;
        }
        status
    }

    fn real_escape_string(&self, input: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; input.len() * 2 + 1];
        // SAFETY: `out` holds the worst case of two bytes per input byte
        // plus the terminator.
        let written = unsafe {
            ffi::mysql_real_escape_string(
                self.handle,
                out.as_mut_ptr().cast(),
                input.as_ptr().cast(),
                input.len() as c_ulong,
            )
        };
        if written == c_ulong::MAX {
            // Refused under NO_BACKSLASH_ESCAPES, where only quotes need
            // doubling.
            return double_quotes(input);
        }
        out.truncate(written as usize);
        out
    }

    fn client_info() -> String {
        // SAFETY: returns a static NUL-terminated string.
        unsafe { opt_string(ffi::mysql_get_client_info()) }.unwrap_or_default()
    }

    fn client_version() -> u64 {
        // SAFETY: no preconditions.
        u64::from(unsafe { ffi::mysql_get_client_version() })
    }

    fn thread_safe() -> bool {
        // SAFETY: no preconditions.
        unsafe { ffi::mysql_thread_safe() != 0 }
    }
}

/// A libmysqlclient result set (`MYSQL_RES*`).
pub struct LibMysqlResult {
    /// The owning connection, for error reporting on streaming fetches.
    conn: *mut ffi::MYSQL,
    res: *mut ffi::MYSQL_RES,
    columns: usize,
    streaming: bool,
    position: u64,
}

// SAFETY: the result is only touched while the owning connection's mutex is
// held, and the connection handle outlives it.
unsafe impl Send for LibMysqlResult {}

impl LibMysqlResult {
    fn new(conn: *mut ffi::MYSQL, res: *mut ffi::MYSQL_RES, streaming: bool) -> Self {
        // SAFETY: `res` is a live result from store/use_result.
        let columns = unsafe { ffi::mysql_num_fields(res) } as usize;
        Self {
            conn,
            res,
            columns,
            streaming,
            position: 0,
        }
    }
}

impl NativeResult for LibMysqlResult {
    fn fields(&self) -> Vec<FieldDescriptor> {
        // SAFETY: `mysql_fetch_fields` returns `columns` contiguous entries
        // owned by the result.
        let fields = unsafe {
            let p = ffi::mysql_fetch_fields(self.res);
            if p.is_null() {
                return Vec::new();
            }
            std::slice::from_raw_parts(p, self.columns)
        };
        fields
            .iter()
            .map(|f| {
                // SAFETY: each name pointer is valid for its recorded length.
                unsafe {
                    FieldDescriptor {
                        name: lossy(f.name, f.name_length),
                        org_name: lossy(f.org_name, f.org_name_length),
                        table: lossy(f.table, f.table_length),
                        org_table: lossy(f.org_table, f.org_table_length),
                        db: lossy(f.db, f.db_length),
                        // Every enum_field_types value fits a byte.
                        type_code: u8::try_from(f.type_).unwrap_or(u8::MAX),
                        length: u64::from(f.length),
                        max_length: u64::from(f.max_length),
                        decimals: f.decimals,
                        flags: f.flags,
                        charsetnr: f.charsetnr,
                    }
                }
            })
            .collect()
    }

    fn fetch_row(&mut self) -> Result<Option<RawRow>, NativeError> {
        // SAFETY: `res` is live.
        let row = unsafe { ffi::mysql_fetch_row(self.res) };
        if row.is_null() {
            if self.streaming {
                // SAFETY: the connection outlives its results.
                let err = unsafe { handle_error(self.conn) };
                if err.code != 0 {
                    return Err(err);
                }
            }
            return Ok(None);
        }
        // SAFETY: a non-null row has `columns` cells and matching lengths.
        let raw = unsafe {
            let lengths =
                std::slice::from_raw_parts(ffi::mysql_fetch_lengths(self.res), self.columns);
            let cells = std::slice::from_raw_parts(row, self.columns);
            cells
                .iter()
                .zip(lengths)
                .map(|(&cell, &len)| {
                    (!cell.is_null()).then(|| {
                        std::slice::from_raw_parts(cell.cast::<u8>(), len as usize).to_vec()
                    })
                })
                .collect()
        };
        self.position += 1;
        Ok(Some(raw))
    }

    fn num_rows(&self) -> u64 {
        // SAFETY: `res` is live.
        unsafe { ffi::mysql_num_rows(self.res) }
    }

    fn data_seek(&mut self, row: u64) {
        let row = seek_target(row, self.num_rows());
        // SAFETY: `res` is a live buffered result and `row` is at most its
        // row count, which leaves the cursor exhausted.
        unsafe { ffi::mysql_data_seek(self.res, row) };
        self.position = row;
    }

    fn row_tell(&self) -> u64 {
        self.position
    }
}

/// Rows past the end leave the cursor exhausted, so `row_tell` never
/// reports a position the result does not have.
fn seek_target(row: u64, num_rows: u64) -> u64 {
    row.min(num_rows)
}

/// The error recorded on `handle`, with its SQLSTATE.
///
/// # Safety
///
/// `handle` must be a live MYSQL from mysql_init.
unsafe fn handle_error(handle: *mut ffi::MYSQL) -> NativeError {
    // SAFETY: guaranteed by the caller.
    unsafe {
        let code = ffi::mysql_errno(handle) as i32;
        let message = opt_string(ffi::mysql_error(handle)).unwrap_or_default();
        let mut err = NativeError::new(code, message);
        if let Some(state) = opt_string(ffi::mysql_sqlstate(handle)) {
            err = err.with_sqlstate(state);
        }
        err
    }
}

impl Drop for LibMysqlResult {
    fn drop(&mut self) {
        // SAFETY: `res` is live and freed exactly once.
        unsafe { ffi::mysql_free_result(self.res) };
    }
}
