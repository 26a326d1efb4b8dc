//! In-memory native backend.
//!
//! `FakeClient` answers scripted statements with scripted result sets and
//! reproduces the library behaviours the binding depends on: one pending
//! result per connection, `CR_COMMANDS_OUT_OF_SYNC` when a command arrives
//! before the previous result was consumed, multi-result statements, and
//! server status bits for transactions.

#![allow(clippy::cast_possible_truncation)]

use crate::config::ConnectOptions;
use crate::native::{CharsetInfo, NativeClient, NativeError, NativeResult, RawRow};
use mysqlbind_core::constants::{BINARY_CHARSET_NR, cr, er, server_option, server_status};
use mysqlbind_core::{DatabaseError, Error, FieldDescriptor, escape_string};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

const CHARSETS: &[(&str, &str, u32)] = &[
    ("utf8mb4", "utf8mb4_0900_ai_ci", 4),
    ("utf8", "utf8_general_ci", 3),
    ("latin1", "latin1_swedish_ci", 1),
    ("ascii", "ascii_general_ci", 1),
    ("binary", "binary", 1),
];

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

/// What the fake server answers to one statement.
#[derive(Debug, Clone)]
pub enum FakeResponse {
    /// A result set.
    Rows {
        fields: Vec<FieldDescriptor>,
        rows: Vec<RawRow>,
    },
    /// A statement without a result set.
    Ok {
        affected_rows: u64,
        insert_id: u64,
        info: Option<String>,
        warnings: u32,
    },
    /// A failing statement.
    Error(NativeError),
}

impl FakeResponse {
    pub fn rows(fields: Vec<FieldDescriptor>, rows: Vec<RawRow>) -> Self {
        FakeResponse::Rows { fields, rows }
    }

    pub fn ok(affected_rows: u64) -> Self {
        FakeResponse::Ok {
            affected_rows,
            insert_id: 0,
            info: None,
            warnings: 0,
        }
    }

    /// A statement without a result set that assigned `insert_id`.
    pub fn inserted(affected_rows: u64, insert_id: u64) -> Self {
        FakeResponse::Ok {
            affected_rows,
            insert_id,
            info: None,
            warnings: 0,
        }
    }
}

/// Build a raw row from text cells; `None` is SQL NULL.
pub fn raw_row(cells: &[Option<&str>]) -> RawRow {
    cells
        .iter()
        .map(|c| c.map(|s| s.as_bytes().to_vec()))
        .collect()
}

/// A scripted native connection.
#[derive(Debug)]
pub struct FakeClient {
    script: HashMap<Vec<u8>, Vec<FakeResponse>>,
    current: Option<FakeResponse>,
    pending: VecDeque<FakeResponse>,
    sent: Option<Vec<u8>>,
    unread: Arc<AtomicBool>,
    fail_next: Option<NativeError>,
    closed: Arc<AtomicBool>,
    gone: bool,
    reconnect: bool,
    status: u32,
    charset: String,
    database: Option<String>,
    user: Option<String>,
    affected_rows: u64,
    insert_id: u64,
    field_count: u32,
    warning_count: u32,
    info: Option<String>,
    last_error: Option<NativeError>,
    thread_id: u64,
    questions: u64,
}

impl Default for FakeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClient {
    pub fn new() -> Self {
        Self {
            script: HashMap::new(),
            current: None,
            pending: VecDeque::new(),
            sent: None,
            unread: Arc::new(AtomicBool::new(false)),
            fail_next: None,
            closed: Arc::new(AtomicBool::new(false)),
            gone: false,
            reconnect: false,
            status: server_status::AUTOCOMMIT,
            charset: "utf8mb4".to_string(),
            database: None,
            user: None,
            affected_rows: 0,
            insert_id: 0,
            field_count: 0,
            warning_count: 0,
            info: None,
            last_error: None,
            thread_id: NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed),
            questions: 0,
        }
    }

    /// Answer `sql` with `response`.
    pub fn script(mut self, sql: impl AsRef<[u8]>, response: FakeResponse) -> Self {
        self.script.insert(sql.as_ref().to_vec(), vec![response]);
        self
    }

    /// Answer `sql` with several results, as a multi-statement would.
    pub fn script_multi(mut self, sql: impl AsRef<[u8]>, responses: Vec<FakeResponse>) -> Self {
        self.script.insert(sql.as_ref().to_vec(), responses);
        self
    }

    /// Make the next command fail with `err`.
    pub fn fail_next(&mut self, err: NativeError) {
        self.fail_next = Some(err);
    }

    /// Simulate the server dropping the connection.
    pub fn disconnect(&mut self) {
        self.gone = true;
    }

    /// A flag that turns true once the handle has been closed.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    pub fn current_database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn current_user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn fail(&mut self, err: NativeError) -> NativeError {
        self.last_error = Some(err.clone());
        err
    }

    /// Common preamble of every command sent to the server.
    fn begin_command(&mut self) -> Result<(), NativeError> {
        if self.unread.load(Ordering::Acquire)
            || matches!(self.current, Some(FakeResponse::Rows { .. }))
            || self.sent.is_some()
        {
            let err = NativeError::new(
                cr::COMMANDS_OUT_OF_SYNC,
                "Commands out of sync; you can't run this command now",
            )
            .with_sqlstate("HY000");
            return Err(self.fail(err));
        }
        if self.gone && !self.reconnect {
            let err = NativeError::new(cr::SERVER_GONE_ERROR, "MySQL server has gone away")
                .with_sqlstate("HY000");
            return Err(self.fail(err));
        }
        if self.gone {
            self.gone = false;
            self.thread_id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(err) = self.fail_next.take() {
            return Err(self.fail(err));
        }
        self.last_error = None;
        self.questions += 1;
        Ok(())
    }

    fn execute(&mut self, sql: &[u8]) -> Result<(), NativeError> {
        self.pending.clear();
        self.current = None;
        self.info = None;
        self.field_count = 0;
        self.warning_count = 0;

        let responses = match self.script.get(sql) {
            Some(responses) => responses.clone(),
            None => vec![self.builtin(sql)],
        };
        self.pending = responses.into();
        self.advance()
    }

    /// Statements the fake understands without a script.
    fn builtin(&mut self, sql: &[u8]) -> FakeResponse {
        let text = String::from_utf8_lossy(sql).trim().to_ascii_uppercase();
        match text.as_str() {
            "BEGIN" | "START TRANSACTION" => {
                self.status |= server_status::IN_TRANS;
                FakeResponse::ok(0)
            }
            "COMMIT" | "ROLLBACK" => {
                self.status &= !server_status::IN_TRANS;
                FakeResponse::ok(0)
            }
            _ => FakeResponse::Error(
                NativeError::new(
                    er::PARSE_ERROR,
                    format!(
                        "You have an error in your SQL syntax near '{}'",
                        String::from_utf8_lossy(sql)
                    ),
                )
                .with_sqlstate("42000"),
            ),
        }
    }

    /// Make the next queued response current.
    fn advance(&mut self) -> Result<(), NativeError> {
        let Some(response) = self.pending.pop_front() else {
            return Ok(());
        };
        if self.pending.is_empty() {
            self.status &= !server_status::MORE_RESULTS_EXISTS;
        } else {
            self.status |= server_status::MORE_RESULTS_EXISTS;
        }
        match response {
            FakeResponse::Error(err) => {
                self.pending.clear();
                self.status &= !server_status::MORE_RESULTS_EXISTS;
                self.affected_rows = u64::MAX;
                Err(self.fail(err))
            }
            FakeResponse::Ok {
                affected_rows,
                insert_id,
                ref info,
                warnings,
            } => {
                self.affected_rows = affected_rows;
                self.insert_id = insert_id;
                self.info.clone_from(info);
                self.warning_count = warnings;
                self.current = Some(response);
                Ok(())
            }
            FakeResponse::Rows { ref fields, .. } => {
                // Unknown until the rows are stored.
                self.affected_rows = u64::MAX;
                self.info = None;
                self.warning_count = 0;
                self.field_count = fields.len() as u32;
                self.current = Some(response);
                Ok(())
            }
        }
    }

    fn take_result(&mut self, streaming: bool) -> Result<Option<FakeResult>, NativeError> {
        if self.unread.load(Ordering::Acquire) {
            let err = NativeError::new(
                cr::COMMANDS_OUT_OF_SYNC,
                "Commands out of sync; you can't run this command now",
            );
            return Err(self.fail(err));
        }
        match self.current.take() {
            Some(FakeResponse::Rows { fields, rows }) => {
                let unread = if streaming {
                    self.unread.store(true, Ordering::Release);
                    Some(Arc::clone(&self.unread))
                } else {
                    self.affected_rows = rows.len() as u64;
                    None
                };
                Ok(Some(FakeResult {
                    fields,
                    rows,
                    pos: 0,
                    streaming,
                    unread,
                }))
            }
            other => {
                self.current = other;
                Ok(None)
            }
        }
    }

    fn simple_command(&mut self) -> Result<(), NativeError> {
        self.begin_command()?;
        self.current = None;
        Ok(())
    }
}

impl NativeClient for FakeClient {
    type Result = FakeResult;

    fn connect(options: &ConnectOptions) -> Result<Self, Error> {
        if let Some(host) = options.host.as_deref().filter(|h| h.ends_with(".invalid")) {
            return Err(DatabaseError::from_native(
                cr::UNKNOWN_HOST,
                format!("Unknown MySQL server host '{}' (-2)", host),
                Some("HY000".to_string()),
            )
            .into());
        }
        let mut client = FakeClient::new();
        client.database.clone_from(&options.database);
        client.user.clone_from(&options.user);
        if let Some(charset) = &options.charset {
            client
                .set_character_set(charset)
                .map_err(Error::from)?;
        }
        client.reconnect = options.reconnect.unwrap_or(false);
        Ok(client)
    }

    fn close(&mut self) {
        self.unread.store(false, Ordering::Release);
        self.closed.store(true, Ordering::Release);
    }

    fn real_query(&mut self, sql: &[u8]) -> Result<(), NativeError> {
        self.begin_command()?;
        self.execute(sql)
    }

    fn send_query(&mut self, sql: &[u8]) -> Result<(), NativeError> {
        self.begin_command()?;
        self.current = None;
        self.sent = Some(sql.to_vec());
        Ok(())
    }

    fn read_query_result(&mut self) -> Result<(), NativeError> {
        let Some(sql) = self.sent.take() else {
            let err = NativeError::new(
                cr::COMMANDS_OUT_OF_SYNC,
                "Commands out of sync; you can't run this command now",
            );
            return Err(self.fail(err));
        };
        self.execute(&sql)
    }

    fn store_result(&mut self) -> Result<Option<FakeResult>, NativeError> {
        self.take_result(false)
    }

    fn use_result(&mut self) -> Result<Option<FakeResult>, NativeError> {
        self.take_result(true)
    }

    fn more_results(&self) -> bool {
        !self.pending.is_empty()
    }

    fn next_result(&mut self) -> Result<bool, NativeError> {
        if self.unread.load(Ordering::Acquire)
            || matches!(self.current, Some(FakeResponse::Rows { .. }))
        {
            let err = NativeError::new(
                cr::COMMANDS_OUT_OF_SYNC,
                "Commands out of sync; you can't run this command now",
            );
            return Err(self.fail(err));
        }
        if self.pending.is_empty() {
            return Ok(false);
        }
        self.current = None;
        self.field_count = 0;
        self.advance()?;
        Ok(true)
    }

    fn ping(&mut self) -> Result<(), NativeError> {
        self.simple_command()
    }

    fn set_reconnect(&mut self, reconnect: bool) -> Result<(), Error> {
        self.reconnect = reconnect;
        Ok(())
    }

    fn autocommit(&mut self, on: bool) -> Result<(), NativeError> {
        self.simple_command()?;
        if on {
            self.status |= server_status::AUTOCOMMIT;
            self.status &= !server_status::IN_TRANS;
        } else {
            self.status &= !server_status::AUTOCOMMIT;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), NativeError> {
        self.simple_command()?;
        self.status &= !server_status::IN_TRANS;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), NativeError> {
        self.simple_command()?;
        self.status &= !server_status::IN_TRANS;
        Ok(())
    }

    fn select_db(&mut self, db: &str) -> Result<(), NativeError> {
        self.simple_command()?;
        if db.is_empty() {
            let err = NativeError::new(er::WRONG_DB_NAME, "Incorrect database name ''")
                .with_sqlstate("42000");
            return Err(self.fail(err));
        }
        self.database = Some(db.to_string());
        Ok(())
    }

    fn change_user(
        &mut self,
        user: &str,
        _password: Option<&str>,
        db: Option<&str>,
    ) -> Result<(), NativeError> {
        self.simple_command()?;
        self.user = Some(user.to_string());
        self.database = db.map(str::to_string);
        self.status = server_status::AUTOCOMMIT;
        Ok(())
    }

    fn kill(&mut self, thread_id: u64) -> Result<(), NativeError> {
        self.simple_command()?;
        if thread_id == self.thread_id {
            self.gone = true;
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), NativeError> {
        self.simple_command()?;
        self.gone = true;
        Ok(())
    }

    fn stat(&mut self) -> Result<String, NativeError> {
        self.simple_command()?;
        Ok(format!(
            "Uptime: 1  Threads: 1  Questions: {}  Slow queries: 0  Opens: 0  \
             Flush tables: 1  Open tables: 0  Queries per second avg: 0.000",
            self.questions
        ))
    }

    fn dump_debug_info(&mut self) -> Result<(), NativeError> {
        self.simple_command()
    }

    fn set_server_option(&mut self, option: u32) -> Result<(), NativeError> {
        self.simple_command()?;
        match option {
            server_option::MULTI_STATEMENTS_ON | server_option::MULTI_STATEMENTS_OFF => Ok(()),
            _ => {
                let err = NativeError::new(1047, "Unknown command").with_sqlstate("08S01");
                Err(self.fail(err))
            }
        }
    }

    fn set_character_set(&mut self, charset: &str) -> Result<(), NativeError> {
        if CHARSETS.iter().any(|(name, ..)| *name == charset) {
            self.charset = charset.to_string();
            Ok(())
        } else {
            let err = NativeError::new(
                cr::CANT_READ_CHARSET,
                format!("Can't initialize character set {}", charset),
            );
            Err(self.fail(err))
        }
    }

    fn character_set_name(&self) -> String {
        self.charset.clone()
    }

    fn character_set_info(&self) -> Result<CharsetInfo, Error> {
        let (name, collation, mbmaxlen) = CHARSETS
            .iter()
            .find(|(name, ..)| *name == self.charset)
            .copied()
            .ok_or_else(|| Error::from(DatabaseError::not_supported("unknown character set")))?;
        Ok(CharsetInfo {
            name: name.to_string(),
            collation: collation.to_string(),
            comment: None,
            dir: None,
            mbminlen: 1,
            mbmaxlen,
        })
    }

    fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    fn insert_id(&self) -> u64 {
        self.insert_id
    }

    fn field_count(&self) -> u32 {
        self.field_count
    }

    fn warning_count(&self) -> u32 {
        self.warning_count
    }

    fn info(&self) -> Option<String> {
        self.info.clone()
    }

    fn sqlstate(&self) -> String {
        self.last_error
            .as_ref()
            .and_then(|e| e.sqlstate.clone())
            .unwrap_or_else(|| "00000".to_string())
    }

    fn errno(&self) -> u32 {
        self.last_error.as_ref().map_or(0, |e| e.code as u32)
    }

    fn error(&self) -> String {
        self.last_error
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_default()
    }

    fn thread_id(&self) -> u64 {
        self.thread_id
    }

    fn server_info(&self) -> String {
        "8.0.36-fake".to_string()
    }

    fn host_info(&self) -> String {
        "Localhost via UNIX socket".to_string()
    }

    fn proto_info(&self) -> u32 {
        10
    }

    fn server_status(&self) -> u32 {
        self.status
    }

    fn real_escape_string(&self, input: &[u8]) -> Vec<u8> {
        if self.status & server_status::NO_BACKSLASH_ESCAPES != 0 {
            let mut out = Vec::with_capacity(input.len());
            for &b in input {
                if b == b'\'' {
                    out.push(b'\'');
                }
                out.push(b);
            }
            out
        } else {
            escape_string(input)
        }
    }

    fn client_info() -> String {
        "8.0.36-fake".to_string()
    }

    fn client_version() -> u64 {
        80036
    }

    fn thread_safe() -> bool {
        true
    }
}

impl FakeClient {
    /// Switch the session to `NO_BACKSLASH_ESCAPES` quoting.
    pub fn set_no_backslash_escapes(&mut self, on: bool) {
        if on {
            self.status |= server_status::NO_BACKSLASH_ESCAPES;
        } else {
            self.status &= !server_status::NO_BACKSLASH_ESCAPES;
        }
    }
}

/// A scripted result set.
#[derive(Debug)]
pub struct FakeResult {
    fields: Vec<FieldDescriptor>,
    rows: Vec<RawRow>,
    pos: usize,
    streaming: bool,
    /// Shared with the client while a streaming result has unread rows.
    unread: Option<Arc<AtomicBool>>,
}

impl FakeResult {
    fn finish(&mut self) {
        if let Some(flag) = self.unread.take() {
            flag.store(false, Ordering::Release);
        }
    }
}

impl NativeResult for FakeResult {
    fn fields(&self) -> Vec<FieldDescriptor> {
        self.fields.clone()
    }

    fn fetch_row(&mut self) -> Result<Option<RawRow>, NativeError> {
        match self.rows.get(self.pos) {
            Some(row) => {
                self.pos += 1;
                Ok(Some(row.clone()))
            }
            None => {
                self.finish();
                Ok(None)
            }
        }
    }

    fn num_rows(&self) -> u64 {
        if self.streaming {
            self.pos as u64
        } else {
            self.rows.len() as u64
        }
    }

    fn data_seek(&mut self, row: u64) {
        self.pos = usize::try_from(row).map_or(self.rows.len(), |r| r.min(self.rows.len()));
    }

    fn row_tell(&self) -> u64 {
        self.pos as u64
    }
}

impl Drop for FakeResult {
    fn drop(&mut self) {
        // mysql_free_result drains whatever the server still has to send
        self.finish();
    }
}

/// A binary column descriptor, for tests that need BLOB semantics.
pub fn binary_field(name: &str, ty: mysqlbind_core::FieldType) -> FieldDescriptor {
    FieldDescriptor::new(name, ty)
        .flags(mysqlbind_core::field::flags::BINARY)
        .charset(BINARY_CHARSET_NR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysqlbind_core::FieldType;

    fn client() -> FakeClient {
        FakeClient::new().script(
            "SELECT id FROM t",
            FakeResponse::rows(
                vec![FieldDescriptor::new("id", FieldType::Long)],
                vec![raw_row(&[Some("1")]), raw_row(&[Some("2")])],
            ),
        )
    }

    #[test]
    fn test_pending_result_blocks_commands() {
        let mut c = client();
        c.real_query(b"SELECT id FROM t").unwrap();
        let err = c.real_query(b"SELECT id FROM t").unwrap_err();
        assert_eq!(err.code, cr::COMMANDS_OUT_OF_SYNC);
        assert!(c.store_result().unwrap().is_some());
        c.real_query(b"SELECT id FROM t").unwrap();
    }

    #[test]
    fn test_streaming_result_blocks_until_drained() {
        let mut c = client();
        c.real_query(b"SELECT id FROM t").unwrap();
        let mut res = c.use_result().unwrap().unwrap();
        assert_eq!(c.ping().unwrap_err().code, cr::COMMANDS_OUT_OF_SYNC);
        while res.fetch_row().unwrap().is_some() {}
        c.ping().unwrap();
    }

    #[test]
    fn test_unknown_statement_is_parse_error() {
        let mut c = FakeClient::new();
        let err = c.real_query(b"SELEKT 1").unwrap_err();
        assert_eq!(err.code, er::PARSE_ERROR);
        assert_eq!(c.errno(), er::PARSE_ERROR as u32);
        assert_eq!(c.sqlstate(), "42000");
    }

    #[test]
    fn test_gone_server() {
        let mut c = FakeClient::new();
        c.disconnect();
        assert_eq!(c.ping().unwrap_err().code, cr::SERVER_GONE_ERROR);
        c.set_reconnect(true).unwrap();
        c.ping().unwrap();
    }

    #[test]
    fn test_buffered_seek() {
        let mut c = client();
        c.real_query(b"SELECT id FROM t").unwrap();
        let mut res = c.store_result().unwrap().unwrap();
        assert_eq!(res.num_rows(), 2);
        res.data_seek(1);
        assert_eq!(res.row_tell(), 1);
        assert_eq!(res.fetch_row().unwrap(), Some(raw_row(&[Some("2")])));
        assert_eq!(res.fetch_row().unwrap(), None);
    }

    #[test]
    fn test_seek_past_end_clamps() {
        let mut c = client();
        c.real_query(b"SELECT id FROM t").unwrap();
        let mut res = c.store_result().unwrap().unwrap();
        res.data_seek(u64::MAX);
        assert_eq!(res.row_tell(), 2);
        assert_eq!(res.fetch_row().unwrap(), None);
        res.data_seek(0);
        assert_eq!(res.fetch_row().unwrap(), Some(raw_row(&[Some("1")])));
    }

    #[test]
    fn test_fail_next_fails_once() {
        let mut c = client();
        c.fail_next(NativeError::new(er::DUP_ENTRY, "Duplicate entry '1'").with_sqlstate("23000"));
        let err = c.real_query(b"SELECT id FROM t").unwrap_err();
        assert_eq!(err.code, er::DUP_ENTRY);
        assert_eq!(c.sqlstate(), "23000");
        c.real_query(b"SELECT id FROM t").unwrap();
        assert_eq!(c.errno(), 0);
    }

    #[test]
    fn test_session_switches() {
        let mut c = FakeClient::new();
        assert_eq!(c.current_database(), None);
        c.select_db("shop").unwrap();
        assert_eq!(c.current_database(), Some("shop"));
        assert_eq!(c.select_db("").unwrap_err().code, er::WRONG_DB_NAME);
        c.change_user("report", Some("pw"), None).unwrap();
        assert_eq!(c.current_user(), Some("report"));
        assert_eq!(c.current_database(), None);
    }
}
