//! Connection wrapper.
//!
//! A [`Connection`] owns one native handle behind a mutex that its result
//! sets share. Every operation checks the open flag first, so a closed
//! connection fails fast with an interface error and never reaches the
//! library. Native failures come back classified by
//! [`ErrorKind::classify`](mysqlbind_core::ErrorKind::classify).

#![allow(clippy::result_large_err)] // Error type is defined in mysqlbind-core

use crate::config::ConnectOptions;
use crate::cursor::{Cursor, CursorKind};
use crate::native::{CharsetInfo, NativeClient, NativeError};
use crate::result::QueryResult;
use mysqlbind_core::constants::server_status;
use mysqlbind_core::escape::{escape_dict, escape_sequence, quote, value_literal};
use mysqlbind_core::{Converters, DatabaseError, Error, Result, Row, RowShape, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// State shared between a connection and the results it produced.
pub(crate) struct ConnState<C: NativeClient> {
    pub(crate) native: C,
    pub(crate) open: bool,
    /// Bumped by every successful command; streaming results remember the
    /// value they were created at.
    pub(crate) generation: u64,
    /// Set once `native.close()` has run.
    pub(crate) released: bool,
    /// Result sets created from this connection and not yet dropped.
    pub(crate) live_results: usize,
}

pub(crate) type Shared<C> = Arc<Mutex<ConnState<C>>>;

pub(crate) fn lock<C: NativeClient>(shared: &Shared<C>) -> MutexGuard<'_, ConnState<C>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Lock and fail unless the connection is still open.
pub(crate) fn lock_open<C: NativeClient>(
    shared: &Shared<C>,
) -> Result<MutexGuard<'_, ConnState<C>>> {
    let state = lock(shared);
    if state.open {
        Ok(state)
    } else {
        Err(closed_error())
    }
}

pub(crate) fn closed_error() -> Error {
    DatabaseError::interface("connection is closed").into()
}

impl<C: NativeClient> Drop for ConnState<C> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if self.open {
            tracing::warn!("connection dropped without close(); releasing native handle");
            self.open = false;
        }
        self.native.close();
        self.released = true;
    }
}

/// One row of `SHOW WARNINGS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerWarning {
    /// `Note`, `Warning` or `Error`.
    pub level: String,
    pub code: u32,
    pub message: String,
}

impl ServerWarning {
    fn from_row(row: &Row) -> Option<Self> {
        let code = match row.get(1)? {
            Value::Text(s) => s.trim().parse().ok()?,
            other => u32::try_from(other.as_u64()?).ok()?,
        };
        Some(Self {
            level: text_cell(row.get(0)?)?,
            code,
            message: text_cell(row.get(2)?)?,
        })
    }
}

fn text_cell(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
        _ => None,
    }
}

/// A connection to a MySQL server.
///
/// The capability flags the server announced in its handshake are not
/// available: the client library keeps them private. [`Connection::client_flag`]
/// reports the flags this side asked for.
pub struct Connection<C: NativeClient> {
    shared: Shared<C>,
    converters: Converters,
    port: u16,
    client_flag: u64,
}

impl<C: NativeClient> Connection<C> {
    /// Open a connection.
    ///
    /// `converters` is used for every result set this connection produces;
    /// see [`Converters::default_conversions`].
    #[tracing::instrument(
        level = "debug",
        skip(options, converters),
        fields(host = ?options.host, port = options.port, db = ?options.database)
    )]
    pub fn connect(options: &ConnectOptions, converters: Converters) -> Result<Self> {
        options.validate()?;
        let native = C::connect(options)?;
        tracing::debug!(thread_id = native.thread_id(), "connected");
        let mut conn = Self::from_native(native, converters);
        conn.port = options.port;
        conn.client_flag = options.capability_flags();
        Ok(conn)
    }

    /// Wrap an already connected native handle.
    pub fn from_native(native: C, converters: Converters) -> Self {
        Self {
            shared: Arc::new(Mutex::new(ConnState {
                native,
                open: true,
                generation: 0,
                released: false,
                live_results: 0,
            })),
            converters,
            port: 0,
            client_flag: 0,
        }
    }

    /// Close the connection.
    ///
    /// Every later operation fails, on this connection and on its result
    /// sets. The native handle is released now if no result set is alive,
    /// otherwise when the last one is dropped.
    pub fn close(&self) -> Result<()> {
        let mut state = lock(&self.shared);
        if !state.open {
            return Err(DatabaseError::programming("closing a closed connection").into());
        }
        state.open = false;
        state.generation += 1;
        if state.live_results == 0 {
            state.native.close();
            state.released = true;
            tracing::debug!("connection closed");
        } else {
            tracing::debug!(
                live_results = state.live_results,
                "connection closed; release deferred to live result sets"
            );
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        lock(&self.shared).open
    }

    /// The TCP port given at connect time; 0 when the library picked it.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The `CLIENT_*` capability flags requested at connect time.
    pub fn client_flag(&self) -> u64 {
        self.client_flag
    }

    /// Run `f` as one server round trip. Invalidates streaming results
    /// when it succeeds.
    fn command<T>(
        &self,
        f: impl FnOnce(&mut C) -> std::result::Result<T, NativeError>,
    ) -> Result<T> {
        let mut state = lock_open(&self.shared)?;
        let out = f(&mut state.native)?;
        state.generation += 1;
        Ok(out)
    }

    /// Read connection state without talking to the server.
    fn read<T>(&self, f: impl FnOnce(&C) -> T) -> Result<T> {
        let state = lock_open(&self.shared)?;
        Ok(f(&state.native))
    }

    /// Execute a statement (`mysql_real_query`).
    #[tracing::instrument(level = "debug", skip_all, fields(len = sql.as_ref().len()))]
    pub fn query(&self, sql: impl AsRef<[u8]>) -> Result<()> {
        self.command(|c| c.real_query(sql.as_ref()))
    }

    /// Send a statement without waiting for the reply.
    #[tracing::instrument(level = "debug", skip_all, fields(len = sql.as_ref().len()))]
    pub fn send_query(&self, sql: impl AsRef<[u8]>) -> Result<()> {
        self.command(|c| c.send_query(sql.as_ref()))
    }

    /// Wait for the reply to [`Connection::send_query`].
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn read_query_result(&self) -> Result<()> {
        self.command(|c| c.read_query_result())
    }

    /// Buffer the whole result set client-side.
    ///
    /// `Ok(None)` when the last statement produced no result set.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn store_result(&self) -> Result<Option<QueryResult<C>>> {
        self.take_result(false)
    }

    /// Stream the result set row by row from the server.
    ///
    /// The result is invalidated by the next command on this connection.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn use_result(&self) -> Result<Option<QueryResult<C>>> {
        self.take_result(true)
    }

    fn take_result(&self, streaming: bool) -> Result<Option<QueryResult<C>>> {
        let mut state = lock_open(&self.shared)?;
        let native = if streaming {
            state.native.use_result()?
        } else {
            state.native.store_result()?
        };
        state.generation += 1;
        let Some(native) = native else {
            return Ok(None);
        };
        let has_next = state.native.more_results();
        let generation = state.generation;
        state.live_results += 1;
        drop(state);
        Ok(Some(QueryResult::new(
            Arc::clone(&self.shared),
            native,
            &self.converters,
            streaming,
            has_next,
            generation,
        )))
    }

    /// Advance to the next result of a multi-statement.
    ///
    /// Returns `true` when another result is ready.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn next_result(&self) -> Result<bool> {
        self.command(|c| c.next_result())
    }

    pub fn more_results(&self) -> Result<bool> {
        self.read(|c| c.more_results())
    }

    /// Check that the server is alive, optionally changing the reconnect
    /// setting first.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn ping(&self, reconnect: Option<bool>) -> Result<()> {
        let mut state = lock_open(&self.shared)?;
        if let Some(reconnect) = reconnect {
            state.native.set_reconnect(reconnect)?;
        }
        state.native.ping()?;
        state.generation += 1;
        Ok(())
    }

    pub fn autocommit(&self, on: bool) -> Result<()> {
        self.command(|c| c.autocommit(on))
    }

    pub fn get_autocommit(&self) -> Result<bool> {
        self.read(|c| c.server_status() & server_status::AUTOCOMMIT != 0)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn commit(&self) -> Result<()> {
        self.command(|c| c.commit())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rollback(&self) -> Result<()> {
        self.command(|c| c.rollback())
    }

    pub fn select_db(&self, db: &str) -> Result<()> {
        self.command(|c| c.select_db(db))
    }

    #[tracing::instrument(level = "debug", skip(self, password))]
    pub fn change_user(
        &self,
        user: &str,
        password: Option<&str>,
        db: Option<&str>,
    ) -> Result<()> {
        self.command(|c| c.change_user(user, password, db))
    }

    /// Switch the connection character set.
    pub fn set_character_set(&self, charset: &str) -> Result<()> {
        if charset.contains('\0') {
            return Err(Error::config("character set name contains a NUL byte"));
        }
        self.command(|c| c.set_character_set(charset))
    }

    pub fn character_set_name(&self) -> Result<String> {
        self.read(|c| c.character_set_name())
    }

    pub fn get_character_set_info(&self) -> Result<CharsetInfo> {
        self.read(|c| c.character_set_info())?
    }

    /// `MYSQL_OPTION_MULTI_STATEMENTS_ON` / `_OFF`.
    pub fn set_server_option(&self, option: u32) -> Result<()> {
        self.command(|c| c.set_server_option(option))
    }

    /// Ask the server to kill a thread.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn kill(&self, thread_id: u64) -> Result<()> {
        self.command(|c| c.kill(thread_id))
    }

    /// Ask the server to shut down.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn shutdown(&self) -> Result<()> {
        self.command(|c| c.shutdown())
    }

    /// Short server status summary.
    pub fn stat(&self) -> Result<String> {
        self.command(|c| c.stat())
    }

    pub fn dump_debug_info(&self) -> Result<()> {
        self.command(|c| c.dump_debug_info())
    }

    pub fn affected_rows(&self) -> Result<u64> {
        self.read(|c| c.affected_rows())
    }

    pub fn insert_id(&self) -> Result<u64> {
        self.read(|c| c.insert_id())
    }

    pub fn field_count(&self) -> Result<u32> {
        self.read(|c| c.field_count())
    }

    pub fn warning_count(&self) -> Result<u32> {
        self.read(|c| c.warning_count())
    }

    pub fn info(&self) -> Result<Option<String>> {
        self.read(|c| c.info())
    }

    pub fn sqlstate(&self) -> Result<String> {
        self.read(|c| c.sqlstate())
    }

    pub fn errno(&self) -> Result<u32> {
        self.read(|c| c.errno())
    }

    pub fn error(&self) -> Result<String> {
        self.read(|c| c.error())
    }

    pub fn thread_id(&self) -> Result<u64> {
        self.read(|c| c.thread_id())
    }

    pub fn get_server_info(&self) -> Result<String> {
        self.read(|c| c.server_info())
    }

    pub fn get_host_info(&self) -> Result<String> {
        self.read(|c| c.host_info())
    }

    pub fn get_proto_info(&self) -> Result<u32> {
        self.read(|c| c.proto_info())
    }

    pub fn server_status(&self) -> Result<u32> {
        self.read(|c| c.server_status())
    }

    /// Escape `input` for use inside a quoted SQL string.
    ///
    /// Uses the connection character set while the connection is open and
    /// the charset-unaware routine otherwise.
    pub fn escape_string(&self, input: &[u8]) -> Vec<u8> {
        let state = lock(&self.shared);
        if state.open {
            state.native.real_escape_string(input)
        } else {
            mysqlbind_core::escape_string(input)
        }
    }

    /// [`Connection::escape_string`] wrapped in single quotes.
    pub fn string_literal(&self, input: &[u8]) -> Vec<u8> {
        quote(&self.escape_string(input))
    }

    /// Render any value as an SQL literal.
    pub fn escape(&self, value: &Value) -> Result<Vec<u8>> {
        value_literal(value, |bytes| self.string_literal(bytes))
    }

    /// [`Connection::escape`] applied to each value in order.
    pub fn escape_sequence(&self, values: &[Value]) -> Result<Vec<Vec<u8>>> {
        escape_sequence(values, |bytes| self.string_literal(bytes))
    }

    /// [`Connection::escape`] applied to each value of a map.
    pub fn escape_dict(
        &self,
        values: &BTreeMap<String, Value>,
    ) -> Result<BTreeMap<String, Vec<u8>>> {
        escape_dict(values, |bytes| self.string_literal(bytes))
    }

    /// Run `SHOW WARNINGS` and collect its rows.
    pub fn show_warnings(&self) -> Result<Vec<ServerWarning>> {
        self.query("SHOW WARNINGS")?;
        let Some(mut result) = self.store_result()? else {
            return Ok(Vec::new());
        };
        let rows = result.fetch_row(0, RowShape::Tuple)?;
        Ok(rows.iter().filter_map(ServerWarning::from_row).collect())
    }

    /// A buffered cursor returning tuple rows.
    pub fn cursor(&self) -> Cursor<'_, C> {
        Cursor::new(self, CursorKind::Buffered, RowShape::Tuple)
    }

    /// A cursor with the given result mode and row shape.
    pub fn cursor_with(&self, kind: CursorKind, shape: RowShape) -> Cursor<'_, C> {
        Cursor::new(self, kind, shape)
    }

    /// The converter mapping used for new result sets.
    pub fn converters(&self) -> &Converters {
        &self.converters
    }

    /// Replace the converter mapping. Existing result sets keep theirs.
    pub fn set_converters(&mut self, converters: Converters) {
        self.converters = converters;
    }

    pub fn client_info() -> String {
        C::client_info()
    }

    pub fn client_version() -> u64 {
        C::client_version()
    }

    pub fn thread_safe() -> bool {
        C::thread_safe()
    }
}

impl<C: NativeClient> fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared);
        f.debug_struct("Connection")
            .field("open", &state.open)
            .field("converters", &self.converters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeClient, FakeResponse, raw_row};
    use mysqlbind_core::constants::{client, cr, er};
    use mysqlbind_core::{ErrorKind, FieldDescriptor, FieldType, RowShape};
    use std::sync::atomic::Ordering;

    fn users() -> FakeResponse {
        FakeResponse::rows(
            vec![
                FieldDescriptor::new("id", FieldType::Long).table("users"),
                FieldDescriptor::new("name", FieldType::VarString).table("users"),
            ],
            vec![
                raw_row(&[Some("1"), Some("ada")]),
                raw_row(&[Some("2"), None]),
            ],
        )
    }

    fn conn(client: FakeClient) -> Connection<FakeClient> {
        Connection::from_native(client, Converters::default_conversions())
    }

    #[test]
    fn test_connect_and_close() {
        let opts = ConnectOptions::new().host("localhost").database("shop").user("app");
        let c = Connection::<FakeClient>::connect(&opts, Converters::new()).unwrap();
        assert!(c.is_open());
        assert_eq!(c.port(), 0);
        assert_eq!(c.client_flag(), 0);
        c.close().unwrap();
        assert!(!c.is_open());
    }

    #[test]
    fn test_connect_failure_is_classified() {
        let opts = ConnectOptions::new().host("db.invalid");
        let err = Connection::<FakeClient>::connect(&opts, Converters::new()).unwrap_err();
        assert_eq!(err.code(), Some(cr::UNKNOWN_HOST));
        assert_eq!(err.kind(), ErrorKind::Operational);
    }

    #[test]
    fn test_connect_rejects_nul_options() {
        let opts = ConnectOptions::new().password("a\0b");
        let err = Connection::<FakeClient>::connect(&opts, Converters::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Interface);
    }

    #[test]
    fn test_close_twice_is_programming_error() {
        let c = conn(FakeClient::new());
        c.close().unwrap();
        let err = c.close().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Programming);
        assert_eq!(err.code(), Some(0));
    }

    #[test]
    fn test_closed_connection_fails_fast() {
        let c = conn(FakeClient::new());
        c.close().unwrap();
        let checks: Vec<Result<()>> = vec![
            c.query("SELECT 1"),
            c.ping(None),
            c.commit(),
            c.select_db("x"),
            c.affected_rows().map(|_| ()),
            c.thread_id().map(|_| ()),
            c.store_result().map(|_| ()),
        ];
        for r in checks {
            let err = r.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Interface);
            assert_eq!(err.code(), Some(0));
        }
    }

    #[test]
    fn test_drop_releases_handle() {
        let client = FakeClient::new();
        let closed = client.closed_flag();
        drop(conn(client));
        assert!(closed.load(Ordering::Acquire));
    }

    #[test]
    fn test_result_keeps_handle_alive() {
        let client = FakeClient::new().script("SELECT * FROM users", users());
        let closed = client.closed_flag();
        let c = conn(client);
        c.query("SELECT * FROM users").unwrap();
        let mut res = c.store_result().unwrap().unwrap();
        drop(c);
        assert!(!closed.load(Ordering::Acquire));
        assert_eq!(res.fetch_row(0, RowShape::Tuple).unwrap().len(), 2);
        drop(res);
        assert!(closed.load(Ordering::Acquire));
    }

    #[test]
    fn test_close_with_live_result_defers_release() {
        let client = FakeClient::new().script("SELECT * FROM users", users());
        let closed = client.closed_flag();
        let c = conn(client);
        c.query("SELECT * FROM users").unwrap();
        let mut res = c.store_result().unwrap().unwrap();
        c.close().unwrap();
        assert!(!c.is_open());
        assert!(!closed.load(Ordering::Acquire));
        let err = res.fetch_row(1, RowShape::Tuple).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Interface);
        drop(res);
        assert!(closed.load(Ordering::Acquire));
    }

    #[test]
    fn test_close_waits_for_last_of_several_results() {
        let client = FakeClient::new().script("SELECT * FROM users", users());
        let closed = client.closed_flag();
        let c = conn(client);
        c.query("SELECT * FROM users").unwrap();
        let first = c.store_result().unwrap().unwrap();
        c.query("SELECT * FROM users").unwrap();
        let second = c.store_result().unwrap().unwrap();
        c.query("SELECT * FROM users").unwrap();
        drop(c.store_result().unwrap().unwrap());
        c.close().unwrap();
        drop(first);
        assert!(!closed.load(Ordering::Acquire));
        drop(second);
        assert!(closed.load(Ordering::Acquire));
        drop(c);
    }

    #[test]
    fn test_close_releases_immediately_without_results() {
        let client = FakeClient::new();
        let closed = client.closed_flag();
        let c = conn(client);
        c.close().unwrap();
        assert!(closed.load(Ordering::Acquire));
    }

    #[test]
    fn test_connect_records_port_and_flags() {
        let opts = ConnectOptions::new()
            .host("db")
            .port(3307)
            .compress(true)
            .client_flag(client::FOUND_ROWS);
        let c = Connection::<FakeClient>::connect(&opts, Converters::new()).unwrap();
        assert_eq!(c.port(), 3307);
        assert_eq!(c.client_flag(), client::FOUND_ROWS | client::COMPRESS);
    }

    #[test]
    fn test_injected_failure_is_classified_once() {
        let mut client = FakeClient::new();
        client.fail_next(NativeError::new(cr::SERVER_LOST, "Lost connection to MySQL server"));
        let c = conn(client);
        let err = c.ping(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Operational);
        assert_eq!(c.errno().unwrap(), cr::SERVER_LOST as u32);
        c.ping(None).unwrap();
        assert_eq!(c.errno().unwrap(), 0);
    }

    #[test]
    fn test_query_error_is_classified() {
        let client = FakeClient::new().script(
            "INSERT INTO t VALUES (1)",
            FakeResponse::Error(
                NativeError::new(er::DUP_ENTRY, "Duplicate entry '1' for key 'PRIMARY'")
                    .with_sqlstate("23000"),
            ),
        );
        let c = conn(client);
        let err = c.query("INSERT INTO t VALUES (1)").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert_eq!(err.sqlstate(), Some("23000"));
        assert_eq!(c.errno().unwrap(), 1062);
        assert_eq!(c.sqlstate().unwrap(), "23000");
    }

    #[test]
    fn test_no_result_set() {
        let client = FakeClient::new().script(
            "DELETE FROM t",
            FakeResponse::Ok {
                affected_rows: 3,
                insert_id: 0,
                info: Some("Rows matched: 3".into()),
                warnings: 0,
            },
        );
        let c = conn(client);
        c.query("DELETE FROM t").unwrap();
        assert!(c.store_result().unwrap().is_none());
        assert_eq!(c.affected_rows().unwrap(), 3);
        assert_eq!(c.field_count().unwrap(), 0);
        assert_eq!(c.info().unwrap().as_deref(), Some("Rows matched: 3"));
    }

    #[test]
    fn test_send_and_read() {
        let c = conn(FakeClient::new().script("SELECT * FROM users", users()));
        c.send_query("SELECT * FROM users").unwrap();
        c.read_query_result().unwrap();
        assert_eq!(c.field_count().unwrap(), 2);
        assert!(c.store_result().unwrap().is_some());
    }

    #[test]
    fn test_out_of_sync_is_programming_error() {
        let c = conn(FakeClient::new().script("SELECT * FROM users", users()));
        c.query("SELECT * FROM users").unwrap();
        let err = c.query("SELECT * FROM users").unwrap_err();
        assert_eq!(err.code(), Some(cr::COMMANDS_OUT_OF_SYNC));
        assert_eq!(err.kind(), ErrorKind::Programming);
    }

    #[test]
    fn test_multi_results() {
        let client = FakeClient::new().script_multi(
            "CALL report()",
            vec![users(), FakeResponse::ok(0)],
        );
        let c = conn(client);
        c.query("CALL report()").unwrap();
        assert!(c.more_results().unwrap());
        let res = c.store_result().unwrap().unwrap();
        assert!(res.has_next());
        drop(res);
        assert!(c.next_result().unwrap());
        assert!(c.store_result().unwrap().is_none());
        assert!(!c.next_result().unwrap());
    }

    #[test]
    fn test_transactions() {
        let c = conn(FakeClient::new());
        assert!(c.get_autocommit().unwrap());
        c.autocommit(false).unwrap();
        assert!(!c.get_autocommit().unwrap());
        c.query("BEGIN").unwrap();
        assert!(c.server_status().unwrap() & server_status::IN_TRANS != 0);
        c.rollback().unwrap();
        assert_eq!(c.server_status().unwrap() & server_status::IN_TRANS, 0);
    }

    #[test]
    fn test_ping_reconnect() {
        let mut client = FakeClient::new();
        client.disconnect();
        let c = conn(client);
        let err = c.ping(None).unwrap_err();
        assert!(err.is_connection_error());
        c.ping(Some(true)).unwrap();
    }

    #[test]
    fn test_session_commands() {
        let c = conn(FakeClient::new());
        c.select_db("inventory").unwrap();
        assert_eq!(c.select_db("").unwrap_err().kind(), ErrorKind::Programming);
        c.change_user("auditor", Some("pw"), Some("logs")).unwrap();
        c.set_character_set("latin1").unwrap();
        assert_eq!(c.character_set_name().unwrap(), "latin1");
        let info = c.get_character_set_info().unwrap();
        assert_eq!(info.collation, "latin1_swedish_ci");
        assert!(c.set_character_set("klingon").is_err());
        assert!(c.stat().unwrap().starts_with("Uptime"));
        c.dump_debug_info().unwrap();
        c.set_server_option(mysqlbind_core::constants::server_option::MULTI_STATEMENTS_ON)
            .unwrap();
        assert!(c.get_server_info().unwrap().starts_with("8.0"));
        assert_eq!(c.get_proto_info().unwrap(), 10);
    }

    #[test]
    fn test_kill_own_thread_loses_connection() {
        let c = conn(FakeClient::new());
        let id = c.thread_id().unwrap();
        c.kill(id).unwrap();
        let err = c.ping(None).unwrap_err();
        assert_eq!(err.code(), Some(cr::SERVER_GONE_ERROR));
        assert_eq!(err.kind(), ErrorKind::Operational);
    }

    #[test]
    fn test_escaping() {
        let c = conn(FakeClient::new());
        assert_eq!(c.escape_string(b"it's"), b"it\\'s");
        assert_eq!(c.string_literal(b"a\0b"), b"'a\\0b'");
        assert_eq!(c.escape(&Value::Text("x'y".into())).unwrap(), b"'x\\'y'");
        assert_eq!(c.escape(&Value::Null).unwrap(), b"NULL");
        c.close().unwrap();
        assert_eq!(c.string_literal(b"it's"), b"'it\\'s'");
    }

    #[test]
    fn test_escape_sequence_and_dict_use_connection_quoting() {
        let mut client = FakeClient::new();
        client.set_no_backslash_escapes(true);
        let c = conn(client);
        let seq = c.escape_sequence(&[Value::Text("it's".into()), Value::Int(2)]).unwrap();
        assert_eq!(seq, vec![b"'it''s'".to_vec(), b"2".to_vec()]);
        let mut map = BTreeMap::new();
        map.insert("note".to_string(), Value::Text("a'b".into()));
        assert_eq!(c.escape_dict(&map).unwrap()["note"], b"'a''b'");
    }

    #[test]
    fn test_show_warnings() {
        let client = FakeClient::new().script(
            "SHOW WARNINGS",
            FakeResponse::rows(
                vec![
                    FieldDescriptor::new("Level", FieldType::VarString),
                    FieldDescriptor::new("Code", FieldType::Long),
                    FieldDescriptor::new("Message", FieldType::VarString),
                ],
                vec![raw_row(&[
                    Some("Warning"),
                    Some("1265"),
                    Some("Data truncated for column 'name' at row 1"),
                ])],
            ),
        );
        let c = conn(client);
        let warnings = c.show_warnings().unwrap();
        assert_eq!(
            warnings,
            vec![ServerWarning {
                level: "Warning".into(),
                code: 1265,
                message: "Data truncated for column 'name' at row 1".into(),
            }]
        );
    }

    #[test]
    fn test_real_escape_follows_session() {
        let mut client = FakeClient::new();
        client.set_no_backslash_escapes(true);
        let c = conn(client);
        assert_eq!(c.string_literal(b"it's"), b"'it''s'");
    }

    #[test]
    fn test_set_converters_affects_new_results_only() {
        let client = FakeClient::new().script("SELECT * FROM users", users());
        let mut c = conn(client);
        c.set_converters(Converters::new());
        assert!(c.converters().is_empty());
        c.query("SELECT * FROM users").unwrap();
        let mut res = c.store_result().unwrap().unwrap();
        let rows = res.fetch_row(1, RowShape::Tuple).unwrap();
        assert_eq!(rows[0].get(0), Some(&Value::Text("1".into())));
    }

    #[test]
    fn test_client_info() {
        assert_eq!(Connection::<FakeClient>::client_version(), 80036);
        assert!(Connection::<FakeClient>::thread_safe());
        assert!(Connection::<FakeClient>::client_info().contains("fake"));
    }
}
