//! DB-API style cursors.
//!
//! A [`Cursor`] borrows a [`Connection`] and layers statement parameters,
//! row position and result-set bookkeeping on top of it. Parameters are
//! interpolated client side: every `%s` (or `%(name)s`) placeholder is
//! replaced by the connection's SQL literal for the matching [`Value`],
//! and `%%` stands for a literal percent sign. A statement executed
//! without parameters is sent exactly as written.
//!
//! Buffered cursors read the whole result set right after executing and
//! can scroll within it. Streaming cursors hand rows out as the server
//! sends them; the connection is busy until they have all been read, which
//! [`Cursor::nextset`], [`Cursor::execute`] and [`Cursor::close`] take
//! care of.

#![allow(clippy::result_large_err)]

use crate::connection::{Connection, ServerWarning};
use crate::native::NativeClient;
use crate::result::QueryResult;
use mysqlbind_core::{ColumnDescription, DatabaseError, Error, Result, Row, RowShape, Value};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::io::SeekFrom;
use std::sync::OnceLock;

/// Finds the row constructor of an `INSERT ... VALUES (...)` statement.
const INSERT_VALUES: &str = r"(?isx)
    \s
    values
    \s*
    (
        \(
            [^()']*
            (?:
                (?:
                        (?:\( .* \))
                    |
                        ' [^\\']* (?:\\.[^\\']*)* '
                )
                [^()']*
            )*
        \)
    )
";

fn insert_values() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(INSERT_VALUES).ok()).as_ref()
}

/// Where a cursor keeps its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorKind {
    /// `store_result`: the whole result set is read after executing.
    #[default]
    Buffered,
    /// `use_result`: rows are read from the server on demand.
    Streaming,
}

/// Statement parameters.
#[derive(Debug, Clone, Copy, Default)]
pub enum Params<'a> {
    /// No interpolation at all; `%` needs no escaping.
    #[default]
    None,
    /// Consumed in order by `%s` placeholders.
    Positional(&'a [Value]),
    /// Looked up by `%(name)s` placeholders.
    Named(&'a BTreeMap<String, Value>),
}

impl From<()> for Params<'_> {
    fn from((): ()) -> Self {
        Params::None
    }
}

impl<'a> From<&'a [Value]> for Params<'a> {
    fn from(values: &'a [Value]) -> Self {
        Params::Positional(values)
    }
}

impl<'a, const N: usize> From<&'a [Value; N]> for Params<'a> {
    fn from(values: &'a [Value; N]) -> Self {
        Params::Positional(values)
    }
}

impl<'a> From<&'a Vec<Value>> for Params<'a> {
    fn from(values: &'a Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

impl<'a> From<&'a BTreeMap<String, Value>> for Params<'a> {
    fn from(values: &'a BTreeMap<String, Value>) -> Self {
        Params::Named(values)
    }
}

/// How [`Cursor::scroll`] interprets its offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollMode {
    #[default]
    Relative,
    Absolute,
}

/// A cursor over a borrowed connection.
pub struct Cursor<'c, C: NativeClient> {
    conn: Option<&'c Connection<C>>,
    kind: CursorKind,
    shape: RowShape,
    /// Streaming results only; buffered rows live in `rows`.
    result: Option<QueryResult<C>>,
    rows: Vec<Row>,
    rownumber: usize,
    executed: Option<Vec<u8>>,
    description: Option<Vec<ColumnDescription>>,
    description_flags: Option<Vec<u32>>,
    rowcount: i64,
    lastrowid: Option<u64>,
    arraysize: usize,
    messages: Vec<ServerWarning>,
    warnings: u32,
    info: Option<String>,
    has_next: bool,
}

impl<'c, C: NativeClient> Cursor<'c, C> {
    pub(crate) fn new(conn: &'c Connection<C>, kind: CursorKind, shape: RowShape) -> Self {
        Self {
            conn: Some(conn),
            kind,
            shape,
            result: None,
            rows: Vec::new(),
            rownumber: 0,
            executed: None,
            description: None,
            description_flags: None,
            rowcount: -1,
            lastrowid: None,
            arraysize: 1,
            messages: Vec::new(),
            warnings: 0,
            info: None,
            has_next: false,
        }
    }

    pub fn kind(&self) -> CursorKind {
        self.kind
    }

    pub fn shape(&self) -> RowShape {
        self.shape
    }

    /// Column descriptions of the current result set, `None` when the last
    /// statement produced none.
    pub fn description(&self) -> Option<&[ColumnDescription]> {
        self.description.as_deref()
    }

    pub fn description_flags(&self) -> Option<&[u32]> {
        self.description_flags.as_deref()
    }

    /// Rows affected or returned by the last statement; -1 when unknown,
    /// as for a streaming result that has not been read.
    pub fn rowcount(&self) -> i64 {
        self.rowcount
    }

    /// The `AUTO_INCREMENT` value generated by the last statement.
    pub fn lastrowid(&self) -> Option<u64> {
        self.lastrowid
    }

    /// Index of the next row to fetch, once a statement has run.
    pub fn rownumber(&self) -> Option<usize> {
        self.executed.as_ref().map(|_| self.rownumber)
    }

    /// Rows returned by [`Cursor::fetchmany`] when no size is given.
    pub fn arraysize(&self) -> usize {
        self.arraysize
    }

    pub fn set_arraysize(&mut self, size: usize) {
        self.arraysize = size;
    }

    /// Warnings collected for the current result set.
    pub fn messages(&self) -> &[ServerWarning] {
        &self.messages
    }

    /// The statement last sent, after interpolation.
    pub fn executed(&self) -> Option<&[u8]> {
        self.executed.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    /// The connection this cursor runs on.
    pub fn connection(&self) -> Result<&'c Connection<C>> {
        self.conn
            .ok_or_else(|| DatabaseError::programming("cursor closed").into())
    }

    /// Execute one statement, interpolating `params`.
    ///
    /// Any result sets still pending from the previous statement are read
    /// and discarded first. Returns [`Cursor::rowcount`].
    #[tracing::instrument(level = "debug", skip_all, fields(len = query.len()))]
    pub fn execute<'p>(&mut self, query: &str, params: impl Into<Params<'p>>) -> Result<i64> {
        self.drain()?;
        let sql = self.interpolate(query, params.into())?;
        let rowcount = self.do_query(&sql)?;
        self.executed = Some(sql);
        if self.kind == CursorKind::Buffered {
            self.warning_check()?;
        }
        Ok(rowcount)
    }

    /// Execute `query` once per parameter set.
    ///
    /// An `INSERT` or `REPLACE` with a `VALUES (...)` clause is sent as a
    /// single statement carrying one row constructor per parameter set.
    /// Anything else runs [`Cursor::execute`] per set and sums the row
    /// counts. `None` when `args` is empty; nothing is sent then.
    pub fn executemany<'p, I, P>(&mut self, query: &str, args: I) -> Result<Option<i64>>
    where
        I: IntoIterator<Item = P>,
        P: Into<Params<'p>>,
    {
        self.messages.clear();
        let args: Vec<Params<'p>> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Ok(None);
        }
        let values = insert_values()
            .and_then(|re| re.captures(query))
            .and_then(|caps| caps.get(1));
        let Some(values) = values else {
            let mut total = 0;
            for params in args {
                total += self.execute(query, params)?;
            }
            return Ok(Some(total));
        };

        let mut sql = query[..values.start()].as_bytes().to_vec();
        sql.push(b'\n');
        for (i, params) in args.iter().enumerate() {
            if i > 0 {
                sql.extend_from_slice(b",\n");
            }
            sql.extend(self.interpolate(values.as_str(), *params)?);
        }
        sql.push(b'\n');
        sql.extend_from_slice(query[values.end()..].as_bytes());
        tracing::debug!(rows = args.len(), "batched insert");

        self.drain()?;
        let rowcount = self.do_query(&sql)?;
        self.executed = Some(sql);
        if self.kind == CursorKind::Buffered {
            self.warning_check()?;
        }
        Ok(Some(rowcount))
    }

    /// Call a stored procedure.
    ///
    /// Each argument is first stored in the server variable
    /// `@_<procname>_<n>`, then the procedure is called with those
    /// variables, so OUT and INOUT values can be read back with a
    /// `SELECT` once every result set of the call has been consumed. The
    /// call itself ends with an empty result set; use
    /// [`Cursor::nextset`] to get past it.
    pub fn callproc(&mut self, procname: &str, args: &[Value]) -> Result<()> {
        let conn = self.connection()?;
        self.drain()?;
        for (i, arg) in args.iter().enumerate() {
            let mut sql = format!("SET @_{}_{}=", procname, i).into_bytes();
            sql.extend(conn.escape(arg)?);
            self.do_query(&sql)?;
            self.nextset()?;
        }
        let vars: Vec<String> = (0..args.len())
            .map(|i| format!("@_{}_{}", procname, i))
            .collect();
        let sql = format!("CALL {}({})", procname, vars.join(",")).into_bytes();
        self.do_query(&sql)?;
        self.executed = Some(sql);
        if self.kind == CursorKind::Buffered {
            self.warning_check()?;
        }
        Ok(())
    }

    /// Move to the next result set of a multi-statement or procedure call.
    ///
    /// Unread rows of the current one are discarded. `false` when there is
    /// none left.
    pub fn nextset(&mut self) -> Result<bool> {
        if self.executed.is_some() {
            self.fetchall()?;
        }
        self.messages.clear();
        let conn = self.connection()?;
        self.result = None;
        if !conn.next_result()? {
            return Ok(false);
        }
        self.do_get_result()?;
        self.post_get_result()?;
        if self.kind == CursorKind::Buffered {
            self.warning_check()?;
        }
        Ok(true)
    }

    /// The next row, or `None` when the result set is exhausted.
    pub fn fetchone(&mut self) -> Result<Option<Row>> {
        self.check_executed()?;
        match self.kind {
            CursorKind::Buffered => {
                let row = self.rows.get(self.rownumber).cloned();
                if row.is_some() {
                    self.rownumber += 1;
                }
                Ok(row)
            }
            CursorKind::Streaming => Ok(self.fetch_stream(1)?.pop()),
        }
    }

    /// Up to `size` rows; [`Cursor::arraysize`] when `size` is `None` or 0.
    pub fn fetchmany(&mut self, size: Option<usize>) -> Result<Vec<Row>> {
        self.check_executed()?;
        let size = size.filter(|&n| n > 0).unwrap_or(self.arraysize);
        match self.kind {
            CursorKind::Buffered => {
                let start = self.rownumber.min(self.rows.len());
                let end = start.saturating_add(size).min(self.rows.len());
                self.rownumber = end;
                Ok(self.rows[start..end].to_vec())
            }
            CursorKind::Streaming if size == 0 => Ok(Vec::new()),
            CursorKind::Streaming => self.fetch_stream(size),
        }
    }

    /// Every remaining row.
    pub fn fetchall(&mut self) -> Result<Vec<Row>> {
        self.check_executed()?;
        match self.kind {
            CursorKind::Buffered => {
                let start = self.rownumber.min(self.rows.len());
                self.rownumber = self.rows.len();
                Ok(self.rows[start..].to_vec())
            }
            CursorKind::Streaming => self.fetch_stream(0),
        }
    }

    /// Move to another row of a buffered result set.
    ///
    /// The target must be an existing row.
    pub fn scroll(&mut self, value: i64, mode: ScrollMode) -> Result<()> {
        self.check_executed()?;
        self.scrollable("scroll")?;
        let target = match mode {
            ScrollMode::Relative => i64::try_from(self.rownumber)
                .ok()
                .and_then(|r| r.checked_add(value)),
            ScrollMode::Absolute => Some(value),
        };
        match target.and_then(|t| usize::try_from(t).ok()) {
            Some(t) if t < self.rows.len() => {
                self.rownumber = t;
                Ok(())
            }
            _ => Err(DatabaseError::programming("out of range").into()),
        }
    }

    /// Reposition like a file, clamped to the rows of a buffered result.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.check_executed()?;
        self.scrollable("seek")?;
        let len = self.rows.len() as u64;
        let target = match pos {
            SeekFrom::Start(n) => n,
            SeekFrom::Current(n) => (self.rownumber as u64).saturating_add_signed(n),
            SeekFrom::End(n) => len.saturating_add_signed(n),
        }
        .min(len);
        self.rownumber = usize::try_from(target).unwrap_or(self.rows.len());
        Ok(target)
    }

    /// Index of the next row to fetch.
    pub fn tell(&self) -> Result<u64> {
        self.check_executed()?;
        Ok(self.rownumber as u64)
    }

    /// Read and discard every pending result set and detach from the
    /// connection. Later calls fail with a programming error; closing again
    /// is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(conn) = self.conn else {
            return Ok(());
        };
        let drained = if conn.is_open() { self.drain() } else { Ok(()) };
        self.conn = None;
        self.result = None;
        self.rows.clear();
        drained
    }

    fn drain(&mut self) -> Result<()> {
        while self.nextset()? {}
        Ok(())
    }

    fn check_executed(&self) -> Result<()> {
        self.connection()?;
        if self.executed.is_none() {
            return Err(DatabaseError::programming("execute() first").into());
        }
        Ok(())
    }

    fn scrollable(&self, op: &str) -> Result<()> {
        if self.kind == CursorKind::Streaming {
            return Err(DatabaseError::not_supported(format!(
                "{}() is not supported on a streaming cursor",
                op
            ))
            .into());
        }
        Ok(())
    }

    fn interpolate(&self, query: &str, params: Params<'_>) -> Result<Vec<u8>> {
        if let Params::None = params {
            return Ok(query.as_bytes().to_vec());
        }
        let conn = self.connection()?;
        interpolate(query, params, |value| conn.escape(value))
    }

    fn do_query(&mut self, sql: &[u8]) -> Result<i64> {
        self.connection()?.query(sql)?;
        self.do_get_result()?;
        self.post_get_result()?;
        Ok(self.rowcount)
    }

    fn do_get_result(&mut self) -> Result<()> {
        let conn = self.connection()?;
        let result = match self.kind {
            CursorKind::Buffered => conn.store_result()?,
            CursorKind::Streaming => conn.use_result()?,
        };
        self.rowcount = i64::try_from(conn.affected_rows()?).unwrap_or(-1);
        self.rownumber = 0;
        self.rows.clear();
        self.description = result.as_ref().map(QueryResult::describe).transpose()?;
        self.description_flags = result.as_ref().map(QueryResult::field_flags).transpose()?;
        self.lastrowid = Some(conn.insert_id()?);
        self.warnings = conn.warning_count()?;
        self.info = conn.info()?;
        self.has_next = conn.more_results()?;
        self.result = result;
        Ok(())
    }

    fn post_get_result(&mut self) -> Result<()> {
        if self.kind == CursorKind::Buffered {
            if let Some(mut result) = self.result.take() {
                self.rows = result.fetch_row(0, self.shape)?;
            }
        }
        Ok(())
    }

    /// Read from a streaming result; `0` reads to the end. Once the result
    /// is exhausted it is released and its warnings are collected.
    fn fetch_stream(&mut self, limit: usize) -> Result<Vec<Row>> {
        let Some(result) = self.result.as_mut() else {
            return Ok(Vec::new());
        };
        let rows = result.fetch_row(limit, self.shape)?;
        self.rownumber += rows.len();
        if limit == 0 || rows.len() < limit {
            self.result = None;
            self.warning_check()?;
        }
        Ok(rows)
    }

    /// Collect the warnings of the current result set, once.
    fn warning_check(&mut self) -> Result<()> {
        let count = std::mem::take(&mut self.warnings);
        if count == 0 {
            return Ok(());
        }
        // SHOW WARNINGS would be out of sync while results are pending.
        if self.has_next {
            let message = format!("There are {} MySQL warnings.", count);
            tracing::warn!(count, "{}", message);
            self.messages.push(ServerWarning {
                level: "Warning".to_string(),
                code: 0,
                message,
            });
            return Ok(());
        }
        let warnings = self.connection()?.show_warnings()?;
        if warnings.is_empty() {
            if let Some(info) = self.info.clone() {
                tracing::warn!("{}", info);
                self.messages.push(ServerWarning {
                    level: "Warning".to_string(),
                    code: 0,
                    message: info,
                });
            }
        }
        for w in &warnings {
            tracing::warn!(level = %w.level, code = w.code, "{}", w.message);
        }
        self.messages.extend(warnings);
        Ok(())
    }
}

impl<C: NativeClient> fmt::Debug for Cursor<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("kind", &self.kind)
            .field("shape", &self.shape)
            .field("closed", &self.conn.is_none())
            .field("rownumber", &self.rownumber)
            .field("rowcount", &self.rowcount)
            .finish()
    }
}

fn format_error(message: impl Into<String>) -> Error {
    DatabaseError::programming(message).into()
}

/// Replace the placeholders of `template` with literals.
fn interpolate<F>(template: &str, params: Params<'_>, literal: F) -> Result<Vec<u8>>
where
    F: Fn(&Value) -> Result<Vec<u8>>,
{
    let bytes = template.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut positional = match params {
        Params::Positional(values) => Some(values.iter()),
        _ => None,
    };
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            Some(b'%') => {
                out.push(b'%');
                i += 2;
            }
            Some(b's') => {
                let Some(values) = positional.as_mut() else {
                    return Err(format_error("%s placeholder needs positional parameters"));
                };
                let value = values
                    .next()
                    .ok_or_else(|| format_error("not enough arguments for format string"))?;
                out.extend(literal(value)?);
                i += 2;
            }
            Some(b'(') => {
                let Params::Named(map) = params else {
                    return Err(format_error("format requires a mapping"));
                };
                let rest = &template[i + 2..];
                let Some(close) = rest.find(')') else {
                    return Err(format_error("incomplete format key"));
                };
                if rest.as_bytes().get(close + 1) != Some(&b's') {
                    return Err(format_error(format!(
                        "unsupported format after %({})",
                        &rest[..close]
                    )));
                }
                let key = &rest[..close];
                let value = map
                    .get(key)
                    .ok_or_else(|| format_error(format!("missing parameter '{}'", key)))?;
                out.extend(literal(value)?);
                i += 2 + close + 2;
            }
            Some(&other) => {
                return Err(format_error(format!(
                    "unsupported format character '{}' at index {}",
                    char::from(other),
                    i + 1
                )));
            }
            None => return Err(format_error("incomplete format")),
        }
    }
    if positional.is_some_and(|mut rest| rest.next().is_some()) {
        return Err(format_error(
            "not all arguments converted during string formatting",
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeClient, FakeResponse, raw_row};
    use mysqlbind_core::constants::er;
    use mysqlbind_core::escape::string_literal;
    use mysqlbind_core::{Converters, ErrorKind, FieldDescriptor, FieldType};

    fn users() -> FakeResponse {
        FakeResponse::rows(
            vec![
                FieldDescriptor::new("id", FieldType::Long).table("users"),
                FieldDescriptor::new("name", FieldType::VarString).table("users"),
            ],
            vec![
                raw_row(&[Some("1"), Some("ada")]),
                raw_row(&[Some("2"), Some("grace")]),
                raw_row(&[Some("3"), None]),
            ],
        )
    }

    fn conn(client: FakeClient) -> Connection<FakeClient> {
        Connection::from_native(client, Converters::default_conversions())
    }

    fn lit(value: &Value) -> Result<Vec<u8>> {
        mysqlbind_core::escape::value_literal(value, string_literal)
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_interpolate_positional() {
        let args = [Value::Int(7), Value::Text("o'k".into())];
        let sql = interpolate("SELECT %s, %s, '100%%'", Params::Positional(&args), lit).unwrap();
        assert_eq!(text(sql), "SELECT 7, 'o\\'k', '100%'");
    }

    #[test]
    fn test_interpolate_named() {
        let mut args = BTreeMap::new();
        args.insert("id".to_string(), Value::Int(3));
        args.insert("name".to_string(), Value::Null);
        let sql = interpolate(
            "UPDATE t SET name = %(name)s WHERE id = %(id)s OR id = %(id)s",
            Params::Named(&args),
            lit,
        )
        .unwrap();
        assert_eq!(text(sql), "UPDATE t SET name = NULL WHERE id = 3 OR id = 3");
    }

    #[test]
    fn test_interpolate_mismatches_are_programming_errors() {
        let one = [Value::Int(1)];
        let two = [Value::Int(1), Value::Int(2)];
        let map = BTreeMap::new();
        let cases = [
            interpolate("SELECT %s, %s", Params::Positional(&one), lit),
            interpolate("SELECT %s", Params::Positional(&two), lit),
            interpolate("SELECT %d", Params::Positional(&one), lit),
            interpolate("SELECT %(id)s", Params::Named(&map), lit),
            interpolate("SELECT %(id)s", Params::Positional(&one), lit),
            interpolate("SELECT %s", Params::Named(&map), lit),
            interpolate("SELECT %(id", Params::Named(&map), lit),
            interpolate("SELECT 5 %", Params::Positional(&[]), lit),
        ];
        for result in cases {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::Programming);
        }
    }

    #[test]
    fn test_insert_values_pattern() {
        let re = insert_values().unwrap();
        let caps = re
            .captures("INSERT INTO t (a, b) VALUES (%s, 'x)'), (1)")
            .unwrap();
        assert_eq!(&caps[1], "(%s, 'x)')");
        let caps = re
            .captures("insert into t values (now(), %s) on duplicate key update a=1")
            .unwrap();
        assert_eq!(&caps[1], "(now(), %s)");
        assert!(re.captures("UPDATE t SET a = %s").is_none());
    }

    #[test]
    fn test_execute_and_fetch_buffered() {
        let c = conn(FakeClient::new().script(
            "SELECT id, name FROM users WHERE id > 0 AND name <> 'x'",
            users(),
        ));
        let mut cur = c.cursor();
        assert_eq!(cur.rownumber(), None);
        let n = cur
            .execute(
                "SELECT id, name FROM users WHERE id > %s AND name <> %s",
                &[Value::Int(0), Value::Text("x".into())],
            )
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(cur.rowcount(), 3);
        assert_eq!(
            cur.executed(),
            Some(&b"SELECT id, name FROM users WHERE id > 0 AND name <> 'x'"[..])
        );
        let desc = cur.description().unwrap();
        assert_eq!(desc.len(), 2);
        assert_eq!(desc[1].name, "name");
        assert_eq!(cur.description_flags().unwrap().len(), 2);

        let first = cur.fetchone().unwrap().unwrap();
        assert_eq!(first.get(0), Some(&Value::Int(1)));
        assert_eq!(cur.rownumber(), Some(1));
        assert_eq!(cur.fetchmany(None).unwrap().len(), 1);
        cur.set_arraysize(5);
        let rest = cur.fetchmany(None).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].get(1), Some(&Value::Null));
        assert!(cur.fetchone().unwrap().is_none());
        assert!(cur.fetchall().unwrap().is_empty());
    }

    #[test]
    fn test_statement_without_params_is_sent_verbatim() {
        let c = conn(FakeClient::new().script("SELECT '100%' AS pct", users()));
        let mut cur = c.cursor();
        cur.execute("SELECT '100%' AS pct", ()).unwrap();
        assert_eq!(cur.fetchall().unwrap().len(), 3);
    }

    #[test]
    fn test_bad_params_send_nothing() {
        let c = conn(FakeClient::new());
        let mut cur = c.cursor();
        let err = cur.execute("SELECT %s, %s", &[Value::Int(1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Programming);
        assert_eq!(c.errno().unwrap(), 0);
        assert!(cur.executed().is_none());
    }

    #[test]
    fn test_insert_sets_lastrowid() {
        let c = conn(FakeClient::new().script(
            "INSERT INTO users (name) VALUES ('lin')",
            FakeResponse::inserted(1, 42),
        ));
        let mut cur = c.cursor();
        let n = cur
            .execute("INSERT INTO users (name) VALUES (%s)", &[Value::Text("lin".into())])
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(cur.lastrowid(), Some(42));
        assert!(cur.description().is_none());
        assert!(cur.fetchone().unwrap().is_none());
    }

    #[test]
    fn test_scroll_seek_tell() {
        let c = conn(FakeClient::new().script("SELECT * FROM users", users()));
        let mut cur = c.cursor();
        cur.execute("SELECT * FROM users", ()).unwrap();
        cur.scroll(2, ScrollMode::Absolute).unwrap();
        assert_eq!(cur.tell().unwrap(), 2);
        cur.scroll(-1, ScrollMode::Relative).unwrap();
        let row = cur.fetchone().unwrap().unwrap();
        assert_eq!(row.get(0), Some(&Value::Int(2)));

        for (value, mode) in [(3, ScrollMode::Absolute), (-3, ScrollMode::Relative)] {
            let err = cur.scroll(value, mode).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Programming);
        }
        assert_eq!(cur.tell().unwrap(), 2);

        assert_eq!(cur.seek(SeekFrom::End(-1)).unwrap(), 2);
        assert_eq!(cur.seek(SeekFrom::Current(-5)).unwrap(), 0);
        assert_eq!(cur.seek(SeekFrom::Start(99)).unwrap(), 3);
        assert!(cur.fetchone().unwrap().is_none());
    }

    #[test]
    fn test_dict_cursor() {
        let c = conn(FakeClient::new().script("SELECT * FROM users", users()));
        let mut cur = c.cursor_with(CursorKind::Buffered, RowShape::Dict);
        cur.execute("SELECT * FROM users", ()).unwrap();
        let row = cur.fetchone().unwrap().unwrap();
        assert_eq!(row.get_by_name("name"), Some(&Value::Text("ada".into())));
    }

    #[test]
    fn test_streaming_cursor() {
        let c = conn(FakeClient::new().script("SELECT * FROM users", users()));
        let mut cur = c.cursor_with(CursorKind::Streaming, RowShape::DictQualified);
        assert_eq!(cur.execute("SELECT * FROM users", ()).unwrap(), -1);
        let row = cur.fetchone().unwrap().unwrap();
        assert_eq!(row.get_by_name("users.id"), Some(&Value::Int(1)));
        assert_eq!(cur.fetchmany(Some(5)).unwrap().len(), 2);
        assert_eq!(cur.rownumber(), Some(3));
        assert!(cur.fetchone().unwrap().is_none());
        assert_eq!(cur.tell().unwrap(), 3);
        for err in [
            cur.scroll(0, ScrollMode::Absolute).unwrap_err(),
            cur.seek(SeekFrom::Start(0)).unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::NotSupported);
        }
    }

    #[test]
    fn test_streaming_execute_discards_unread_rows() {
        let c = conn(FakeClient::new().script("SELECT * FROM users", users()));
        let mut cur = c.cursor_with(CursorKind::Streaming, RowShape::Tuple);
        cur.execute("SELECT * FROM users", ()).unwrap();
        cur.fetchone().unwrap();
        cur.execute("SELECT * FROM users", ()).unwrap();
        assert_eq!(cur.fetchall().unwrap().len(), 3);
        cur.close().unwrap();
        c.ping(None).unwrap();
    }

    #[test]
    fn test_executemany_batches_inserts() {
        let c = conn(FakeClient::new().script(
            "INSERT INTO t (a, b) VALUES \n(1, 'x'),\n(2, 'y')\n",
            FakeResponse::ok(2),
        ));
        let mut cur = c.cursor();
        let rows = vec![
            vec![Value::Int(1), Value::Text("x".into())],
            vec![Value::Int(2), Value::Text("y".into())],
        ];
        let n = cur.executemany("INSERT INTO t (a, b) VALUES (%s, %s)", &rows).unwrap();
        assert_eq!(n, Some(2));
        assert_eq!(cur.rowcount(), 2);
    }

    #[test]
    fn test_executemany_loops_other_statements() {
        let c = conn(
            FakeClient::new()
                .script("UPDATE t SET a = 1", FakeResponse::ok(2))
                .script("UPDATE t SET a = 2", FakeResponse::ok(3)),
        );
        let mut cur = c.cursor();
        let args = [[Value::Int(1)], [Value::Int(2)]];
        assert_eq!(cur.executemany("UPDATE t SET a = %s", &args).unwrap(), Some(5));

        let none: [&[Value]; 0] = [];
        assert_eq!(cur.executemany("UPDATE t SET a = %s", none).unwrap(), None);
    }

    #[test]
    fn test_nextset_walks_results() {
        let c = conn(FakeClient::new().script_multi(
            "SELECT * FROM users; DELETE FROM t",
            vec![users(), FakeResponse::ok(4)],
        ));
        let mut cur = c.cursor();
        cur.execute("SELECT * FROM users; DELETE FROM t", ()).unwrap();
        assert!(cur.description().is_some());
        assert!(cur.nextset().unwrap());
        assert!(cur.description().is_none());
        assert_eq!(cur.rowcount(), 4);
        assert!(!cur.nextset().unwrap());
    }

    #[test]
    fn test_callproc() {
        let c = conn(
            FakeClient::new()
                .script("SET @_total_0=5", FakeResponse::ok(0))
                .script("SET @_total_1='eu'", FakeResponse::ok(0))
                .script_multi(
                    "CALL total(@_total_0,@_total_1)",
                    vec![users(), FakeResponse::ok(0)],
                ),
        );
        let mut cur = c.cursor();
        cur.callproc("total", &[Value::Int(5), Value::Text("eu".into())])
            .unwrap();
        assert_eq!(cur.executed(), Some(&b"CALL total(@_total_0,@_total_1)"[..]));
        assert_eq!(cur.fetchall().unwrap().len(), 3);
        assert!(cur.nextset().unwrap());
        assert!(!cur.nextset().unwrap());
    }

    #[test]
    fn test_closed_and_unexecuted_cursors() {
        let c = conn(FakeClient::new());
        let mut cur = c.cursor();
        assert_eq!(cur.fetchone().unwrap_err().kind(), ErrorKind::Programming);
        assert!(cur.fetchall().unwrap_err().to_string().contains("execute() first"));
        cur.close().unwrap();
        assert!(cur.is_closed());
        cur.close().unwrap();
        let err = cur.execute("SELECT 1", ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Programming);
        assert!(err.to_string().contains("cursor closed"));
    }

    #[test]
    fn test_close_after_connection_closed() {
        let c = conn(FakeClient::new().script("SELECT * FROM users", users()));
        let mut cur = c.cursor();
        cur.execute("SELECT * FROM users", ()).unwrap();
        c.close().unwrap();
        cur.close().unwrap();
    }

    #[test]
    fn test_server_error_is_classified() {
        let c = conn(FakeClient::new());
        let mut cur = c.cursor();
        let err = cur.execute("SELEKT %s", &[Value::Int(1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Programming);
        assert_eq!(err.code(), Some(er::PARSE_ERROR));
    }

    fn warnings_table() -> FakeResponse {
        FakeResponse::rows(
            vec![
                FieldDescriptor::new("Level", FieldType::VarString),
                FieldDescriptor::new("Code", FieldType::Long),
                FieldDescriptor::new("Message", FieldType::VarString),
            ],
            vec![raw_row(&[Some("Note"), Some("1051"), Some("Unknown table 'x'")])],
        )
    }

    #[test]
    fn test_warnings_are_collected() {
        let c = conn(
            FakeClient::new()
                .script(
                    "DROP TABLE IF EXISTS x",
                    FakeResponse::Ok {
                        affected_rows: 0,
                        insert_id: 0,
                        info: None,
                        warnings: 1,
                    },
                )
                .script("SHOW WARNINGS", warnings_table()),
        );
        let mut cur = c.cursor();
        cur.execute("DROP TABLE IF EXISTS x", ()).unwrap();
        assert_eq!(cur.messages().len(), 1);
        assert_eq!(cur.messages()[0].code, 1051);
        assert_eq!(cur.messages()[0].level, "Note");
    }

    #[test]
    fn test_warnings_with_pending_results_are_summarized() {
        let c = conn(FakeClient::new().script_multi(
            "UPDATE t SET a = 1; SELECT * FROM users",
            vec![
                FakeResponse::Ok {
                    affected_rows: 1,
                    insert_id: 0,
                    info: None,
                    warnings: 2,
                },
                users(),
            ],
        ));
        let mut cur = c.cursor();
        cur.execute("UPDATE t SET a = 1; SELECT * FROM users", ())
            .unwrap();
        assert_eq!(cur.messages().len(), 1);
        assert!(cur.messages()[0].message.contains("2 MySQL warnings"));
        assert!(cur.nextset().unwrap());
        assert!(cur.messages().is_empty());
        assert_eq!(cur.fetchall().unwrap().len(), 3);
    }
}
