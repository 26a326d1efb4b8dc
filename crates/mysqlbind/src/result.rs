//! Result wrapper.

#![allow(clippy::result_large_err)]
#![allow(clippy::cast_possible_truncation)]

use crate::connection::{ConnState, Shared, lock, lock_open};
use crate::native::{NativeClient, NativeResult};
use mysqlbind_core::convert::convert_column;
use mysqlbind_core::{
    ColumnDescription, ColumnInfo, Converter, Converters, DatabaseError, FieldDescriptor, Result,
    Row, RowShape,
};
use std::fmt;
use std::sync::{Arc, MutexGuard};

/// Rows fetched per batch when a streaming result is read to the end.
const STREAM_BATCH: usize = 1000;

/// A result set from [`Connection::store_result`](crate::Connection::store_result)
/// or [`Connection::use_result`](crate::Connection::use_result).
pub struct QueryResult<C: NativeClient> {
    conn: Shared<C>,
    /// Taken in `drop` so it is freed under the connection lock.
    native: Option<C::Result>,
    fields: Vec<FieldDescriptor>,
    converters: Vec<Converter>,
    streaming: bool,
    has_next: bool,
    generation: u64,
}

impl<C: NativeClient> QueryResult<C> {
    pub(crate) fn new(
        conn: Shared<C>,
        native: C::Result,
        converters: &Converters,
        streaming: bool,
        has_next: bool,
        generation: u64,
    ) -> Self {
        let fields = native.fields();
        let converters = converters.resolve_all(&fields);
        tracing::debug!(columns = fields.len(), streaming, "result set opened");
        Self {
            conn,
            native: Some(native),
            fields,
            converters,
            streaming,
            has_next,
            generation,
        }
    }

    /// Lock the connection and check this result may still be read.
    fn lock_usable(
        conn: &Shared<C>,
        streaming: bool,
        generation: u64,
    ) -> Result<MutexGuard<'_, ConnState<C>>> {
        let state = lock_open(conn)?;
        if streaming && state.generation != generation {
            return Err(DatabaseError::interface(
                "streaming result invalidated by a later command on its connection",
            )
            .into());
        }
        Ok(state)
    }

    fn check_open(&self) -> Result<()> {
        lock_open(&self.conn).map(drop)
    }

    fn buffered_only(&self, op: &str) -> Result<()> {
        if self.streaming {
            Err(DatabaseError::programming(format!(
                "{}() cannot be used with connection.use_result()",
                op
            ))
            .into())
        } else {
            Ok(())
        }
    }

    /// Fetch up to `max_rows` rows; `0` means all remaining rows.
    ///
    /// A converter failure fails the whole call and names the column.
    pub fn fetch_row(&mut self, max_rows: usize, how: RowShape) -> Result<Vec<Row>> {
        let columns = Arc::new(ColumnInfo::for_fields(&self.fields, how));
        if max_rows > 0 {
            return self.fetch_batch(max_rows, &columns);
        }
        if !self.streaming {
            let remaining = self.num_rows()?.saturating_sub(self.row_position()?);
            return self.fetch_batch(remaining as usize, &columns);
        }
        let mut rows = Vec::new();
        loop {
            let batch = self.fetch_batch(STREAM_BATCH, &columns)?;
            let done = batch.len() < STREAM_BATCH;
            rows.extend(batch);
            if done {
                return Ok(rows);
            }
        }
    }

    fn fetch_batch(&mut self, limit: usize, columns: &Arc<ColumnInfo>) -> Result<Vec<Row>> {
        let _state = Self::lock_usable(&self.conn, self.streaming, self.generation)?;
        let Some(native) = self.native.as_mut() else {
            return Ok(Vec::new());
        };
        let mut rows = Vec::with_capacity(limit.min(STREAM_BATCH));
        while rows.len() < limit {
            let Some(raw) = native.fetch_row()? else {
                break;
            };
            let values = self
                .fields
                .iter()
                .zip(&self.converters)
                .zip(raw.iter().map(Option::as_deref).chain(std::iter::repeat(None)))
                .map(|((field, conv), cell)| convert_column(conv, field, cell))
                .collect::<Result<Vec<_>>>()?;
            rows.push(Row::with_columns(Arc::clone(columns), values));
        }
        tracing::trace!(rows = rows.len(), limit, "fetched row batch");
        Ok(rows)
    }

    fn row_position(&self) -> Result<u64> {
        let _state = lock_open(&self.conn)?;
        Ok(self.native.as_ref().map_or(0, NativeResult::row_tell))
    }

    /// DB-API description of each column.
    pub fn describe(&self) -> Result<Vec<ColumnDescription>> {
        self.check_open()?;
        Ok(self.fields.iter().map(FieldDescriptor::describe).collect())
    }

    /// The flags of each column.
    pub fn field_flags(&self) -> Result<Vec<u32>> {
        self.check_open()?;
        Ok(self.fields.iter().map(|f| f.flags).collect())
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Rows in a buffered result, or rows read so far from a streaming one.
    pub fn num_rows(&self) -> Result<u64> {
        let _state = lock_open(&self.conn)?;
        Ok(self.native.as_ref().map_or(0, NativeResult::num_rows))
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Whether the connection had more results queued when this one was
    /// retrieved.
    pub fn has_next(&self) -> bool {
        self.has_next
    }

    /// Position on row `row` of a buffered result.
    pub fn data_seek(&mut self, row: u64) -> Result<()> {
        self.buffered_only("data_seek")?;
        let _state = lock_open(&self.conn)?;
        if let Some(native) = self.native.as_mut() {
            native.data_seek(row);
        }
        Ok(())
    }

    /// Move the cursor `offset` rows from its current position.
    pub fn row_seek(&mut self, offset: i64) -> Result<()> {
        self.buffered_only("row_seek")?;
        let _state = lock_open(&self.conn)?;
        if let Some(native) = self.native.as_mut() {
            let target = native
                .row_tell()
                .saturating_add_signed(offset)
                .min(native.num_rows());
            native.data_seek(target);
        }
        Ok(())
    }

    /// The current cursor position.
    pub fn row_tell(&self) -> Result<u64> {
        self.buffered_only("row_tell")?;
        self.row_position()
    }
}

impl<C: NativeClient> Drop for QueryResult<C> {
    fn drop(&mut self) {
        let mut state = lock(&self.conn);
        drop(self.native.take());
        state.live_results = state.live_results.saturating_sub(1);
        if !state.open && !state.released && state.live_results == 0 {
            state.native.close();
            state.released = true;
            tracing::debug!("last result set dropped; native handle released");
        }
    }
}

impl<C: NativeClient> fmt::Debug for QueryResult<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("fields", &self.fields.len())
            .field("streaming", &self.streaming)
            .field("has_next", &self.has_next)
            .finish()
    }
}
