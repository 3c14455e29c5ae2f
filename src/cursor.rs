//! Pull-based iteration over the result sets of one execution.

use std::sync::Arc;

use tracing::instrument;

use crate::col::FieldDescriptor;
use crate::error::{Error, FetchError, Result};
use crate::protocol::decode_field;
use crate::row::Row;
use crate::session::{QueryReply, ResultSetId, ResultSetPage, Session};
use crate::value::Value;

/// One result set of an execution
#[derive(Debug, Clone)]
pub enum RowsResult {
    /// Rows paged from the server
    Query {
        id: ResultSetId,
        fields: Arc<[FieldDescriptor]>,
        page: ResultSetPage,
        /// The server no longer holds the result set
        released: bool,
    },
    /// Rows fully materialized on the client, e.g. procedure output parameters
    Call {
        fields: Arc<[FieldDescriptor]>,
        rows: Vec<Vec<Value>>,
    },
    NoResult,
}

impl RowsResult {
    pub fn from_query(reply: QueryReply) -> Self {
        let released = reply.page.is_last;
        Self::Query {
            id: reply.result_set_id,
            fields: reply.fields,
            page: reply.page,
            released,
        }
    }

    pub fn columns(&self) -> &[FieldDescriptor] {
        match self {
            Self::Query { fields, .. } | Self::Call { fields, .. } => fields,
            Self::NoResult => &[],
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            Self::Query { page, .. } => page.rows.len(),
            Self::Call { rows, .. } => rows.len(),
            Self::NoResult => 0,
        }
    }

    pub fn is_last_packet(&self) -> bool {
        match self {
            Self::Query { page, .. } => page.is_last,
            Self::Call { .. } | Self::NoResult => true,
        }
    }

    pub fn result_set_id(&self) -> Option<ResultSetId> {
        match self {
            Self::Query { id, .. } => Some(*id),
            Self::Call { .. } | Self::NoResult => None,
        }
    }

    /// Decode row `idx` of the current page
    fn copy_row(&self, idx: usize, result_set: usize, row_number: u64) -> Result<Row> {
        match self {
            Self::Query { fields, page, .. } => {
                let raw = page.rows.get(idx).ok_or_else(|| {
                    Error::LibraryBug(crate::error::eyre!("row {idx} out of page bounds"))
                })?;
                if raw.len() != fields.len() {
                    return Err(Error::InvalidPacket);
                }
                let values = fields
                    .iter()
                    .zip(raw.fields())
                    .enumerate()
                    .map(|(i, (desc, payload))| {
                        decode_field(desc, payload).map_err(|e| Error::Field {
                            result_set,
                            row: row_number,
                            field: i,
                            source: Box::new(e),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Row::new(Arc::clone(fields), values))
            }
            Self::Call { fields, rows } => {
                let values = rows.get(idx).cloned().ok_or_else(|| {
                    Error::LibraryBug(crate::error::eyre!("row {idx} out of bounds"))
                })?;
                Ok(Row::new(Arc::clone(fields), values))
            }
            Self::NoResult => Err(Error::LibraryBug(crate::error::eyre!(
                "copy_row on an empty result"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CursorState {
    Active,
    /// The current result set is drained
    Exhausted,
    Closed,
    /// A fetch failed; terminal until `close()`
    Errored(FetchError),
}

/// Cursor over the result sets of one execution
pub struct ResultSetCursor {
    session: Arc<dyn Session>,
    fetch_size: u32,
    results: Vec<RowsResult>,
    current: usize,
    pos: usize,
    rows_delivered: u64,
    state: CursorState,
}

impl ResultSetCursor {
    pub fn new(session: Arc<dyn Session>, fetch_size: u32, results: Vec<RowsResult>) -> Self {
        let results = if results.is_empty() {
            vec![RowsResult::NoResult]
        } else {
            results
        };
        Self {
            session,
            fetch_size,
            results,
            current: 0,
            pos: 0,
            rows_delivered: 0,
            state: CursorState::Active,
        }
    }

    pub fn from_query(session: Arc<dyn Session>, fetch_size: u32, reply: QueryReply) -> Self {
        Self::new(session, fetch_size, vec![RowsResult::from_query(reply)])
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, CursorState::Closed)
    }

    /// Descriptors of the active result set
    pub fn columns(&self) -> &[FieldDescriptor] {
        self.active().columns()
    }

    /// Server id of the active result set
    pub fn result_set_id(&self) -> Option<ResultSetId> {
        self.active().result_set_id()
    }

    /// Index of the active result set
    pub fn result_set_index(&self) -> usize {
        self.current
    }

    pub fn column(&self, idx: usize) -> Result<&FieldDescriptor> {
        self.columns().get(idx).ok_or_else(|| {
            Error::BadUsageError(format!("column index {idx} out of range"))
        })
    }

    pub fn column_type_name(&self, idx: usize) -> Result<String> {
        Ok(self.column(idx)?.type_code.type_name())
    }

    pub fn column_length(&self, idx: usize) -> Result<(i64, bool)> {
        Ok(self.column(idx)?.length())
    }

    pub fn column_precision_scale(&self, idx: usize) -> Result<(i64, i64, bool)> {
        Ok(self.column(idx)?.precision_scale())
    }

    pub fn column_nullable(&self, idx: usize) -> Result<bool> {
        Ok(self.column(idx)?.nullable())
    }

    fn active(&self) -> &RowsResult {
        &self.results[self.current]
    }

    /// Next row of the active result set, `None` once it is drained.
    ///
    /// Fetches at most one page per call. A failed fetch is terminal: this and
    /// every later call return the same [`Error::Fetch`] until [`Self::close`].
    #[expect(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Row>> {
        match &self.state {
            CursorState::Active => {}
            CursorState::Exhausted => return Ok(None),
            CursorState::Closed => {
                return Err(Error::BadUsageError("cursor is closed".to_owned()));
            }
            CursorState::Errored(err) => return Err(Error::Fetch(err.clone())),
        }

        if self.pos >= self.active().row_count() {
            if self.active().is_last_packet() {
                self.state = CursorState::Exhausted;
                return Ok(None);
            }
            self.fetch()?;
            if self.active().row_count() == 0 {
                self.state = CursorState::Exhausted;
                return Ok(None);
            }
        }

        let row_number = self.rows_delivered;
        let idx = self.pos;
        self.pos += 1;
        self.rows_delivered += 1;
        let mut row = self.active().copy_row(idx, self.current, row_number)?;
        self.bind_lobs(&mut row);
        Ok(Some(row))
    }

    fn bind_lobs(&self, row: &mut Row) {
        for value in row.values_mut() {
            if let Value::Lob(lob) = value {
                lob.bind(&self.session);
            }
        }
    }

    #[instrument(skip_all, fields(result_set = self.current))]
    fn fetch(&mut self) -> Result<()> {
        let RowsResult::Query { id, .. } = *self.active() else {
            return Err(Error::LibraryBug(crate::error::eyre!(
                "fetch on a client-side result"
            )));
        };
        match self.session.fetch_next(id, self.fetch_size) {
            Ok(next) => {
                tracing::debug!(
                    result_set_id = id,
                    rows = next.rows.len(),
                    is_last = next.is_last,
                    "fetched page"
                );
                if let RowsResult::Query { page, released, .. } = &mut self.results[self.current] {
                    *released = next.is_last;
                    *page = next;
                }
                self.pos = 0;
                Ok(())
            }
            Err(e) => {
                let err = FetchError {
                    result_set: self.current,
                    rows_delivered: self.rows_delivered,
                    source: Arc::new(e),
                };
                tracing::debug!(error = %err, "fetch failed");
                self.state = CursorState::Errored(err.clone());
                Err(Error::Fetch(err))
            }
        }
    }

    /// Iterate the rows of the active result set. Stops after the first error.
    pub fn rows(&mut self) -> Rows<'_> {
        Rows {
            cursor: self,
            done: false,
        }
    }

    pub fn has_more_result_sets(&self) -> bool {
        matches!(self.state, CursorState::Active | CursorState::Exhausted)
            && self.current + 1 < self.results.len()
    }

    /// Move to the next result set, releasing the current one.
    ///
    /// Returns `false` if there is none.
    pub fn advance_result_set(&mut self) -> Result<bool> {
        match &self.state {
            CursorState::Active | CursorState::Exhausted => {}
            CursorState::Closed => {
                return Err(Error::BadUsageError("cursor is closed".to_owned()));
            }
            CursorState::Errored(err) => return Err(Error::Fetch(err.clone())),
        }
        if self.current + 1 >= self.results.len() {
            return Ok(false);
        }
        let released = self.release(self.current);
        self.current += 1;
        self.pos = 0;
        self.rows_delivered = 0;
        self.state = CursorState::Active;
        released.map(|()| true)
    }

    fn release(&mut self, idx: usize) -> Result<()> {
        if let RowsResult::Query { id, released, .. } = &mut self.results[idx] {
            if !*released {
                *released = true;
                tracing::debug!(result_set_id = *id, "closing result set");
                return self.session.close_result_set(*id);
            }
        }
        Ok(())
    }

    /// Release the server handles of every result set not yet drained.
    ///
    /// Idempotent. After a failed fetch nothing is sent to the server.
    #[instrument(skip_all)]
    pub fn close(&mut self) -> Result<()> {
        let previous = std::mem::replace(&mut self.state, CursorState::Closed);
        match previous {
            CursorState::Closed | CursorState::Errored(_) => return Ok(()),
            CursorState::Active | CursorState::Exhausted => {}
        }
        let mut first_err = None;
        for idx in 0..self.results.len() {
            if let Err(e) = self.release(idx) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl Drop for ResultSetCursor {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "failed to close result set on drop");
        }
    }
}

/// Iterator over the rows of the active result set
pub struct Rows<'a> {
    cursor: &'a mut ResultSetCursor,
    done: bool,
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.next() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for Rows<'_> {}
