use std::sync::Arc;

use parking_lot::Mutex;
use tracing::instrument;

use crate::cache::{ResultSetCache, SharedCursor};
use crate::col::FieldDescriptor;
use crate::constant::TypeCode;
use crate::cursor::{ResultSetCursor, RowsResult};
use crate::error::{Error, Result};
use crate::lob::{Lob, LobReader, LobWriter};
use crate::opts::Opts;
use crate::protocol::{RawRow, decode_field};
use crate::session::{CallReply, LocatorId, ResultSetId, Session, SessionId};
use crate::value::Value;

/// A session bound to client options and the shared result-set cache.
///
/// Closing (or dropping) the connection evicts every cached result set of its session.
pub struct Conn {
    session: Arc<dyn Session>,
    opts: Opts,
    cache: Arc<ResultSetCache>,
    closed: bool,
}

impl Conn {
    pub fn new(session: impl Session + 'static, opts: Opts, cache: Arc<ResultSetCache>) -> Self {
        Self {
            session: Arc::new(session),
            opts,
            cache,
            closed: false,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session.id()
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    pub fn cache(&self) -> &Arc<ResultSetCache> {
        &self.cache
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::BadUsageError("connection is closed".to_owned()));
        }
        Ok(())
    }

    #[instrument(skip_all)]
    pub fn query(&mut self, sql: &str, args: &[Value]) -> Result<ResultSetCursor> {
        self.check_open()?;
        let reply = self.session.execute_query(sql, args)?;
        tracing::debug!(
            result_set_id = reply.result_set_id,
            rows = reply.page.rows.len(),
            is_last = reply.page.is_last,
            "query executed"
        );
        Ok(ResultSetCursor::from_query(
            Arc::clone(&self.session),
            self.opts.fetch_size,
            reply,
        ))
    }

    /// Call a procedure.
    ///
    /// The first result set is one row of output parameters. Each table output
    /// adds a column to it: in legacy mode a `TableRef` column holding the id of
    /// a cached cursor (see [`Self::result_set_by_ref`]), otherwise a `TableRows`
    /// column holding [`Value::Rows`] with the id of a following result set.
    #[instrument(skip_all)]
    pub fn call(&mut self, sql: &str, args: &[Value]) -> Result<ResultSetCursor> {
        self.check_open()?;
        let reply = self.session.execute_call(sql, args)?;
        self.call_cursor(reply)
    }

    fn call_cursor(&self, reply: CallReply) -> Result<ResultSetCursor> {
        let mut fields: Vec<FieldDescriptor> = reply.out_fields.to_vec();
        let mut values = match &reply.out_row {
            Some(raw) => decode_out_row(&reply.out_fields, raw)?,
            None if fields.is_empty() => Vec::new(),
            None => return Err(Error::InvalidPacket),
        };

        let mut tables = Vec::new();
        for table in reply.tables {
            let id = table.reply.result_set_id;
            if self.opts.legacy {
                fields.push(FieldDescriptor::new(TypeCode::TableRef, table.name));
                values.push(Value::String(id.to_string()));
                let cursor = ResultSetCursor::from_query(
                    Arc::clone(&self.session),
                    self.opts.fetch_size,
                    table.reply,
                );
                self.cache
                    .register(id, self.session.id(), Arc::new(Mutex::new(cursor)));
            } else {
                fields.push(FieldDescriptor::new(TypeCode::TableRows, table.name));
                values.push(Value::Rows(id));
                tables.push(RowsResult::from_query(table.reply));
            }
        }

        let mut results = Vec::with_capacity(tables.len() + 1);
        if !fields.is_empty() {
            results.push(RowsResult::Call {
                fields: fields.into(),
                rows: vec![values],
            });
        }
        results.extend(tables);
        Ok(ResultSetCursor::new(
            Arc::clone(&self.session),
            self.opts.fetch_size,
            results,
        ))
    }

    /// The cached cursor of a legacy table output
    pub fn result_set_by_ref(&self, id: ResultSetId) -> Result<SharedCursor> {
        self.check_open()?;
        self.cache.get(id)
    }

    pub fn lob_reader(&self, lob: &Lob) -> Result<LobReader> {
        self.check_open()?;
        lob.reader(self.opts.lob_chunk_size)
    }

    /// Writer for a LOB parameter the server returned `locator` for
    pub fn lob_writer(&self, type_code: TypeCode, locator: LocatorId) -> Result<LobWriter> {
        self.check_open()?;
        Ok(LobWriter::new(
            Arc::clone(&self.session),
            type_code,
            locator,
            self.opts.lob_chunk_size as usize,
        ))
    }

    /// Evict the session's cached result sets and close the session.
    ///
    /// Eviction happens even if closing the session fails. Idempotent.
    #[instrument(skip_all)]
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.cache.evict_all(self.session.id());
        self.session.close()
    }
}

fn decode_out_row(fields: &[FieldDescriptor], raw: &RawRow) -> Result<Vec<Value>> {
    if raw.len() != fields.len() {
        return Err(Error::InvalidPacket);
    }
    fields
        .iter()
        .zip(raw.fields())
        .enumerate()
        .map(|(i, (desc, payload))| {
            decode_field(desc, payload).map_err(|e| Error::Field {
                result_set: 0,
                row: 0,
                field: i,
                source: Box::new(e),
            })
        })
        .collect()
}

impl Drop for Conn {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "failed to close session on drop");
        }
    }
}
