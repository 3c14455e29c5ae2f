//! The boundary to the transport.
//!
//! A [`Session`] performs one request/response round trip per call. Implementations
//! serialize concurrent calls themselves; the methods take `&self`.

use std::sync::Arc;

use auto_impl::auto_impl;

use crate::col::FieldDescriptor;
use crate::error::Result;
use crate::protocol::RawRow;
use crate::value::Value;

pub type SessionId = u64;
pub type ResultSetId = u64;
pub type LocatorId = u64;

/// One page of rows of a result set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSetPage {
    pub rows: Vec<RawRow>,
    /// No page follows this one; the server released the result set
    pub is_last: bool,
}

impl ResultSetPage {
    pub fn new(rows: Vec<RawRow>, is_last: bool) -> Self {
        Self { rows, is_last }
    }

    /// Split a row-data part into a page
    pub fn from_row_data(
        fields: &[FieldDescriptor],
        data: &[u8],
        row_count: usize,
        is_last: bool,
    ) -> Result<Self> {
        Ok(Self {
            rows: crate::protocol::read_rows(fields, data, row_count)?,
            is_last,
        })
    }
}

/// Reply to a query execution
#[derive(Debug, Clone)]
pub struct QueryReply {
    pub result_set_id: ResultSetId,
    pub fields: Arc<[FieldDescriptor]>,
    pub page: ResultSetPage,
}

/// A table-valued output of a procedure call
#[derive(Debug, Clone)]
pub struct TableOutput {
    /// Name of the output parameter
    pub name: String,
    pub reply: QueryReply,
}

/// Reply to a procedure call
#[derive(Debug, Clone, Default)]
pub struct CallReply {
    /// Scalar output parameters
    pub out_fields: Arc<[FieldDescriptor]>,
    pub out_row: Option<RawRow>,
    pub tables: Vec<TableOutput>,
}

/// Reply to a LOB read request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LobChunk {
    pub data: Vec<u8>,
    pub is_eof: bool,
}

#[auto_impl(&, Box, Arc)]
pub trait Session: Send + Sync {
    fn id(&self) -> SessionId;

    fn execute_query(&self, sql: &str, args: &[Value]) -> Result<QueryReply>;

    fn execute_call(&self, sql: &str, args: &[Value]) -> Result<CallReply>;

    /// Fetch the next page of an open result set
    fn fetch_next(&self, result_set_id: ResultSetId, fetch_size: u32) -> Result<ResultSetPage>;

    fn close_result_set(&self, result_set_id: ResultSetId) -> Result<()>;

    /// Read up to `max_len` units starting at the 0-based `offset`.
    ///
    /// Units are characters for character-encoded LOBs and bytes otherwise.
    fn read_lob_chunk(&self, locator: LocatorId, offset: u64, max_len: u32) -> Result<LobChunk>;

    /// Append `data` to a LOB being written; returns the number of bytes accepted
    fn write_lob_chunk(&self, locator: LocatorId, data: &[u8], is_last: bool) -> Result<u64>;

    fn close(&self) -> Result<()>;
}
