//! In-memory session used by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use zero_hdb::col::FieldDescriptor;
use zero_hdb::constant::TypeCode;
use zero_hdb::error::{Error, Result, ServerError};
use zero_hdb::protocol::RawRow;
use zero_hdb::protocol::cesu8;
use zero_hdb::protocol::lob::encode_descriptor;
use zero_hdb::session::{
    CallReply, LobChunk, LocatorId, QueryReply, ResultSetId, ResultSetPage, Session, SessionId,
    TableOutput,
};
use zero_hdb::value::Value;

pub const LOB_AUTOCOMMIT_ERROR: i32 = 596;

pub type ScriptedPage = std::result::Result<Vec<RawRow>, ServerError>;

#[derive(Clone)]
struct Script {
    fields: Arc<[FieldDescriptor]>,
    pages: Vec<ScriptedPage>,
}

#[derive(Clone)]
struct CallScript {
    out_fields: Arc<[FieldDescriptor]>,
    out_row: Option<RawRow>,
    tables: Vec<(String, Script)>,
}

struct StoredLob {
    data: Vec<u8>,
    character_encoded: bool,
}

#[derive(Default)]
struct State {
    queries: HashMap<String, Script>,
    calls: HashMap<String, CallScript>,
    open: HashMap<ResultSetId, VecDeque<ScriptedPage>>,
    next_id: ResultSetId,
    lobs: HashMap<LocatorId, StoredLob>,
    autocommit: bool,
    fail_lob_read_after: Option<usize>,
    fail_close: bool,
    closed: bool,

    fetches: Vec<(ResultSetId, u32)>,
    closed_result_sets: Vec<ResultSetId>,
    lob_reads: Vec<(LocatorId, u64, u32)>,
    lob_writes: Vec<(LocatorId, usize, bool)>,
    executed: Vec<(String, Vec<Value>)>,
}

pub struct MockSession {
    id: SessionId,
    state: Mutex<State>,
}

impl MockSession {
    /// Result-set ids of the session start at `id * 1000 + 1`
    pub fn new(id: SessionId) -> Arc<Self> {
        Arc::new(Self {
            id,
            state: Mutex::new(State {
                next_id: id * 1000 + 1,
                autocommit: true,
                ..Default::default()
            }),
        })
    }

    pub fn add_query(&self, sql: &str, fields: Vec<FieldDescriptor>, pages: Vec<ScriptedPage>) {
        self.state.lock().queries.insert(
            sql.to_owned(),
            Script {
                fields: fields.into(),
                pages,
            },
        );
    }

    pub fn add_call(
        &self,
        sql: &str,
        out_fields: Vec<FieldDescriptor>,
        out_row: Option<RawRow>,
        tables: Vec<(&str, Vec<FieldDescriptor>, Vec<ScriptedPage>)>,
    ) {
        let tables = tables
            .into_iter()
            .map(|(name, fields, pages)| {
                (
                    name.to_owned(),
                    Script {
                        fields: fields.into(),
                        pages,
                    },
                )
            })
            .collect();
        self.state.lock().calls.insert(
            sql.to_owned(),
            CallScript {
                out_fields: out_fields.into(),
                out_row,
                tables,
            },
        );
    }

    pub fn add_lob(&self, locator: LocatorId, data: Vec<u8>, character_encoded: bool) {
        self.state.lock().lobs.insert(
            locator,
            StoredLob {
                data,
                character_encoded,
            },
        );
    }

    pub fn lob_data(&self, locator: LocatorId) -> Option<Vec<u8>> {
        self.state.lock().lobs.get(&locator).map(|l| l.data.clone())
    }

    pub fn set_autocommit(&self, autocommit: bool) {
        self.state.lock().autocommit = autocommit;
    }

    pub fn fail_lob_read_after(&self, reads: usize) {
        self.state.lock().fail_lob_read_after = Some(reads);
    }

    pub fn fail_close(&self) {
        self.state.lock().fail_close = true;
    }

    pub fn fetches(&self) -> Vec<(ResultSetId, u32)> {
        self.state.lock().fetches.clone()
    }

    pub fn closed_result_sets(&self) -> Vec<ResultSetId> {
        self.state.lock().closed_result_sets.clone()
    }

    pub fn lob_reads(&self) -> Vec<(LocatorId, u64, u32)> {
        self.state.lock().lob_reads.clone()
    }

    pub fn lob_writes(&self) -> Vec<(LocatorId, usize, bool)> {
        self.state.lock().lob_writes.clone()
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().executed.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Row-data payload of a LOB field whose first `inline` bytes are sent with the row
    pub fn lob_payload(&self, tc: TypeCode, locator: LocatorId, inline: usize) -> Vec<u8> {
        let state = self.state.lock();
        let lob = &state.lobs[&locator];
        let inline = inline.min(lob.data.len());
        let char_length = cesu8::char_count(&lob.data) as u64;
        encode_descriptor(
            tc,
            locator,
            char_length,
            lob.data.len() as u64,
            &lob.data[..inline],
            inline == lob.data.len(),
        )
        .unwrap()
    }
}

fn open_reply(state: &mut State, script: Script) -> Result<QueryReply> {
    let id = state.next_id;
    state.next_id += 1;
    let mut pages: VecDeque<ScriptedPage> = script.pages.into();
    let first = match pages.pop_front() {
        Some(page) => page.map_err(Error::ServerError)?,
        None => Vec::new(),
    };
    let is_last = pages.is_empty();
    if !is_last {
        state.open.insert(id, pages);
    }
    Ok(QueryReply {
        result_set_id: id,
        fields: script.fields,
        page: ResultSetPage::new(first, is_last),
    })
}

fn not_found(what: &str) -> Error {
    Error::ServerError(ServerError::new(259, "HY000", format!("invalid {what}")))
}

impl Session for MockSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn execute_query(&self, sql: &str, args: &[Value]) -> Result<QueryReply> {
        let mut state = self.state.lock();
        state.executed.push((sql.to_owned(), args.to_vec()));
        let script = state
            .queries
            .get(sql)
            .cloned()
            .ok_or_else(|| not_found("query"))?;
        open_reply(&mut state, script)
    }

    fn execute_call(&self, sql: &str, args: &[Value]) -> Result<CallReply> {
        let mut state = self.state.lock();
        state.executed.push((sql.to_owned(), args.to_vec()));
        let script = state
            .calls
            .get(sql)
            .cloned()
            .ok_or_else(|| not_found("procedure"))?;
        let mut tables = Vec::new();
        for (name, table) in script.tables {
            tables.push(TableOutput {
                name,
                reply: open_reply(&mut state, table)?,
            });
        }
        Ok(CallReply {
            out_fields: script.out_fields,
            out_row: script.out_row,
            tables,
        })
    }

    fn fetch_next(&self, result_set_id: ResultSetId, fetch_size: u32) -> Result<ResultSetPage> {
        let mut state = self.state.lock();
        state.fetches.push((result_set_id, fetch_size));
        let pages = state
            .open
            .get_mut(&result_set_id)
            .ok_or_else(|| not_found("result set id"))?;
        let page = pages.pop_front().ok_or_else(|| not_found("result set id"))?;
        let is_last = pages.is_empty();
        if is_last {
            state.open.remove(&result_set_id);
        }
        Ok(ResultSetPage::new(page.map_err(Error::ServerError)?, is_last))
    }

    fn close_result_set(&self, result_set_id: ResultSetId) -> Result<()> {
        let mut state = self.state.lock();
        state.closed_result_sets.push(result_set_id);
        state.open.remove(&result_set_id);
        Ok(())
    }

    fn read_lob_chunk(&self, locator: LocatorId, offset: u64, max_len: u32) -> Result<LobChunk> {
        let mut state = self.state.lock();
        state.lob_reads.push((locator, offset, max_len));
        if let Some(limit) = state.fail_lob_read_after {
            if state.lob_reads.len() > limit {
                return Err(Error::IoError(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset",
                )));
            }
        }
        let lob = state.lobs.get(&locator).ok_or_else(|| not_found("locator"))?;
        let (start, end) = if lob.character_encoded {
            let starts: Vec<usize> = lob
                .data
                .iter()
                .enumerate()
                .filter(|&(_, b)| b & 0xC0 != 0x80)
                .map(|(i, _)| i)
                .collect();
            let unit = |n: u64| {
                starts
                    .get(n as usize)
                    .copied()
                    .unwrap_or(lob.data.len())
            };
            (unit(offset), unit(offset + u64::from(max_len)))
        } else {
            let start = (offset as usize).min(lob.data.len());
            (start, (start + max_len as usize).min(lob.data.len()))
        };
        Ok(LobChunk {
            data: lob.data[start..end].to_vec(),
            is_eof: end == lob.data.len(),
        })
    }

    fn write_lob_chunk(&self, locator: LocatorId, data: &[u8], is_last: bool) -> Result<u64> {
        let mut state = self.state.lock();
        state.lob_writes.push((locator, data.len(), is_last));
        if state.autocommit {
            return Err(Error::ServerError(ServerError::new(
                LOB_AUTOCOMMIT_ERROR,
                "HY000",
                "LOB streaming is not permitted in auto-commit mode",
            )));
        }
        let lob = state.lobs.entry(locator).or_insert_with(|| StoredLob {
            data: Vec::new(),
            character_encoded: false,
        });
        lob.data.extend_from_slice(data);
        Ok(data.len() as u64)
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.closed = true;
        if state.fail_close {
            return Err(Error::IoError(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "broken pipe",
            )));
        }
        Ok(())
    }
}

pub fn int_field(name: &str) -> FieldDescriptor {
    FieldDescriptor::new(TypeCode::Integer, name)
}

pub fn int_row(v: i32) -> RawRow {
    RawRow::new(vec![Some(v.to_le_bytes().to_vec())])
}

pub fn int_rows(values: std::ops::Range<i32>) -> Vec<RawRow> {
    values.map(int_row).collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
