//! Large-object values and their chunked readers and writers.

use std::io;
use std::sync::Arc;

use tracing::instrument;

use crate::constant::TypeCode;
use crate::error::{Error, LobStreamError, Result};
use crate::protocol::cesu8;
use crate::protocol::lob::parse_descriptor;
use crate::session::{LocatorId, Session};

/// A LOB column value.
///
/// Holds the server locator and the chunk delivered with the row. The data is
/// only transferred through a [`LobReader`].
#[derive(Clone)]
pub struct Lob {
    type_code: TypeCode,
    locator: LocatorId,
    char_length: u64,
    byte_length: u64,
    first_chunk: Vec<u8>,
    complete: bool,
    session: Option<Arc<dyn Session>>,
}

impl Lob {
    /// Build from a non-NULL LOB field payload. The value is not bound to a session.
    pub fn from_payload(type_code: TypeCode, payload: &[u8]) -> Result<Self> {
        let (desc, chunk) = parse_descriptor(payload)?;
        Ok(Self {
            type_code,
            locator: desc.locator(),
            char_length: desc.char_length(),
            byte_length: desc.byte_length(),
            complete: desc.is_last_data(),
            first_chunk: chunk.to_vec(),
            session: None,
        })
    }

    pub(crate) fn bind(&mut self, session: &Arc<dyn Session>) {
        self.session = Some(Arc::clone(session));
    }

    pub fn is_bound(&self) -> bool {
        self.session.is_some()
    }

    pub fn type_code(&self) -> TypeCode {
        self.type_code
    }

    pub fn locator(&self) -> LocatorId {
        self.locator
    }

    pub fn is_character_encoded(&self) -> bool {
        self.type_code.is_character_encoded()
    }

    /// Total length in the LOB's offset unit (characters or bytes)
    pub fn len(&self) -> u64 {
        if self.is_character_encoded() {
            self.char_length
        } else {
            self.byte_length
        }
    }

    pub fn is_empty(&self) -> bool {
        self.byte_length == 0
    }

    pub fn byte_length(&self) -> u64 {
        self.byte_length
    }

    /// Open a reader that requests at most `chunk_size` units per round trip
    pub fn reader(&self, chunk_size: u32) -> Result<LobReader> {
        let session = self.session.as_ref().ok_or_else(|| {
            Error::BadUsageError(format!("LOB {} is not bound to a session", self.locator))
        })?;
        let consumed = units(self.is_character_encoded(), &self.first_chunk);
        Ok(LobReader {
            session: Arc::clone(session),
            locator: self.locator,
            character_encoded: self.is_character_encoded(),
            chunk_size: chunk_size.max(1),
            buffer: self.first_chunk.clone(),
            pos: 0,
            offset: consumed,
            eof: self.complete || consumed >= self.len(),
            state: StreamState::Open,
        })
    }
}

impl std::fmt::Debug for Lob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lob")
            .field("type_code", &self.type_code)
            .field("locator", &self.locator)
            .field("char_length", &self.char_length)
            .field("byte_length", &self.byte_length)
            .field("bound", &self.is_bound())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Lob {
    fn eq(&self, other: &Self) -> bool {
        self.type_code == other.type_code
            && self.locator == other.locator
            && self.char_length == other.char_length
            && self.byte_length == other.byte_length
            && self.first_chunk == other.first_chunk
    }
}

fn units(character_encoded: bool, data: &[u8]) -> u64 {
    let n = if character_encoded {
        cesu8::char_count(data)
    } else {
        data.len()
    };
    n as u64
}

#[derive(Debug, Clone)]
enum StreamState {
    Open,
    Closed,
    Errored(LobStreamError),
}

/// Reads a LOB chunk by chunk
pub struct LobReader {
    session: Arc<dyn Session>,
    locator: LocatorId,
    character_encoded: bool,
    chunk_size: u32,
    buffer: Vec<u8>,
    pos: usize,
    /// Units received so far; the offset of the next request
    offset: u64,
    eof: bool,
    state: StreamState,
}

impl LobReader {
    pub fn is_closed(&self) -> bool {
        matches!(self.state, StreamState::Closed)
    }

    pub fn close(&mut self) {
        if matches!(self.state, StreamState::Open) {
            self.state = StreamState::Closed;
        }
    }

    /// Read the remaining data and decode it as CESU-8
    pub fn read_text(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match self.read_some(&mut buf)? {
                0 => break,
                n => bytes.extend_from_slice(&buf[..n]),
            }
        }
        cesu8::decode(&bytes)
    }

    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match &self.state {
                StreamState::Open => {}
                StreamState::Closed => return Ok(0),
                StreamState::Errored(err) => return Err(Error::LobStream(err.clone())),
            }
            if self.pos < self.buffer.len() {
                let n = buf.len().min(self.buffer.len() - self.pos);
                buf[..n].copy_from_slice(&self.buffer[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if self.eof {
                self.state = StreamState::Closed;
                return Ok(0);
            }
            self.fill()?;
        }
    }

    #[instrument(skip_all, fields(locator = self.locator, offset = self.offset))]
    fn fill(&mut self) -> Result<()> {
        let chunk = match self
            .session
            .read_lob_chunk(self.locator, self.offset, self.chunk_size)
        {
            Ok(chunk) if chunk.data.is_empty() && !chunk.is_eof => Err(Error::InvalidPacket),
            other => other,
        };
        match chunk {
            Ok(chunk) => {
                self.offset += units(self.character_encoded, &chunk.data);
                self.buffer = chunk.data;
                self.pos = 0;
                self.eof = chunk.is_eof;
                Ok(())
            }
            Err(e) => {
                let err = LobStreamError {
                    locator: self.locator,
                    offset: self.offset,
                    source: Arc::new(e),
                };
                tracing::debug!(error = %err, "lob read failed");
                self.state = StreamState::Errored(err.clone());
                Err(Error::LobStream(err))
            }
        }
    }
}

impl io::Read for LobReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_some(buf)?)
    }
}

/// Writes a LOB in chunks of a fixed size
pub struct LobWriter {
    session: Arc<dyn Session>,
    locator: LocatorId,
    character_encoded: bool,
    chunk_size: usize,
    pending: Vec<u8>,
    written: u64,
    state: StreamState,
}

impl LobWriter {
    /// `locator` is the write locator returned by the server for a LOB parameter
    pub fn new(
        session: Arc<dyn Session>,
        type_code: TypeCode,
        locator: LocatorId,
        chunk_size: usize,
    ) -> Self {
        Self {
            session,
            locator,
            character_encoded: type_code.is_character_encoded(),
            chunk_size: chunk_size.max(1),
            pending: Vec::new(),
            written: 0,
            state: StreamState::Open,
        }
    }

    /// Bytes accepted by the server so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append text, encoded as CESU-8
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        let bytes = cesu8::encode_to_vec(text);
        self.write_bytes(&bytes)
    }

    /// Append bytes; full chunks are sent right away
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.check_open()?;
        self.pending.extend_from_slice(data);
        self.flush_full_chunks()
    }

    /// Send the remaining data and mark the LOB complete.
    ///
    /// Returns the total number of bytes written.
    pub fn finish(&mut self) -> Result<u64> {
        self.check_open()?;
        let rest = std::mem::take(&mut self.pending);
        self.send(&rest, true)?;
        self.state = StreamState::Closed;
        Ok(self.written)
    }

    fn check_open(&self) -> Result<()> {
        match &self.state {
            StreamState::Open => Ok(()),
            StreamState::Closed => Err(Error::BadUsageError(format!(
                "LOB writer for locator {} is closed",
                self.locator
            ))),
            StreamState::Errored(err) => Err(Error::LobStream(err.clone())),
        }
    }

    #[instrument(skip_all, fields(locator = self.locator, len = data.len(), is_last = is_last))]
    fn send(&mut self, data: &[u8], is_last: bool) -> Result<()> {
        match self.session.write_lob_chunk(self.locator, data, is_last) {
            Ok(n) => {
                self.written += n;
                Ok(())
            }
            Err(e) => {
                let err = LobStreamError {
                    locator: self.locator,
                    offset: self.written,
                    source: Arc::new(e),
                };
                tracing::debug!(error = %err, "lob write failed");
                self.state = StreamState::Errored(err.clone());
                Err(Error::LobStream(err))
            }
        }
    }

    fn flush_full_chunks(&mut self) -> Result<()> {
        while self.pending.len() >= self.chunk_size {
            let mut end = self.chunk_size;
            if self.character_encoded {
                end = cesu8::char_boundary(&self.pending[..end]);
                if end == 0 {
                    // a single character wider than the chunk size
                    end = self.chunk_size;
                }
            }
            let chunk: Vec<u8> = self.pending.drain(..end).collect();
            self.send(&chunk, false)?;
        }
        Ok(())
    }
}

impl io::Write for LobWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_open()?;
        Ok(())
    }
}

impl Drop for LobWriter {
    fn drop(&mut self) {
        if matches!(self.state, StreamState::Open) {
            tracing::warn!(
                locator = self.locator,
                pending = self.pending.len(),
                "LobWriter dropped without finish()"
            );
        }
    }
}
