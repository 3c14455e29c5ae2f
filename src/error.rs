use std::sync::Arc;

use thiserror::Error;

use crate::constant::TypeCode;

pub use color_eyre::eyre::eyre;

/// Error reported by the server for a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SQL error {code} ({sql_state}): {text}")]
pub struct ServerError {
    pub code: i32,
    pub position: i32,
    pub sql_state: String,
    pub text: String,
}

impl ServerError {
    pub fn new(code: i32, sql_state: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            code,
            position: 0,
            sql_state: sql_state.into(),
            text: text.into(),
        }
    }
}

/// A failed page fetch. Terminal for the cursor that issued it.
#[derive(Debug, Clone, Error)]
#[error("fetch failed for result set {result_set} after {rows_delivered} rows: {source}")]
pub struct FetchError {
    /// Index of the result set within its execution
    pub result_set: usize,
    /// Number of rows the cursor handed out before the failure
    pub rows_delivered: u64,
    #[source]
    pub source: Arc<Error>,
}

/// A failed LOB chunk transfer. Terminal for the LOB handle that issued it.
#[derive(Debug, Clone, Error)]
#[error("lob stream failed for locator {locator} at offset {offset}: {source}")]
pub struct LobStreamError {
    pub locator: u64,
    pub offset: u64,
    #[source]
    pub source: Arc<Error>,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Server Error: {0}")]
    ServerError(#[from] ServerError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Bad config error: {0}")]
    BadConfigError(String),

    #[error("Bad usage error: {0}")]
    BadUsageError(String),

    #[error("Invalid packet")]
    InvalidPacket,

    #[error("Unexpected end of data")]
    UnexpectedEof,

    /// The server sent a type code this client does not know.
    /// Client and server disagree on the protocol version.
    #[error("Unknown type code: 0x{0:02X}")]
    UnknownTypeCode(u8),

    /// A registered type code this client cannot decode or encode
    #[error("Unsupported type code: {}", .0.type_name())]
    UnsupportedTypeCode(TypeCode),

    #[error("result set {result_set}, row {row}, field {field}: {source}")]
    Field {
        result_set: usize,
        row: u64,
        field: usize,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    LobStream(#[from] LobStreamError),

    #[error("No cached result set with id {0}")]
    CacheMiss(u64),

    #[error("Library bug: {0}")]
    LibraryBug(color_eyre::Report),
}

impl Error {
    pub fn from_debug(err: impl std::fmt::Debug) -> Self {
        Self::LibraryBug(eyre!("{:?}", err))
    }

    /// Whether the error means client and server speak different protocol versions.
    pub fn is_protocol_mismatch(&self) -> bool {
        match self {
            Self::UnknownTypeCode(_) | Self::UnsupportedTypeCode(_) => true,
            Self::Field { source, .. } => source.is_protocol_mismatch(),
            _ => false,
        }
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::IoError(io) => io,
            other => std::io::Error::other(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
