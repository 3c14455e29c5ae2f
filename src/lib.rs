pub mod cache;
pub mod col;
mod conn;
pub mod constant;
pub mod cursor;
pub mod error;
pub mod lob;
mod opts;
pub mod protocol;
pub mod row;
pub mod session;
pub mod value;

pub use cache::{ResultSetCache, SharedCursor};
pub use conn::Conn;
pub use cursor::ResultSetCursor;
pub use opts::Opts;
pub use protocol::decimal::Decimal;
pub use row::Row;
pub use value::{FromValue, Value};

#[cfg(test)]
mod constant_test;
