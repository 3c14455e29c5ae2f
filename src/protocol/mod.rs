pub mod cesu8;
pub mod decimal;
pub mod field;
pub mod lob;
pub mod primitive;
mod row;
pub mod temporal;

pub use field::{decode_field, encode_param, encode_params};
pub use row::{RawRow, read_field, read_rows};
