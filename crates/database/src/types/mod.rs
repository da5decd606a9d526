//! Shared types and result types for the database layer

pub mod errors;
pub mod timestamp;

pub use errors::{ChatError, ErrorKind};
pub use timestamp::{decode_timestamp, encode_timestamp, epoch, now_timestamp};

pub type ChatResult<T> = Result<T, ChatError>;
