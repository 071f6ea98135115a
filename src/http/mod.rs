//! HTTP/1.1 wire handling
//!
//! Request encoding and response decoding over a raw byte stream. The
//! decoder delimits bodies with `Content-Length` or chunked
//! transfer-encoding; anything else is a framing error.

pub mod decoder;
pub mod request;
pub mod response;

pub use request::{parse_destination, Method, Request};
pub use response::Response;

/// Default read chunk size for response decoding
pub const READ_CHUNK_SIZE: usize = 8192;
