//! Wire protocol: envelope types and the newline-delimited JSON codec.
//!
//! - [`envelope`] - [`Request`], [`Response`], the closed [`Method`] set and
//!   stable [`ErrorCode`]s
//! - [`codec`] - `encode_*` / `decode_*` for single lines

pub mod codec;
pub mod envelope;

pub use codec::{
    RequestDecodeError, decode_request, decode_response, encode_request, encode_response,
};
pub use envelope::{
    ErrorCode, JSONRPC_VERSION, Method, PROTOCOL_VERSION, Request, RequestId, Response,
    ResponseError,
};
