//! Line-oriented transport shared by client and server.

pub mod line;

pub use line::LineTransport;
