//! Tool server processes: a child process for production, an in-process
//! task for embedding and tests.

pub mod child;
pub mod in_process;
pub mod shell;

pub use child::ChildProcessConnector;
pub use in_process::InProcessConnector;
