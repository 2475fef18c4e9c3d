//! Application layer for toolgate
//!
//! This crate contains use cases, the process supervisor, and port definitions.
//! It depends only on the domain layer.

pub mod ports;
pub mod supervisor;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use ports::{
    channel::{ChannelConnector, RpcConnection},
    feature_switch::{FeatureSwitch, StaticSwitch},
    invocation_observer::{
        CompositeObserver, InvocationEvent, InvocationObserver, NoObserver, TracingObserver,
    },
    tool_executor::ToolExecutorPort,
    tool_handler::{AsyncFnHandler, FnHandler, ToolHandler, async_handler_fn, handler_fn},
};
pub use supervisor::{ProcessSupervisor, SupervisorError, SupervisorSettings};
pub use use_cases::dispatch::{DispatchError, RequestDispatcher, ServerInfo};
pub use use_cases::invoke_tool::{CallerScope, InvokerSettings, LIST_TOOLS, ToolInvoker};
