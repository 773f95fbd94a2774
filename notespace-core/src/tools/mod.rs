pub mod args;
pub mod complete;
pub mod dispatcher;
pub mod file;
pub mod folder;
pub mod registry;
pub mod types;

pub use dispatcher::ToolDispatcher;
pub use registry::ToolRegistry;
pub use types::{Tool, ToolContext, ToolResult};
