#![deny(missing_docs)]
//! Tool registry for colloquy.
//!
//! Tools are stored as type-erased [`ToolDyn`] trait objects in a name-keyed
//! table. The registry exposes the catalog offered to the model and a single
//! bounded invocation entry point.

pub mod func;
pub mod registry;
pub mod tool;

pub use func::{FnTool, tool_fn};
pub use registry::{DEFAULT_TOOL_TIMEOUT, ToolRegistry};
pub use tool::{ToolContext, ToolDyn, ToolError, ToolFuture};
