//! Shared types for the tool-discovery substrate: descriptors, the
//! `Source` contract, provider-agnostic tool-call types, the event
//! channel, configuration knobs, and the error taxonomy.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod llm;
pub mod message;
pub mod source;
pub mod tool;

pub use descriptor::{SourceKind, ToolDescriptor};
pub use error::{Error, Result};
pub use event::{EventChannel, Handler, SubscriptionId};
pub use llm::{BoundLlm, Llm, LlmReply};
pub use message::{Message, Role};
pub use source::Source;
pub use tool::{ExecutableTool, FnTool, SharedTool, ToolCall, ToolDefinition, SEARCH_TOOL_NAME};
