//! The model boundary the controller drives. Field-compatible with
//! `ChatRequest`/`ChatResponse`-shaped providers (`content: String`,
//! `tool_calls: Vec<ToolCall>`) so a real adapter is a thin wrapper, but
//! the core never depends on a transport crate itself.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Error;
use crate::message::Message;
use crate::tool::{ToolCall, ToolDefinition};

/// A completed model reply.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl LlmReply {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn requests(&self, tool_name: &str) -> bool {
        self.tool_calls.iter().any(|c| c.name == tool_name)
    }
}

/// A model bound to a fixed tool set for the remainder of a turn.
#[async_trait]
pub trait BoundLlm: Send + Sync {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmReply, Error>;
}

/// Entry point for binding a model to the tools available at a given
/// point in the controller's state machine. Implementations typically
/// close over a provider client and a model identifier.
#[async_trait]
pub trait Llm: Send + Sync {
    async fn bind_tools(&self, tools: &[ToolDefinition]) -> Arc<dyn BoundLlm>;
}
