//! Provider-agnostic tool-call and executable-tool types.
//!
//! The core never talks to an LLM transport directly; it only needs a
//! common shape for tool calls/results so the controller can drive an
//! injected [`crate::llm::Llm`] without knowing which provider backs it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// A tool-call record as emitted by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
}

/// Definition of a tool as bound to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// Opaque JSON-Schema-shaped parameter schema.
    pub parameters: Value,
}

/// Name of the built-in meta-tool through which the model expresses
/// discovery queries.
pub const SEARCH_TOOL_NAME: &str = "search";

/// A resolved, invocable tool handle produced by a [`crate::source::Source`].
#[async_trait]
pub trait ExecutableTool: Send + Sync {
    /// Invoke the tool with model-provided arguments.
    async fn call(&self, arguments: Value) -> Result<Value, Error>;
}

/// An [`ExecutableTool`] built from a plain async closure — convenient for
/// in-memory sources and tests.
pub struct FnTool<F>(pub F);

#[async_trait]
impl<F, Fut> ExecutableTool for FnTool<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Value, Error>> + Send,
{
    async fn call(&self, arguments: Value) -> Result<Value, Error> {
        (self.0)(arguments).await
    }
}

pub type SharedTool = Arc<dyn ExecutableTool>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fn_tool_invokes_closure() {
        let tool = FnTool(|args: Value| async move { Ok(args) });
        let result = tool.call(serde_json::json!({"a": 1})).await.unwrap();
        assert_eq!(result, serde_json::json!({"a": 1}));
    }
}
