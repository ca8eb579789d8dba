//! Remote protocol source — a thin client over an external tool-serving
//! process, speaking newline-delimited JSON-RPC over stdio.

mod protocol;
mod transport;

pub use protocol::{JsonRpcError, RemoteToolDef, ToolCallResult, ToolsListResult};
pub use transport::{StdioTransport, TransportError};

use std::collections::BTreeSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use td_core::source::{strip_source_prefix, Source};
use td_core::{Error, SharedTool, SourceKind, ToolDescriptor};

fn descriptor_from_remote(source_id: &str, def: &RemoteToolDef) -> ToolDescriptor {
    ToolDescriptor {
        id: format!("{source_id}:{}", def.name),
        name: def.name.clone(),
        description: def.description.clone(),
        parameters: def.input_schema.clone(),
        categories: def.categories.iter().cloned().collect::<BTreeSet<_>>(),
        keywords: def.keywords.iter().cloned().collect::<BTreeSet<_>>(),
        source_kind: SourceKind::Remote,
        source_id: source_id.to_string(),
    }
}

/// A tool handle that forwards invocations to the remote process over the
/// shared transport.
struct RemoteTool {
    source_id: String,
    tool_name: String,
    transport: std::sync::Arc<StdioTransport>,
}

#[async_trait]
impl td_core::ExecutableTool for RemoteTool {
    async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value, Error> {
        let params = serde_json::json!({ "name": self.tool_name, "arguments": arguments });
        let resp = self
            .transport
            .send_request("tools/call", Some(params))
            .await
            .map_err(|cause| Error::ToolExecutionFailed {
                tool_name: self.tool_name.clone(),
                cause: format!("[{}] {cause}", self.source_id),
            })?;

        if resp.is_error() {
            let err = resp.error.clone().unwrap();
            return Err(Error::ToolExecutionFailed {
                tool_name: self.tool_name.clone(),
                cause: format!("[{}] {err}", self.source_id),
            });
        }

        let value = resp.result.unwrap_or(serde_json::Value::Null);
        let result: ToolCallResult =
            serde_json::from_value(value).map_err(|e| Error::ToolExecutionFailed {
                tool_name: self.tool_name.clone(),
                cause: format!("[{}] malformed tools/call response: {e}", self.source_id),
            })?;

        if result.is_error {
            return Err(Error::ToolExecutionFailed {
                tool_name: self.tool_name.clone(),
                cause: format!("[{}] {:?}", self.source_id, result.result),
            });
        }

        Ok(result.result)
    }
}

/// Source backed by one external process. Performs one `tools/list` call
/// on first access and memoizes the result for the life of the source.
pub struct RemoteSource {
    id: String,
    transport: std::sync::Arc<StdioTransport>,
    cached: Mutex<Option<Vec<ToolDescriptor>>>,
}

impl RemoteSource {
    /// Spawn `command args...` and wrap it as a remote source named `id`.
    pub fn spawn(id: impl Into<String>, command: &str, args: &[String]) -> Result<Self, Error> {
        let id = id.into();
        let transport = StdioTransport::spawn(command, args).map_err(|cause| {
            Error::SourceResolveFailed {
                source_id: id.clone(),
                cause: cause.to_string(),
            }
        })?;
        Ok(Self {
            id,
            transport: std::sync::Arc::new(transport),
            cached: Mutex::new(None),
        })
    }

    async fn list_remote(&self) -> Result<Vec<ToolDescriptor>, Error> {
        let resp = self
            .transport
            .send_request("tools/list", None)
            .await
            .map_err(|cause| Error::SourceResolveFailed {
                source_id: self.id.clone(),
                cause: cause.to_string(),
            })?;

        if resp.is_error() {
            let err = resp.error.clone().unwrap();
            return Err(Error::SourceResolveFailed {
                source_id: self.id.clone(),
                cause: err.to_string(),
            });
        }

        let value = resp.result.unwrap_or(serde_json::Value::Null);
        let parsed: ToolsListResult =
            serde_json::from_value(value).map_err(|e| Error::SourceResolveFailed {
                source_id: self.id.clone(),
                cause: format!("malformed tools/list response: {e}"),
            })?;

        Ok(parsed
            .tools
            .iter()
            .map(|def| descriptor_from_remote(&self.id, def))
            .collect())
    }

    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}

#[async_trait]
impl Source for RemoteSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn get_descriptors(&self) -> Result<Vec<ToolDescriptor>, Error> {
        if let Some(cached) = self.cached.lock().clone() {
            return Ok(cached);
        }
        let descriptors = self.list_remote().await?;
        *self.cached.lock() = Some(descriptors.clone());
        Ok(descriptors)
    }

    async fn get_tool(&self, id: &str) -> Result<Option<SharedTool>, Error> {
        let local = strip_source_prefix(&self.id, id);
        let descriptors = self.get_descriptors().await?;
        if !descriptors.iter().any(|d| d.name == local) {
            return Ok(None);
        }
        if !self.transport.is_alive() {
            return Err(Error::SourceResolveFailed {
                source_id: self.id.clone(),
                cause: "remote process is not alive".to_string(),
            });
        }
        Ok(Some(std::sync::Arc::new(RemoteTool {
            source_id: self.id.clone(),
            tool_name: local.to_string(),
            transport: self.transport.clone(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_from_remote_builds_qualified_id() {
        let def = RemoteToolDef {
            name: "read_file".into(),
            description: "reads a file".into(),
            input_schema: serde_json::json!({"type": "object"}),
            categories: vec!["fs".into()],
            keywords: vec![],
        };
        let descriptor = descriptor_from_remote("fsserver", &def);
        assert_eq!(descriptor.id, "fsserver:read_file");
        assert_eq!(descriptor.source_kind, SourceKind::Remote);
        assert!(descriptor.categories.contains("fs"));
    }
}
