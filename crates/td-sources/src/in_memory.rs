//! In-memory source — descriptors and tools built from a fixed collection.
//!
//! The simplest [`Source`] variant: `get_descriptors` returns the
//! precomputed list, `get_tool` is a map lookup. Never refreshes.

use std::collections::HashMap;

use async_trait::async_trait;

use td_core::source::{strip_source_prefix, Source};
use td_core::{Error, SharedTool, ToolDescriptor};

/// A source built once from a fixed array of descriptor/tool pairs, the
/// way a process registers its built-in tools at startup.
pub struct InMemorySource {
    id: String,
    descriptors: Vec<ToolDescriptor>,
    tools: HashMap<String, SharedTool>,
}

impl InMemorySource {
    /// Build from `(descriptor, tool)` pairs. Descriptor ids are expected
    /// to already carry the `<id>:` qualifier, though `get_tool` accepts
    /// bare local names too.
    pub fn new(id: impl Into<String>, entries: Vec<(ToolDescriptor, SharedTool)>) -> Self {
        let id = id.into();
        let mut descriptors = Vec::with_capacity(entries.len());
        let mut tools = HashMap::with_capacity(entries.len());
        for (descriptor, tool) in entries {
            tools.insert(descriptor.id.clone(), tool);
            descriptors.push(descriptor);
        }
        Self {
            id,
            descriptors,
            tools,
        }
    }
}

#[async_trait]
impl Source for InMemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn get_descriptors(&self) -> Result<Vec<ToolDescriptor>, Error> {
        Ok(self.descriptors.clone())
    }

    async fn get_tool(&self, id: &str) -> Result<Option<SharedTool>, Error> {
        if let Some(tool) = self.tools.get(id) {
            return Ok(Some(tool.clone()));
        }
        // Fall back to bare local-name lookup.
        let local = strip_source_prefix(&self.id, id);
        let qualified = format!("{}:{}", self.id, local);
        Ok(self.tools.get(&qualified).cloned())
    }
}
