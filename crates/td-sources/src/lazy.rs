//! Lazy source — metadata is provided upfront, resolution happens via a
//! user-supplied resolver invoked on demand.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use td_core::source::{strip_source_prefix, Source};
use td_core::{Error, SharedTool, ToolDescriptor};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A user-supplied resolver: given a bare local name, produce an
/// executable (or fail). Invoked only when `get_tool` is actually called.
pub type Resolver = Arc<dyn Fn(String) -> BoxFuture<'static, Result<Option<SharedTool>, String>> + Send + Sync>;

/// Source whose descriptors are known upfront but whose executables are
/// materialized lazily through `resolver`. Resolver failures (process
/// spawn, dynamic import, network call) are wrapped as
/// `Error::SourceResolveFailed`.
pub struct LazySource {
    id: String,
    descriptors: Vec<ToolDescriptor>,
    resolver: Resolver,
}

impl LazySource {
    pub fn new(id: impl Into<String>, descriptors: Vec<ToolDescriptor>, resolver: Resolver) -> Self {
        Self {
            id: id.into(),
            descriptors,
            resolver,
        }
    }
}

#[async_trait]
impl Source for LazySource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn get_descriptors(&self) -> Result<Vec<ToolDescriptor>, Error> {
        Ok(self.descriptors.clone())
    }

    async fn get_tool(&self, id: &str) -> Result<Option<SharedTool>, Error> {
        let local = strip_source_prefix(&self.id, id).to_string();
        (self.resolver)(local)
            .await
            .map_err(|cause| Error::SourceResolveFailed {
                source_id: self.id.clone(),
                cause,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use td_core::tool::FnTool;
    use td_core::SourceKind;

    fn descriptor() -> ToolDescriptor {
        ToolDescriptor {
            id: "lazy:slow_tool".into(),
            name: "slow_tool".into(),
            description: "resolved on demand".into(),
            parameters: json!({"type": "object"}),
            categories: Default::default(),
            keywords: Default::default(),
            source_kind: SourceKind::Lazy,
            source_id: "lazy".into(),
        }
    }

    #[tokio::test]
    async fn get_tool_invokes_resolver_with_bare_name() {
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let seen2 = seen.clone();
        let resolver: Resolver = Arc::new(move |name: String| {
            let seen2 = seen2.clone();
            Box::pin(async move {
                *seen2.lock() = Some(name);
                let tool: SharedTool = Arc::new(FnTool(|args: serde_json::Value| async move { Ok(args) }));
                Ok(Some(tool))
            })
        });
        let src = LazySource::new("lazy", vec![descriptor()], resolver);
        let tool = src.get_tool("lazy:slow_tool").await.unwrap();
        assert!(tool.is_some());
        assert_eq!(seen.lock().as_deref(), Some("slow_tool"));
    }

    #[tokio::test]
    async fn resolver_failure_becomes_source_resolve_failed() {
        let resolver: Resolver =
            Arc::new(|_name: String| Box::pin(async move { Err("spawn failed".to_string()) }));
        let src = LazySource::new("lazy", vec![descriptor()], resolver);
        let err = match src.get_tool("lazy:slow_tool").await {
            Err(e) => e,
            Ok(_) => panic!("expected error"),
        };
        match err {
            Error::SourceResolveFailed { source_id, cause } => {
                assert_eq!(source_id, "lazy");
                assert_eq!(cause, "spawn failed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
