//! The discovery controller: a three-state machine (`model` / `search` /
//! `execute`) over a turn, modeled on the teacher runtime's tool-call
//! loop but driving a generic [`td_core::Llm`] rather than a specific
//! provider, and dispatching through the search meta-tool plus the
//! [`td_loader::Loader`] instead of a node router.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;

use td_catalog::Catalog;
use td_core::config::ControllerConfig;
use td_core::{Error, Llm, Message, Role, SharedTool, ToolCall, ToolDefinition, SEARCH_TOOL_NAME};
use td_loader::Loader;
use td_search::{SearchIndex, SearchOpts};

use crate::cancel::CancelToken;
use crate::state::{TurnOutcome, TurnState, TurnStatus};

/// A tool bound to the model unconditionally, outside of discovery.
#[derive(Clone)]
pub struct PinnedTool {
    pub definition: ToolDefinition,
    pub tool: SharedTool,
}

fn search_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: SEARCH_TOOL_NAME.to_string(),
        description: "Search the tool catalog for capabilities relevant to the current goal."
            .to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Natural-language description of the capability needed" }
            },
            "required": ["query"]
        }),
    }
}

enum Phase {
    Model,
    Search {
        search_calls: Vec<ToolCall>,
        other_calls: Vec<ToolCall>,
    },
    Execute(Vec<ToolCall>),
}

pub struct DiscoveryController {
    llm: Arc<dyn Llm>,
    catalog: Catalog,
    search_index: Arc<SearchIndex>,
    loader: Loader,
    pinned: Vec<PinnedTool>,
    config: ControllerConfig,
    system_prompt: Option<String>,
}

impl DiscoveryController {
    pub fn new(
        llm: Arc<dyn Llm>,
        catalog: Catalog,
        search_index: Arc<SearchIndex>,
        loader: Loader,
        pinned: Vec<PinnedTool>,
        config: ControllerConfig,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            llm,
            catalog,
            search_index,
            loader,
            pinned,
            config,
            system_prompt,
        }
    }

    /// Run one turn to completion (or until cancelled), starting from
    /// `messages` and an empty `selectedIds`/`searchHistory` — callers
    /// that carry state across turns re-supply `selected_ids` via
    /// [`TurnState::merge_selected`] before their next call, since this
    /// entry point always starts a fresh turn state.
    pub async fn run(&self, messages: Vec<Message>, cancel: &CancelToken) -> Result<TurnOutcome, Error> {
        let mut state = TurnState::new(self.with_system_prompt(messages));
        let mut phase = Phase::Model;
        let mut loops = 0usize;

        loop {
            match phase {
                Phase::Model => {
                    if cancel.is_cancelled() {
                        return Ok(self.finish(state, TurnStatus::CancelledByCaller));
                    }
                    loops += 1;
                    if loops > self.config.max_turn_loops {
                        tracing::warn!(
                            limit = self.config.max_turn_loops,
                            "controller reached its turn-loop safety bound"
                        );
                        return Ok(self.finish(state, TurnStatus::Done));
                    }

                    let tool_defs = self.bound_tool_defs(&state.selected_ids).await;
                    let bound = self.llm.bind_tools(&tool_defs).await;
                    let reply = bound.invoke(&state.messages).await?;
                    state.messages.push(Message::assistant(reply.content));

                    let (search_calls, other_calls): (Vec<ToolCall>, Vec<ToolCall>) = reply
                        .tool_calls
                        .into_iter()
                        .partition(|c| c.name == SEARCH_TOOL_NAME);

                    phase = if !search_calls.is_empty() {
                        Phase::Search { search_calls, other_calls }
                    } else if !other_calls.is_empty() {
                        Phase::Execute(other_calls)
                    } else {
                        return Ok(self.finish(state, TurnStatus::Done));
                    };
                }

                Phase::Search { search_calls, other_calls } => {
                    for call in search_calls {
                        if cancel.is_cancelled() {
                            return Ok(self.finish(state, TurnStatus::CancelledByCaller));
                        }
                        self.run_search(&mut state, &call).await?;
                    }
                    phase = if other_calls.is_empty() {
                        Phase::Model
                    } else {
                        Phase::Execute(other_calls)
                    };
                }

                Phase::Execute(calls) => {
                    for call in calls {
                        if cancel.is_cancelled() {
                            return Ok(self.finish(state, TurnStatus::CancelledByCaller));
                        }
                        self.run_tool_call(&mut state, &call).await;
                    }
                    phase = Phase::Model;
                }
            }
        }
    }

    fn with_system_prompt(&self, mut messages: Vec<Message>) -> Vec<Message> {
        let starts_with_system = messages.first().map(|m| m.role == Role::System).unwrap_or(false);
        if !starts_with_system {
            if let Some(prompt) = &self.system_prompt {
                messages.insert(0, Message::system(prompt.clone()));
            }
        }
        messages
    }

    /// Bind the search meta-tool, the pinned tools, and each currently
    /// selected descriptor (resolved through the loader; a descriptor
    /// that fails to load is dropped from the bound set for this step
    /// only — it stays in `selectedIds` for a future attempt).
    async fn bound_tool_defs(&self, selected_ids: &BTreeSet<String>) -> Vec<ToolDefinition> {
        let mut defs = vec![search_tool_definition()];
        defs.extend(self.pinned.iter().map(|p| p.definition.clone()));
        for id in selected_ids {
            if self.loader.load(id).await.is_err() {
                continue;
            }
            if let Some(descriptor) = self.catalog.get_descriptor(id) {
                defs.push(ToolDefinition {
                    name: descriptor.id,
                    description: descriptor.description,
                    parameters: descriptor.parameters,
                });
            }
        }
        defs
    }

    async fn run_search(&self, state: &mut TurnState, call: &ToolCall) -> Result<(), Error> {
        let query = call
            .arguments
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let opts = SearchOpts {
            limit: self.config.search_limit,
            ..SearchOpts::default()
        };
        let results = self.search_index.search(&query, opts).await?;
        let result_ids: Vec<String> = results.iter().map(|r| r.id.clone()).collect();

        let body = if results.is_empty() {
            "no tools found".to_string()
        } else {
            results
                .iter()
                .map(|r| format!("{}: {}", r.name, r.description))
                .collect::<Vec<_>>()
                .join("\n")
        };

        state.messages.push(Message::tool_result(call.call_id.clone(), body));
        state.merge_selected(result_ids.clone());
        state.record_search(query, result_ids);
        Ok(())
    }

    async fn run_tool_call(&self, state: &mut TurnState, call: &ToolCall) {
        let message = match self.invoke_tool(call).await {
            Ok(value) => Message::tool_result(call.call_id.clone(), value.to_string()),
            Err(e) => Message::tool_error(call.call_id.clone(), e.to_string()),
        };
        state.messages.push(message);
    }

    async fn invoke_tool(&self, call: &ToolCall) -> Result<Value, Error> {
        if let Some(pinned) = self.pinned.iter().find(|p| p.definition.name == call.name) {
            return pinned.tool.call(call.arguments.clone()).await;
        }
        let tool = self.loader.load(&call.name).await?;
        tool.call(call.arguments.clone()).await
    }

    fn finish(&self, state: TurnState, status: TurnStatus) -> TurnOutcome {
        TurnOutcome {
            messages: state.messages,
            selected_ids: state.selected_ids,
            search_history: state.search_history,
            status,
        }
    }
}
