//! Turn state: the accumulator threaded through every state-machine step.
//!
//! `selected_ids` merges by set-union, `messages` and `search_history` are
//! append-only — a turn never drops or reorders what came before it.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use td_core::Message;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRecord {
    pub query: String,
    pub result_ids: Vec<String>,
    pub timestamp_millis: u64,
}

#[derive(Debug, Clone)]
pub struct TurnState {
    pub messages: Vec<Message>,
    pub selected_ids: BTreeSet<String>,
    pub search_history: Vec<SearchRecord>,
}

impl TurnState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            selected_ids: BTreeSet::new(),
            search_history: Vec::new(),
        }
    }

    /// Set-union merge: ids already selected in a prior turn stay selected.
    pub fn merge_selected(&mut self, ids: impl IntoIterator<Item = String>) {
        self.selected_ids.extend(ids);
    }

    pub fn record_search(&mut self, query: String, result_ids: Vec<String>) {
        self.search_history.push(SearchRecord {
            query,
            result_ids,
            timestamp_millis: now_millis(),
        });
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Terminal status of a `run` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Done,
    CancelledByCaller,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub messages: Vec<Message>,
    pub selected_ids: BTreeSet<String>,
    pub search_history: Vec<SearchRecord>,
    pub status: TurnStatus,
}
