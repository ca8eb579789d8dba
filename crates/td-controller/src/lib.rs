//! The Discovery Controller: drives a model through `model`/`search`/
//! `execute` turns, surfacing tools on demand via the search meta-tool
//! instead of binding the entire catalog up front.

pub mod cancel;
pub mod controller;
pub mod state;

pub use cancel::CancelToken;
pub use controller::{DiscoveryController, PinnedTool};
pub use state::{SearchRecord, TurnOutcome, TurnState, TurnStatus};
