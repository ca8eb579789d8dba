//! The Catalog subsystem: aggregates registered [`td_core::Source`]s into
//! a uniform descriptor view and emits [`ToolsChanged`] on every mutation.

pub mod catalog;

pub use catalog::{Catalog, ToolsChanged};
