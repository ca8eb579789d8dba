//! Reference [`td_core::Source`] implementations: in-memory, remote
//! protocol (stdio JSON-RPC), and lazy.

pub mod in_memory;
pub mod lazy;
pub mod remote;

pub use in_memory::InMemorySource;
pub use lazy::{LazySource, Resolver};
pub use remote::RemoteSource;
