//! The Loader subsystem: resolves descriptor ids to executables with an
//! LRU cache and in-flight request coalescing.

pub mod loader;

pub use loader::{Loader, LoaderStats};
