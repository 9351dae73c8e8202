// src/watch/mod.rs

//! File watching and change aggregation.
//!
//! This module is responsible for:
//! - The [`ChangeSource`] abstraction and its `notify`-backed implementation
//!   (native watcher, or polling when forced).
//! - Watch filters deciding which changes matter.
//! - Debouncing bursts of changes into one [`ChangeBatch`](crate::types::ChangeBatch)
//!   per window.
//!
//! It does **not** know about child processes; it only turns filesystem
//! activity into batches for the supervisor.

pub mod debounce;
pub mod filter;
pub mod source;

pub use debounce::{Collected, DebounceSettings, Debouncer};
pub use filter::{build_filter, DefaultFilter, ExtensionFilter, WatchFilter};
pub use source::{ChangeSource, NotifySource, SourceOptions};
