//! Host side of the flattening tool.
//!
//! This module provides:
//! - The [`MergedConfig`] view the renderer reads from
//! - Loading a config tree with in-place includes and the SAVE_CONFIG overlay
//! - A small event bus that announces when the merged config is ready

mod autosave;
mod events;
mod loader;
mod store;

pub use events::{Event, Printer};
pub use loader::{load_config, LoadedConfig};
pub use store::{ConfigStore, MergedConfig};
