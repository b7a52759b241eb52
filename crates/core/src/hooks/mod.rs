//! Output-suppression hooks for plugin methods
//!
//! A hook names one method on one node class:
//! ```json
//! { "node": "DPRandomGenerator", "method": "get_prompt", "enabled": true }
//! ```
//!
//! Applying a hook swaps the method for a wrapper that runs the original
//! with host stdout discarded. The registry remembers each original so the
//! swap can be undone exactly, which is what makes hot reload safe:
//! restore everything, re-read the configuration, apply again.

pub mod lifecycle;
pub mod registry;
pub mod spec;
pub mod wrapper;

pub use lifecycle::{HostEvents, PluginsLoadedEvent, PluginsLoadedHandler};
pub use registry::{ApplyOutcome, HookRegistry};
pub use spec::{HookKey, HookSpec, InvalidHookSpec, parse_hooks};
pub use wrapper::suppress_output;
