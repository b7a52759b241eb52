//! remove-print core: silences console output of selected plugin methods.
//!
//! The host hands over its plugin class mapping once all plugins are loaded.
//! From then on the [`HookManager`] keeps the configured `(node, method)`
//! pairs wrapped so that anything they write to the host stdout is discarded,
//! and re-applies the wrapping whenever the hook configuration changes.

pub mod admin;
pub mod config;
pub mod env;
pub mod hooks;
pub mod output;
pub mod paths;
pub mod plugin;

pub use admin::{AdminError, HookManager, HooksResponse};
pub use config::{ConfigError, FileHookStore, HookStore};
pub use hooks::{HookKey, HookRegistry, HookSpec};
pub use plugin::{CallArgs, Method, NodeClass, PluginClass, PluginMapping};

/// Prefix carried by every diagnostic line this crate emits.
pub const LOG_PREFIX: &str = "[comfyui-remove-print]";
