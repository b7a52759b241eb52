//! Environment variable constants used throughout the application.
//!
//! Centralized definition of all environment variables read by remove-print
//! to avoid hardcoded strings.

/// Host user directory override (the directory holding `default/`)
pub const COMFYUI_USER_DIR: &str = "COMFYUI_USER_DIR";

/// Defaults document override (path to a `default_hooks.json`)
pub const REMOVE_PRINT_DEFAULT_HOOKS: &str = "REMOVE_PRINT_DEFAULT_HOOKS";
