pub mod hooks;
pub mod paths;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use remove_print_core::env::{COMFYUI_USER_DIR, REMOVE_PRINT_DEFAULT_HOOKS};
use remove_print_core::paths::Paths;

#[derive(Parser)]
#[command(name = "remove-print")]
#[command(about = "Inspect and edit the hooks that silence noisy node methods")]
#[command(version)]
pub struct Cli {
    /// Host user directory (contains `default/comfyui-remove-print/hooks.json`)
    #[arg(long, global = true, env = COMFYUI_USER_DIR)]
    pub user_dir: Option<PathBuf>,

    /// Defaults document to use instead of the built-in defaults
    #[arg(long, global = true, env = REMOVE_PRINT_DEFAULT_HOOKS)]
    pub defaults: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Resolve paths, letting explicit flags win over platform defaults
    pub fn paths(&self) -> Paths {
        let mut paths = match &self.user_dir {
            Some(dir) => Paths::from_root(dir),
            None => Paths::resolve(),
        };
        if let Some(defaults) = &self.defaults {
            paths.default_hooks = Some(defaults.clone());
        }
        paths
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the default hooks
    Defaults,

    /// Print the active hooks (user override, or defaults)
    Active,

    /// Replace the user override with a hook document
    Save(hooks::SaveArgs),

    /// Add or replace the hook for one node
    Add(hooks::AddArgs),

    /// Drop the hook for one node from the user override
    Remove(hooks::RemoveArgs),

    /// Delete the user override and go back to the defaults
    Reset,

    /// Show resolved file locations
    Paths,
}
