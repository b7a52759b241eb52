//! Filesystem locations for hook documents.
//!
//! Resolution order for the user directory:
//! 1. `COMFYUI_USER_DIR` env var
//! 2. Platform data dir (`ProjectDirs`), e.g. `~/.local/share/comfyui/user`
//! 3. `./user` relative to the working directory

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::env::{COMFYUI_USER_DIR, REMOVE_PRINT_DEFAULT_HOOKS};

/// Directory name under `<user_dir>/default/` owned by this extension
pub const EXTENSION_DIR: &str = "comfyui-remove-print";

/// File name of the user override document
pub const USER_HOOKS_FILE: &str = "hooks.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Host user directory (contains the `default` profile)
    pub user_dir: PathBuf,

    /// Optional defaults document replacing the compiled-in defaults
    pub default_hooks: Option<PathBuf>,
}

impl Paths {
    /// Resolve paths from the environment, falling back to platform dirs.
    pub fn resolve() -> Self {
        let user_dir = std::env::var_os(COMFYUI_USER_DIR)
            .map(PathBuf::from)
            .or_else(|| {
                ProjectDirs::from("org", "ComfyUI", "comfyui")
                    .map(|dirs| dirs.data_dir().join("user"))
            })
            .unwrap_or_else(|| PathBuf::from("user"));

        let default_hooks = std::env::var_os(REMOVE_PRINT_DEFAULT_HOOKS).map(PathBuf::from);

        Self {
            user_dir,
            default_hooks,
        }
    }

    /// Root all paths under an explicit user directory.
    pub fn from_root(user_dir: impl AsRef<Path>) -> Self {
        Self {
            user_dir: user_dir.as_ref().to_path_buf(),
            default_hooks: None,
        }
    }

    /// `<user_dir>/default/comfyui-remove-print/hooks.json`
    pub fn user_hooks_file(&self) -> PathBuf {
        self.user_dir
            .join("default")
            .join(EXTENSION_DIR)
            .join(USER_HOOKS_FILE)
    }
}
