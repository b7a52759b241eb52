//! Hook configuration source
//!
//! Two documents feed the hook list:
//! - defaults: compiled in from `default_hooks.json`, or read from the file
//!   named by `REMOVE_PRINT_DEFAULT_HOOKS`
//! - user override: `<user_dir>/default/comfyui-remove-print/hooks.json`
//!
//! When the override exists and parses it replaces the defaults entirely.
//! An unreadable or corrupt override is logged and ignored.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::LOG_PREFIX;
use crate::hooks::spec::{HookSpec, parse_hooks, render_hooks};
use crate::paths::Paths;

/// Compiled-in default hook document
const DEFAULT_HOOKS_JSON: &str = include_str!("../../default_hooks.json");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize hooks: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Document store behind the hook configuration.
///
/// Every load returns an owned snapshot, so a concurrent save cannot change
/// the list a running apply pass is iterating.
#[cfg_attr(test, mockall::automock)]
pub trait HookStore: Send + Sync {
    /// User override if present and readable, otherwise the defaults
    fn load_active_hooks(&self) -> Vec<HookSpec>;

    /// Built-in (or shipped) default hooks
    fn load_default_hooks(&self) -> Vec<HookSpec>;

    /// Persist `hooks` as the user override
    fn save_user_hooks(&self, hooks: &[HookSpec]) -> Result<(), ConfigError>;

    /// Remove the user override. Returns whether a document was removed.
    fn delete_user_hooks(&self) -> Result<bool, ConfigError>;
}

/// [`HookStore`] backed by JSON files.
#[derive(Debug, Clone)]
pub struct FileHookStore {
    defaults: Vec<HookSpec>,
    user_path: PathBuf,
}

impl FileHookStore {
    /// Store for resolved [`Paths`]: shipped defaults file if configured,
    /// compiled-in defaults otherwise.
    pub fn new(paths: &Paths) -> Self {
        let defaults = match &paths.default_hooks {
            Some(path) => load_defaults_file(path),
            None => builtin_defaults(),
        };
        Self::with_defaults(paths.user_hooks_file(), defaults)
    }

    pub fn with_defaults(user_path: impl Into<PathBuf>, defaults: Vec<HookSpec>) -> Self {
        Self {
            defaults,
            user_path: user_path.into(),
        }
    }

    /// Location of the user override document
    pub fn user_path(&self) -> &Path {
        &self.user_path
    }

    pub fn has_user_hooks(&self) -> bool {
        self.user_path.exists()
    }

    /// Read the user override. `Ok(None)` when there is none.
    pub fn read_user_hooks(&self) -> Result<Option<Vec<HookSpec>>, ConfigError> {
        read_hooks_file(&self.user_path)
    }
}

impl HookStore for FileHookStore {
    fn load_active_hooks(&self) -> Vec<HookSpec> {
        match self.read_user_hooks() {
            Ok(Some(hooks)) => {
                debug!(
                    "{} Loaded {} user hooks from {}",
                    LOG_PREFIX,
                    hooks.len(),
                    self.user_path.display()
                );
                hooks
            }
            Ok(None) => self.load_default_hooks(),
            Err(e) => {
                warn!(
                    "{} Failed to load user hooks, falling back to defaults: {}",
                    LOG_PREFIX, e
                );
                self.load_default_hooks()
            }
        }
    }

    fn load_default_hooks(&self) -> Vec<HookSpec> {
        self.defaults.clone()
    }

    fn save_user_hooks(&self, hooks: &[HookSpec]) -> Result<(), ConfigError> {
        let content = render_hooks(hooks)?;

        if let Some(parent) = self.user_path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(&self.user_path, content).map_err(|source| ConfigError::Write {
            path: self.user_path.clone(),
            source,
        })?;

        info!(
            "{} Saved {} hooks to {}",
            LOG_PREFIX,
            hooks.len(),
            self.user_path.display()
        );
        Ok(())
    }

    fn delete_user_hooks(&self) -> Result<bool, ConfigError> {
        match fs::remove_file(&self.user_path) {
            Ok(()) => {
                info!(
                    "{} Removed user hooks at {}",
                    LOG_PREFIX,
                    self.user_path.display()
                );
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ConfigError::Remove {
                path: self.user_path.clone(),
                source,
            }),
        }
    }
}

/// Parse the compiled-in defaults
pub fn builtin_defaults() -> Vec<HookSpec> {
    match parse_hooks(DEFAULT_HOOKS_JSON) {
        Ok(hooks) => hooks,
        Err(e) => {
            warn!("{} Failed to parse built-in default hooks: {}", LOG_PREFIX, e);
            Vec::new()
        }
    }
}

/// Load a defaults document; an unreadable or corrupt file yields no hooks.
pub fn load_defaults_file(path: &Path) -> Vec<HookSpec> {
    match read_hooks_file(path) {
        Ok(Some(hooks)) => hooks,
        Ok(None) => {
            warn!(
                "{} Failed to load default hooks: {} not found",
                LOG_PREFIX,
                path.display()
            );
            Vec::new()
        }
        Err(e) => {
            warn!("{} Failed to load default hooks: {}", LOG_PREFIX, e);
            Vec::new()
        }
    }
}

fn read_hooks_file(path: &Path) -> Result<Option<Vec<HookSpec>>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    parse_hooks(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileHookStore {
        FileHookStore::new(&Paths::from_root(dir.path()))
    }

    #[test]
    fn test_builtin_defaults_not_empty() {
        let defaults = builtin_defaults();
        assert!(!defaults.is_empty());
        assert_eq!(defaults[0], HookSpec::new("DPRandomGenerator", "get_prompt"));
    }

    #[test]
    fn test_load_default_hooks_without_override() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(!store.has_user_hooks());
        assert_eq!(store.load_active_hooks(), builtin_defaults());
    }

    #[test]
    fn test_load_user_hooks() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let path = store.user_path().to_path_buf();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{"hooks": [{"node": "TestNode", "method": "test_method"}]}"#,
        )
        .unwrap();

        assert_eq!(
            store.load_active_hooks(),
            vec![HookSpec::new("TestNode", "test_method")]
        );
    }

    #[test]
    fn test_load_corrupted_user_hooks_fallback() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let path = store.user_path().to_path_buf();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ invalid json }").unwrap();

        assert!(matches!(
            store.read_user_hooks(),
            Err(ConfigError::Parse { .. })
        ));
        let hooks = store.load_active_hooks();
        assert!(!hooks.is_empty());
        assert_eq!(hooks, store.load_default_hooks());
    }

    #[test]
    fn test_empty_user_override_is_respected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save_user_hooks(&[]).unwrap();
        assert!(store.has_user_hooks());
        assert!(store.load_active_hooks().is_empty());
    }

    #[test]
    fn test_save_then_load_creates_directories() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let hooks = vec![
            HookSpec::new("CheckpointLoaderSimple", "load_checkpoint"),
            HookSpec::disabled("DPRandomGenerator", "get_prompt"),
        ];

        store.save_user_hooks(&hooks).unwrap();

        assert!(
            dir.path()
                .join("default/comfyui-remove-print/hooks.json")
                .exists()
        );
        assert_eq!(store.load_active_hooks(), hooks);
    }

    #[test]
    fn test_delete_user_hooks() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(!store.delete_user_hooks().unwrap());

        store.save_user_hooks(&[HookSpec::new("A", "m")]).unwrap();
        assert!(store.delete_user_hooks().unwrap());
        assert!(!store.has_user_hooks());
        assert_eq!(store.load_active_hooks(), builtin_defaults());
    }

    #[test]
    fn test_missing_defaults_file_yields_empty() {
        let dir = TempDir::new().unwrap();
        let mut paths = Paths::from_root(dir.path());
        paths.default_hooks = Some(dir.path().join("missing.json"));

        let store = FileHookStore::new(&paths);
        assert!(store.load_default_hooks().is_empty());
    }

    #[test]
    fn test_defaults_file_overrides_builtin() {
        let dir = TempDir::new().unwrap();
        let defaults_path = dir.path().join("default_hooks.json");
        fs::write(
            &defaults_path,
            r#"{"hooks": [{"node": "KSampler", "method": "sample", "enabled": false}]}"#,
        )
        .unwrap();

        let mut paths = Paths::from_root(dir.path());
        paths.default_hooks = Some(defaults_path);

        let store = FileHookStore::new(&paths);
        assert_eq!(
            store.load_default_hooks(),
            vec![HookSpec::disabled("KSampler", "sample")]
        );
    }
}
