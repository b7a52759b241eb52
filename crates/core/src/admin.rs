//! Hook manager: the single entry point hosts and admin surfaces talk to.
//!
//! Every operation that touches installed hooks (the initial apply, reloads,
//! saves, resets, teardown) runs under one mutex, so one request's partial
//! application is never visible to, or overwritten by, another.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{info, warn};

use crate::LOG_PREFIX;
use crate::config::{ConfigError, HookStore};
use crate::hooks::lifecycle::HostEvents;
use crate::hooks::registry::HookRegistry;
use crate::hooks::spec::{HookKey, HookSpec};
use crate::plugin::PluginMapping;

/// Successful admin response: `{ "status": "ok", "hooks": [...], "hooked": [...] }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HooksResponse {
    pub status: &'static str,
    pub hooks: Vec<HookSpec>,
    pub hooked: Vec<HookKey>,
}

impl HooksResponse {
    fn ok(hooks: Vec<HookSpec>, hooked: Vec<HookKey>) -> Self {
        Self {
            status: "ok",
            hooks,
            hooked,
        }
    }
}

/// Failed admin response: `{ "status": "error", "message": "..." }`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("failed to save hooks: {0}")]
    Save(#[source] ConfigError),

    #[error("failed to reset hooks: {0}")]
    Reset(#[source] ConfigError),
}

impl AdminError {
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            status: "error",
            message: self.to_string(),
        }
    }
}

struct ManagerState {
    registry: HookRegistry,
    /// Set once by the plugins-loaded event
    mapping: Option<Arc<PluginMapping>>,
}

/// Owns the hook registry for the lifetime of the host process.
pub struct HookManager {
    store: Arc<dyn HookStore>,
    state: Mutex<ManagerState>,
}

impl HookManager {
    pub fn new(store: Arc<dyn HookStore>) -> Self {
        let registry = HookRegistry::new(Arc::clone(&store));
        Self {
            store,
            state: Mutex::new(ManagerState {
                registry,
                mapping: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to the host's plugins-loaded event.
    pub fn attach(self: &Arc<Self>, host: &dyn HostEvents) {
        let manager = Arc::clone(self);
        host.on_plugins_loaded(Box::new(move |mapping| {
            manager.plugins_loaded(mapping);
        }));
    }

    /// Handle the plugins-loaded event: keep the mapping and apply hooks.
    ///
    /// Only the first delivery counts. Returns the number of hooks applied.
    pub fn plugins_loaded(&self, mapping: Arc<PluginMapping>) -> usize {
        let mut state = self.lock();
        if state.mapping.is_some() {
            warn!(
                "{} Plugin mapping already received, ignoring redelivery",
                LOG_PREFIX
            );
            return 0;
        }

        info!("{} {} node classes loaded", LOG_PREFIX, mapping.len());
        // Stored before apply; a panic inside apply must not lose the mapping.
        state.mapping = Some(Arc::clone(&mapping));
        state.registry.apply(&mapping)
    }

    /// Whether the host has delivered its plugin mapping
    pub fn is_attached(&self) -> bool {
        self.lock().mapping.is_some()
    }

    pub fn get_default_hooks(&self) -> Vec<HookSpec> {
        self.store.load_default_hooks()
    }

    pub fn get_active_hooks(&self) -> Vec<HookSpec> {
        self.store.load_active_hooks()
    }

    /// Persist `hooks` as the user override, then reload.
    pub fn save_hooks(&self, hooks: Vec<HookSpec>) -> Result<HooksResponse, AdminError> {
        let mut state = self.lock();
        self.store.save_user_hooks(&hooks).map_err(AdminError::Save)?;

        let active = self.store.load_active_hooks();
        let hooked = Self::reload_locked(&mut state, &active);
        Ok(HooksResponse::ok(active, hooked))
    }

    /// Remove the user override, then reload with the defaults.
    pub fn delete_user_override(&self) -> Result<HooksResponse, AdminError> {
        let mut state = self.lock();
        self.store.delete_user_hooks().map_err(AdminError::Reset)?;

        let defaults = self.store.load_default_hooks();
        let active = self.store.load_active_hooks();
        let hooked = Self::reload_locked(&mut state, &active);
        Ok(HooksResponse::ok(defaults, hooked))
    }

    /// Re-apply the current configuration. No-op before the host has
    /// delivered its plugin mapping.
    pub fn reload(&self) -> Vec<HookKey> {
        let mut state = self.lock();
        let active = self.store.load_active_hooks();
        Self::reload_locked(&mut state, &active)
    }

    fn reload_locked(state: &mut ManagerState, specs: &[HookSpec]) -> Vec<HookKey> {
        if let Some(mapping) = state.mapping.clone() {
            state.registry.reload_specs(&mapping, specs);
        }
        state.registry.hooked_keys()
    }

    /// Restore every hooked method, e.g. at host shutdown.
    pub fn restore_all(&self) -> usize {
        let mut state = self.lock();
        match state.mapping.clone() {
            Some(mapping) => state.registry.restore(&mapping),
            None => 0,
        }
    }

    pub fn hooked_keys(&self) -> Vec<HookKey> {
        self.lock().registry.hooked_keys()
    }

    pub fn is_hooked(&self, key: &HookKey) -> bool {
        self.lock().registry.is_hooked(key)
    }

    /// Method names of a loaded node class, for debugging hook targets
    pub fn list_methods(&self, class_name: &str) -> Option<Vec<String>> {
        let state = self.lock();
        let mapping = state.mapping.as_ref()?;
        mapping.get(class_name).map(|class| class.method_names())
    }
}
