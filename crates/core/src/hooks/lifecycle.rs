//! "Plugin classes loaded" host event
//!
//! The host fires this event once, after every custom node class has been
//! registered. [`HookManager::attach`](crate::HookManager::attach) subscribes
//! to it; hosts without their own dispatcher can use [`PluginsLoadedEvent`].

use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::LOG_PREFIX;
use crate::plugin::PluginMapping;

/// Callback receiving the host's plugin mapping
pub type PluginsLoadedHandler = Box<dyn FnOnce(Arc<PluginMapping>) + Send>;

/// Registration point for host lifecycle callbacks
pub trait HostEvents {
    /// Run `handler` once the host has loaded all plugin classes
    fn on_plugins_loaded(&self, handler: PluginsLoadedHandler);
}

enum EventState {
    Pending(Vec<PluginsLoadedHandler>),
    Fired(Arc<PluginMapping>),
}

/// One-shot event dispatcher.
///
/// Handlers registered before [`emit`](Self::emit) run during it; handlers
/// registered afterwards run immediately with the same mapping.
pub struct PluginsLoadedEvent {
    state: Mutex<EventState>,
}

impl Default for PluginsLoadedEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginsLoadedEvent {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EventState::Pending(Vec::new())),
        }
    }

    /// Fire the event. Only the first call delivers; returns whether this
    /// call was the one that fired.
    pub fn emit(&self, mapping: Arc<PluginMapping>) -> bool {
        let handlers = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match &mut *state {
                EventState::Fired(_) => {
                    warn!("{} Plugins-loaded event fired twice, ignoring", LOG_PREFIX);
                    return false;
                }
                EventState::Pending(handlers) => {
                    let handlers = std::mem::take(handlers);
                    *state = EventState::Fired(Arc::clone(&mapping));
                    handlers
                }
            }
        };

        for handler in handlers {
            handler(Arc::clone(&mapping));
        }
        true
    }

    pub fn has_fired(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*state, EventState::Fired(_))
    }
}

impl HostEvents for PluginsLoadedEvent {
    fn on_plugins_loaded(&self, handler: PluginsLoadedHandler) {
        let fired = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match &mut *state {
                EventState::Pending(handlers) => {
                    handlers.push(handler);
                    return;
                }
                EventState::Fired(mapping) => Arc::clone(mapping),
            }
        };
        handler(fired);
    }
}
