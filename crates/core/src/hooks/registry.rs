//! Hook registry: which methods are wrapped, and what they were before

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::spec::{HookKey, HookSpec, last_per_class};
use super::wrapper::suppress_output;
use crate::LOG_PREFIX;
use crate::config::HookStore;
use crate::plugin::{Method, PluginMapping};

/// What `apply` decided for one hook spec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Wrapper installed
    Applied,
    /// Spec has `enabled: false`
    Disabled,
    /// No class with that name in the plugin mapping
    ClassNotLoaded,
    /// Class has no such method
    MethodNotFound,
    /// A wrapper from this registry is already in place
    AlreadyHooked,
}

/// Live interception state for one [`HookKey`]
struct HookEntry {
    /// Callable the class held before wrapping
    original: Method,
    /// Callable installed in its place
    wrapper: Method,
}

/// Registry of installed hooks.
///
/// Holds one entry per wrapped `(class, method)`. An entry exists exactly as
/// long as the class method points at the wrapper this registry installed.
pub struct HookRegistry {
    source: Arc<dyn HookStore>,
    entries: BTreeMap<HookKey, HookEntry>,
}

impl HookRegistry {
    pub fn new(source: Arc<dyn HookStore>) -> Self {
        Self {
            source,
            entries: BTreeMap::new(),
        }
    }

    /// Wrap every enabled, resolvable hook from the current configuration.
    ///
    /// Returns the number of newly installed wrappers. Calling it again with
    /// unchanged inputs installs nothing.
    pub fn apply(&mut self, mapping: &PluginMapping) -> usize {
        let snapshot = self.source.load_active_hooks();
        self.apply_specs(mapping, &snapshot)
    }

    /// Like [`apply`](Self::apply) with an explicit configuration snapshot.
    pub fn apply_specs(&mut self, mapping: &PluginMapping, specs: &[HookSpec]) -> usize {
        last_per_class(specs)
            .into_iter()
            .map(|spec| self.apply_spec(mapping, spec))
            .filter(|outcome| *outcome == ApplyOutcome::Applied)
            .count()
    }

    /// Apply a single spec and report the decision.
    pub fn apply_spec(&mut self, mapping: &PluginMapping, spec: &HookSpec) -> ApplyOutcome {
        let key = spec.key();

        if !spec.enabled {
            debug!("{} Hook disabled, skipping: {}", LOG_PREFIX, key);
            return ApplyOutcome::Disabled;
        }

        let Some(class) = mapping.get(&spec.class_name) else {
            debug!("{} Node not loaded, skipping: {}", LOG_PREFIX, key);
            return ApplyOutcome::ClassNotLoaded;
        };

        let Some(original) = class.get_method(&spec.method_name) else {
            warn!("{} Method not found: {}", LOG_PREFIX, key);
            return ApplyOutcome::MethodNotFound;
        };

        if self.entries.contains_key(&key) {
            debug!("{} Already hooked: {}", LOG_PREFIX, key);
            return ApplyOutcome::AlreadyHooked;
        }

        // Record before installing so a failing install still leaves the
        // original reachable for restore.
        let wrapper = suppress_output(original.clone());
        self.entries.insert(
            key.clone(),
            HookEntry {
                original,
                wrapper: wrapper.clone(),
            },
        );
        class.set_method(&spec.method_name, wrapper);

        info!("{} Hooked: {}", LOG_PREFIX, key);
        ApplyOutcome::Applied
    }

    /// Put every original method back and forget all entries.
    ///
    /// Entries whose class is missing from `mapping` are dropped without a
    /// method to restore. Returns the number of methods actually restored.
    ///
    /// An entry is forgotten only once its original is back in place, so a
    /// plugin class that panics mid-restore leaves the remaining entries
    /// tracked and a later restore finishes the job.
    pub fn restore(&mut self, mapping: &PluginMapping) -> usize {
        let mut restored = 0;

        while let Some((key, entry)) = self.entries.first_key_value() {
            let key = key.clone();

            match mapping.get(&key.class_name) {
                Some(class) => {
                    if let Some(current) = class.get_method(&key.method_name)
                        && !current.ptr_eq(&entry.wrapper)
                    {
                        warn!(
                            "{} {} was replaced outside the registry, restoring original anyway",
                            LOG_PREFIX, key
                        );
                    }

                    class.set_method(&key.method_name, entry.original.clone());
                    restored += 1;
                    info!("{} Restored: {}", LOG_PREFIX, key);
                }
                None => warn!(
                    "{} Node no longer loaded, dropping hook without restore: {}",
                    LOG_PREFIX, key
                ),
            }

            self.entries.remove(&key);
        }

        restored
    }

    /// Restore everything, re-read the configuration and apply it.
    pub fn reload(&mut self, mapping: &PluginMapping) -> usize {
        self.restore(mapping);
        self.apply(mapping)
    }

    /// [`reload`](Self::reload) against an explicit configuration snapshot.
    pub fn reload_specs(&mut self, mapping: &PluginMapping, specs: &[HookSpec]) -> usize {
        self.restore(mapping);
        self.apply_specs(mapping, specs)
    }

    /// Keys of all installed hooks, in sorted order
    pub fn hooked_keys(&self) -> Vec<HookKey> {
        self.entries.keys().cloned().collect()
    }

    pub fn is_hooked(&self, key: &HookKey) -> bool {
        self.entries.contains_key(key)
    }

    /// The pre-hook callable recorded for `key`
    pub fn original(&self, key: &HookKey) -> Option<&Method> {
        self.entries.get(key).map(|entry| &entry.original)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MockHookStore;
    use crate::host_println;
    use crate::output::capture;
    use crate::plugin::{CallArgs, NodeClass, PluginClass};
    use serde_json::json;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn chatty_node(name: &str) -> Arc<NodeClass> {
        NodeClass::new(name)
            .with_method("get_prompt", |args| {
                host_println!("DP: generating");
                Ok(json!(format!("prompt-{}", args.positional.len())))
            })
            .with_method("quiet", |_| Ok(json!(null)))
            .shared()
    }

    fn mapping_with(nodes: &[&Arc<NodeClass>]) -> PluginMapping {
        nodes
            .iter()
            .map(|node| {
                let class: Arc<dyn PluginClass> = Arc::clone(*node) as Arc<dyn PluginClass>;
                (node.name().to_string(), class)
            })
            .collect()
    }

    /// Store whose active hooks can be swapped between calls
    fn scripted_store(initial: Vec<HookSpec>) -> (Arc<Mutex<Vec<HookSpec>>>, Arc<dyn HookStore>) {
        let current = Arc::new(Mutex::new(initial));
        let handle = Arc::clone(&current);

        let mut store = MockHookStore::new();
        store
            .expect_load_active_hooks()
            .returning(move || handle.lock().unwrap().clone());

        (current, Arc::new(store))
    }

    /// Class whose `set_method` panics while `failing` is set
    struct FlakyNode {
        inner: Arc<NodeClass>,
        failing: AtomicBool,
    }

    impl PluginClass for FlakyNode {
        fn get_method(&self, name: &str) -> Option<Method> {
            self.inner.get_method(name)
        }

        fn set_method(&self, name: &str, method: Method) {
            if self.failing.load(Ordering::SeqCst) {
                panic!("set_method({name}) failed");
            }
            self.inner.set_method(name, method);
        }

        fn method_names(&self) -> Vec<String> {
            self.inner.method_names()
        }
    }

    fn flaky_node(name: &str) -> (Arc<NodeClass>, Arc<FlakyNode>) {
        let inner = chatty_node(name);
        let flaky = Arc::new(FlakyNode {
            inner: Arc::clone(&inner),
            failing: AtomicBool::new(false),
        });
        (inner, flaky)
    }

    fn original_of(node: &NodeClass, method: &str) -> Method {
        node.get_method(method).unwrap()
    }

    #[test]
    fn test_apply_wraps_and_silences() {
        let node = chatty_node("DPRandomGenerator");
        let mapping = mapping_with(&[&node]);
        let (_, store) = scripted_store(vec![HookSpec::new("DPRandomGenerator", "get_prompt")]);
        let mut registry = HookRegistry::new(store);

        let before = original_of(&node, "get_prompt");
        assert_eq!(registry.apply(&mapping), 1);

        let key = HookKey::new("DPRandomGenerator", "get_prompt");
        assert!(registry.is_hooked(&key));
        assert!(registry.original(&key).unwrap().ptr_eq(&before));
        assert!(!original_of(&node, "get_prompt").ptr_eq(&before));

        let (result, out) = capture(|| node.invoke("get_prompt", &CallArgs::new().arg(1)));
        assert_eq!(result.unwrap(), json!("prompt-1"));
        assert_eq!(out, "");
    }

    #[test]
    fn test_apply_is_idempotent() {
        let node = chatty_node("A");
        let mapping = mapping_with(&[&node]);
        let (_, store) = scripted_store(vec![HookSpec::new("A", "get_prompt")]);
        let mut registry = HookRegistry::new(store);

        assert_eq!(registry.apply(&mapping), 1);
        let wrapper = original_of(&node, "get_prompt");

        assert_eq!(registry.apply(&mapping), 0);
        assert_eq!(registry.hooked_keys(), vec![HookKey::new("A", "get_prompt")]);
        assert!(original_of(&node, "get_prompt").ptr_eq(&wrapper));
    }

    #[test]
    fn test_apply_spec_outcomes() {
        let node = chatty_node("A");
        let mapping = mapping_with(&[&node]);
        let (_, store) = scripted_store(Vec::new());
        let mut registry = HookRegistry::new(store);

        assert_eq!(
            registry.apply_spec(&mapping, &HookSpec::disabled("A", "get_prompt")),
            ApplyOutcome::Disabled
        );
        assert_eq!(
            registry.apply_spec(&mapping, &HookSpec::new("Missing", "get_prompt")),
            ApplyOutcome::ClassNotLoaded
        );
        assert_eq!(
            registry.apply_spec(&mapping, &HookSpec::new("A", "nope")),
            ApplyOutcome::MethodNotFound
        );
        assert_eq!(
            registry.apply_spec(&mapping, &HookSpec::new("A", "get_prompt")),
            ApplyOutcome::Applied
        );
        assert_eq!(
            registry.apply_spec(&mapping, &HookSpec::new("A", "get_prompt")),
            ApplyOutcome::AlreadyHooked
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_disabled_spec_never_creates_entry() {
        let node = chatty_node("A");
        let mapping = mapping_with(&[&node]);
        let (_, store) = scripted_store(vec![HookSpec::disabled("A", "get_prompt")]);
        let mut registry = HookRegistry::new(store);

        let before = original_of(&node, "get_prompt");
        assert_eq!(registry.apply(&mapping), 0);
        assert!(registry.is_empty());
        assert!(original_of(&node, "get_prompt").ptr_eq(&before));
    }

    #[test]
    fn test_duplicate_class_last_wins() {
        let node = chatty_node("A");
        let mapping = mapping_with(&[&node]);
        let (_, store) = scripted_store(vec![
            HookSpec::new("A", "get_prompt"),
            HookSpec::new("A", "quiet"),
        ]);
        let mut registry = HookRegistry::new(store);

        registry.apply(&mapping);
        assert_eq!(registry.hooked_keys(), vec![HookKey::new("A", "quiet")]);
    }

    #[test]
    fn test_restore_returns_exact_original() {
        let node = chatty_node("A");
        let mapping = mapping_with(&[&node]);
        let (_, store) = scripted_store(vec![HookSpec::new("A", "get_prompt")]);
        let mut registry = HookRegistry::new(store);

        let before = original_of(&node, "get_prompt");
        registry.apply(&mapping);
        assert_eq!(registry.restore(&mapping), 1);

        assert!(registry.is_empty());
        assert!(original_of(&node, "get_prompt").ptr_eq(&before));

        let (result, out) = capture(|| node.invoke("get_prompt", &CallArgs::new()));
        assert_eq!(result.unwrap(), json!("prompt-0"));
        assert_eq!(out, "DP: generating\n");
    }

    #[test]
    fn test_restore_drops_entries_for_missing_class() {
        let a = chatty_node("A");
        let b = chatty_node("B");
        let (_, store) = scripted_store(vec![
            HookSpec::new("A", "get_prompt"),
            HookSpec::new("B", "get_prompt"),
        ]);
        let mut registry = HookRegistry::new(store);

        registry.apply(&mapping_with(&[&a, &b]));
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.restore(&mapping_with(&[&a])), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reload_follows_new_configuration() {
        let node = chatty_node("A");
        let other = chatty_node("B");
        let mapping = mapping_with(&[&node, &other]);
        let (current, store) = scripted_store(vec![HookSpec::new("A", "get_prompt")]);
        let mut registry = HookRegistry::new(store);

        let a_before = original_of(&node, "get_prompt");
        registry.apply(&mapping);

        *current.lock().unwrap() = vec![HookSpec::new("B", "quiet")];
        assert_eq!(registry.reload(&mapping), 1);

        assert_eq!(registry.hooked_keys(), vec![HookKey::new("B", "quiet")]);
        assert!(original_of(&node, "get_prompt").ptr_eq(&a_before));
    }

    #[test]
    fn test_reload_never_double_wraps() {
        let node = chatty_node("A");
        let mapping = mapping_with(&[&node]);
        let (_, store) = scripted_store(vec![HookSpec::new("A", "get_prompt")]);
        let mut registry = HookRegistry::new(store);

        let before = original_of(&node, "get_prompt");
        registry.apply(&mapping);
        registry.reload(&mapping);
        registry.reload(&mapping);

        let key = HookKey::new("A", "get_prompt");
        assert_eq!(registry.len(), 1);
        assert!(registry.original(&key).unwrap().ptr_eq(&before));

        registry.restore(&mapping);
        assert!(original_of(&node, "get_prompt").ptr_eq(&before));
    }

    #[test]
    fn test_restore_after_foreign_replacement() {
        let node = chatty_node("A");
        let mapping = mapping_with(&[&node]);
        let (_, store) = scripted_store(vec![HookSpec::new("A", "get_prompt")]);
        let mut registry = HookRegistry::new(store);

        let before = original_of(&node, "get_prompt");
        registry.apply(&mapping);
        node.set_method("get_prompt", Method::new(|_| Ok(json!("foreign"))));

        registry.restore(&mapping);
        assert!(original_of(&node, "get_prompt").ptr_eq(&before));
    }

    #[test]
    fn test_panicking_restore_keeps_unrestored_entries() {
        let (a, flaky) = flaky_node("A");
        let b = chatty_node("B");
        let mut mapping = mapping_with(&[&b]);
        mapping.insert("A".to_string(), Arc::clone(&flaky) as Arc<dyn PluginClass>);
        let (_, store) = scripted_store(vec![
            HookSpec::new("A", "get_prompt"),
            HookSpec::new("B", "get_prompt"),
        ]);
        let mut registry = HookRegistry::new(store);

        let a_before = original_of(&a, "get_prompt");
        let b_before = original_of(&b, "get_prompt");
        assert_eq!(registry.apply(&mapping), 2);

        flaky.failing.store(true, Ordering::SeqCst);
        let result = catch_unwind(AssertUnwindSafe(|| registry.restore(&mapping)));
        assert!(result.is_err());
        assert_eq!(registry.len(), 2);
        assert!(!original_of(&b, "get_prompt").ptr_eq(&b_before));

        // Entries still tracked, so a retry neither double wraps nor loses originals
        flaky.failing.store(false, Ordering::SeqCst);
        assert_eq!(registry.apply(&mapping), 0);
        assert_eq!(registry.restore(&mapping), 2);
        assert!(registry.is_empty());
        assert!(original_of(&a, "get_prompt").ptr_eq(&a_before));
        assert!(original_of(&b, "get_prompt").ptr_eq(&b_before));
    }

    #[test]
    fn test_panicking_install_is_still_restorable() {
        let (a, flaky) = flaky_node("A");
        let mut mapping = PluginMapping::new();
        mapping.insert("A".to_string(), Arc::clone(&flaky) as Arc<dyn PluginClass>);
        let (_, store) = scripted_store(vec![HookSpec::new("A", "get_prompt")]);
        let mut registry = HookRegistry::new(store);

        let before = original_of(&a, "get_prompt");
        flaky.failing.store(true, Ordering::SeqCst);
        let result = catch_unwind(AssertUnwindSafe(|| registry.apply(&mapping)));
        assert!(result.is_err());
        assert!(registry.is_hooked(&HookKey::new("A", "get_prompt")));

        flaky.failing.store(false, Ordering::SeqCst);
        assert_eq!(registry.restore(&mapping), 1);
        assert!(original_of(&a, "get_prompt").ptr_eq(&before));
    }
}
