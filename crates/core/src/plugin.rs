//! Host-side view of plugin classes.
//!
//! The host owns the class objects; this crate only needs to read and
//! replace one named method at a time. [`PluginClass`] is that capability,
//! and [`NodeClass`] is a ready-made implementation backed by a method table.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::{Map, Value};

/// Loaded plugin classes keyed by class (node) name. Owned by the host.
pub type PluginMapping = HashMap<String, Arc<dyn PluginClass>>;

/// Result of invoking a plugin method
pub type MethodResult = anyhow::Result<Value>;

/// Arguments of a single method invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub keyword: Map<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            keyword: Map::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Look up a keyword argument
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.keyword.get(name)
    }
}

type MethodFn = dyn Fn(&CallArgs) -> MethodResult + Send + Sync;

/// A callable attribute of a plugin class.
///
/// Cloning shares the underlying function; [`Method::ptr_eq`] tells whether
/// two handles refer to the very same callable.
#[derive(Clone)]
pub struct Method(Arc<MethodFn>);

impl Method {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&CallArgs) -> MethodResult + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, args: &CallArgs) -> MethodResult {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Method) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method({:p})", Arc::as_ptr(&self.0))
    }
}

/// Read/replace access to the methods of one host class object.
///
/// Implementations must use interior mutability: the class is shared with
/// the host, which keeps calling it while hooks are installed or removed.
pub trait PluginClass: Send + Sync {
    /// Current callable bound to `name`, if the class has such an attribute
    fn get_method(&self, name: &str) -> Option<Method>;

    /// Bind `name` to `method`, replacing whatever was there
    fn set_method(&self, name: &str, method: Method);

    /// Names of all callable attributes, for debugging output only
    fn method_names(&self) -> Vec<String>;
}

/// Plugin class backed by a name → method table.
pub struct NodeClass {
    name: String,
    methods: RwLock<HashMap<String, Method>>,
}

impl NodeClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: RwLock::new(HashMap::new()),
        }
    }

    /// Builder-style method registration
    pub fn with_method<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&CallArgs) -> MethodResult + Send + Sync + 'static,
    {
        let name: String = name.into();
        self.set_method(&name, Method::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up and invoke `method`, the way the host dispatches node calls
    pub fn invoke(&self, method: &str, args: &CallArgs) -> MethodResult {
        let Some(m) = self.get_method(method) else {
            anyhow::bail!("{} has no method '{}'", self.name, method);
        };
        m.call(args)
    }

    /// Wrap in an `Arc` for insertion into a [`PluginMapping`]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl PluginClass for NodeClass {
    fn get_method(&self, name: &str) -> Option<Method> {
        let methods = self.methods.read().unwrap_or_else(PoisonError::into_inner);
        methods.get(name).cloned()
    }

    fn set_method(&self, name: &str, method: Method) {
        let mut methods = self.methods.write().unwrap_or_else(PoisonError::into_inner);
        methods.insert(name.to_string(), method);
    }

    fn method_names(&self) -> Vec<String> {
        let methods = self.methods.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = methods.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeClass")
            .field("name", &self.name)
            .field("methods", &self.method_names())
            .finish()
    }
}
