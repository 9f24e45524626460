//! Module locator: the collaborator that turns dotted paths into values.
//!
//! A [`Locator`] imports modules by dotted name. A [`Module`] is a named
//! attribute table whose attributes are values, submodules, or whole
//! registries (namespaces). The default locator, [`ModuleTable`], holds
//! declared modules as loader closures and runs each loader at most once,
//! even when several threads import the same module at the same time.
//!
//! ```
//! use plexus_registry::locator::{Locator, Module, ModuleTable};
//!
//! let table = ModuleTable::new();
//! table.declare("greet", || Module::new("greet").with_value("hello", "hello, world"));
//!
//! let module = table.import("greet").unwrap();
//! assert!(module.attr("hello").is_some());
//! ```

use core::cell::RefCell;
use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};

use crate::component::Component;
use crate::error::ResolveError;
use crate::registry::Registry;

/// An attribute of a [`Module`].
#[derive(Debug, Clone)]
pub enum Attr {
    /// A plain value.
    Value(Component),
    /// A submodule.
    Module(Arc<Module>),
    /// A registry exposed by the module, e.g. for inclusion.
    Namespace(Registry),
}

/// A named table of attributes.
///
/// Attributes can be added after import; submodules are bound onto their
/// parent this way when they are first imported.
pub struct Module {
    name: String,
    attrs: RwLock<HashMap<String, Attr>>,
}

impl Module {
    /// Creates an empty module.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a value attribute.
    #[must_use]
    pub fn with_value<T: Send + Sync + 'static>(self, attr: impl Into<String>, value: T) -> Self {
        self.with_component(attr, Component::new(value))
    }

    /// Adds an already wrapped component attribute.
    #[must_use]
    pub fn with_component(self, attr: impl Into<String>, component: Component) -> Self {
        self.set_attr(attr, Attr::Value(component));
        self
    }

    /// Exposes a registry under `attr`.
    #[must_use]
    pub fn with_namespace(self, attr: impl Into<String>, registry: Registry) -> Self {
        self.set_attr(attr, Attr::Namespace(registry));
        self
    }

    /// Returns the module's dotted name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns an attribute by name.
    #[must_use]
    pub fn attr(&self, attr: &str) -> Option<Attr> {
        self.attrs.read().get(attr).cloned()
    }

    /// Sets an attribute, replacing any previous value.
    pub fn set_attr(&self, attr: impl Into<String>, value: Attr) {
        self.attrs.write().insert(attr.into(), value);
    }

    /// Returns the attribute names in no particular order.
    #[must_use]
    pub fn attr_names(&self) -> Vec<String> {
        self.attrs.read().keys().cloned().collect()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("attrs", &self.attr_names())
            .finish()
    }
}

/// Imports modules by dotted name.
///
/// Implementations must be deterministic: importing the same name twice
/// returns the same module.
pub trait Locator: Send + Sync + 'static {
    /// Imports the module named `module`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ModuleNotFound`] if no such module exists, or
    /// another [`ResolveError`] if loading it fails.
    fn import(&self, module: &str) -> Result<Arc<Module>, ResolveError>;
}

/// Loader closure for a declared module.
type Loader = Arc<dyn Fn() -> Result<Module, ResolveError> + Send + Sync>;

/// Import slot for one module name. Held locked while its loader runs, so
/// concurrent importers of the same name wait instead of loading again.
type ImportCell = Arc<Mutex<Option<Arc<Module>>>>;

thread_local! {
    /// Modules whose loader is running on this thread.
    static LOADING: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Marks a module as loading on this thread until dropped.
struct LoadingGuard;

impl LoadingGuard {
    fn enter(module: &str) -> Option<Self> {
        LOADING.with_borrow_mut(|stack| {
            if stack.iter().any(|name| name == module) {
                None
            } else {
                stack.push(module.to_string());
                Some(Self)
            }
        })
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        LOADING.with_borrow_mut(|stack| {
            stack.pop();
        });
    }
}

/// The default [`Locator`]: a table of declared modules loaded on demand.
///
/// Importing `a.b` imports `a` first and binds `b` onto it as a submodule
/// attribute. A parent that was never declared but has declared children is
/// created empty, like a namespace package.
#[derive(Default)]
pub struct ModuleTable {
    loaders: RwLock<HashMap<String, Loader>>,
    loaded: RwLock<HashMap<String, ImportCell>>,
}

impl ModuleTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with the built-in modules declared.
    ///
    /// Built-ins:
    ///
    /// | Module | Attributes |
    /// |--------|------------|
    /// | `math` | `sqrt`, `floor`, `ceil`, `abs`, `exp`, `ln` (`fn(f64) -> f64`), `pow` (`fn(f64, f64) -> f64`), `pi`, `e` (`f64`) |
    #[must_use]
    pub fn with_builtins() -> Self {
        let table = Self::new();
        table.declare("math", math_module);
        table
    }

    /// Declares a module. Re-declaring replaces the loader but does not
    /// affect a module that has already been imported.
    pub fn declare<F>(&self, name: impl Into<String>, loader: F) -> &Self
    where
        F: Fn() -> Module + Send + Sync + 'static,
    {
        self.declare_fallible(name, move || Ok(loader()))
    }

    /// Declares a module whose loader may fail.
    pub fn declare_fallible<F>(&self, name: impl Into<String>, loader: F) -> &Self
    where
        F: Fn() -> Result<Module, ResolveError> + Send + Sync + 'static,
    {
        self.loaders.write().insert(name.into(), Arc::new(loader));
        self
    }

    /// Returns `true` if `name` is declared.
    #[must_use]
    pub fn is_declared(&self, name: &str) -> bool {
        self.loaders.read().contains_key(name)
    }

    /// Returns `true` if `name` has been imported.
    #[must_use]
    ///
    /// A module whose loader is still running counts as not loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded
            .read()
            .get(name)
            .is_some_and(|cell| cell.try_lock().is_some_and(|module| module.is_some()))
    }

    fn cell(&self, name: &str) -> ImportCell {
        if let Some(cell) = self.loaded.read().get(name) {
            return Arc::clone(cell);
        }
        Arc::clone(self.loaded.write().entry(name.to_string()).or_default())
    }

    fn has_declared_children(&self, name: &str) -> bool {
        let prefix = format!("{name}.");
        self.loaders.read().keys().any(|key| key.starts_with(&prefix))
    }
}

impl Locator for ModuleTable {
    fn import(&self, module: &str) -> Result<Arc<Module>, ResolveError> {
        if module.is_empty() || module.split('.').any(str::is_empty) {
            return Err(ResolveError::InvalidPath(module.to_string()));
        }
        // A loader importing its own module (or a submodule of it) would wait
        // on its own import cell.
        let Some(_guard) = LoadingGuard::enter(module) else {
            return Err(ResolveError::Cycle(module.to_string()));
        };

        let parent = match module.rsplit_once('.') {
            Some((parent, leaf)) => Some((self.import(parent)?, leaf)),
            None => None,
        };

        let cell = self.cell(module);
        let mut slot = cell.lock();
        if let Some(loaded) = &*slot {
            return Ok(Arc::clone(loaded));
        }

        let loader = self.loaders.read().get(module).cloned();
        let imported = Arc::new(match loader {
            Some(loader) => loader()?,
            None if self.has_declared_children(module) => Module::new(module),
            None => return Err(ResolveError::ModuleNotFound(module.to_string())),
        });
        *slot = Some(Arc::clone(&imported));
        drop(slot);
        tracing::trace!(module, "imported module");

        if let Some((parent, leaf)) = parent
            && parent.attr(leaf).is_none()
        {
            parent.set_attr(leaf, Attr::Module(Arc::clone(&imported)));
        }
        Ok(imported)
    }
}

impl fmt::Debug for ModuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut declared: Vec<String> = self.loaders.read().keys().cloned().collect();
        declared.sort();
        f.debug_struct("ModuleTable")
            .field("declared", &declared)
            .field(
                "loaded",
                &self
                    .loaded
                    .read()
                    .values()
                    .filter(|cell| cell.try_lock().is_some_and(|module| module.is_some()))
                    .count(),
            )
            .finish()
    }
}

fn math_module() -> Module {
    Module::new("math")
        .with_value("sqrt", f64::sqrt as fn(f64) -> f64)
        .with_value("floor", f64::floor as fn(f64) -> f64)
        .with_value("ceil", f64::ceil as fn(f64) -> f64)
        .with_value("abs", f64::abs as fn(f64) -> f64)
        .with_value("exp", f64::exp as fn(f64) -> f64)
        .with_value("ln", f64::ln as fn(f64) -> f64)
        .with_value("pow", f64::powf as fn(f64, f64) -> f64)
        .with_value("pi", core::f64::consts::PI)
        .with_value("e", core::f64::consts::E)
}
