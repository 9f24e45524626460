//! The registry: a `(tag, label) → entry` store forming a namespace tree.
//!
//! A [`Registry`] maps a capability tag plus a label to an [`Entry`]. Entries
//! are concrete components, nested registries ("branches"), or deferred
//! references that are resolved on first lookup and replaced in place.
//!
//! # Sharing
//!
//! `Registry` is a handle. Clones point at the same store, so a deferred
//! entry resolved through one clone is resolved for all of them.
//!
//! # Locking
//!
//! Each registry node guards its map with its own [`RwLock`], and each slot
//! guards its entry with a [`Mutex`]. The entry lock is never held while a
//! deferred entry resolves. A second per-slot lock serializes resolution
//! instead: concurrent lookups of the same key wait and then observe the
//! resolved value, and lookups of other keys proceed.
//!
//! Loader code may therefore read, overwrite, or remove the very key being
//! resolved. An overwrite replaces the slot, so later lookups see the new
//! entry while the lookup in flight still returns what it resolved.
//!
//! # Example
//!
//! ```
//! use plexus_registry::Registry;
//! use plexus_registry::tag::Apps;
//!
//! let registry = Registry::new();
//! registry.set::<Apps>("sqrt", "math.sqrt");
//!
//! let sqrt = registry.component::<fn(f64) -> f64>("sqrt").unwrap();
//! assert_eq!(sqrt(4.0), 2.0);
//!
//! let views = registry.branch("views").unwrap();
//! assert!(views.ptr_eq(&registry.branch("views").unwrap()));
//! ```

use core::any::{Any, TypeId};
use core::cell::RefCell;
use core::fmt;
use std::sync::{Arc, Weak};

use hashbrown::HashMap;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use crate::component::Component;
use crate::entry::{DEFAULT_INCLUDE_ATTR, DeferredRef, Entry, Resolved};
use crate::error::{RegistryError, ResolveError};
use crate::locator::{Locator, ModuleTable};
use crate::resolver::{DEFAULT_RESOLVE_CACHE_SIZE, Resolver};
use crate::service::Service;
use crate::tag::{Apps, Tag, TagId};

// ─────────────────────────────────────────────────────────────────────────────
// RegistryConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration shared by a registry and every branch beneath it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use plexus_registry::{Registry, RegistryConfig};
/// use plexus_registry::locator::{Module, ModuleTable};
///
/// let modules = ModuleTable::with_builtins();
/// modules.declare("greetings", || Module::new("greetings").with_value("en", "hello"));
///
/// let registry = Registry::with_config(
///     RegistryConfig::default()
///         .with_root_label("app")
///         .with_locator(Arc::new(modules)),
/// );
/// assert_eq!(registry.root_label(), "app");
/// ```
#[derive(Clone)]
pub struct RegistryConfig {
    root_label: String,
    locator: Arc<dyn Locator>,
    include_attr: String,
    resolve_cache_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            root_label: "root".to_string(),
            locator: Arc::new(ModuleTable::with_builtins()),
            include_attr: DEFAULT_INCLUDE_ATTR.to_string(),
            resolve_cache_size: DEFAULT_RESOLVE_CACHE_SIZE,
        }
    }
}

impl RegistryConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the label of the root registry.
    #[must_use]
    pub fn with_root_label(mut self, label: impl Into<String>) -> Self {
        self.root_label = label.into();
        self
    }

    /// Sets the locator used to resolve deferred references.
    #[must_use]
    pub fn with_locator(mut self, locator: Arc<dyn Locator>) -> Self {
        self.locator = locator;
        self
    }

    /// Sets the attribute [`Registry::include`] reads off included modules.
    #[must_use]
    pub fn with_include_attr(mut self, attr: impl Into<String>) -> Self {
        self.include_attr = attr.into();
        self
    }

    /// Sets how many imported modules the resolver remembers. Zero disables the cache.
    #[must_use]
    pub fn with_resolve_cache_size(mut self, size: usize) -> Self {
        self.resolve_cache_size = size;
        self
    }

    /// Returns the root label.
    #[must_use]
    pub fn root_label(&self) -> &str {
        &self.root_label
    }

    /// Returns the include attribute.
    #[must_use]
    pub fn include_attr(&self) -> &str {
        &self.include_attr
    }

    /// Returns the resolve cache size.
    #[must_use]
    pub fn resolve_cache_size(&self) -> usize {
        self.resolve_cache_size
    }
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("root_label", &self.root_label)
            .field("include_attr", &self.include_attr)
            .field("resolve_cache_size", &self.resolve_cache_size)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal storage
// ─────────────────────────────────────────────────────────────────────────────

/// State shared by every node of one registry tree.
struct Shared {
    config: RegistryConfig,
    resolver: Resolver,
}

/// One `(tag, label)` slot. Replaced wholesale on overwrite.
struct Slot {
    entry: Mutex<Entry>,
    /// Held for the duration of a resolution; the entry lock is not.
    resolution: Mutex<()>,
}

impl Slot {
    fn new(entry: Entry) -> Arc<Self> {
        Arc::new(Self {
            entry: Mutex::new(entry),
            resolution: Mutex::new(()),
        })
    }

    fn pending(&self) -> Result<DeferredRef, Resolved> {
        match &*self.entry.lock() {
            Entry::Component(component) => Err(Resolved::Component(component.clone())),
            Entry::Branch(branch) => Err(Resolved::Branch(branch.clone())),
            Entry::Deferred(deferred) => Ok(deferred.clone()),
        }
    }
}

type SlotKey = (TagId, String);

type BoxedService = Arc<dyn Any + Send + Sync>;

struct RegistryInner {
    label: String,
    path: String,
    shared: Arc<Shared>,
    entries: RwLock<IndexMap<SlotKey, Arc<Slot>>>,
    services: RwLock<HashMap<TypeId, BoxedService>>,
}

thread_local! {
    /// Slots this thread is currently resolving, by address.
    static RESOLVING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a slot as being resolved on this thread until dropped.
struct ResolvingGuard(usize);

impl ResolvingGuard {
    fn enter(slot: &Arc<Slot>) -> Option<Self> {
        let addr = Arc::as_ptr(slot) as usize;
        RESOLVING.with_borrow_mut(|stack| {
            if stack.contains(&addr) {
                None
            } else {
                stack.push(addr);
                Some(Self(addr))
            }
        })
    }
}

impl Drop for ResolvingGuard {
    fn drop(&mut self) {
        RESOLVING.with_borrow_mut(|stack| {
            if let Some(pos) = stack.iter().rposition(|addr| *addr == self.0) {
                stack.remove(pos);
            }
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// A node in the namespace tree.
///
/// See the [module documentation](self) for sharing and locking rules.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a root registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates a root registry.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        let resolver =
            Resolver::with_cache_size(Arc::clone(&config.locator), config.resolve_cache_size);
        let label = config.root_label.clone();
        let shared = Arc::new(Shared { config, resolver });
        Self::from_parts(label.clone(), label, shared)
    }

    fn from_parts(label: String, path: String, shared: Arc<Shared>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                label,
                path,
                shared,
                entries: RwLock::new(IndexMap::new()),
                services: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Creates a registry that shares this one's configuration and resolver
    /// but is not stored in it.
    ///
    /// Use [`branch`](Self::branch) to create a child that is reachable from
    /// this registry.
    #[must_use]
    pub fn child(&self, label: impl Into<String>) -> Registry {
        let label = label.into();
        let path = format!("{}.{}", self.inner.path, label);
        Self::from_parts(label, path, Arc::clone(&self.inner.shared))
    }

    /// Returns this node's label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Returns the label of the tree's root.
    #[must_use]
    pub fn root_label(&self) -> &str {
        self.inner.shared.config.root_label()
    }

    /// Returns the dotted path from the root to this node.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Returns the tree's configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.shared.config
    }

    /// Returns the tree's resolver.
    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.inner.shared.resolver
    }

    /// Returns `true` if both handles point at the same registry.
    #[must_use]
    pub fn ptr_eq(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Creates a handle that does not keep the registry alive.
    ///
    /// Services stored in a registry use this to refer back to it.
    #[must_use]
    pub fn downgrade(&self) -> WeakRegistry {
        WeakRegistry {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────────

    /// Looks up the entry at `(T, label)`, resolving it if it is deferred.
    ///
    /// A resolved value is written back to the slot, so later lookups return
    /// the same object without resolving again.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] if nothing is stored at `(T, label)`
    /// - [`RegistryError::Resolve`] if a deferred entry fails to resolve
    pub fn get<T: Tag>(&self, label: &str) -> Result<Resolved, RegistryError> {
        self.get_by_id(TagId::of::<T>(), label)
    }

    /// [`get`](Self::get) with a runtime tag.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn get_by_id(&self, tag: TagId, label: &str) -> Result<Resolved, RegistryError> {
        let slot = self
            .slot(tag, label)
            .ok_or_else(|| RegistryError::NotFound {
                tag,
                label: label.to_string(),
            })?;
        self.resolve_slot(&slot, tag, label)
    }

    /// Looks up an [`Apps`] component and downcasts it to `C`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TypeMismatch`] if the entry is a branch or a
    /// component of another type, plus every error of [`get`](Self::get).
    pub fn component<C: Send + Sync + 'static>(&self, label: &str) -> Result<Arc<C>, RegistryError> {
        let resolved = self.get::<Apps>(label)?;
        let found = resolved.describe();
        resolved
            .into_component()
            .and_then(|component| component.downcast::<C>())
            .ok_or_else(|| RegistryError::TypeMismatch {
                label: label.to_string(),
                expected: core::any::type_name::<C>(),
                found,
            })
    }

    /// Returns a copy of the stored entry without resolving it.
    #[must_use]
    pub fn peek<T: Tag>(&self, label: &str) -> Option<Entry> {
        self.peek_by_id(TagId::of::<T>(), label)
    }

    /// [`peek`](Self::peek) with a runtime tag.
    #[must_use]
    pub fn peek_by_id(&self, tag: TagId, label: &str) -> Option<Entry> {
        self.slot(tag, label).map(|slot| slot.entry.lock().clone())
    }

    /// Walks branches along a dotted path and looks up the final segment
    /// under [`Apps`].
    ///
    /// `lookup("db.pool")` is `branch "db"`, then `get::<Apps>("pool")`.
    /// Intermediate branches must already exist.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Configuration`] if the path has an empty segment
    /// - [`RegistryError::TypeMismatch`] if an intermediate entry is not a branch
    /// - every error of [`get`](Self::get)
    pub fn lookup(&self, path: &str) -> Result<Resolved, RegistryError> {
        let segments = split_labels(path)?;
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(RegistryError::configuration("empty lookup path"));
        };

        let mut node = self.clone();
        for segment in parents {
            let resolved = node.get::<Apps>(segment)?;
            let found = resolved.describe();
            node = resolved
                .into_branch()
                .ok_or_else(|| RegistryError::TypeMismatch {
                    label: (*segment).to_string(),
                    expected: "branch",
                    found,
                })?;
        }
        node.get::<Apps>(leaf)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Stores an entry at `(T, label)`, replacing whatever was there.
    ///
    /// Strings are stored as deferred import paths and `(module, attr)` pairs
    /// as deferred includes; see the `From` impls on [`Entry`]. Wrap plain
    /// values in a [`Component`]. The previous entry is returned regardless
    /// of its kind.
    pub fn set<T: Tag>(&self, label: impl Into<String>, entry: impl Into<Entry>) -> Option<Entry> {
        self.set_by_id(TagId::of::<T>(), label, entry)
    }

    /// [`set`](Self::set) with a runtime tag.
    pub fn set_by_id(
        &self,
        tag: TagId,
        label: impl Into<String>,
        entry: impl Into<Entry>,
    ) -> Option<Entry> {
        let label = label.into();
        let entry = entry.into();
        tracing::debug!(
            registry = %self.inner.path,
            tag = %tag,
            label = %label,
            kind = entry.kind(),
            "registering entry"
        );
        let previous = self
            .inner
            .entries
            .write()
            .insert((tag, label), Slot::new(entry));
        previous.map(|slot| slot.entry.lock().clone())
    }

    /// Wraps `value` in a [`Component`] and stores it under [`Apps`].
    pub fn insert<C: Send + Sync + 'static>(
        &self,
        label: impl Into<String>,
        value: C,
    ) -> Option<Entry> {
        self.set::<Apps>(label, Component::new(value))
    }

    /// Stores a deferred include of `module` under [`Apps`], reading the
    /// configured include attribute.
    pub fn include(&self, label: impl Into<String>, module: impl Into<String>) -> Option<Entry> {
        let deferred = DeferredRef::include_attr(module, self.config().include_attr());
        self.set::<Apps>(label, deferred)
    }

    /// Removes and returns the entry at `(T, label)`.
    pub fn remove<T: Tag>(&self, label: &str) -> Option<Entry> {
        self.remove_by_id(TagId::of::<T>(), label)
    }

    /// [`remove`](Self::remove) with a runtime tag.
    pub fn remove_by_id(&self, tag: TagId, label: &str) -> Option<Entry> {
        let removed = self
            .inner
            .entries
            .write()
            .shift_remove(&(tag, label.to_string()));
        removed.map(|slot| slot.entry.lock().clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Branches
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the branch at `label`, creating it if absent.
    ///
    /// This is get-or-create: an existing branch is the success path, not an
    /// error. A deferred include stored at `label` is resolved and returned.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Configuration`] if `label` is empty or contains a
    ///   `.`, or if a component is stored at `label`
    /// - [`RegistryError::Resolve`] if a deferred entry at `label` fails to resolve
    pub fn branch(&self, label: &str) -> Result<Registry, RegistryError> {
        validate_label(label)?;
        let tag = TagId::of::<Apps>();

        let existing = {
            let mut entries = self.inner.entries.write();
            match entries.get(&(tag, label.to_string())) {
                Some(slot) => Arc::clone(slot),
                None => {
                    let child = self.child(label);
                    entries.insert(
                        (tag, label.to_string()),
                        Slot::new(Entry::Branch(child.clone())),
                    );
                    tracing::debug!(registry = %self.inner.path, label, "created branch");
                    return Ok(child);
                }
            }
        };

        match self.resolve_slot(&existing, tag, label)? {
            Resolved::Branch(branch) => Ok(branch),
            Resolved::Component(component) => Err(RegistryError::configuration(format!(
                "cannot branch at '{label}' in '{}': it holds a component of type {}",
                self.inner.path,
                component.type_name()
            ))),
        }
    }

    /// Get-or-creates every branch along a dotted path and returns the last.
    ///
    /// # Errors
    ///
    /// See [`branch`](Self::branch).
    pub fn branch_path(&self, path: &str) -> Result<Registry, RegistryError> {
        split_labels(path)?
            .into_iter()
            .try_fold(self.clone(), |node, segment| node.branch(segment))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns `true` if `label` is registered under [`Apps`], resolved or not.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.contains_key::<Apps>(label)
    }

    /// Returns `true` if anything is stored at `(T, label)`.
    #[must_use]
    pub fn contains_key<T: Tag>(&self, label: &str) -> bool {
        self.contains_key_by_id(TagId::of::<T>(), label)
    }

    /// [`contains_key`](Self::contains_key) with a runtime tag.
    #[must_use]
    pub fn contains_key_by_id(&self, tag: TagId, label: &str) -> bool {
        self.inner
            .entries
            .read()
            .contains_key(&(tag, label.to_string()))
    }

    /// Returns the labels stored under `T`, in insertion order.
    #[must_use]
    pub fn labels<T: Tag>(&self) -> Vec<String> {
        self.labels_by_id(TagId::of::<T>())
    }

    /// [`labels`](Self::labels) with a runtime tag.
    #[must_use]
    pub fn labels_by_id(&self, tag: TagId) -> Vec<String> {
        self.inner
            .entries
            .read()
            .keys()
            .filter(|(key_tag, _)| *key_tag == tag)
            .map(|(_, label)| label.clone())
            .collect()
    }

    /// Returns the number of entries across all tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Services
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the service of type `S` attached to this node, if any.
    #[must_use]
    pub fn service<S: Service>(&self) -> Option<Arc<S>> {
        self.inner
            .services
            .read()
            .get(&TypeId::of::<S>())
            .and_then(|service| Arc::clone(service).downcast::<S>().ok())
    }

    /// Returns the service of type `S`, constructing it on first use.
    ///
    /// `init` runs without any registry lock held. If two threads race, the
    /// first service stored wins and both receive it.
    pub fn service_or_init<S: Service>(&self, init: impl FnOnce(&Registry) -> S) -> Arc<S> {
        if let Some(existing) = self.service::<S>() {
            return existing;
        }
        let fresh: BoxedService = Arc::new(init(self));
        let stored = Arc::clone(
            self.inner
                .services
                .write()
                .entry(TypeId::of::<S>())
                .or_insert(fresh),
        );
        stored
            .downcast::<S>()
            .unwrap_or_else(|_| unreachable!("services are keyed by their own TypeId"))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn slot(&self, tag: TagId, label: &str) -> Option<Arc<Slot>> {
        self.inner
            .entries
            .read()
            .get(&(tag, label.to_string()))
            .cloned()
    }

    fn resolve_slot(
        &self,
        slot: &Arc<Slot>,
        tag: TagId,
        label: &str,
    ) -> Result<Resolved, RegistryError> {
        let Some(_guard) = ResolvingGuard::enter(slot) else {
            return Err(ResolveError::Cycle(format!("{}.{label}", self.inner.path)).into());
        };

        if let Err(resolved) = slot.pending() {
            return Ok(resolved);
        }
        let _resolution = slot.resolution.lock();
        // Another thread may have finished while this one waited.
        let deferred = match slot.pending() {
            Ok(deferred) => deferred,
            Err(resolved) => return Ok(resolved),
        };

        let resolved = self.inner.shared.resolver.resolve(&deferred)?;
        tracing::debug!(
            registry = %self.inner.path,
            tag = %tag,
            label,
            target = %deferred,
            "resolved deferred entry"
        );
        *slot.entry.lock() = Entry::from(resolved.clone());
        Ok(resolved)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("path", &self.inner.path)
            .field("entries", &self.len())
            .finish()
    }
}

/// A non-owning handle to a [`Registry`], created by [`Registry::downgrade`].
#[derive(Clone)]
pub struct WeakRegistry {
    inner: Weak<RegistryInner>,
}

impl WeakRegistry {
    /// Returns the registry if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Registry> {
        self.inner.upgrade().map(|inner| Registry { inner })
    }
}

impl fmt::Debug for WeakRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRegistry")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

fn validate_label(label: &str) -> Result<(), RegistryError> {
    if label.is_empty() || label.contains('.') {
        return Err(RegistryError::configuration(format!(
            "invalid branch label '{label}': labels must be non-empty and contain no '.'"
        )));
    }
    Ok(())
}

fn split_labels(path: &str) -> Result<Vec<&str>, RegistryError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(RegistryError::configuration(format!(
            "invalid registry path '{path}'"
        )));
    }
    Ok(segments)
}
