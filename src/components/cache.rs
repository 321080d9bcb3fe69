//! Two-tier dependency cache.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::components::CacheError;

/// A cached instance.
pub type Component = Arc<dyn Any + Send + Sync>;

/// Cache key: the type of the component.
#[derive(Debug, Clone, Copy)]
pub struct ComponentKey {
    id: TypeId,
    name: &'static str,
}

impl ComponentKey {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentKey {}

impl Hash for ComponentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Lifetime of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// One per server, shared by every request.
    Application,
    /// One per request (or WebSocket message), dropped when it ends.
    Request,
}

impl Scope {
    fn as_str(&self) -> &'static str {
        match self {
            Scope::Application => "application",
            Scope::Request => "request",
        }
    }
}

/// Key → instance store with an optional parent.
///
/// Every key owns a `OnceLock` slot. The map lock is only held while the
/// slot is looked up, never while a factory runs, so factories may resolve
/// other keys of the same cache.
pub struct DependencyCache {
    scope: Scope,
    entries: DashMap<ComponentKey, Arc<OnceLock<Component>>>,
    parent: Option<Arc<DependencyCache>>,
}

impl DependencyCache {
    /// Create the application-scoped cache of a server.
    pub fn application() -> Arc<Self> {
        Arc::new(Self {
            scope: Scope::Application,
            entries: DashMap::new(),
            parent: None,
        })
    }

    /// Create a request-scoped cache chained to `parent`.
    pub fn request(parent: Arc<DependencyCache>) -> Self {
        Self {
            scope: Scope::Request,
            entries: DashMap::new(),
            parent: Some(parent),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Return the instance for `key`, running `factory` if there is none yet.
    ///
    /// Concurrent callers for the same key wait for the first one; `factory`
    /// runs at most once per key for the lifetime of this cache.
    pub fn get_or_create(&self, key: ComponentKey, factory: impl FnOnce() -> Component) -> Component {
        let slot = Arc::clone(
            self.entries
                .entry(key)
                .or_insert_with(|| Arc::new(OnceLock::new()))
                .value(),
        );
        slot.get_or_init(factory).clone()
    }

    /// Typed variant of [`get_or_create`](Self::get_or_create) keyed by `T`.
    pub fn get_or_create_typed<T>(&self, factory: impl FnOnce() -> T) -> Result<Arc<T>, CacheError>
    where
        T: Any + Send + Sync,
    {
        let key = ComponentKey::of::<T>();
        self.get_or_create(key, || Arc::new(factory()))
            .downcast::<T>()
            .map_err(|_| CacheError::TypeMismatch {
                type_name: key.type_name(),
            })
    }

    /// Instance for `key` if one was already created or seeded.
    pub fn get(&self, key: ComponentKey) -> Option<Component> {
        let slot = self.entries.get(&key).map(|slot| Arc::clone(slot.value()))?;
        slot.get().cloned()
    }

    /// Force-seed a value, replacing any previous one.
    pub fn put(&self, key: ComponentKey, component: Component) {
        self.entries.insert(key, Arc::new(OnceLock::from(component)));
    }

    /// The next cache up the chain.
    pub fn parent(&self) -> Result<&Arc<DependencyCache>, CacheError> {
        self.parent.as_ref().ok_or(CacheError::NoParent {
            scope: self.scope.as_str(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for DependencyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyCache")
            .field("scope", &self.scope)
            .field("entries", &self.entries.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
