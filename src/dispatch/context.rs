//! Per-request context handed to filters, endpoints and message handlers.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::components::{ComponentKey, DenyAll, DependencyCache, ResolveError, Resolver};
use crate::routing::RouteMatch;

type Attribute = Arc<dyn Any + Send + Sync>;

/// Cloneable view of one request.
///
/// Carries the positional path parameters, request attributes set by filters
/// for downstream filters and the endpoint, and the request-scoped cache.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    request_id: Uuid,
    route: RouteMatch,
    attributes: Mutex<HashMap<String, Attribute>>,
    cache: DependencyCache,
    resolver: Arc<dyn Resolver>,
}

impl Context {
    pub(crate) fn new(
        request_id: Uuid,
        route: RouteMatch,
        app_cache: &Arc<DependencyCache>,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                request_id,
                route,
                attributes: Mutex::new(HashMap::new()),
                cache: DependencyCache::request(app_cache.clone()),
                resolver,
            }),
        }
    }

    /// Context detached from any server, backed by its own empty
    /// application cache and a resolver that refuses everything.
    pub fn standalone(route: RouteMatch) -> Self {
        Self::new(
            Uuid::new_v4(),
            route,
            &DependencyCache::application(),
            Arc::new(DenyAll),
        )
    }

    pub fn request_id(&self) -> Uuid {
        self.inner.request_id
    }

    pub fn route(&self) -> &RouteMatch {
        &self.inner.route
    }

    /// Path parameter by position: "1" is the first capture group.
    pub fn param(&self, index: &str) -> Option<&str> {
        self.inner.route.param(index)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.inner.route.params
    }

    pub fn set_attribute<T>(&self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.inner
            .attributes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), Arc::new(value));
    }

    /// Attribute set earlier in this request, if it exists with type `T`.
    pub fn attribute<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let value = self
            .inner
            .attributes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()?;
        value.downcast::<T>().ok()
    }

    /// Resolve a component through the server's resolver.
    pub fn dep<T>(&self) -> Result<Arc<T>, ResolveError>
    where
        T: Any + Send + Sync,
    {
        let key = ComponentKey::of::<T>();
        self.inner
            .resolver
            .resolve(key, &self.inner.cache, &self.inner.route)?
            .downcast::<T>()
            .map_err(|_| ResolveError::TypeMismatch {
                type_name: key.type_name(),
            })
    }

    pub fn request_cache(&self) -> &DependencyCache {
        &self.inner.cache
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.inner.request_id)
            .field("route", &self.inner.route)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_typed() {
        let ctx = Context::standalone(RouteMatch::default());
        ctx.set_attribute("user", "jimmy".to_string());
        ctx.clone().set_attribute("attempts", 3u32);

        assert_eq!(ctx.attribute::<String>("user").as_deref().map(String::as_str), Some("jimmy"));
        assert_eq!(ctx.attribute::<u32>("attempts").as_deref(), Some(&3));
        assert!(ctx.attribute::<u32>("user").is_none());
        assert!(ctx.attribute::<u32>("missing").is_none());
    }

    #[test]
    fn standalone_context_resolves_nothing() {
        let mut params = HashMap::new();
        params.insert("1".to_string(), "42".to_string());
        let ctx = Context::standalone(RouteMatch::new("^/orders/(\\d+)$", params));

        assert_eq!(ctx.param("1"), Some("42"));
        assert_eq!(ctx.param("2"), None);
        assert!(matches!(
            ctx.dep::<String>(),
            Err(ResolveError::NotAComponent { .. })
        ));
    }
}
