//! Component resolution.
//!
//! # Responsibilities
//! - Define the `Resolver` seam that `Context::dep` goes through
//! - Provide the default resolver that refuses everything
//! - Provide a factory table keyed by type with application and request scopes

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::components::{CacheError, Component, ComponentKey, DependencyCache, ResolveError, UseOnceCache};
use crate::routing::RouteMatch;

/// The only sanctioned way handler and filter code obtains an instance.
pub trait Resolver: Send + Sync + 'static {
    /// Produce the instance for `key`.
    ///
    /// `request` is the request-scoped cache of the current dispatch, `route`
    /// the route it matched (for parameterised construction).
    fn resolve(
        &self,
        key: ComponentKey,
        request: &DependencyCache,
        route: &RouteMatch,
    ) -> Result<Component, ResolveError>;
}

/// Default resolver: nothing is a component.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl Resolver for DenyAll {
    fn resolve(
        &self,
        key: ComponentKey,
        _request: &DependencyCache,
        _route: &RouteMatch,
    ) -> Result<Component, ResolveError> {
        Err(ResolveError::NotAComponent {
            type_name: key.type_name(),
        })
    }
}

type AppFactory = Arc<dyn Fn() -> Component + Send + Sync>;
type RequestFactory = Arc<dyn Fn(&RouteMatch) -> Component + Send + Sync>;

#[derive(Clone)]
enum Factory {
    Application(AppFactory),
    Request(RequestFactory),
}

/// Explicit factory table.
///
/// ```ignore
/// server.resolver(|token| {
///     Ok(Components::new(token)?
///         .application(Database::connect)
///         .request(|route| Session::for_user(route.param("1"))))
/// })?;
/// ```
pub struct Components {
    app: Arc<DependencyCache>,
    factories: HashMap<ComponentKey, Factory>,
}

impl Components {
    /// Build from the application cache token. Consumes the token's one use.
    pub fn new(token: &UseOnceCache) -> Result<Self, CacheError> {
        Ok(Self {
            app: token.take()?,
            factories: HashMap::new(),
        })
    }

    /// Register an application-scoped singleton.
    pub fn application<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let factory: AppFactory = Arc::new(move || Arc::new(factory()) as Component);
        self.factories
            .insert(ComponentKey::of::<T>(), Factory::Application(factory));
        self
    }

    /// Register a request-scoped component.
    pub fn request<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&RouteMatch) -> T + Send + Sync + 'static,
    {
        let factory: RequestFactory =
            Arc::new(move |route: &RouteMatch| Arc::new(factory(route)) as Component);
        self.factories
            .insert(ComponentKey::of::<T>(), Factory::Request(factory));
        self
    }

    /// Seed an application-scoped instance directly.
    pub fn seed<T>(self, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.app.put(ComponentKey::of::<T>(), Arc::new(value));
        self
    }
}

impl Resolver for Components {
    fn resolve(
        &self,
        key: ComponentKey,
        request: &DependencyCache,
        route: &RouteMatch,
    ) -> Result<Component, ResolveError> {
        match self.factories.get(&key) {
            Some(Factory::Application(factory)) => Ok(self.app.get_or_create(key, || factory())),
            Some(Factory::Request(factory)) => Ok(request.get_or_create(key, || factory(route))),
            None => self.app.get(key).ok_or(ResolveError::NotAComponent {
                type_name: key.type_name(),
            }),
        }
    }
}

impl fmt::Debug for Components {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.factories.keys().map(ComponentKey::type_name).collect();
        names.sort_unstable();
        f.debug_struct("Components").field("factories", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Pool;

    #[derive(Debug)]
    struct Session(String);

    fn resolve<T: Any + Send + Sync>(
        resolver: &dyn Resolver,
        request: &DependencyCache,
        route: &RouteMatch,
    ) -> Result<Arc<T>, ResolveError> {
        resolver
            .resolve(ComponentKey::of::<T>(), request, route)?
            .downcast::<T>()
            .map_err(|_| ResolveError::TypeMismatch {
                type_name: std::any::type_name::<T>(),
            })
    }

    #[test]
    fn deny_all_refuses_everything() {
        let app = DependencyCache::application();
        let request = DependencyCache::request(app);
        let err = resolve::<Pool>(&DenyAll, &request, &RouteMatch::default()).unwrap_err();
        assert!(matches!(err, ResolveError::NotAComponent { .. }));
        assert!(err.to_string().contains("not a component"));
    }

    #[test]
    fn scopes_follow_factory_kind() {
        let app = DependencyCache::application();
        let token = UseOnceCache::new(app.clone());
        let components = Components::new(&token)
            .unwrap()
            .application(|| Pool)
            .request(|route: &RouteMatch| Session(route.param("1").unwrap_or("anonymous").to_string()))
            .seed(7u16);
        assert!(Components::new(&token).is_err());

        let mut params = HashMap::new();
        params.insert("1".to_string(), "jimmy".to_string());
        let route = RouteMatch::new("^/users/(\\w+)$", params);

        let first = DependencyCache::request(app.clone());
        let second = DependencyCache::request(app.clone());

        let pool_a = resolve::<Pool>(&components, &first, &route).unwrap();
        let pool_b = resolve::<Pool>(&components, &second, &route).unwrap();
        assert!(Arc::ptr_eq(&pool_a, &pool_b));

        let session_a = resolve::<Session>(&components, &first, &route).unwrap();
        let session_a2 = resolve::<Session>(&components, &first, &route).unwrap();
        let session_b = resolve::<Session>(&components, &second, &route).unwrap();
        assert!(Arc::ptr_eq(&session_a, &session_a2));
        assert!(!Arc::ptr_eq(&session_a, &session_b));
        assert_eq!(session_a.0, "jimmy");

        assert_eq!(*resolve::<u16>(&components, &first, &route).unwrap(), 7);
        assert!(resolve::<String>(&components, &first, &route).is_err());
    }
}
