//! Composition-time server and its started engine.
//!
//! # Data Flow
//! ```text
//! Server::new(config)
//!     → resolver(|token| ...)    (exchange the use-once token for app cache)
//!     → configure(|c| ...)       (routes, filters, websockets, paths)
//!     → start()                  (flip lifecycle flag, freeze tables)
//!     → Engine                   (cloneable, read-only, shared by transports)
//! ```
//!
//! # Design Decisions
//! - Registration keeps answering after start, but only with errors
//! - The engine owns a snapshot of the table; the server's copy stays
//!   available for collision checks

pub mod engine;

use std::sync::Arc;

use thiserror::Error;

use crate::components::{CacheError, DenyAll, DependencyCache, Resolver, UseOnceCache};
use crate::config::EngineConfig;
use crate::dispatch::{Dispatcher, ErrorSink, MetricsStatsSink, StatsSink, TracingErrorSink};
use crate::lifecycle::LifecycleState;
use crate::routing::{Composer, CompositionError};

pub use engine::Engine;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Composition(#[from] CompositionError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// A server under composition.
pub struct Server {
    config: EngineConfig,
    lifecycle: LifecycleState,
    composer: Composer,
    app_cache: Arc<DependencyCache>,
    resolver: Arc<dyn Resolver>,
    resolver_installed: bool,
    stats: Arc<dyn StatsSink>,
    errors: Arc<dyn ErrorSink>,
}

impl Server {
    pub fn new(config: EngineConfig) -> Self {
        let lifecycle = LifecycleState::new();
        Self {
            config,
            composer: Composer::new(lifecycle.clone()),
            lifecycle,
            app_cache: DependencyCache::application(),
            resolver: Arc::new(DenyAll),
            resolver_installed: false,
            stats: Arc::new(MetricsStatsSink),
            errors: Arc::new(TracingErrorSink),
        }
    }

    /// Install the component resolver.
    ///
    /// `build` receives a token that can be exchanged for the application
    /// cache exactly once; the resolver it returns is the only code that
    /// keeps a handle on that cache. Only one resolver can be installed, and
    /// a failed `build` still uses up the single attempt.
    pub fn resolver<R, B>(&mut self, build: B) -> Result<&mut Self, ServerError>
    where
        R: Resolver,
        B: FnOnce(&UseOnceCache) -> Result<R, CacheError>,
    {
        self.lifecycle.ensure_mutable("components")?;
        if self.resolver_installed {
            return Err(CompositionError::ResolverInstalled.into());
        }
        self.resolver_installed = true;
        let token = UseOnceCache::new(self.app_cache.clone());
        self.resolver = Arc::new(build(&token)?);
        Ok(self)
    }

    pub fn stats_sink(&mut self, sink: impl StatsSink) -> Result<&mut Self, CompositionError> {
        self.lifecycle.ensure_mutable("hooks")?;
        self.stats = Arc::new(sink);
        Ok(self)
    }

    pub fn error_sink(&mut self, sink: impl ErrorSink) -> Result<&mut Self, CompositionError> {
        self.lifecycle.ensure_mutable("hooks")?;
        self.errors = Arc::new(sink);
        Ok(self)
    }

    /// Run a composition block against the top-level table.
    pub fn configure<F>(&mut self, build: F) -> Result<&mut Self, CompositionError>
    where
        F: FnOnce(&mut Composer) -> Result<(), CompositionError>,
    {
        build(&mut self.composer)?;
        Ok(self)
    }

    /// Direct access to the composer, for registration outside a block.
    pub fn composer(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.lifecycle.is_started()
    }

    /// Freeze composition and hand out the dispatch engine.
    pub fn start(&mut self) -> Result<Engine, CompositionError> {
        if !self.composer.lifecycle().mark_started() {
            return Err(CompositionError::StartedTwice);
        }

        let table = self.composer.table().clone();
        tracing::info!(
            routes = table.route_count(),
            filters = table.filter_count(),
            websockets = table.websocket_count(),
            "Server started"
        );

        let dispatcher = Dispatcher::new(
            table,
            self.app_cache.clone(),
            self.resolver.clone(),
            self.stats.clone(),
            self.errors.clone(),
        );
        Ok(Engine::new(dispatcher, self.config.clone()))
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("started", &self.lifecycle.is_started())
            .field("table", self.composer.table())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::components::Components;
    use crate::dispatch::{BoxError, Context, Request, Response};
    use crate::routing::Compose;

    async fn noop(_req: Arc<Request>, _res: Response, _ctx: Context) -> Result<(), BoxError> {
        Ok(())
    }

    #[test]
    fn start_freezes_composition() {
        let mut server = Server::new(EngineConfig::default());
        server
            .configure(|c| {
                c.path("/advertising", |c| {
                    c.path("/selling", |c| {
                        c.get("/offers", noop)?;
                        Ok(())
                    })?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap();

        let engine = server.start().unwrap();
        assert!(server.is_started());
        assert_eq!(engine.table().route_count(), 1);

        let err = server
            .configure(|c| {
                c.path("/advertising", |c| {
                    c.path("/buying", |_| Ok(()))?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "path already registered: /advertising");

        assert!(matches!(
            server.composer().get("/late", noop),
            Err(CompositionError::AlreadyStarted { what: "endpoints" })
        ));
        assert!(matches!(server.start(), Err(CompositionError::StartedTwice)));
        assert!(matches!(
            server.resolver(|_| Ok(DenyAll)),
            Err(ServerError::Composition(CompositionError::AlreadyStarted { .. }))
        ));
        assert_eq!(engine.table().route_count(), 1);
    }

    #[test]
    fn resolver_can_only_be_installed_once() {
        let mut server = Server::new(EngineConfig::default());
        server
            .resolver(|token| Ok(Components::new(token)?.seed(1u8)))
            .unwrap();

        let mut reached_builder = false;
        let result = server.resolver(|token| {
            reached_builder = true;
            Components::new(token)
        });
        assert!(matches!(
            result,
            Err(ServerError::Composition(CompositionError::ResolverInstalled))
        ));
        assert!(!reached_builder);
    }

    #[test]
    fn resolver_token_is_single_use() {
        let mut server = Server::new(EngineConfig::default());
        let result = server.resolver(|token| {
            let first = Components::new(token)?;
            let _second = Components::new(token)?;
            Ok(first)
        });
        assert!(matches!(
            result,
            Err(ServerError::Cache(CacheError::UseOnceViolation { .. }))
        ));
    }
}
