//! Hierarchical path composition.
//!
//! # Responsibilities
//! - Register endpoints, filters and WebSocket handlers into the current table
//! - Run path blocks against a scratch table and merge them back prefixed
//! - Refuse every structural change once the server has started
//!
//! # Design Decisions
//! - Scratch tables live on an explicit stack; nested `path` calls push and
//!   pop, so a block at depth N always writes into `stack[N]`
//! - The namespace guard runs before the lifecycle guard: a colliding prefix
//!   reports the collision whether or not the server is running

use std::future::Future;
use std::sync::Arc;

use crate::dispatch::{BoxError, Context, Filter, Flow, Handler, Request, Response};
use crate::lifecycle::LifecycleState;
use crate::routing::pattern::{Method, MethodSelector, RoutePattern};
use crate::routing::table::RouteTable;
use crate::routing::CompositionError;
use crate::websocket::{FrameSender, MessageHandler};

/// Registration surface shared by [`Composer`] and [`PathScope`].
///
/// Implementors provide the three `add_*` primitives and `path`; the
/// convenience methods are derived from them.
pub trait Compose {
    fn add_endpoint(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), CompositionError>;

    fn add_filter(
        &mut self,
        method: MethodSelector,
        pattern: &str,
        filter: Arc<dyn Filter>,
    ) -> Result<(), CompositionError>;

    fn add_websocket(
        &mut self,
        sub_path: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), CompositionError>;

    /// Compose a block of registrations under `prefix`.
    fn path<B>(&mut self, prefix: &str, build: B) -> Result<PathScope<'_>, CompositionError>
    where
        B: FnOnce(&mut Composer) -> Result<(), CompositionError>;

    fn endpoint<F, Fut>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: F,
    ) -> Result<&mut Self, CompositionError>
    where
        Self: Sized,
        F: Fn(Arc<Request>, Response, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.add_endpoint(method, pattern, Arc::new(handler))?;
        Ok(self)
    }

    fn get<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, CompositionError>
    where
        Self: Sized,
        F: Fn(Arc<Request>, Response, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.endpoint(Method::Get, pattern, handler)
    }

    fn post<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, CompositionError>
    where
        Self: Sized,
        F: Fn(Arc<Request>, Response, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.endpoint(Method::Post, pattern, handler)
    }

    fn put<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, CompositionError>
    where
        Self: Sized,
        F: Fn(Arc<Request>, Response, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.endpoint(Method::Put, pattern, handler)
    }

    fn delete<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, CompositionError>
    where
        Self: Sized,
        F: Fn(Arc<Request>, Response, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.endpoint(Method::Delete, pattern, handler)
    }

    fn patch<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, CompositionError>
    where
        Self: Sized,
        F: Fn(Arc<Request>, Response, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.endpoint(Method::Patch, pattern, handler)
    }

    fn head<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, CompositionError>
    where
        Self: Sized,
        F: Fn(Arc<Request>, Response, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.endpoint(Method::Head, pattern, handler)
    }

    fn options<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, CompositionError>
    where
        Self: Sized,
        F: Fn(Arc<Request>, Response, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.endpoint(Method::Options, pattern, handler)
    }

    /// Register a filter that runs for every method.
    fn filter<F, Fut>(&mut self, pattern: &str, filter: F) -> Result<&mut Self, CompositionError>
    where
        Self: Sized,
        F: Fn(Arc<Request>, Response, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow, BoxError>> + Send + 'static,
    {
        self.add_filter(MethodSelector::All, pattern, Arc::new(filter))?;
        Ok(self)
    }

    /// Register a filter for a single method.
    fn filter_for<F, Fut>(
        &mut self,
        method: Method,
        pattern: &str,
        filter: F,
    ) -> Result<&mut Self, CompositionError>
    where
        Self: Sized,
        F: Fn(Arc<Request>, Response, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow, BoxError>> + Send + 'static,
    {
        self.add_filter(MethodSelector::Only(method), pattern, Arc::new(filter))?;
        Ok(self)
    }

    /// Register a WebSocket message handler for an exact sub-path.
    fn websocket<F, Fut>(&mut self, sub_path: &str, handler: F) -> Result<&mut Self, CompositionError>
    where
        Self: Sized,
        F: Fn(Vec<u8>, FrameSender, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.add_websocket(sub_path, Arc::new(handler))?;
        Ok(self)
    }
}

/// Builds the route table of one server.
#[derive(Debug)]
pub struct Composer {
    root: RouteTable,
    scratch: Vec<RouteTable>,
    lifecycle: LifecycleState,
}

impl Composer {
    pub fn new(lifecycle: LifecycleState) -> Self {
        Self {
            root: RouteTable::new(),
            scratch: Vec::new(),
            lifecycle,
        }
    }

    /// Table registrations currently land in.
    fn current(&mut self) -> &mut RouteTable {
        match self.scratch.last_mut() {
            Some(table) => table,
            None => &mut self.root,
        }
    }

    fn current_ref(&self) -> &RouteTable {
        self.scratch.last().unwrap_or(&self.root)
    }

    /// Nesting depth of the block currently running (0 at top level).
    pub fn depth(&self) -> usize {
        self.scratch.len()
    }

    /// The fully composed top-level table.
    pub fn table(&self) -> &RouteTable {
        &self.root
    }

    pub(crate) fn lifecycle(&self) -> &LifecycleState {
        &self.lifecycle
    }

    fn compose(
        &mut self,
        prefix: &str,
        build: impl FnOnce(&mut Composer) -> Result<(), CompositionError>,
    ) -> Result<(), CompositionError> {
        if self.current_ref().claims_namespace(prefix) {
            return Err(CompositionError::PathAlreadyRegistered {
                prefix: prefix.to_string(),
            });
        }
        self.lifecycle.ensure_mutable("paths")?;

        self.scratch.push(RouteTable::new());
        let built = build(self);
        let scratch = self.scratch.pop().unwrap_or_default();
        built?;

        let prefixed = scratch.prefixed(prefix)?;
        self.current().merge(prefixed)?;
        tracing::debug!(prefix, depth = self.depth(), "Path composed");
        Ok(())
    }
}

impl Compose for Composer {
    fn add_endpoint(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), CompositionError> {
        self.lifecycle.ensure_mutable("endpoints")?;
        let pattern = RoutePattern::compile(pattern)?;
        self.current().add_route(method, pattern, handler);
        Ok(())
    }

    fn add_filter(
        &mut self,
        method: MethodSelector,
        pattern: &str,
        filter: Arc<dyn Filter>,
    ) -> Result<(), CompositionError> {
        self.lifecycle.ensure_mutable("filters")?;
        let pattern = RoutePattern::compile(pattern)?;
        self.current().add_filter(method, pattern, filter)
    }

    fn add_websocket(
        &mut self,
        sub_path: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), CompositionError> {
        self.lifecycle.ensure_mutable("websocket")?;
        self.current().add_websocket(sub_path, handler)
    }

    fn path<B>(&mut self, prefix: &str, build: B) -> Result<PathScope<'_>, CompositionError>
    where
        B: FnOnce(&mut Composer) -> Result<(), CompositionError>,
    {
        self.compose(prefix, build)?;
        Ok(PathScope {
            composer: self,
            prefix: prefix.to_string(),
        })
    }
}

/// Handle returned by [`Compose::path`] for registering more entries under
/// the same prefix after the block has run.
#[derive(Debug)]
pub struct PathScope<'a> {
    composer: &'a mut Composer,
    prefix: String,
}

impl PathScope<'_> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Compose for PathScope<'_> {
    fn add_endpoint(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), CompositionError> {
        self.composer.lifecycle.ensure_mutable("endpoints")?;
        let pattern = RoutePattern::compile(pattern)?.prefixed(&self.prefix)?;
        self.composer.current().add_route(method, pattern, handler);
        Ok(())
    }

    fn add_filter(
        &mut self,
        method: MethodSelector,
        pattern: &str,
        filter: Arc<dyn Filter>,
    ) -> Result<(), CompositionError> {
        self.composer.lifecycle.ensure_mutable("filters")?;
        let pattern = RoutePattern::compile(pattern)?.prefixed(&self.prefix)?;
        self.composer.current().add_filter(method, pattern, filter)
    }

    fn add_websocket(
        &mut self,
        sub_path: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), CompositionError> {
        self.composer.lifecycle.ensure_mutable("websocket")?;
        let full = format!("{}{}", self.prefix, sub_path);
        self.composer.current().add_websocket(&full, handler)
    }

    fn path<B>(&mut self, prefix: &str, build: B) -> Result<PathScope<'_>, CompositionError>
    where
        B: FnOnce(&mut Composer) -> Result<(), CompositionError>,
    {
        let full = format!("{}{}", self.prefix, prefix);
        self.composer.compose(&full, build)?;
        Ok(PathScope {
            composer: &mut *self.composer,
            prefix: full,
        })
    }
}
