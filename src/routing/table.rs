//! Ordered route, filter and WebSocket tables.
//!
//! # Responsibilities
//! - Keep per-method routes in registration order
//! - Keep filters per method selector (ALL or one method), rejecting duplicates
//! - Keep WebSocket handlers keyed by exact sub-path
//! - Rewrite a whole table under a prefix and merge it into a parent
//!
//! # Design Decisions
//! - Tables are plain data; the composer decides which one is current
//! - Merge validates everything before touching the parent, so a failed
//!   merge leaves the parent unchanged

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dispatch::{Filter, Handler};
use crate::routing::pattern::{Method, MethodSelector, RoutePattern};
use crate::routing::CompositionError;
use crate::websocket::envelope::validate_sub_path;
use crate::websocket::MessageHandler;

/// A registered endpoint.
#[derive(Clone)]
pub struct RouteEntry {
    pub pattern: RoutePattern,
    pub handler: Arc<dyn Handler>,
}

/// A registered filter.
#[derive(Clone)]
pub struct FilterEntry {
    pub pattern: RoutePattern,
    pub method: MethodSelector,
    pub filter: Arc<dyn Filter>,
}

/// All structural registrations of one server (or one scratch composition).
#[derive(Clone)]
pub struct RouteTable {
    routes: HashMap<Method, Vec<RouteEntry>>,
    filters: HashMap<MethodSelector, Vec<FilterEntry>>,
    websockets: HashMap<String, Arc<dyn MessageHandler>>,
}

impl RouteTable {
    /// Create a table with an empty collection for every known method and
    /// for the ALL filter selector.
    pub fn new() -> Self {
        let mut routes = HashMap::new();
        let mut filters = HashMap::new();
        filters.insert(MethodSelector::All, Vec::new());
        for method in Method::ALL {
            routes.insert(method, Vec::new());
            filters.insert(MethodSelector::Only(method), Vec::new());
        }
        Self {
            routes,
            filters,
            websockets: HashMap::new(),
        }
    }

    pub fn add_route(&mut self, method: Method, pattern: RoutePattern, handler: Arc<dyn Handler>) {
        self.routes
            .entry(method)
            .or_default()
            .push(RouteEntry { pattern, handler });
    }

    pub fn add_filter(
        &mut self,
        method: MethodSelector,
        pattern: RoutePattern,
        filter: Arc<dyn Filter>,
    ) -> Result<(), CompositionError> {
        self.check_filter_free(method, &pattern)?;
        self.filters.entry(method).or_default().push(FilterEntry {
            pattern,
            method,
            filter,
        });
        Ok(())
    }

    pub fn add_websocket(
        &mut self,
        path: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), CompositionError> {
        validate_sub_path(path)?;
        if self.websockets.contains_key(path) {
            return Err(CompositionError::DuplicateWebSocket {
                path: path.to_string(),
            });
        }
        self.websockets.insert(path.to_string(), handler);
        Ok(())
    }

    fn check_filter_free(
        &self,
        method: MethodSelector,
        pattern: &RoutePattern,
    ) -> Result<(), CompositionError> {
        let taken = self
            .filters
            .get(&method)
            .is_some_and(|entries| entries.iter().any(|e| e.pattern.as_str() == pattern.as_str()));
        if taken {
            return Err(CompositionError::DuplicateFilter {
                method: method.to_string(),
                pattern: pattern.as_str().to_string(),
            });
        }
        Ok(())
    }

    /// True if any route (any method) or WebSocket sub-path already lives
    /// under `prefix/`.
    pub fn claims_namespace(&self, prefix: &str) -> bool {
        let in_routes = self
            .routes
            .values()
            .flatten()
            .any(|entry| entry.pattern.claims_namespace(prefix));
        let ws_prefix = format!("{prefix}/");
        in_routes || self.websockets.keys().any(|path| path.starts_with(&ws_prefix))
    }

    /// Rewrite every entry of this table under `prefix`.
    pub fn prefixed(self, prefix: &str) -> Result<RouteTable, CompositionError> {
        let mut out = RouteTable::new();
        for (method, entries) in self.routes {
            let rewritten = entries
                .into_iter()
                .map(|e| {
                    Ok(RouteEntry {
                        pattern: e.pattern.prefixed(prefix)?,
                        handler: e.handler,
                    })
                })
                .collect::<Result<Vec<_>, CompositionError>>()?;
            out.routes.insert(method, rewritten);
        }
        for (method, entries) in self.filters {
            let rewritten = entries
                .into_iter()
                .map(|e| {
                    Ok(FilterEntry {
                        pattern: e.pattern.prefixed(prefix)?,
                        method: e.method,
                        filter: e.filter,
                    })
                })
                .collect::<Result<Vec<_>, CompositionError>>()?;
            out.filters.insert(method, rewritten);
        }
        for (path, handler) in self.websockets {
            let full = format!("{prefix}{path}");
            validate_sub_path(&full)?;
            out.websockets.insert(full, handler);
        }
        Ok(out)
    }

    /// Append every entry of `child` after the entries already present.
    pub fn merge(&mut self, child: RouteTable) -> Result<(), CompositionError> {
        for entries in child.filters.values() {
            for entry in entries {
                self.check_filter_free(entry.method, &entry.pattern)?;
            }
        }
        if let Some(path) = child.websockets.keys().find(|p| self.websockets.contains_key(*p)) {
            return Err(CompositionError::DuplicateWebSocket { path: path.clone() });
        }

        for method in Method::ALL {
            if let Some(entries) = child.routes.get(&method) {
                self.routes
                    .entry(method)
                    .or_default()
                    .extend(entries.iter().cloned());
            }
        }
        for (method, entries) in child.filters {
            self.filters.entry(method).or_default().extend(entries);
        }
        self.websockets.extend(child.websockets);
        Ok(())
    }

    /// Routes of one method in registration order.
    pub fn routes(&self, method: Method) -> &[RouteEntry] {
        self.routes.get(&method).map(Vec::as_slice).unwrap_or_default()
    }

    /// First route (in registration order) whose pattern matches `path`.
    pub fn match_route(&self, method: Method, path: &str) -> Option<(&RouteEntry, HashMap<String, String>)> {
        self.routes(method)
            .iter()
            .find_map(|entry| entry.pattern.captures(path).map(|params| (entry, params)))
    }

    /// Filters to run for a request: ALL filters first, then the method's own,
    /// each in registration order and restricted to patterns matching `path`.
    pub fn filters_for(&self, method: Method, path: &str) -> Vec<&FilterEntry> {
        [MethodSelector::All, MethodSelector::Only(method)]
            .iter()
            .filter_map(|selector| self.filters.get(selector))
            .flatten()
            .filter(|entry| entry.pattern.is_match(path))
            .collect()
    }

    pub fn websocket(&self, sub_path: &str) -> Option<&Arc<dyn MessageHandler>> {
        self.websockets.get(sub_path)
    }

    pub fn route_count(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn filter_count(&self) -> usize {
        self.filters.values().map(Vec::len).sum()
    }

    pub fn websocket_count(&self) -> usize {
        self.websockets.len()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut patterns: Vec<String> = Method::ALL
            .iter()
            .flat_map(|m| self.routes(*m).iter().map(move |e| format!("{m} {}", e.pattern)))
            .collect();
        patterns.sort();
        f.debug_struct("RouteTable")
            .field("routes", &patterns)
            .field("filters", &self.filter_count())
            .field("websockets", &self.websockets.keys().collect::<Vec<_>>())
            .finish()
    }
}
