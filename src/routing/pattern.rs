//! Route patterns and HTTP method selectors.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::routing::CompositionError;

/// HTTP methods known to the route table.
///
/// Tokens outside this set are rejected with "method not allowed" before any
/// route is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Patch,
        Method::Head,
        Method::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a method token the table does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    /// Method tokens are case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// Which requests a filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodSelector {
    All,
    Only(Method),
}

impl fmt::Display for MethodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodSelector::All => f.write_str("ALL"),
            MethodSelector::Only(m) => m.fmt(f),
        }
    }
}

/// A compiled path pattern anchored over the whole request path.
///
/// The source always has the shape `^...$`. Composition only ever touches
/// the leading anchor, see [`prefix_anchored`].
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
}

impl RoutePattern {
    /// Compile a user pattern such as `/users/(\w+)` into `^/users/(\w+)$`.
    pub fn compile(pattern: &str) -> Result<Self, CompositionError> {
        Self::from_anchored(format!("^{pattern}$"))
    }

    fn from_anchored(source: String) -> Result<Self, CompositionError> {
        let regex = Regex::new(&source).map_err(|e| CompositionError::InvalidPattern {
            pattern: source.clone(),
            source: e,
        })?;
        Ok(Self { source, regex })
    }

    /// The anchored source, e.g. `^/users/(\w+)$`.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Recompile this pattern under a path prefix.
    pub fn prefixed(&self, prefix: &str) -> Result<Self, CompositionError> {
        Self::from_anchored(prefix_anchored(&self.source, prefix))
    }

    /// True if this pattern lives inside the `prefix/` namespace.
    pub fn claims_namespace(&self, prefix: &str) -> bool {
        self.source.starts_with(&format!("^{prefix}/"))
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match `path` and collect capture groups keyed "1", "2", ...
    ///
    /// Optional groups that did not participate are left out of the map.
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(path)?;
        let params = (1..caps.len())
            .filter_map(|i| caps.get(i).map(|m| (i.to_string(), m.as_str().to_string())))
            .collect();
        Some(params)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Replace the single leading `^` of an anchored pattern with `^prefix`.
///
/// `prefix_anchored("^/x$", "/api")` is `^/api/x$`. A source without the
/// anchor is treated as if it had one.
pub fn prefix_anchored(source: &str, prefix: &str) -> String {
    let rest = source.strip_prefix('^').unwrap_or(source);
    format!("^{prefix}{rest}")
}

/// The route a request (or WebSocket message) was matched against.
#[derive(Debug, Clone, Default)]
pub struct RouteMatch {
    /// Anchored pattern source, or the WebSocket sub-path.
    pub pattern: String,
    /// Positional captures keyed "1", "2", ...
    pub params: HashMap<String, String>,
}

impl RouteMatch {
    pub fn new(pattern: impl Into<String>, params: HashMap<String, String>) -> Self {
        Self {
            pattern: pattern.into(),
            params,
        }
    }

    pub fn param(&self, index: &str) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_anchors_both_ends() {
        let pattern = RoutePattern::compile("/users/(\\w+)").unwrap();
        assert_eq!(pattern.as_str(), "^/users/(\\w+)$");
        assert!(pattern.is_match("/users/Jimmy"));
        assert!(!pattern.is_match("/users/Jimmy/extra"));
        assert!(!pattern.is_match("/api/users/Jimmy"));
    }

    #[test]
    fn captures_are_one_indexed() {
        let pattern = RoutePattern::compile("/(\\w+)/(\\d+)(/edit)?").unwrap();
        let params = pattern.captures("/orders/42").unwrap();
        assert_eq!(params.get("1").map(String::as_str), Some("orders"));
        assert_eq!(params.get("2").map(String::as_str), Some("42"));
        assert!(!params.contains_key("3"));
        assert!(!params.contains_key("0"));
    }

    #[test]
    fn prefixing_rewrites_only_the_leading_anchor() {
        assert_eq!(prefix_anchored("^/x$", "/api"), "^/api/x$");
        assert_eq!(prefix_anchored("^/x$", ""), "^/x$");
        assert_eq!(prefix_anchored("/x$", "/api"), "^/api/x$");
        assert_eq!(
            prefix_anchored(&prefix_anchored("^/x$", "/v1"), "/api"),
            "^/api/v1/x$"
        );
        // A caret used inside a character class is left alone.
        assert_eq!(prefix_anchored("^/[^/]+$", "/api"), "^/api/[^/]+$");
    }

    #[test]
    fn prefixed_pattern_matches_under_prefix_only() {
        let pattern = RoutePattern::compile("/x").unwrap().prefixed("/api").unwrap();
        assert!(pattern.is_match("/api/x"));
        assert!(!pattern.is_match("/x"));
        assert!(pattern.claims_namespace("/api"));
        assert!(!pattern.claims_namespace("/ap"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = RoutePattern::compile("/broken(").unwrap_err();
        assert!(matches!(err, CompositionError::InvalidPattern { .. }));
    }

    #[test]
    fn method_tokens_are_case_sensitive() {
        assert_eq!("GET".parse::<Method>(), Ok(Method::Get));
        assert!("get".parse::<Method>().is_err());
        assert!("PROPFIND".parse::<Method>().is_err());
    }
}
