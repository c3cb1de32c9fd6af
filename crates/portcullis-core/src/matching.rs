//! Request matchers.
//!
//! A route declares its matchers by name. All of them must match for the
//! security logic to apply; a request that does not match is let through
//! untouched.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use regex::Regex;

use crate::client::{names_match, split_names};
use crate::context::WebContext;
use crate::error::{Error, Result};

/// Decides whether the security logic applies to a request.
#[async_trait]
pub trait Matcher: Send + Sync {
    /// `false` lets the request through without authentication.
    ///
    /// May fail with [`Error::RequiredAction`].
    async fn matches(&self, ctx: &mut dyn WebContext) -> Result<bool>;
}

/// Named matchers of a configuration.
pub type MatcherMap = IndexMap<String, Arc<dyn Matcher>>;

/// Resolve `names` (comma separated) against `matchers`.
///
/// Names are trimmed and compared case-insensitively; an unknown name is a
/// configuration error.
pub fn resolve_matchers(names: &str, matchers: &MatcherMap) -> Result<Vec<Arc<dyn Matcher>>> {
    split_names(names)
        .map(|name| {
            matchers
                .iter()
                .find(|(key, _)| names_match(key, name))
                .map(|(_, matcher)| matcher.clone())
                .ok_or_else(|| Error::config(format!("no matcher found for name: {name}")))
        })
        .collect()
}

/// Evaluate the named matchers with AND semantics, stopping at the first
/// one that does not match. No names means the request matches.
pub async fn matches(ctx: &mut dyn WebContext, names: &str, matchers: &MatcherMap) -> Result<bool> {
    for matcher in resolve_matchers(names, matchers)? {
        if !matcher.matches(ctx).await? {
            return Ok(false);
        }
    }
    Ok(true)
}

// ============================================================================
// Built-in matchers
// ============================================================================

/// Matches every path except the excluded ones.
#[derive(Debug, Clone, Default)]
pub struct PathMatcher {
    excluded_paths: Vec<String>,
    excluded_patterns: Vec<Regex>,
}

impl PathMatcher {
    /// A matcher excluding nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude an exact path.
    pub fn exclude_path(mut self, path: impl Into<String>) -> Self {
        self.excluded_paths.push(path.into());
        self
    }

    /// Exclude every path matching `pattern` (anchored on both ends).
    pub fn exclude_regex(mut self, pattern: &str) -> Result<Self> {
        let anchored = format!("^(?:{pattern})$");
        let regex = Regex::new(&anchored)
            .map_err(|e| Error::config(format!("invalid path pattern {pattern}: {e}")))?;
        self.excluded_patterns.push(regex);
        Ok(self)
    }

    fn matches_path(&self, path: &str) -> bool {
        !self.excluded_paths.iter().any(|p| p == path)
            && !self.excluded_patterns.iter().any(|r| r.is_match(path))
    }
}

/// The path of a full request URL.
pub fn path_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest);
    let path = match without_scheme {
        Some(rest) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
        None => url,
    };
    path.split(['?', '#']).next().unwrap_or(path)
}

#[async_trait]
impl Matcher for PathMatcher {
    async fn matches(&self, ctx: &mut dyn WebContext) -> Result<bool> {
        Ok(self.matches_path(path_of(ctx.full_request_url())))
    }
}

/// Matches requests using one of the given HTTP methods.
#[derive(Debug, Clone)]
pub struct HttpMethodMatcher {
    methods: Vec<String>,
}

impl HttpMethodMatcher {
    /// Match any of `methods` (case-insensitive).
    pub fn new<I>(methods: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            methods: methods
                .into_iter()
                .map(|m| m.as_ref().to_ascii_uppercase())
                .collect(),
        }
    }
}

#[async_trait]
impl Matcher for HttpMethodMatcher {
    async fn matches(&self, ctx: &mut dyn WebContext) -> Result<bool> {
        let method = ctx.request_method().to_ascii_uppercase();
        Ok(self.methods.iter().any(|m| *m == method))
    }
}
