//! Resolving the clients of a route.

use std::sync::Arc;

use super::AuthClient;
use crate::context::WebContext;
use crate::error::{Error, Result};

/// Separator between names in route declarations.
pub const ELEMENT_SEPARATOR: char = ',';

/// Split a comma-separated name list, dropping blanks.
pub fn split_names(names: &str) -> impl Iterator<Item = &str> {
    names
        .split(ELEMENT_SEPARATOR)
        .map(str::trim)
        .filter(|n| !n.is_empty())
}

/// Whether two names are equal ignoring case and surrounding blanks.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Chooses which configured clients apply to the current request.
pub trait ClientFinder: Send + Sync {
    /// Resolve `route_clients` (comma separated) against `configured`.
    fn find(
        &self,
        configured: &[Arc<dyn AuthClient>],
        ctx: &dyn WebContext,
        route_clients: &str,
    ) -> Result<Vec<Arc<dyn AuthClient>>>;
}

/// Route clients in declaration order, narrowed to one when the request
/// names a client.
///
/// When the request carries the client-name parameter, the named client
/// must be one of the route's clients. Unknown names are configuration
/// errors.
#[derive(Debug, Clone)]
pub struct DefaultClientFinder {
    client_name_parameter: String,
}

impl DefaultClientFinder {
    /// Look for the requested client in `client_name_parameter`.
    pub fn new(client_name_parameter: impl Into<String>) -> Self {
        Self {
            client_name_parameter: client_name_parameter.into(),
        }
    }
}

/// Find a configured client by name.
pub fn find_client(configured: &[Arc<dyn AuthClient>], name: &str) -> Result<Arc<dyn AuthClient>> {
    configured
        .iter()
        .find(|c| names_match(c.name(), name))
        .cloned()
        .ok_or_else(|| Error::config(format!("no client found for name: {}", name.trim())))
}

impl ClientFinder for DefaultClientFinder {
    fn find(
        &self,
        configured: &[Arc<dyn AuthClient>],
        ctx: &dyn WebContext,
        route_clients: &str,
    ) -> Result<Vec<Arc<dyn AuthClient>>> {
        let names: Vec<&str> = split_names(route_clients).collect();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(requested) = ctx.request_parameter(&self.client_name_parameter) {
            let client = find_client(configured, requested)?;
            if names.iter().any(|n| names_match(n, client.name())) {
                return Ok(vec![client]);
            }
            return Err(Error::config(format!(
                "client not allowed: {}",
                client.name()
            )));
        }

        names
            .into_iter()
            .map(|name| find_client(configured, name))
            .collect()
    }
}
