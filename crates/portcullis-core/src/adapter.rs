//! Translating logic results into host responses.
//!
//! The logics never build a framework response themselves. They hand the
//! final [`HttpAction`] to an [`HttpActionAdapter`], or the authenticated
//! profiles to a [`GrantedAccessAdapter`], and wrap whatever comes back in an
//! [`Outcome`](crate::action::Outcome).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::action::{HttpAction, LOCATION_HEADER};
use crate::context::WebContext;
use crate::error::Result;
use crate::profile::UserProfile;

/// Adapts an action into the host's response type `R`.
#[async_trait]
pub trait HttpActionAdapter<R>: Send + Sync {
    /// Build the response for `action`.
    async fn adapt(&self, action: &HttpAction, ctx: &mut dyn WebContext) -> Result<R>;
}

/// Produces the host's response when access is granted.
#[async_trait]
pub trait GrantedAccessAdapter<R>: Send + Sync {
    /// Build the response for an authenticated and authorized request.
    ///
    /// `profiles` is empty when the route did not match and the request
    /// was let through untouched.
    async fn adapt(&self, ctx: &mut dyn WebContext, profiles: &[UserProfile]) -> Result<R>;
}

/// A framework-neutral response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Option<String>,
}

impl SimpleResponse {
    /// A response with no headers or body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    /// A header value, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Reference adapter producing [`SimpleResponse`]s.
///
/// Granted requests answer 200 with the profile ids, one per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleResponseAdapter;

#[async_trait]
impl HttpActionAdapter<SimpleResponse> for SimpleResponseAdapter {
    async fn adapt(&self, action: &HttpAction, _ctx: &mut dyn WebContext) -> Result<SimpleResponse> {
        let mut response = SimpleResponse::new(action.status());
        if let Some(location) = action.location() {
            response
                .headers
                .push((LOCATION_HEADER.to_string(), location.to_string()));
        }
        response.body = action.content().map(str::to_string);
        Ok(response)
    }
}

#[async_trait]
impl GrantedAccessAdapter<SimpleResponse> for SimpleResponseAdapter {
    async fn adapt(&self, _ctx: &mut dyn WebContext, profiles: &[UserProfile]) -> Result<SimpleResponse> {
        let mut response = SimpleResponse::new(HttpAction::OK);
        let ids: Vec<&str> = profiles.iter().map(UserProfile::id).collect();
        response.body = Some(ids.join("\n"));
        Ok(response)
    }
}
