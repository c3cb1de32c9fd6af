//! CSRF token issuing and checking.
//!
//! The token lives in the session under [`CSRF_TOKEN`]. The generator
//! exposes it to the page as a request attribute and a cookie; the check
//! expects it back as a request parameter or header of the same name.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::Authorizer;
use crate::context::{Cookie, WebContext};
use crate::error::Result;
use crate::profile::UserProfile;
use crate::session;

/// Name of the CSRF token in the session, request, cookie and header.
pub const CSRF_TOKEN: &str = "portcullisCsrfToken";

async fn session_token(ctx: &mut dyn WebContext) -> Result<Option<String>> {
    Ok(session::get_attribute(ctx, CSRF_TOKEN)
        .await?
        .and_then(|v| v.as_str().map(str::to_string)))
}

/// Issues the session's CSRF token, creating it on first use.
#[derive(Debug, Clone, Default)]
pub struct CsrfTokenGenerator {
    cookie_domain: Option<String>,
}

impl CsrfTokenGenerator {
    /// Set the cookie domain explicitly instead of using the server name.
    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    /// The session's token, generated and stored if absent.
    pub async fn token(&self, ctx: &mut dyn WebContext) -> Result<String> {
        if let Some(token) = session_token(ctx).await? {
            return Ok(token);
        }
        let token = Uuid::new_v4().to_string();
        session::set_attribute(ctx, CSRF_TOKEN, Value::String(token.clone())).await?;
        log::debug!("Generated new CSRF token");
        Ok(token)
    }
}

#[async_trait]
impl Authorizer for CsrfTokenGenerator {
    async fn is_authorized(&self, ctx: &mut dyn WebContext, _profiles: &[UserProfile]) -> Result<bool> {
        let token = self.token(ctx).await?;
        ctx.set_request_attribute(CSRF_TOKEN, Value::String(token.clone()));

        let mut cookie = Cookie::new(CSRF_TOKEN, token);
        cookie.domain = Some(
            self.cookie_domain
                .clone()
                .unwrap_or_else(|| ctx.server_name().to_string()),
        );
        cookie.path = Some("/".to_string());
        ctx.add_response_cookie(cookie);
        Ok(true)
    }
}

/// Refuses requests whose CSRF token does not match the session's.
#[derive(Debug, Clone, Copy)]
pub struct CsrfCheck {
    only_check_post: bool,
}

impl CsrfCheck {
    /// Check every method, not only POST.
    pub fn all_methods() -> Self {
        Self {
            only_check_post: false,
        }
    }
}

impl Default for CsrfCheck {
    fn default() -> Self {
        Self {
            only_check_post: true,
        }
    }
}

#[async_trait]
impl Authorizer for CsrfCheck {
    async fn is_authorized(&self, ctx: &mut dyn WebContext, _profiles: &[UserProfile]) -> Result<bool> {
        if self.only_check_post && !ctx.request_method().eq_ignore_ascii_case("POST") {
            return Ok(true);
        }
        let presented = ctx
            .request_parameter(CSRF_TOKEN)
            .or_else(|| ctx.request_header(CSRF_TOKEN))
            .map(str::to_string);
        let expected = session_token(ctx).await?;
        let authorized = matches!((presented, expected), (Some(p), Some(e)) if p == e);
        if !authorized {
            log::debug!("CSRF token missing or mismatched");
        }
        Ok(authorized)
    }
}
