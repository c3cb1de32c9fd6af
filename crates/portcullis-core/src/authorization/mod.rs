//! Authorizers and the authorization check.
//!
//! Routes name their authorizers in a comma-separated list. Well-known
//! names resolve to built-in authorizers, anything else is looked up in the
//! configuration's [`AuthorizerMap`]:
//!
//! | Name | Authorizer |
//! |---|---|
//! | `hsts` | `Strict-Transport-Security` header on secure requests |
//! | `nosniff` | `X-Content-Type-Options: nosniff` |
//! | `noframe` | `X-Frame-Options: DENY` |
//! | `xssprotection` | `X-XSS-Protection: 1; mode=block` |
//! | `nocache` | cache-busting headers, except on static assets |
//! | `securityheaders` | all five header authorizers above |
//! | `csrfToken` | issue a CSRF token |
//! | `csrfCheck` | verify the CSRF token of POST requests |
//! | `csrf` | `csrfToken` then `csrfCheck` |
//! | `allowAjaxRequests` | permissive CORS headers |
//! | `isAnonymous` | every profile is anonymous |
//! | `isAuthenticated` | some profile is not anonymous |
//! | `isFullyAuthenticated` | some profile is neither anonymous nor remembered |
//! | `isRemembered` | some profile is remembered |

mod builtin;
mod csrf;

pub use builtin::{
    AuthenticationCheck, CacheControlHeader, CheckAuthentication, CorsAuthorizer,
    RequireAllRoles, RequireAnyRole, StrictTransportSecurityHeader, XContentTypeOptionsHeader,
    XFrameOptionsHeader, XssProtectionHeader,
};
pub use csrf::{CSRF_TOKEN, CsrfCheck, CsrfTokenGenerator};

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::client::{names_match, split_names};
use crate::context::WebContext;
use crate::error::{Error, Result};
use crate::profile::UserProfile;

/// Checks whether the authenticated user may access the resource.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// `false` denies access (403).
    ///
    /// `profiles` is never empty. May fail with [`Error::RequiredAction`].
    async fn is_authorized(&self, ctx: &mut dyn WebContext, profiles: &[UserProfile])
    -> Result<bool>;
}

/// Named authorizers of a configuration.
pub type AuthorizerMap = IndexMap<String, Arc<dyn Authorizer>>;

fn arc<A: Authorizer + 'static>(authorizer: A) -> Arc<dyn Authorizer> {
    Arc::new(authorizer)
}

fn builtin(name: &str) -> Option<Vec<Arc<dyn Authorizer>>> {
    let resolved = match name.to_ascii_lowercase().as_str() {
        "hsts" => vec![arc(StrictTransportSecurityHeader::default())],
        "nosniff" => vec![arc(XContentTypeOptionsHeader)],
        "noframe" => vec![arc(XFrameOptionsHeader)],
        "xssprotection" => vec![arc(XssProtectionHeader)],
        "nocache" => vec![arc(CacheControlHeader)],
        "securityheaders" => vec![
            arc(CacheControlHeader),
            arc(XContentTypeOptionsHeader),
            arc(StrictTransportSecurityHeader::default()),
            arc(XFrameOptionsHeader),
            arc(XssProtectionHeader),
        ],
        "csrftoken" => vec![arc(CsrfTokenGenerator::default())],
        "csrfcheck" => vec![arc(CsrfCheck::default())],
        "csrf" => vec![arc(CsrfTokenGenerator::default()), arc(CsrfCheck::default())],
        "allowajaxrequests" => vec![arc(CorsAuthorizer::permissive())],
        "isanonymous" => vec![arc(CheckAuthentication::new(AuthenticationCheck::Anonymous))],
        "isauthenticated" => vec![arc(CheckAuthentication::new(AuthenticationCheck::Authenticated))],
        "isfullyauthenticated" => vec![arc(CheckAuthentication::new(
            AuthenticationCheck::FullyAuthenticated,
        ))],
        "isremembered" => vec![arc(CheckAuthentication::new(AuthenticationCheck::Remembered))],
        _ => return None,
    };
    Some(resolved)
}

/// Resolve `names` (comma separated) to authorizers, built-ins first.
pub fn resolve_authorizers(names: &str, authorizers: &AuthorizerMap) -> Result<Vec<Arc<dyn Authorizer>>> {
    let mut resolved = Vec::new();
    for name in split_names(names) {
        if let Some(builtins) = builtin(name) {
            resolved.extend(builtins);
            continue;
        }
        let found = authorizers
            .iter()
            .find(|(key, _)| names_match(key, name))
            .map(|(_, authorizer)| authorizer.clone())
            .ok_or_else(|| Error::config(format!("no authorizer found for name: {name}")))?;
        resolved.push(found);
    }
    Ok(resolved)
}

/// Evaluate the named authorizers with AND semantics, stopping at the first
/// refusal. No names means authorized.
pub async fn is_authorized(
    ctx: &mut dyn WebContext,
    profiles: &[UserProfile],
    names: &str,
    authorizers: &AuthorizerMap,
) -> Result<bool> {
    if profiles.is_empty() {
        return Err(Error::technical("authorization requires at least one profile"));
    }
    for authorizer in resolve_authorizers(names, authorizers)? {
        if !authorizer.is_authorized(ctx, profiles).await? {
            return Ok(false);
        }
    }
    Ok(true)
}
