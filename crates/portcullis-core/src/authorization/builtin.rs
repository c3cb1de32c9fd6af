//! Built-in authorizers: security headers, authentication checks, roles
//! and CORS.

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::Authorizer;
use crate::action::HttpAction;
use crate::context::WebContext;
use crate::error::Result;
use crate::profile::UserProfile;

// ============================================================================
// Security headers
// ============================================================================

/// `Strict-Transport-Security`, on secure requests only.
#[derive(Debug, Clone, Copy)]
pub struct StrictTransportSecurityHeader {
    max_age: u64,
}

impl StrictTransportSecurityHeader {
    /// Six months.
    pub const DEFAULT_MAX_AGE: u64 = 15_768_000;

    /// Advertise HSTS for `max_age` seconds.
    pub fn new(max_age: u64) -> Self {
        Self { max_age }
    }
}

impl Default for StrictTransportSecurityHeader {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_AGE)
    }
}

#[async_trait]
impl Authorizer for StrictTransportSecurityHeader {
    async fn is_authorized(&self, ctx: &mut dyn WebContext, _profiles: &[UserProfile]) -> Result<bool> {
        if ctx.is_secure() {
            let value = format!("max-age={} ; includeSubDomains", self.max_age);
            ctx.set_response_header("Strict-Transport-Security", &value);
        }
        Ok(true)
    }
}

/// `X-Content-Type-Options: nosniff`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XContentTypeOptionsHeader;

#[async_trait]
impl Authorizer for XContentTypeOptionsHeader {
    async fn is_authorized(&self, ctx: &mut dyn WebContext, _profiles: &[UserProfile]) -> Result<bool> {
        ctx.set_response_header("X-Content-Type-Options", "nosniff");
        Ok(true)
    }
}

/// `X-Frame-Options: DENY`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XFrameOptionsHeader;

#[async_trait]
impl Authorizer for XFrameOptionsHeader {
    async fn is_authorized(&self, ctx: &mut dyn WebContext, _profiles: &[UserProfile]) -> Result<bool> {
        ctx.set_response_header("X-Frame-Options", "DENY");
        Ok(true)
    }
}

/// `X-XSS-Protection: 1; mode=block`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XssProtectionHeader;

#[async_trait]
impl Authorizer for XssProtectionHeader {
    async fn is_authorized(&self, ctx: &mut dyn WebContext, _profiles: &[UserProfile]) -> Result<bool> {
        ctx.set_response_header("X-XSS-Protection", "1; mode=block");
        Ok(true)
    }
}

/// Cache-busting headers, skipped for static assets.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheControlHeader;

const STATIC_SUFFIXES: &[&str] = &[".css", ".js", ".png", ".jpg", ".ico", ".jpeg", ".bmp", ".gif"];

#[async_trait]
impl Authorizer for CacheControlHeader {
    async fn is_authorized(&self, ctx: &mut dyn WebContext, _profiles: &[UserProfile]) -> Result<bool> {
        let url = ctx.full_request_url().to_ascii_lowercase();
        if !STATIC_SUFFIXES.iter().any(|suffix| url.ends_with(suffix)) {
            ctx.set_response_header("Cache-Control", "no-cache, no-store, max-age=0, must-revalidate");
            ctx.set_response_header("Pragma", "no-cache");
            ctx.set_response_header("Expires", "0");
        }
        Ok(true)
    }
}

// ============================================================================
// Authentication checks
// ============================================================================

/// Which authentication level a [`CheckAuthentication`] requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationCheck {
    /// Every profile is anonymous.
    Anonymous,
    /// Some profile is not anonymous.
    Authenticated,
    /// Some profile is neither anonymous nor remembered.
    FullyAuthenticated,
    /// Some profile is remembered and not anonymous.
    Remembered,
}

impl AuthenticationCheck {
    fn accepts(&self, profile: &UserProfile) -> bool {
        match self {
            Self::Anonymous => profile.is_anonymous(),
            Self::Authenticated => !profile.is_anonymous(),
            Self::FullyAuthenticated => !profile.is_anonymous() && !profile.is_remembered(),
            Self::Remembered => !profile.is_anonymous() && profile.is_remembered(),
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::Anonymous => "user should be anonymous",
            Self::Authenticated => "user should be authenticated",
            Self::FullyAuthenticated => "user should be fully authenticated",
            Self::Remembered => "user should be remembered",
        }
    }
}

/// Checks the authentication level of the profiles.
///
/// On failure either refuses (403) or, when a redirection URL is set,
/// redirects there.
#[derive(Debug, Clone)]
pub struct CheckAuthentication {
    check: AuthenticationCheck,
    redirection_url: Option<String>,
}

impl CheckAuthentication {
    /// Refuse access when `check` fails.
    pub fn new(check: AuthenticationCheck) -> Self {
        Self {
            check,
            redirection_url: None,
        }
    }

    /// Redirect to `url` instead of refusing.
    pub fn redirect_to(mut self, url: impl Into<String>) -> Self {
        self.redirection_url = Some(url.into());
        self
    }
}

#[async_trait]
impl Authorizer for CheckAuthentication {
    async fn is_authorized(&self, _ctx: &mut dyn WebContext, profiles: &[UserProfile]) -> Result<bool> {
        let authorized = match self.check {
            AuthenticationCheck::Anonymous => profiles.iter().all(|p| self.check.accepts(p)),
            _ => profiles.iter().any(|p| self.check.accepts(p)),
        };
        if authorized {
            return Ok(true);
        }
        match &self.redirection_url {
            Some(url) => Err(HttpAction::redirect(self.check.message(), url.clone()).into()),
            None => Ok(false),
        }
    }
}

// ============================================================================
// Roles
// ============================================================================

/// Authorized when some profile holds at least one of the roles.
#[derive(Debug, Clone, Default)]
pub struct RequireAnyRole {
    roles: BTreeSet<String>,
}

impl RequireAnyRole {
    /// Require any of `roles`. An empty set authorizes everyone.
    pub fn new<I>(roles: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Authorizer for RequireAnyRole {
    async fn is_authorized(&self, _ctx: &mut dyn WebContext, profiles: &[UserProfile]) -> Result<bool> {
        if self.roles.is_empty() {
            return Ok(true);
        }
        Ok(profiles
            .iter()
            .any(|p| self.roles.iter().any(|role| p.has_role(role))))
    }
}

/// Authorized when some profile holds every one of the roles.
#[derive(Debug, Clone, Default)]
pub struct RequireAllRoles {
    roles: BTreeSet<String>,
}

impl RequireAllRoles {
    /// Require all of `roles`.
    pub fn new<I>(roles: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Authorizer for RequireAllRoles {
    async fn is_authorized(&self, _ctx: &mut dyn WebContext, profiles: &[UserProfile]) -> Result<bool> {
        Ok(profiles
            .iter()
            .any(|p| self.roles.iter().all(|role| p.has_role(role))))
    }
}

// ============================================================================
// CORS
// ============================================================================

/// Writes `Access-Control-Allow-*` headers.
#[derive(Debug, Clone)]
pub struct CorsAuthorizer {
    allow_origin: String,
    allow_credentials: bool,
    allow_methods: Vec<String>,
    allow_headers: Option<String>,
}

impl CorsAuthorizer {
    /// Allow `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            allow_origin: origin.into(),
            allow_credentials: false,
            allow_methods: Vec::new(),
            allow_headers: None,
        }
    }

    /// Any origin, with credentials, for the usual methods.
    pub fn permissive() -> Self {
        Self {
            allow_credentials: true,
            allow_methods: ["GET", "PUT", "POST", "DELETE", "OPTIONS"]
                .into_iter()
                .map(String::from)
                .collect(),
            ..Self::new("*")
        }
    }

    /// Allowed request headers.
    pub fn with_allow_headers(mut self, headers: impl Into<String>) -> Self {
        self.allow_headers = Some(headers.into());
        self
    }
}

#[async_trait]
impl Authorizer for CorsAuthorizer {
    async fn is_authorized(&self, ctx: &mut dyn WebContext, _profiles: &[UserProfile]) -> Result<bool> {
        ctx.set_response_header("Access-Control-Allow-Origin", &self.allow_origin);
        if self.allow_credentials {
            ctx.set_response_header("Access-Control-Allow-Credentials", "true");
        }
        if !self.allow_methods.is_empty() {
            ctx.set_response_header("Access-Control-Allow-Methods", &self.allow_methods.join(","));
        }
        if let Some(headers) = &self.allow_headers {
            ctx.set_response_header("Access-Control-Allow-Headers", headers);
        }
        Ok(true)
    }
}
