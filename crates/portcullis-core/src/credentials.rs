//! Per-client capabilities: extract, validate, create.
//!
//! A client is assembled from one implementation of each of these traits,
//! all sharing the credentials type `C`. Every capability may suspend; none
//! of them may block the calling thread.

use async_trait::async_trait;

use crate::context::WebContext;
use crate::error::Result;
use crate::profile::UserProfile;

/// Pulls raw credentials out of the request.
#[async_trait]
pub trait CredentialsExtractor<C>: Send + Sync {
    /// `Ok(None)` means no credentials were presented.
    ///
    /// May fail with [`Error::RequiredAction`](crate::Error::RequiredAction)
    /// or [`Error::CredentialsInvalid`](crate::Error::CredentialsInvalid).
    async fn extract(&self, ctx: &mut dyn WebContext) -> Result<Option<C>>;
}

/// Validates extracted credentials.
#[async_trait]
pub trait Authenticator<C>: Send + Sync {
    /// Reject with [`Error::CredentialsInvalid`](crate::Error::CredentialsInvalid)
    /// when the credentials are not acceptable.
    async fn validate(&self, credentials: &C, ctx: &mut dyn WebContext) -> Result<()>;
}

/// Materialises a profile from validated credentials.
#[async_trait]
pub trait ProfileCreator<C>: Send + Sync {
    /// Build the profile. May perform I/O (user-info endpoints and the like).
    async fn create(&self, credentials: C, ctx: &mut dyn WebContext) -> Result<UserProfile>;
}

/// Enriches a freshly created profile (roles, permissions, attributes).
#[async_trait]
pub trait AuthorizationGenerator: Send + Sync {
    /// Return the enriched profile.
    async fn generate(&self, ctx: &mut dyn WebContext, profile: UserProfile)
    -> Result<UserProfile>;
}

/// Grants a fixed set of roles and permissions to every profile.
#[derive(Debug, Clone, Default)]
pub struct DefaultRolesGenerator {
    roles: Vec<String>,
    permissions: Vec<String>,
}

impl DefaultRolesGenerator {
    /// Grant `roles` and `permissions` to every profile.
    pub fn new<R, P>(roles: R, permissions: P) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl AuthorizationGenerator for DefaultRolesGenerator {
    async fn generate(
        &self,
        _ctx: &mut dyn WebContext,
        mut profile: UserProfile,
    ) -> Result<UserProfile> {
        for role in &self.roles {
            profile.add_role(role.clone());
        }
        for permission in &self.permissions {
            profile.add_permission(permission.clone());
        }
        Ok(profile)
    }
}

/// Accepts any credentials. Useful when the extractor already did the
/// checking, or for profile creators that validate while fetching.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

#[async_trait]
impl<C> Authenticator<C> for AcceptAll
where
    C: Send + Sync + 'static,
{
    async fn validate(&self, _credentials: &C, _ctx: &mut dyn WebContext) -> Result<()> {
        Ok(())
    }
}
