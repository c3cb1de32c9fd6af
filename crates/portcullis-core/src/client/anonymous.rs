//! The built-in anonymous client.

use async_trait::async_trait;

use super::Client;
use crate::context::WebContext;
use crate::credentials::{AcceptAll, CredentialsExtractor, ProfileCreator};
use crate::error::Result;
use crate::profile::UserProfile;

/// Name of the built-in anonymous client.
pub const ANONYMOUS_CLIENT_NAME: &str = "AnonymousClient";

struct AnonymousCredentials;

#[async_trait]
impl CredentialsExtractor<()> for AnonymousCredentials {
    async fn extract(&self, _ctx: &mut dyn WebContext) -> Result<Option<()>> {
        Ok(Some(()))
    }
}

struct AnonymousProfileCreator;

#[async_trait]
impl ProfileCreator<()> for AnonymousProfileCreator {
    async fn create(&self, _credentials: (), _ctx: &mut dyn WebContext) -> Result<UserProfile> {
        Ok(UserProfile::anonymous())
    }
}

/// A direct client that always yields an anonymous profile.
pub fn anonymous_client() -> Client<()> {
    Client::direct(
        ANONYMOUS_CLIENT_NAME,
        AnonymousCredentials,
        AcceptAll,
        AnonymousProfileCreator,
    )
    .as_anonymous()
}
