//! The per-client authentication chain.

use crate::client::Client;
use crate::context::WebContext;
use crate::error::Result;
use crate::profile::UserProfile;

/// Composes extract, validate and create into one operation.
///
/// The three steps run strictly in sequence; each starts only after its
/// predecessor resolved:
///
/// 1. Extract credentials. None presented resolves to `Ok(None)` right
///    away, and neither the authenticator nor the profile creator runs.
/// 2. Validate. A rejection surfaces as
///    [`Error::CredentialsInvalid`](crate::Error::CredentialsInvalid);
///    technical failures of the authenticator propagate unchanged.
/// 3. Create the profile, stamp the client name on it and run the client's
///    authorization generators.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientAuthenticator;

impl ClientAuthenticator {
    /// Authenticate the request against `client`.
    pub async fn authenticate_for<C>(
        client: &Client<C>,
        ctx: &mut dyn WebContext,
    ) -> Result<Option<UserProfile>>
    where
        C: Send + Sync + 'static,
    {
        let Some(credentials) = client.credentials(ctx).await? else {
            log::debug!("No credentials presented to client {}", client_name(client));
            return Ok(None);
        };

        if let Err(e) = client.authenticator().validate(&credentials, ctx).await {
            log::debug!("Credentials rejected by client {}: {e}", client_name(client));
            return Err(e);
        }

        let profile = client.creator().create(credentials, ctx).await?;
        let profile = client.finish_profile(ctx, profile).await?;
        log::debug!("Created profile {} for client {}", profile.id(), client_name(client));
        Ok(Some(profile))
    }
}

fn client_name<C>(client: &Client<C>) -> &str
where
    C: Send + Sync + 'static,
{
    crate::client::AuthClient::name(client)
}
