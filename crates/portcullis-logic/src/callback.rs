//! The callback logic: finishing an indirect login.
//!
//! The identity provider sends the browser back to the callback URL, with
//! the client name as a request parameter. The named client authenticates
//! the request; a profile is saved in the session, the session is renewed,
//! and the browser goes back to the URL it first asked for.

use portcullis_core::adapter::HttpActionAdapter;
use portcullis_core::client::find_client;
use portcullis_core::{
    Error, Outcome, ProfileManager, Result, SecurityConfig, UserProfile, WebContext,
};

use crate::indirect;
use crate::outcome::{self, Step};

/// Handles identity provider callbacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallbackLogic;

impl CallbackLogic {
    /// Process a callback.
    ///
    /// `default_url` overrides the configured default URL, used when no URL
    /// was saved before the round-trip.
    pub async fn perform<R>(
        &self,
        ctx: &mut dyn WebContext,
        config: &SecurityConfig,
        default_url: Option<&str>,
        adapter: &dyn HttpActionAdapter<R>,
    ) -> Result<Outcome<R>> {
        log::debug!("=== CALLBACK === url: {}", ctx.full_request_url());
        let result = self.run(ctx, config, default_url).await;
        outcome::finish(result, ctx, config, adapter).await
    }

    async fn run<R>(
        &self,
        ctx: &mut dyn WebContext,
        config: &SecurityConfig,
        default_url: Option<&str>,
    ) -> Result<Step<R>> {
        let settings = config.settings();
        let name = ctx
            .request_parameter(&settings.client_name_parameter)
            .ok_or_else(|| {
                Error::config(format!(
                    "missing {} parameter on the callback",
                    settings.client_name_parameter
                ))
            })?
            .to_string();
        let client = find_client(config.clients(), &name)?;
        if !client.is_indirect() {
            return Err(Error::config(format!(
                "only indirect clients are allowed on the callback URL, not {}",
                client.name()
            )));
        }

        let profile: Option<UserProfile> = match client.authenticate(ctx).await {
            Ok(profile) => profile,
            Err(Error::CredentialsInvalid { message }) => {
                log::warn!("Client {} rejected the callback credentials: {message}", client.name());
                None
            }
            Err(e) => return Err(e),
        };

        match profile {
            Some(profile) => {
                log::debug!("Callback authenticated {}", profile.id());
                ProfileManager::new(ctx)
                    .save(true, profile, settings.multi_profile)
                    .await?;
                settings.session_renewal().renew(ctx, config.clients()).await?;
            }
            None => log::debug!("Callback yielded no profile"),
        }

        let default_url = default_url.unwrap_or(&settings.default_url);
        let action = indirect::redirect_to_originally_requested_url(ctx, default_url).await?;
        Ok(Step::Action(action))
    }
}
