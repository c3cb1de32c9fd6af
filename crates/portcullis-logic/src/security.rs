//! The security logic: protecting a route.
//!
//! One run goes through these phases, each starting only once the previous
//! one resolved. A phase that fails ends the run.
//!
//! 1. **Matching.** The route's matchers decide whether the logic applies
//!    at all. A request that does not match is granted untouched.
//! 2. **Load decision.** Taken once, before any client runs. When it says
//!    so, profiles are looked up in the session as well as in the request.
//! 3. **Authenticating**, only when no profile was found. The direct
//!    clients are tried in route order, indirect ones are skipped; rejected
//!    credentials move on to the next client. The first profile wins, or
//!    with multi-profile support every direct client contributes one.
//!    Without any profile, the run ends with a redirect to the identity
//!    provider when the first route client is indirect, else with 401.
//! 4. **Authorizing.** The route's authorizers all have to agree, otherwise
//!    the run ends with 403.
//! 5. **Save decision.** A freshly authenticated profile is written to the
//!    session when the decision says so, before access is granted.
//! 6. **Adapting.** The granted-access adapter builds the response.

use std::sync::Arc;

use portcullis_core::adapter::{GrantedAccessAdapter, HttpActionAdapter};
use portcullis_core::client::AuthClient;
use portcullis_core::{
    Error, HttpAction, Outcome, ProfileManager, Result, SecuredRoute, SecurityConfig,
    UserProfile, WebContext, authorization, matching,
};

use crate::indirect;
use crate::outcome::{self, Step};

/// Protects routes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityLogic;

impl SecurityLogic {
    /// Secure one request against `route`.
    ///
    /// Returns [`Outcome::Granted`] with the granted adapter's response, or
    /// the adapted redirect or status. Technical failures are returned or
    /// adapted as 500 depending on the configured error handling.
    pub async fn perform<R>(
        &self,
        ctx: &mut dyn WebContext,
        config: &SecurityConfig,
        route: &SecuredRoute,
        granted: &dyn GrantedAccessAdapter<R>,
        adapter: &dyn HttpActionAdapter<R>,
    ) -> Result<Outcome<R>> {
        log::debug!(
            "=== SECURITY === url: {}, clients: {}, authorizers: {}, matchers: {}",
            ctx.full_request_url(),
            route.clients,
            route.authorizers,
            route.matchers
        );
        let result = self.run(ctx, config, route, granted).await;
        outcome::finish(result, ctx, config, adapter).await
    }

    async fn run<R>(
        &self,
        ctx: &mut dyn WebContext,
        config: &SecurityConfig,
        route: &SecuredRoute,
        granted: &dyn GrantedAccessAdapter<R>,
    ) -> Result<Step<R>> {
        if !matching::matches(ctx, &route.matchers, config.matchers()).await? {
            log::debug!("No matching for this request, granting access");
            return Ok(Step::Granted(granted.adapt(ctx, &[]).await?));
        }

        let clients = config.find_clients(&*ctx, &route.clients)?;
        log::debug!("Clients: {}", names(&clients));

        let load_from_session = config.decisions().should_load_from_session(&*ctx, &clients);
        log::debug!("Load profiles from session: {load_from_session}");
        let mut profiles = ProfileManager::new(ctx).get_all(load_from_session).await?;
        log::debug!("Found {} profile(s)", profiles.len());

        let mut fresh: Vec<(Arc<dyn AuthClient>, UserProfile)> = Vec::new();
        if profiles.is_empty() {
            let multi_profile = config.settings().multi_profile;
            for client in clients.iter().filter(|c| !c.is_indirect()) {
                log::debug!("Performing authentication for direct client {}", client.name());
                match client.authenticate(ctx).await {
                    Ok(Some(profile)) => {
                        log::debug!("Client {} authenticated {}", client.name(), profile.id());
                        ProfileManager::new(ctx)
                            .save(false, profile.clone(), multi_profile)
                            .await?;
                        fresh.push((client.clone(), profile));
                        if !multi_profile {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(Error::CredentialsInvalid { message }) => {
                        log::warn!("Client {} rejected the credentials: {message}", client.name());
                    }
                    Err(e) => return Err(e),
                }
            }
            if fresh.is_empty() {
                return self.authentication_failed(ctx, config, &clients).await;
            }
            profiles = fresh.iter().map(|(_, profile)| profile.clone()).collect();
        }

        if !authorization::is_authorized(ctx, &profiles, &route.authorizers, config.authorizers()).await? {
            log::debug!("Access forbidden by authorizers: {}", route.authorizers);
            return Ok(Step::Action(HttpAction::forbidden("forbidden")));
        }

        for (client, profile) in fresh {
            let save = config
                .decisions()
                .should_save_to_session(&*ctx, &clients, Some(client.as_ref()), &profile);
            if save {
                log::debug!("Saving profile {} in session", profile.id());
                ProfileManager::new(ctx)
                    .save(true, profile, config.settings().multi_profile)
                    .await?;
            }
        }

        log::debug!("Access granted");
        Ok(Step::Granted(granted.adapt(ctx, &profiles).await?))
    }

    /// No direct client produced a profile.
    async fn authentication_failed<R>(
        &self,
        ctx: &mut dyn WebContext,
        config: &SecurityConfig,
        clients: &[Arc<dyn AuthClient>],
    ) -> Result<Step<R>> {
        match clients.first() {
            Some(head) if head.is_indirect() => {
                log::debug!("Starting indirect authentication with client {}", head.name());
                let action = indirect::redirect_to_identity_provider(ctx, config, head.as_ref()).await?;
                Ok(Step::Action(action))
            }
            _ => {
                log::debug!("No profile, unauthorized");
                Ok(Step::Action(HttpAction::unauthorized("authentication required")))
            }
        }
    }
}

fn names(clients: &[Arc<dyn AuthClient>]) -> String {
    clients
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(",")
}
