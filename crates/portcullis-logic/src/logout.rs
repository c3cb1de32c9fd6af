//! The logout logic.

use portcullis_core::adapter::HttpActionAdapter;
use portcullis_core::client::find_client;
use portcullis_core::{HttpAction, Outcome, ProfileManager, Result, SecurityConfig, WebContext};

use crate::outcome::{self, Step};

/// Request parameter carrying the post-logout redirect target.
pub const LOGOUT_URL_PARAMETER: &str = "url";

/// Logs users out, locally and optionally at the identity provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogoutLogic;

impl LogoutLogic {
    /// Process a logout request.
    ///
    /// The redirect target is the [`LOGOUT_URL_PARAMETER`] parameter when it
    /// matches the logout URL pattern, else the default URL. Local logout
    /// happens when configured or when several profiles are held; it removes
    /// the profiles and applies the session destruction strategy. Central
    /// logout asks the client of the first profile that has one for a
    /// logout redirect, which wins over the local redirect.
    pub async fn perform<R>(
        &self,
        ctx: &mut dyn WebContext,
        config: &SecurityConfig,
        adapter: &dyn HttpActionAdapter<R>,
    ) -> Result<Outcome<R>> {
        log::debug!("=== LOGOUT === url: {}", ctx.full_request_url());
        let result = self.run(ctx, config).await;
        outcome::finish(result, ctx, config, adapter).await
    }

    async fn run<R>(&self, ctx: &mut dyn WebContext, config: &SecurityConfig) -> Result<Step<R>> {
        let settings = config.settings();

        let requested = ctx.request_parameter(LOGOUT_URL_PARAMETER).map(str::to_string);
        let redirect_url = match requested {
            Some(url) if config.allows_logout_url(&url) => Some(url),
            Some(url) => {
                log::debug!("Logout URL {url} not allowed, using the default URL");
                default_url(&settings.default_url)
            }
            None => default_url(&settings.default_url),
        };

        let has_store = ctx.session_store().is_some();
        let profiles = ProfileManager::new(ctx).get_all(true).await?;

        if settings.local_logout || profiles.len() > 1 {
            log::debug!("Performing application logout");
            ProfileManager::new(ctx).remove(has_store).await?;
            settings
                .session_destruction()
                .attempt_session_destruction_for(ctx)
                .await;
        }

        if settings.central_logout {
            log::debug!("Performing central logout");
            let target = redirect_url.as_deref().filter(|url| is_absolute(url));
            for profile in &profiles {
                let Some(client_name) = profile.client_name() else {
                    continue;
                };
                let client = match find_client(config.clients(), client_name) {
                    Ok(client) => client,
                    Err(e) => {
                        log::debug!("Skipping central logout for {}: {e}", profile.id());
                        continue;
                    }
                };
                if let Some(logout) = client.logout_action(&*ctx, profile, target) {
                    log::debug!("Central logout through client {client_name}");
                    return Ok(Step::Action(logout.perform(ctx)));
                }
            }
        }

        let action = match redirect_url {
            Some(url) => {
                ctx.set_response_header(portcullis_core::action::LOCATION_HEADER, &url);
                HttpAction::redirect("logged out", url)
            }
            None => HttpAction::ok("logged out"),
        };
        Ok(Step::Action(action))
    }
}

fn default_url(url: &str) -> Option<String> {
    (!url.is_empty()).then(|| url.to_string())
}

fn is_absolute(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
