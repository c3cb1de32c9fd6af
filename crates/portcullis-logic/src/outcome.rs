//! Turning the result of a logic run into the caller-visible outcome.

use portcullis_core::adapter::HttpActionAdapter;
use portcullis_core::config::{ErrorHandling, SecurityConfig};
use portcullis_core::{Error, HttpAction, Outcome, Result, WebContext};

/// Where a logic run ended up, before adaptation.
pub(crate) enum Step<R> {
    /// Access granted, response already built.
    Granted(R),
    /// An action for the host to perform.
    Action(HttpAction),
}

/// Adapt the end of a run.
///
/// Required actions and rejected credentials are control flow and become
/// actions. Anything else is logged, then either returned or turned into a
/// 500 depending on the configured [`ErrorHandling`].
pub(crate) async fn finish<R>(
    result: Result<Step<R>>,
    ctx: &mut dyn WebContext,
    config: &SecurityConfig,
    adapter: &dyn HttpActionAdapter<R>,
) -> Result<Outcome<R>> {
    let action = match result {
        Ok(Step::Granted(response)) => return Ok(Outcome::Granted(response)),
        Ok(Step::Action(action)) => action,
        Err(Error::RequiredAction(action)) => {
            log::debug!("Required action: {action}");
            action
        }
        Err(Error::CredentialsInvalid { message }) => {
            log::warn!("Invalid credentials: {message}");
            HttpAction::unauthorized(message)
        }
        Err(e) => {
            log::error!("Security failure: {e}");
            match config.settings().error_handling {
                ErrorHandling::Propagate => return Err(e),
                ErrorHandling::ServerError => HttpAction::server_error(e.to_string()),
            }
        }
    };
    let response = adapter.adapt(&action, ctx).await?;
    Ok(Outcome::from_action(&action, response))
}
