//! The indirect authentication round-trip.
//!
//! Before the browser leaves for the identity provider, the URL it asked
//! for is kept in the session under [`REQUESTED_URL`]. Once the callback
//! has logged the user in, the browser is sent back there.

use portcullis_core::action::LOCATION_HEADER;
use portcullis_core::client::AuthClient;
use portcullis_core::session::{self, REQUESTED_URL};
use portcullis_core::{HttpAction, Result, SecurityConfig, WebContext};
use serde_json::Value;

/// Remember the current URL in the session.
pub async fn save_requested_url(ctx: &mut dyn WebContext) -> Result<()> {
    let url = ctx.full_request_url().to_string();
    log::debug!("Saving requested URL: {url}");
    session::set_attribute(ctx, REQUESTED_URL, Value::from(url)).await
}

/// Save the requested URL and send the browser to `client`'s identity
/// provider.
pub async fn redirect_to_identity_provider(
    ctx: &mut dyn WebContext,
    config: &SecurityConfig,
    client: &dyn AuthClient,
) -> Result<HttpAction> {
    save_requested_url(ctx).await?;
    let callback_url = config.callback_url_for(client)?;
    log::debug!("Redirecting to identity provider of client {}", client.name());
    client.redirect(ctx, &callback_url).await
}

/// Redirect to the URL saved before the round-trip, or to `default_url`.
///
/// The saved URL is cleared.
pub async fn redirect_to_originally_requested_url(
    ctx: &mut dyn WebContext,
    default_url: &str,
) -> Result<HttpAction> {
    let requested = session::get_attribute(ctx, REQUESTED_URL)
        .await?
        .and_then(|v| v.as_str().map(str::to_string))
        .filter(|url| !url.is_empty());
    if requested.is_some() {
        session::remove_attribute(ctx, REQUESTED_URL).await?;
    }
    let location = requested.unwrap_or_else(|| default_url.to_string());
    log::debug!("Redirecting to {location}");
    ctx.set_response_header(LOCATION_HEADER, &location);
    Ok(HttpAction::redirect("back to requested URL", location))
}
