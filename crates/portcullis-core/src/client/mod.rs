//! Authentication clients.
//!
//! A [`Client`] bundles the three per-client capabilities (extract,
//! validate, create) for one credentials type, plus the flags the logics
//! branch on:
//!
//! - `indirect`: the flow needs a browser-mediated redirect round-trip.
//! - `anonymous`: the client grants a placeholder identity.
//!
//! Configurations hold clients behind the object-safe [`AuthClient`] trait,
//! so clients with different credentials types can sit in one list.
//! Clients are read-only once configured.

mod anonymous;
mod failure;
mod finder;

pub use anonymous::{ANONYMOUS_CLIENT_NAME, anonymous_client};
pub use failure::{ATTEMPTED_AUTHENTICATION_SUFFIX, FailedAuthRecorder};
pub use finder::{
    ClientFinder, DefaultClientFinder, ELEMENT_SEPARATOR, find_client, names_match, split_names,
};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::action::{HttpAction, LOCATION_HEADER, RedirectAction};
use crate::authenticate::ClientAuthenticator;
use crate::context::WebContext;
use crate::credentials::{AuthorizationGenerator, Authenticator, CredentialsExtractor, ProfileCreator};
use crate::error::{Error, Result};
use crate::profile::UserProfile;
use crate::session;

/// Header set by browsers' XHR libraries on AJAX calls.
pub const AJAX_HEADER: &str = "X-Requested-With";

/// Value of [`AJAX_HEADER`] marking an AJAX call.
pub const AJAX_HEADER_VALUE: &str = "XMLHttpRequest";

/// Whether the request is an AJAX call.
pub fn is_ajax(ctx: &dyn WebContext) -> bool {
    ctx.request_header(AJAX_HEADER)
        .is_some_and(|v| v.eq_ignore_ascii_case(AJAX_HEADER_VALUE))
}

// ============================================================================
// Redirect and logout builders
// ============================================================================

/// Computes where an indirect client sends the browser.
#[async_trait]
pub trait RedirectActionBuilder: Send + Sync {
    /// Build the redirect. `callback_url` is where the identity provider
    /// must send the browser back to.
    async fn redirect(&self, ctx: &mut dyn WebContext, callback_url: &str)
    -> Result<RedirectAction>;
}

/// Computes the central (identity provider) logout redirect.
pub trait LogoutActionBuilder: Send + Sync {
    /// `None` when the provider has no logout endpoint.
    fn logout_action(
        &self,
        ctx: &dyn WebContext,
        profile: &UserProfile,
        target_url: Option<&str>,
    ) -> Option<RedirectAction>;
}

/// Redirects to a fixed login page.
#[derive(Debug, Clone)]
pub struct FixedRedirect {
    location: String,
}

impl FixedRedirect {
    /// Always redirect to `location`.
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

#[async_trait]
impl RedirectActionBuilder for FixedRedirect {
    async fn redirect(
        &self,
        _ctx: &mut dyn WebContext,
        _callback_url: &str,
    ) -> Result<RedirectAction> {
        Ok(RedirectAction::redirect(self.location.clone()))
    }
}

// ============================================================================
// AuthClient
// ============================================================================

/// Object-safe view of a client, independent of its credentials type.
#[async_trait]
pub trait AuthClient: Send + Sync + fmt::Debug {
    /// Unique client name.
    fn name(&self) -> &str;

    /// Whether the client needs a redirect round-trip.
    fn is_indirect(&self) -> bool;

    /// Whether the client grants anonymous access.
    fn is_anonymous(&self) -> bool;

    /// The client's own callback URL, if it has one.
    fn callback_url(&self) -> Option<&str> {
        None
    }

    /// Run extract, validate and create. `Ok(None)` when no credentials
    /// were presented.
    async fn authenticate(&self, ctx: &mut dyn WebContext) -> Result<Option<UserProfile>>;

    /// Redirect the browser to the identity provider.
    async fn redirect(&self, ctx: &mut dyn WebContext, callback_url: &str) -> Result<HttpAction>;

    /// Central logout redirect for `profile`, if the client supports it.
    fn logout_action(
        &self,
        _ctx: &dyn WebContext,
        _profile: &UserProfile,
        _target_url: Option<&str>,
    ) -> Option<RedirectAction> {
        None
    }

    /// Called after the session id changed from `old_session_id`.
    async fn notify_session_renewal(
        &self,
        _old_session_id: &str,
        _ctx: &mut dyn WebContext,
    ) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Client
// ============================================================================

/// A client for credentials of type `C`.
pub struct Client<C> {
    name: String,
    indirect: bool,
    anonymous: bool,
    extractor: Arc<dyn CredentialsExtractor<C>>,
    authenticator: Arc<dyn Authenticator<C>>,
    creator: Arc<dyn ProfileCreator<C>>,
    generators: Vec<Arc<dyn AuthorizationGenerator>>,
    redirect_builder: Option<Arc<dyn RedirectActionBuilder>>,
    logout_builder: Option<Arc<dyn LogoutActionBuilder>>,
    callback_url: Option<String>,
}

impl<C> Client<C>
where
    C: Send + Sync + 'static,
{
    /// A direct client: credentials come with every request.
    pub fn direct(
        name: impl Into<String>,
        extractor: impl CredentialsExtractor<C> + 'static,
        authenticator: impl Authenticator<C> + 'static,
        creator: impl ProfileCreator<C> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            indirect: false,
            anonymous: false,
            extractor: Arc::new(extractor),
            authenticator: Arc::new(authenticator),
            creator: Arc::new(creator),
            generators: Vec::new(),
            redirect_builder: None,
            logout_builder: None,
            callback_url: None,
        }
    }

    /// An indirect client: the browser is redirected to an identity
    /// provider and comes back with credentials on the callback URL.
    pub fn indirect(
        name: impl Into<String>,
        extractor: impl CredentialsExtractor<C> + 'static,
        authenticator: impl Authenticator<C> + 'static,
        creator: impl ProfileCreator<C> + 'static,
        redirect_builder: impl RedirectActionBuilder + 'static,
    ) -> Self {
        Self {
            indirect: true,
            redirect_builder: Some(Arc::new(redirect_builder)),
            ..Self::direct(name, extractor, authenticator, creator)
        }
    }

    /// Mark the client as granting anonymous access.
    pub fn as_anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// Add an authorization generator, applied to every created profile in
    /// the order added.
    pub fn with_generator(mut self, generator: impl AuthorizationGenerator + 'static) -> Self {
        self.generators.push(Arc::new(generator));
        self
    }

    /// Set the central logout builder.
    pub fn with_logout_action_builder(
        mut self,
        builder: impl LogoutActionBuilder + 'static,
    ) -> Self {
        self.logout_builder = Some(Arc::new(builder));
        self
    }

    /// Set a client-specific callback URL.
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    /// The credentials extractor.
    pub fn extractor(&self) -> &dyn CredentialsExtractor<C> {
        self.extractor.as_ref()
    }

    /// The credentials authenticator.
    pub fn authenticator(&self) -> &dyn Authenticator<C> {
        self.authenticator.as_ref()
    }

    /// The profile creator.
    pub fn creator(&self) -> &dyn ProfileCreator<C> {
        self.creator.as_ref()
    }

    fn recorder(&self) -> FailedAuthRecorder {
        FailedAuthRecorder::for_client(self.indirect)
    }

    /// Extract credentials, keeping the failed-attempt marker up to date.
    pub async fn credentials(&self, ctx: &mut dyn WebContext) -> Result<Option<C>> {
        let credentials = self.extractor.extract(ctx).await?;
        match credentials {
            None => self.recorder().record(&self.name, ctx).await?,
            Some(_) => self.recorder().clear(&self.name, ctx).await?,
        }
        Ok(credentials)
    }

    /// Stamp the client name on a created profile and run the generators.
    pub async fn finish_profile(
        &self,
        ctx: &mut dyn WebContext,
        mut profile: UserProfile,
    ) -> Result<UserProfile> {
        profile.set_client_name(self.name.clone());
        for generator in &self.generators {
            profile = generator.generate(ctx, profile).await?;
        }
        Ok(profile)
    }

    /// The redirect descriptor of an indirect client.
    ///
    /// AJAX calls and repeated attempts get a 401 instead, as a
    /// [`Error::RequiredAction`].
    pub async fn redirect_action(
        &self,
        ctx: &mut dyn WebContext,
        callback_url: &str,
    ) -> Result<RedirectAction> {
        let builder = self.redirect_builder.as_ref().ok_or_else(|| {
            Error::config(format!("client {} has no redirect action builder", self.name))
        })?;

        if is_ajax(ctx) {
            log::info!("AJAX request detected -> returning 401");
            session::remove_attribute(ctx, session::REQUESTED_URL).await?;
            let action = builder.redirect(ctx, callback_url).await?;
            if let Some(location) = action.location() {
                ctx.set_response_header(LOCATION_HEADER, location);
            }
            return Err(HttpAction::unauthorized("AJAX request -> 401").into());
        }

        if self.recorder().is_present(&self.name, ctx).await? {
            self.recorder().clear(&self.name, ctx).await?;
            session::remove_attribute(ctx, session::REQUESTED_URL).await?;
            return Err(HttpAction::unauthorized("authentication already tried -> 401").into());
        }

        builder.redirect(ctx, callback_url).await
    }
}

impl<C> fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.name)
            .field("indirect", &self.indirect)
            .field("anonymous", &self.anonymous)
            .field("generators", &self.generators.len())
            .finish()
    }
}

#[async_trait]
impl<C> AuthClient for Client<C>
where
    C: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_indirect(&self) -> bool {
        self.indirect
    }

    fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    fn callback_url(&self) -> Option<&str> {
        self.callback_url.as_deref()
    }

    async fn authenticate(&self, ctx: &mut dyn WebContext) -> Result<Option<UserProfile>> {
        ClientAuthenticator::authenticate_for(self, ctx).await
    }

    async fn redirect(&self, ctx: &mut dyn WebContext, callback_url: &str) -> Result<HttpAction> {
        if !self.indirect {
            return Err(Error::technical(format!(
                "direct client {} cannot start a redirect",
                self.name
            )));
        }
        let action = self.redirect_action(ctx, callback_url).await?;
        Ok(action.perform(ctx))
    }

    fn logout_action(
        &self,
        ctx: &dyn WebContext,
        profile: &UserProfile,
        target_url: Option<&str>,
    ) -> Option<RedirectAction> {
        self.logout_builder
            .as_ref()
            .and_then(|builder| builder.logout_action(ctx, profile, target_url))
    }
}
