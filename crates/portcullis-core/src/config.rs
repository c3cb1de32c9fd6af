//! Security settings and the assembled security configuration.
//!
//! [`SecuritySettings`] is the serializable part, read from TOML.
//! [`SecurityConfig`] adds the clients, authorizers and matchers, which
//! are code, and is immutable once built. Share it in an `Arc`.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::authorization::{Authorizer, AuthorizerMap};
use crate::client::{AuthClient, ClientFinder, DefaultClientFinder, names_match};
use crate::context::WebContext;
use crate::decision::{DefaultSessionDecisions, SessionDecisionPolicy};
use crate::error::{Error, Result};
use crate::matching::{Matcher, MatcherMap};
use crate::session::{SessionDestruction, SessionRenewal};

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "PORTCULLIS_CONFIG";

// ============================================================================
// Settings
// ============================================================================

/// What the logics do with technical failures.
///
/// Failures are logged either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorHandling {
    /// Return the error to the caller.
    #[default]
    Propagate,
    /// Adapt a 500 action instead.
    ServerError,
}

/// The clients, authorizers and matchers protecting one route, each as a
/// comma-separated name list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuredRoute {
    /// Client names, in the order they are tried.
    pub clients: String,
    /// Authorizer names, all of which must authorize.
    pub authorizers: String,
    /// Matcher names, all of which must match for the route to be secured.
    pub matchers: String,
}

impl SecuredRoute {
    /// A route secured by `clients`.
    pub fn new(clients: impl Into<String>) -> Self {
        Self {
            clients: clients.into(),
            ..Self::default()
        }
    }

    /// Set the authorizer names.
    pub fn with_authorizers(mut self, authorizers: impl Into<String>) -> Self {
        self.authorizers = authorizers.into();
        self
    }

    /// Set the matcher names.
    pub fn with_matchers(mut self, matchers: impl Into<String>) -> Self {
        self.matchers = matchers.into();
        self
    }
}

/// Serializable security settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Save freshly authenticated profiles in the session.
    pub save_profile_in_session: bool,
    /// Keep one profile per client instead of a single profile.
    pub multi_profile: bool,
    /// Move the session to a new id after a callback login.
    pub renew_session: bool,
    /// Where to go when no URL was requested or allowed.
    pub default_url: String,
    /// Logout redirect targets must match this pattern.
    pub logout_url_pattern: String,
    /// Remove the local profiles on logout.
    pub local_logout: bool,
    /// Destroy the session on local logout.
    pub destroy_session: bool,
    /// Ask the identity provider to log out too.
    pub central_logout: bool,
    /// Request parameter naming the client on callbacks and explicit
    /// client selection.
    pub client_name_parameter: String,
    /// Callback URL shared by indirect clients without their own.
    pub callback_url: Option<String>,
    /// What to do with technical failures.
    pub error_handling: ErrorHandling,
    /// Named routes.
    pub routes: IndexMap<String, SecuredRoute>,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            save_profile_in_session: true,
            multi_profile: false,
            renew_session: true,
            default_url: "/".to_string(),
            logout_url_pattern: "/.*".to_string(),
            local_logout: true,
            destroy_session: false,
            central_logout: false,
            client_name_parameter: "client_name".to_string(),
            callback_url: None,
            error_handling: ErrorHandling::default(),
            routes: IndexMap::new(),
        }
    }
}

impl SecuritySettings {
    /// Parse settings from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::config(format!("Failed to parse settings: {e}")))
    }

    /// Load settings from `path`, or from the file named by
    /// [`CONFIG_ENV`], or fall back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = std::env::var_os(CONFIG_ENV);
        let path = path.or(from_env.as_deref().map(Path::new));
        let Some(path) = path else {
            log::debug!("No settings file given, using defaults");
            return Ok(Self::default());
        };
        log::debug!("Loading settings from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))
    }

    /// The named route.
    pub fn route(&self, name: &str) -> Result<&SecuredRoute> {
        self.routes
            .get(name)
            .ok_or_else(|| Error::config(format!("no route named {name}")))
    }

    /// The session destruction strategy for logout.
    pub fn session_destruction(&self) -> SessionDestruction {
        SessionDestruction::from_flag(self.destroy_session)
    }

    /// The session renewal strategy for callbacks.
    pub fn session_renewal(&self) -> SessionRenewal {
        SessionRenewal::from_flag(self.renew_session)
    }
}

// ============================================================================
// Security configuration
// ============================================================================

/// Everything the logics need, assembled once at startup.
pub struct SecurityConfig {
    settings: SecuritySettings,
    clients: Vec<Arc<dyn AuthClient>>,
    authorizers: AuthorizerMap,
    matchers: MatcherMap,
    client_finder: Arc<dyn ClientFinder>,
    decisions: Arc<dyn SessionDecisionPolicy>,
    logout_url_pattern: Regex,
}

impl SecurityConfig {
    /// Start assembling a configuration from `settings`.
    pub fn builder(settings: SecuritySettings) -> SecurityConfigBuilder {
        SecurityConfigBuilder {
            settings,
            clients: Vec::new(),
            authorizers: AuthorizerMap::new(),
            matchers: MatcherMap::new(),
            client_finder: None,
            decisions: None,
        }
    }

    /// The settings.
    pub fn settings(&self) -> &SecuritySettings {
        &self.settings
    }

    /// Configured clients, in declaration order.
    pub fn clients(&self) -> &[Arc<dyn AuthClient>] {
        &self.clients
    }

    /// Named authorizers.
    pub fn authorizers(&self) -> &AuthorizerMap {
        &self.authorizers
    }

    /// Named matchers.
    pub fn matchers(&self) -> &MatcherMap {
        &self.matchers
    }

    /// Session load and save decisions.
    pub fn decisions(&self) -> &dyn SessionDecisionPolicy {
        self.decisions.as_ref()
    }

    /// The clients of a route for the current request.
    pub fn find_clients(
        &self,
        ctx: &dyn WebContext,
        route_clients: &str,
    ) -> Result<Vec<Arc<dyn AuthClient>>> {
        self.client_finder.find(&self.clients, ctx, route_clients)
    }

    /// Where the identity provider sends the browser back for `client`.
    ///
    /// The client's own callback URL if it has one, otherwise the shared
    /// callback URL with the client name added as a parameter.
    pub fn callback_url_for(&self, client: &dyn AuthClient) -> Result<String> {
        if let Some(url) = client.callback_url() {
            return Ok(url.to_string());
        }
        let base = self.settings.callback_url.as_deref().ok_or_else(|| {
            Error::config(format!("no callback URL for client {}", client.name()))
        })?;
        let separator = if base.contains('?') { '&' } else { '?' };
        Ok(format!(
            "{base}{separator}{}={}",
            self.settings.client_name_parameter,
            client.name()
        ))
    }

    /// Whether a logout redirect target is allowed.
    pub fn allows_logout_url(&self, url: &str) -> bool {
        self.logout_url_pattern.is_match(url)
    }
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("settings", &self.settings)
            .field("clients", &self.clients)
            .field("authorizers", &self.authorizers.keys().collect::<Vec<_>>())
            .field("matchers", &self.matchers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Builder for [`SecurityConfig`].
pub struct SecurityConfigBuilder {
    settings: SecuritySettings,
    clients: Vec<Arc<dyn AuthClient>>,
    authorizers: AuthorizerMap,
    matchers: MatcherMap,
    client_finder: Option<Arc<dyn ClientFinder>>,
    decisions: Option<Arc<dyn SessionDecisionPolicy>>,
}

impl SecurityConfigBuilder {
    /// Add a client.
    pub fn client(self, client: impl AuthClient + 'static) -> Self {
        self.shared_client(Arc::new(client))
    }

    /// Add an already shared client.
    pub fn shared_client(mut self, client: Arc<dyn AuthClient>) -> Self {
        self.clients.push(client);
        self
    }

    /// Register a named authorizer.
    pub fn authorizer(mut self, name: impl Into<String>, authorizer: impl Authorizer + 'static) -> Self {
        self.authorizers.insert(name.into(), Arc::new(authorizer));
        self
    }

    /// Register a named matcher.
    pub fn matcher(mut self, name: impl Into<String>, matcher: impl Matcher + 'static) -> Self {
        self.matchers.insert(name.into(), Arc::new(matcher));
        self
    }

    /// Replace the default client finder.
    pub fn client_finder(mut self, finder: impl ClientFinder + 'static) -> Self {
        self.client_finder = Some(Arc::new(finder));
        self
    }

    /// Replace the default session decisions.
    pub fn decisions(mut self, decisions: impl SessionDecisionPolicy + 'static) -> Self {
        self.decisions = Some(Arc::new(decisions));
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// Fails on duplicate client names, indirect clients without a
    /// callback URL and an invalid logout URL pattern.
    pub fn build(self) -> Result<SecurityConfig> {
        for (i, client) in self.clients.iter().enumerate() {
            if self.clients[..i]
                .iter()
                .any(|other| names_match(other.name(), client.name()))
            {
                return Err(Error::config(format!("duplicate client name: {}", client.name())));
            }
            if client.is_indirect()
                && client.callback_url().is_none()
                && self.settings.callback_url.is_none()
            {
                return Err(Error::config(format!(
                    "indirect client {} needs a callback URL",
                    client.name()
                )));
            }
        }

        let anchored = format!("^(?:{})$", self.settings.logout_url_pattern);
        let logout_url_pattern = Regex::new(&anchored)
            .map_err(|e| Error::config(format!("invalid logout URL pattern: {e}")))?;

        let client_finder = self.client_finder.unwrap_or_else(|| {
            Arc::new(DefaultClientFinder::new(self.settings.client_name_parameter.clone()))
        });
        let decisions = self.decisions.unwrap_or_else(|| {
            Arc::new(DefaultSessionDecisions::new(self.settings.save_profile_in_session))
        });

        log::debug!(
            "Security configuration built with {} client(s), {} authorizer(s), {} matcher(s)",
            self.clients.len(),
            self.authorizers.len(),
            self.matchers.len()
        );

        Ok(SecurityConfig {
            settings: self.settings,
            clients: self.clients,
            authorizers: self.authorizers,
            matchers: self.matchers,
            client_finder,
            decisions,
            logout_url_pattern,
        })
    }
}
