//! Common test utilities and harness for the logic integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use portcullis_core::action::RedirectAction;
use portcullis_core::adapter::{GrantedAccessAdapter, HttpActionAdapter};
use portcullis_core::authorization::Authorizer;
use portcullis_core::client::{Client, LogoutActionBuilder, RedirectActionBuilder};
use portcullis_core::credentials::{Authenticator, CredentialsExtractor, ProfileCreator};
use portcullis_core::session::SessionStore;
use portcullis_core::{
    Error, HttpAction, MemorySessionStore, RequestContext, Result, UserProfile, WebContext,
};
use serde_json::Value;

/// Header carrying bearer tokens for the direct client.
pub const TOKEN_HEADER: &str = "Authorization";

/// Request parameter carrying the code on callbacks.
pub const CODE_PARAMETER: &str = "code";

/// Login page of the fake identity provider.
pub const IDP_LOGIN: &str = "https://idp.example/login";

/// Logout page of the fake identity provider.
pub const IDP_LOGOUT: &str = "https://idp.example/logout";

/// Step-up page of the fake identity provider.
pub const IDP_STEP_UP: &str = "https://idp.example/step-up";

// ============================================================================
// Journal
// ============================================================================

/// Ordered record of capability calls, shared by the fakes of one test.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    /// Every entry, in call order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Entries starting with `prefix`.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    /// Position of the first entry equal to `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

// ============================================================================
// Session store
// ============================================================================

/// A memory session store journaling every call.
pub struct JournalStore {
    inner: MemorySessionStore,
    journal: Journal,
    can_destroy: bool,
}

impl JournalStore {
    /// A store recording into `journal`.
    pub fn new(journal: Journal) -> Self {
        Self {
            inner: MemorySessionStore::new(),
            journal,
            can_destroy: true,
        }
    }

    /// A store whose `destroy_session` reports failure.
    pub fn unable_to_destroy(journal: Journal) -> Self {
        Self {
            can_destroy: false,
            ..Self::new(journal)
        }
    }
}

#[async_trait]
impl SessionStore for JournalStore {
    async fn get_or_create_session_id(&self, ctx: &mut dyn WebContext) -> Result<String> {
        self.journal.record("session:id");
        self.inner.get_or_create_session_id(ctx).await
    }

    async fn get(&self, ctx: &mut dyn WebContext, key: &str) -> Result<Option<Value>> {
        self.journal.record(format!("session:get:{key}"));
        self.inner.get(ctx, key).await
    }

    async fn set(&self, ctx: &mut dyn WebContext, key: &str, value: Value) -> Result<()> {
        self.journal.record(format!("session:set:{key}"));
        self.inner.set(ctx, key, value).await
    }

    async fn destroy_session(&self, ctx: &mut dyn WebContext) -> Result<bool> {
        self.journal.record("session:destroy");
        if !self.can_destroy {
            return Ok(false);
        }
        self.inner.destroy_session(ctx).await
    }

    async fn renew_session(&self, ctx: &mut dyn WebContext) -> Result<bool> {
        self.journal.record("session:renew");
        self.inner.renew_session(ctx).await
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Reads a bearer token from [`TOKEN_HEADER`].
pub struct HeaderToken {
    journal: Journal,
}

#[async_trait]
impl CredentialsExtractor<String> for HeaderToken {
    async fn extract(&self, ctx: &mut dyn WebContext) -> Result<Option<String>> {
        self.journal.record("extract");
        Ok(ctx
            .request_header(TOKEN_HEADER)
            .map(|v| v.trim_start_matches("Bearer ").to_string()))
    }
}

/// Reads the code from [`CODE_PARAMETER`].
pub struct CallbackCode {
    journal: Journal,
}

#[async_trait]
impl CredentialsExtractor<String> for CallbackCode {
    async fn extract(&self, ctx: &mut dyn WebContext) -> Result<Option<String>> {
        self.journal.record("extract");
        Ok(ctx.request_parameter(CODE_PARAMETER).map(str::to_string))
    }
}

/// Accepts tokens starting with `valid`, optionally after a delay.
///
/// `"broken"` fails with a technical error.
pub struct PrefixAuthenticator {
    journal: Journal,
    delay: Option<Duration>,
}

#[async_trait]
impl Authenticator<String> for PrefixAuthenticator {
    async fn validate(&self, credentials: &String, _ctx: &mut dyn WebContext) -> Result<()> {
        self.journal.record("validate:start");
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.journal.record("validate:end");
        if credentials == "broken" {
            return Err(Error::technical("token introspection endpoint unreachable"));
        }
        if credentials.starts_with("valid") {
            Ok(())
        } else {
            Err(Error::credentials(format!("unknown token {credentials}")))
        }
    }
}

/// Creates a profile named after the token.
pub struct TokenProfiles {
    journal: Journal,
}

#[async_trait]
impl ProfileCreator<String> for TokenProfiles {
    async fn create(&self, credentials: String, _ctx: &mut dyn WebContext) -> Result<UserProfile> {
        self.journal.record("create");
        Ok(UserProfile::new(credentials).with_role("user"))
    }
}

/// Asks for a step-up login instead of creating a profile.
pub struct StepUpProfiles {
    journal: Journal,
}

#[async_trait]
impl ProfileCreator<String> for StepUpProfiles {
    async fn create(&self, _credentials: String, _ctx: &mut dyn WebContext) -> Result<UserProfile> {
        self.journal.record("create");
        Err(Error::RequiredAction(HttpAction::redirect(
            "step-up required",
            IDP_STEP_UP,
        )))
    }
}

/// Counts its calls and always agrees.
#[derive(Default)]
pub struct CountingAuthorizer {
    /// Number of calls so far
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Authorizer for CountingAuthorizer {
    async fn is_authorized(&self, _ctx: &mut dyn WebContext, _profiles: &[UserProfile]) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

/// Redirects to [`IDP_LOGIN`], passing the callback URL along.
pub struct IdpRedirect;

#[async_trait]
impl RedirectActionBuilder for IdpRedirect {
    async fn redirect(&self, _ctx: &mut dyn WebContext, callback_url: &str) -> Result<RedirectAction> {
        Ok(RedirectAction::redirect(format!("{IDP_LOGIN}?callback={callback_url}")))
    }
}

/// Redirects to [`IDP_LOGOUT`].
pub struct IdpLogout;

impl LogoutActionBuilder for IdpLogout {
    fn logout_action(
        &self,
        _ctx: &dyn WebContext,
        profile: &UserProfile,
        target_url: Option<&str>,
    ) -> Option<RedirectAction> {
        let mut location = format!("{IDP_LOGOUT}?user={}", profile.id());
        if let Some(target) = target_url {
            location.push_str("&target=");
            location.push_str(target);
        }
        Some(RedirectAction::redirect(location))
    }
}

/// The direct bearer-token client.
pub fn header_client(journal: &Journal) -> Client<String> {
    header_client_with_delay(journal, None)
}

/// The direct bearer-token client with a slow authenticator.
pub fn header_client_with_delay(journal: &Journal, delay: Option<Duration>) -> Client<String> {
    Client::direct(
        "HeaderClient",
        HeaderToken {
            journal: journal.clone(),
        },
        PrefixAuthenticator {
            journal: journal.clone(),
            delay,
        },
        TokenProfiles {
            journal: journal.clone(),
        },
    )
}

/// A direct bearer-token client whose profile creation demands a step-up.
pub fn step_up_client(journal: &Journal) -> Client<String> {
    Client::direct(
        "StepUpClient",
        HeaderToken {
            journal: journal.clone(),
        },
        PrefixAuthenticator {
            journal: journal.clone(),
            delay: None,
        },
        StepUpProfiles {
            journal: journal.clone(),
        },
    )
}

/// The indirect identity provider client.
pub fn idp_client(journal: &Journal) -> Client<String> {
    Client::indirect(
        "IdpClient",
        CallbackCode {
            journal: journal.clone(),
        },
        PrefixAuthenticator {
            journal: journal.clone(),
            delay: None,
        },
        TokenProfiles {
            journal: journal.clone(),
        },
        IdpRedirect,
    )
    .with_logout_action_builder(IdpLogout)
}

// ============================================================================
// Adapters
// ============================================================================

/// Adapts everything to strings: `granted:<ids>`, `<status> <location>` or
/// `<status> <message>`.
pub struct StringAdapter;

#[async_trait]
impl HttpActionAdapter<String> for StringAdapter {
    async fn adapt(&self, action: &HttpAction, _ctx: &mut dyn WebContext) -> Result<String> {
        Ok(match action.location() {
            Some(location) => format!("{} {location}", action.status()),
            None => format!("{} {}", action.status(), action.message()),
        })
    }
}

#[async_trait]
impl GrantedAccessAdapter<String> for StringAdapter {
    async fn adapt(&self, _ctx: &mut dyn WebContext, profiles: &[UserProfile]) -> Result<String> {
        let ids: Vec<&str> = profiles.iter().map(UserProfile::id).collect();
        Ok(format!("granted:{}", ids.join(",")))
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Test harness: a journal and a journaling session store.
pub struct TestHarness {
    /// Capability and session call journal
    pub journal: Journal,
    /// Session store shared by every request of the test
    pub store: Arc<JournalStore>,
}

impl TestHarness {
    /// A harness with a fresh store.
    pub fn new() -> Self {
        let journal = Journal::new();
        let store = Arc::new(JournalStore::new(journal.clone()));
        Self { journal, store }
    }

    /// A request carrying the shared store.
    pub fn request(&self, method: &str, url: &str) -> portcullis_core::context::RequestContextBuilder {
        RequestContext::builder(method, url).session_store(self.store.clone())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
