//! When to read profiles from, and write them to, the session.

use std::sync::Arc;

use crate::client::AuthClient;
use crate::context::WebContext;
use crate::profile::UserProfile;

/// The two session decisions of the security logic.
///
/// Both are pure: they look at their arguments and nothing else, and the
/// load decision is taken once per request, before any client runs.
pub trait SessionDecisionPolicy: Send + Sync {
    /// Whether to look for profiles in the session before authenticating.
    fn should_load_from_session(
        &self,
        ctx: &dyn WebContext,
        clients: &[Arc<dyn AuthClient>],
    ) -> bool;

    /// Whether to persist a newly obtained profile into the session.
    fn should_save_to_session(
        &self,
        ctx: &dyn WebContext,
        clients: &[Arc<dyn AuthClient>],
        selected: Option<&dyn AuthClient>,
        profile: &UserProfile,
    ) -> bool;
}

/// The default decisions.
///
/// - Load when the route has no client, or when its first client is
///   indirect or anonymous: those imply an identity may already be held
///   from an earlier round-trip, so a fresh direct attempt is not forced.
/// - Save according to the `save_profile_in_session` setting. The
///   arguments are ignored for now; a policy wanting to decide per client
///   or per profile implements [`SessionDecisionPolicy`] itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultSessionDecisions {
    save_profile_in_session: bool,
}

impl DefaultSessionDecisions {
    /// Decisions saving profiles iff `save_profile_in_session`.
    pub fn new(save_profile_in_session: bool) -> Self {
        Self {
            save_profile_in_session,
        }
    }
}

impl Default for DefaultSessionDecisions {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SessionDecisionPolicy for DefaultSessionDecisions {
    fn should_load_from_session(
        &self,
        _ctx: &dyn WebContext,
        clients: &[Arc<dyn AuthClient>],
    ) -> bool {
        match clients.first() {
            None => true,
            Some(first) => first.is_indirect() || first.is_anonymous(),
        }
    }

    fn should_save_to_session(
        &self,
        _ctx: &dyn WebContext,
        _clients: &[Arc<dyn AuthClient>],
        _selected: Option<&dyn AuthClient>,
        _profile: &UserProfile,
    ) -> bool {
        self.save_profile_in_session
    }
}
