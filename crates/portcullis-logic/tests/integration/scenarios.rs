//! The reference scenarios: indirect redirect, direct login with session
//! save, and no client at all.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use portcullis_core::adapter::GrantedAccessAdapter;
use portcullis_core::{
    Outcome, ProfileManager, Result, SecuredRoute, SecurityConfig, SecuritySettings, UserProfile,
    WebContext,
};
use portcullis_logic::SecurityLogic;

use crate::common::{
    CountingAuthorizer, IDP_LOGIN, Journal, StringAdapter, TOKEN_HEADER, TestHarness,
    header_client, idp_client,
};

struct JournalingGranted {
    journal: Journal,
}

#[async_trait]
impl GrantedAccessAdapter<String> for JournalingGranted {
    async fn adapt(&self, _ctx: &mut dyn WebContext, profiles: &[UserProfile]) -> Result<String> {
        self.journal.record("adapt:granted");
        Ok(format!("granted:{}", profiles.len()))
    }
}

#[tokio::test]
async fn test_indirect_client_without_session_profile_redirects() {
    let harness = TestHarness::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let settings = SecuritySettings {
        callback_url: Some("https://app.example/callback".to_string()),
        ..SecuritySettings::default()
    };
    let config = SecurityConfig::builder(settings)
        .client(idp_client(&harness.journal))
        .authorizer("counting", CountingAuthorizer { calls: calls.clone() })
        .build()
        .unwrap();
    let route = SecuredRoute::new("IdpClient").with_authorizers("counting");

    let mut ctx = harness.request("GET", "https://app.example/private").build();
    let outcome = SecurityLogic
        .perform(&mut ctx, &config, &route, &StringAdapter, &StringAdapter)
        .await
        .unwrap();

    let expected = format!("{IDP_LOGIN}?callback=https://app.example/callback?client_name=IdpClient");
    assert_eq!(
        outcome,
        Outcome::Redirect {
            location: expected.clone(),
            response: format!("302 {expected}"),
        }
    );
    assert_eq!(ctx.response_header("Location"), Some(expected.as_str()));

    // The load decision read the session; nothing was authenticated or authorized.
    assert_eq!(harness.journal.matching("session:get:userProfiles").len(), 1);
    assert!(harness.journal.matching("extract").is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.journal.matching("session:set:requestedUrl").len(), 1);
}

#[tokio::test]
async fn test_direct_login_saves_profile_once_before_granting() {
    let harness = TestHarness::new();
    let config = SecurityConfig::builder(SecuritySettings::default())
        .client(header_client(&harness.journal))
        .build()
        .unwrap();
    let route = SecuredRoute::new("HeaderClient");
    let granted = JournalingGranted {
        journal: harness.journal.clone(),
    };

    let mut ctx = harness
        .request("GET", "http://app.example/api")
        .header(TOKEN_HEADER, "Bearer valid-alice")
        .build();
    let outcome = SecurityLogic
        .perform(&mut ctx, &config, &route, &granted, &StringAdapter)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Granted("granted:1".to_string()));

    let sets = harness.journal.matching("session:set");
    assert_eq!(sets, vec!["session:set:userProfiles".to_string()]);
    let saved = harness.journal.position("session:set:userProfiles").unwrap();
    let adapted = harness.journal.position("adapt:granted").unwrap();
    assert!(saved < adapted);

    // A direct first client never reads the session.
    assert!(harness.journal.matching("session:get").is_empty());

    let mut next = ctx.follow_up("GET", "http://app.example/api").build();
    let profile = ProfileManager::new(&mut next).get(true).await.unwrap().unwrap();
    assert_eq!(profile.id(), "valid-alice");
    assert_eq!(profile.client_name(), Some("HeaderClient"));
}

#[tokio::test]
async fn test_direct_login_without_session_save() {
    let harness = TestHarness::new();
    let settings = SecuritySettings {
        save_profile_in_session: false,
        ..SecuritySettings::default()
    };
    let config = SecurityConfig::builder(settings)
        .client(header_client(&harness.journal))
        .build()
        .unwrap();

    let mut ctx = harness
        .request("GET", "http://app.example/api")
        .header(TOKEN_HEADER, "Bearer valid-alice")
        .build();
    let outcome = SecurityLogic
        .perform(&mut ctx, &config, &SecuredRoute::new("HeaderClient"), &StringAdapter, &StringAdapter)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Granted("granted:valid-alice".to_string()));
    assert!(harness.journal.matching("session:set").is_empty());

    // The profile is still visible for the rest of this request.
    let profile = ProfileManager::new(&mut ctx).get(false).await.unwrap().unwrap();
    assert_eq!(profile.id(), "valid-alice");
}

#[tokio::test]
async fn test_no_clients_is_unauthorized_without_authenticating() {
    let harness = TestHarness::new();
    let config = SecurityConfig::builder(SecuritySettings::default())
        .client(header_client(&harness.journal))
        .build()
        .unwrap();
    let route = SecuredRoute::new("").with_authorizers("isAuthenticated");

    let mut ctx = harness
        .request("GET", "http://app.example/private")
        .header(TOKEN_HEADER, "Bearer valid-alice")
        .build();
    let outcome = SecurityLogic
        .perform(&mut ctx, &config, &route, &StringAdapter, &StringAdapter)
        .await
        .unwrap();

    assert_eq!(outcome.status(), Some(401));
    assert!(harness.journal.matching("extract").is_empty());
    assert!(harness.journal.matching("create").is_empty());
}
