//! The full indirect round-trip: security redirect, callback, return.

use portcullis_core::client::anonymous_client;
use portcullis_core::session::SESSION_COOKIE;
use portcullis_core::{
    Error, ErrorHandling, Outcome, ProfileManager, SecuredRoute, SecurityConfig, SecuritySettings,
};
use portcullis_logic::{CallbackLogic, SecurityLogic};

use crate::common::{StringAdapter, TestHarness, header_client, idp_client};

const CALLBACK: &str = "https://app.example/callback";

fn config(harness: &TestHarness, settings: SecuritySettings) -> SecurityConfig {
    SecurityConfig::builder(SecuritySettings {
        callback_url: Some(CALLBACK.to_string()),
        ..settings
    })
    .client(idp_client(&harness.journal))
    .client(header_client(&harness.journal))
    .client(anonymous_client())
    .build()
    .unwrap()
}

#[tokio::test]
async fn test_login_round_trip() {
    let harness = TestHarness::new();
    let config = config(&harness, SecuritySettings::default());
    let route = SecuredRoute::new("IdpClient");

    let mut first = harness.request("GET", "https://app.example/orders?page=3").build();
    let outcome = SecurityLogic
        .perform(&mut first, &config, &route, &StringAdapter, &StringAdapter)
        .await
        .unwrap();
    assert_eq!(outcome.status(), Some(302));
    let old_session = first
        .response_cookies()
        .iter()
        .find(|c| c.name == SESSION_COOKIE)
        .unwrap()
        .value
        .clone();

    let mut callback = first
        .follow_up("GET", &format!("{CALLBACK}?client_name=IdpClient&code=valid-hana"))
        .build();
    let outcome = CallbackLogic
        .perform(&mut callback, &config, None, &StringAdapter)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::Redirect {
            location: "https://app.example/orders?page=3".to_string(),
            response: "302 https://app.example/orders?page=3".to_string(),
        }
    );
    assert_eq!(harness.journal.matching("session:renew").len(), 1);
    let new_session = callback
        .response_cookies()
        .iter()
        .rev()
        .find(|c| c.name == SESSION_COOKIE)
        .unwrap()
        .value
        .clone();
    assert_ne!(old_session, new_session);

    let mut back = callback.follow_up("GET", "https://app.example/orders?page=3").build();
    let extracts_before = harness.journal.matching("extract").len();
    let outcome = SecurityLogic
        .perform(&mut back, &config, &route, &StringAdapter, &StringAdapter)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Granted("granted:valid-hana".to_string()));
    assert_eq!(harness.journal.matching("extract").len(), extracts_before);
}

#[tokio::test]
async fn test_callback_without_renewal_keeps_session() {
    let harness = TestHarness::new();
    let settings = SecuritySettings {
        renew_session: false,
        ..SecuritySettings::default()
    };
    let config = config(&harness, settings);

    let mut callback = harness
        .request("GET", &format!("{CALLBACK}?client_name=IdpClient&code=valid-ivan"))
        .build();
    let outcome = CallbackLogic
        .perform(&mut callback, &config, Some("/welcome"), &StringAdapter)
        .await
        .unwrap();

    assert_eq!(outcome.status(), Some(302));
    assert_eq!(callback.response_header("Location"), Some("/welcome"));
    assert!(harness.journal.matching("session:renew").is_empty());
    let profile = ProfileManager::new(&mut callback).get(true).await.unwrap().unwrap();
    assert_eq!(profile.id(), "valid-ivan");
}

#[tokio::test]
async fn test_callback_without_credentials_blocks_the_next_redirect() {
    let harness = TestHarness::new();
    let config = config(&harness, SecuritySettings::default());
    let route = SecuredRoute::new("IdpClient");

    let mut callback = harness
        .request("GET", &format!("{CALLBACK}?client_name=IdpClient"))
        .build();
    let outcome = CallbackLogic
        .perform(&mut callback, &config, None, &StringAdapter)
        .await
        .unwrap();
    assert_eq!(callback.response_header("Location"), Some("/"));
    assert_eq!(outcome.status(), Some(302));

    let mut retry = callback.follow_up("GET", "https://app.example/orders").build();
    let outcome = SecurityLogic
        .perform(&mut retry, &config, &route, &StringAdapter, &StringAdapter)
        .await
        .unwrap();
    assert_eq!(outcome.status(), Some(401));

    // The marker is consumed: the following attempt redirects again.
    let mut again = retry.follow_up("GET", "https://app.example/orders").build();
    let outcome = SecurityLogic
        .perform(&mut again, &config, &route, &StringAdapter, &StringAdapter)
        .await
        .unwrap();
    assert_eq!(outcome.status(), Some(302));
}

#[tokio::test]
async fn test_rejected_callback_credentials_mean_no_profile() {
    let harness = TestHarness::new();
    let config = config(&harness, SecuritySettings::default());

    let mut callback = harness
        .request("GET", &format!("{CALLBACK}?client_name=IdpClient&code=forged"))
        .build();
    let outcome = CallbackLogic
        .perform(&mut callback, &config, None, &StringAdapter)
        .await
        .unwrap();

    assert_eq!(outcome.status(), Some(302));
    assert!(harness.journal.matching("create").is_empty());
    assert!(harness.journal.matching("session:set:userProfiles").is_empty());
}

#[tokio::test]
async fn test_direct_client_cannot_be_called_back() {
    let harness = TestHarness::new();
    let config = config(&harness, SecuritySettings::default());

    let mut callback = harness
        .request("GET", &format!("{CALLBACK}?client_name=HeaderClient"))
        .build();
    let err = CallbackLogic
        .perform(&mut callback, &config, None, &StringAdapter)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Config { .. }));
}

#[tokio::test]
async fn test_missing_client_name_as_server_error() {
    let harness = TestHarness::new();
    let settings = SecuritySettings {
        error_handling: ErrorHandling::ServerError,
        ..SecuritySettings::default()
    };
    let config = config(&harness, settings);

    let mut callback = harness.request("GET", CALLBACK).build();
    let outcome = CallbackLogic
        .perform(&mut callback, &config, None, &StringAdapter)
        .await
        .unwrap();

    assert_eq!(outcome.status(), Some(500));
}
