//! Local and central logout.

use portcullis_core::{
    Outcome, ProfileManager, RequestContext, SecurityConfig, SecuritySettings, UserProfile,
};
use portcullis_logic::LogoutLogic;

use crate::common::{IDP_LOGOUT, StringAdapter, TestHarness, header_client, idp_client};

fn config(harness: &TestHarness, settings: SecuritySettings) -> SecurityConfig {
    SecurityConfig::builder(SecuritySettings {
        callback_url: Some("https://app.example/callback".to_string()),
        ..settings
    })
    .client(idp_client(&harness.journal))
    .client(header_client(&harness.journal))
    .build()
    .unwrap()
}

fn profile(id: &str, client: &str) -> UserProfile {
    let mut profile = UserProfile::new(id);
    profile.set_client_name(client);
    profile
}

/// A request whose session holds `profiles`.
async fn logged_in(harness: &TestHarness, profiles: &[UserProfile], url: &str) -> RequestContext {
    let mut login = harness.request("GET", "https://app.example/").build();
    for p in profiles {
        ProfileManager::new(&mut login)
            .save(true, p.clone(), true)
            .await
            .unwrap();
    }
    login.follow_up("GET", url).build()
}

async fn profiles_after(ctx: &RequestContext) -> Vec<UserProfile> {
    let mut next = ctx.follow_up("GET", "https://app.example/").build();
    ProfileManager::new(&mut next).get_all(true).await.unwrap()
}

#[tokio::test]
async fn test_local_logout_to_allowed_url() {
    let harness = TestHarness::new();
    let config = config(&harness, SecuritySettings::default());
    let mut ctx = logged_in(&harness, &[profile("jo", "IdpClient")], "https://app.example/logout?url=/bye").await;

    let outcome = LogoutLogic
        .perform(&mut ctx, &config, &StringAdapter)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Redirect {
            location: "/bye".to_string(),
            response: "302 /bye".to_string(),
        }
    );
    assert!(profiles_after(&ctx).await.is_empty());
    assert!(harness.journal.matching("session:destroy").is_empty());
}

#[tokio::test]
async fn test_disallowed_url_falls_back_to_default() {
    let harness = TestHarness::new();
    let config = config(&harness, SecuritySettings::default());
    let mut ctx = harness
        .request("GET", "https://app.example/logout?url=https://evil.example/")
        .build();

    let outcome = LogoutLogic
        .perform(&mut ctx, &config, &StringAdapter)
        .await
        .unwrap();

    assert_eq!(ctx.response_header("Location"), Some("/"));
    assert_eq!(outcome.status(), Some(302));
}

#[tokio::test]
async fn test_no_default_url_answers_ok() {
    let harness = TestHarness::new();
    let settings = SecuritySettings {
        default_url: String::new(),
        ..SecuritySettings::default()
    };
    let config = config(&harness, settings);
    let mut ctx = harness.request("GET", "https://app.example/logout").build();

    let outcome = LogoutLogic
        .perform(&mut ctx, &config, &StringAdapter)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Status {
            code: 200,
            response: "200 logged out".to_string(),
        }
    );
}

#[tokio::test]
async fn test_logout_destroys_session_when_configured() {
    let harness = TestHarness::new();
    let settings = SecuritySettings {
        destroy_session: true,
        ..SecuritySettings::default()
    };
    let config = config(&harness, settings);
    let mut ctx = logged_in(&harness, &[profile("kim", "HeaderClient")], "https://app.example/logout").await;

    let outcome = LogoutLogic
        .perform(&mut ctx, &config, &StringAdapter)
        .await
        .unwrap();

    assert_eq!(outcome.status(), Some(302));
    assert_eq!(harness.journal.matching("session:destroy").len(), 1);
    assert!(profiles_after(&ctx).await.is_empty());
}

#[tokio::test]
async fn test_single_profile_kept_without_local_logout() {
    let harness = TestHarness::new();
    let settings = SecuritySettings {
        local_logout: false,
        ..SecuritySettings::default()
    };
    let config = config(&harness, settings);
    let mut ctx = logged_in(&harness, &[profile("lou", "HeaderClient")], "https://app.example/logout").await;

    LogoutLogic
        .perform(&mut ctx, &config, &StringAdapter)
        .await
        .unwrap();

    assert_eq!(profiles_after(&ctx).await.len(), 1);
}

#[tokio::test]
async fn test_several_profiles_always_logged_out_locally() {
    let harness = TestHarness::new();
    let settings = SecuritySettings {
        local_logout: false,
        ..SecuritySettings::default()
    };
    let config = config(&harness, settings);
    let held = [profile("max", "HeaderClient"), profile("max", "IdpClient")];
    let mut ctx = logged_in(&harness, &held, "https://app.example/logout").await;

    LogoutLogic
        .perform(&mut ctx, &config, &StringAdapter)
        .await
        .unwrap();

    assert!(profiles_after(&ctx).await.is_empty());
}

#[tokio::test]
async fn test_central_logout_goes_through_identity_provider() {
    let harness = TestHarness::new();
    let settings = SecuritySettings {
        central_logout: true,
        logout_url_pattern: r"https://app\.example/.*".to_string(),
        ..SecuritySettings::default()
    };
    let config = config(&harness, settings);
    let held = [profile("nia", "HeaderClient"), profile("nia", "IdpClient")];
    let mut ctx = logged_in(
        &harness,
        &held,
        "https://app.example/logout?url=https://app.example/bye",
    )
    .await;

    let outcome = LogoutLogic
        .perform(&mut ctx, &config, &StringAdapter)
        .await
        .unwrap();

    let expected = format!("{IDP_LOGOUT}?user=nia&target=https://app.example/bye");
    assert_eq!(outcome.status(), Some(302));
    assert_eq!(ctx.response_header("Location"), Some(expected.as_str()));
}

#[tokio::test]
async fn test_central_logout_drops_relative_targets() {
    let harness = TestHarness::new();
    let settings = SecuritySettings {
        central_logout: true,
        ..SecuritySettings::default()
    };
    let config = config(&harness, settings);
    let mut ctx = logged_in(&harness, &[profile("oz", "IdpClient")], "https://app.example/logout?url=/bye").await;

    LogoutLogic
        .perform(&mut ctx, &config, &StringAdapter)
        .await
        .unwrap();

    let expected = format!("{IDP_LOGOUT}?user=oz");
    assert_eq!(ctx.response_header("Location"), Some(expected.as_str()));
}
