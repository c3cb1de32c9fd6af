//! Phase ordering under controlled timing.

use std::time::Duration;

use portcullis_core::client::Client;
use portcullis_core::{
    ClientAuthenticator, Outcome, RequestContext, SecuredRoute, SecurityConfig, SecuritySettings,
};
use portcullis_logic::SecurityLogic;

use crate::common::{Journal, StringAdapter, TOKEN_HEADER, TestHarness, header_client_with_delay};

fn slow_client(journal: &Journal) -> Client<String> {
    header_client_with_delay(journal, Some(Duration::from_secs(5)))
}

#[tokio::test(start_paused = true)]
async fn test_validation_completes_before_creation() {
    let journal = Journal::new();
    let client = slow_client(&journal);

    let mut ctx = RequestContext::builder("GET", "http://app.example/")
        .header(TOKEN_HEADER, "Bearer valid-dave")
        .build();
    let profile = ClientAuthenticator::authenticate_for(&client, &mut ctx)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(profile.id(), "valid-dave");
    assert_eq!(
        journal.entries(),
        vec!["extract", "validate:start", "validate:end", "create"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_validation_delays_the_whole_run() {
    let harness = TestHarness::new();
    let config = SecurityConfig::builder(SecuritySettings::default())
        .client(slow_client(&harness.journal))
        .build()
        .unwrap();

    let started = tokio::time::Instant::now();
    let mut ctx = harness
        .request("GET", "http://app.example/api")
        .header(TOKEN_HEADER, "Bearer valid-dave")
        .build();
    let outcome = SecurityLogic
        .perform(&mut ctx, &config, &SecuredRoute::new("HeaderClient"), &StringAdapter, &StringAdapter)
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(outcome, Outcome::Granted("granted:valid-dave".to_string()));
    let create = harness.journal.position("create").unwrap();
    let saved = harness.journal.position("session:set:userProfiles").unwrap();
    assert!(harness.journal.position("validate:end").unwrap() < create);
    assert!(create < saved);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_do_not_share_state() {
    let harness = TestHarness::new();
    let config = SecurityConfig::builder(SecuritySettings::default())
        .client(slow_client(&harness.journal))
        .build()
        .unwrap();
    let route = SecuredRoute::new("HeaderClient");

    let mut first = harness
        .request("GET", "http://app.example/api")
        .header(TOKEN_HEADER, "Bearer valid-erin")
        .build();
    let mut second = harness
        .request("GET", "http://app.example/api")
        .header(TOKEN_HEADER, "Bearer valid-frank")
        .build();

    let (a, b) = futures::join!(
        SecurityLogic.perform(&mut first, &config, &route, &StringAdapter, &StringAdapter),
        SecurityLogic.perform(&mut second, &config, &route, &StringAdapter, &StringAdapter),
    );

    assert_eq!(a.unwrap(), Outcome::Granted("granted:valid-erin".to_string()));
    assert_eq!(b.unwrap(), Outcome::Granted("granted:valid-frank".to_string()));
    // Both validations were in flight at the same time.
    let entries = harness.journal.matching("validate");
    assert_eq!(&entries[..2], &["validate:start".to_string(), "validate:start".to_string()]);
}

#[test]
fn test_chain_can_be_driven_synchronously() {
    let journal = Journal::new();
    let client = header_client_with_delay(&journal, None);
    let mut ctx = RequestContext::builder("GET", "http://app.example/").build();

    let profile = tokio_test::block_on(ClientAuthenticator::authenticate_for(&client, &mut ctx)).unwrap();

    assert!(profile.is_none());
    assert_eq!(journal.entries(), vec!["extract"]);
}
