//! Concurrent use of the authority registry and authenticator.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Barrier};
use std::time::Duration;

use mssql_aad_auth::{AuthorityRegistry, AuthenticatorConfig, IdentityClient};
use mssql_aad_testing::fixtures::{self, AUTHORITY, COMMON, at};
use mssql_aad_testing::{MockClientBuilder, MockClientFactory};
use tokio_util::sync::CancellationToken;

const CALLERS: usize = 16;

#[test]
fn test_racing_first_use_constructs_one_client() {
    let factory = Arc::new(
        MockClientFactory::new(MockClientBuilder::new())
            .with_construction_delay(Duration::from_millis(20)),
    );
    let registry = Arc::new(AuthorityRegistry::new(Arc::clone(&factory) as _));
    let identity = AuthenticatorConfig::default();
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let identity = identity.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                registry.get_or_create(AUTHORITY, COMMON, &identity).unwrap()
            })
        })
        .collect();

    let clients: Vec<Arc<dyn IdentityClient>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(factory.attempts(), 1);
    assert_eq!(factory.creations(), 1);
    assert_eq!(registry.len(), 1);
    let first = &clients[0];
    assert!(clients.iter().all(|c| Arc::ptr_eq(c, first)));
    let published = registry.get(AUTHORITY, COMMON).unwrap();
    assert!(Arc::ptr_eq(&published, first));
}

#[test]
fn test_distinct_keys_race_independently() {
    let factory = Arc::new(MockClientFactory::new(MockClientBuilder::new()));
    let registry = Arc::new(AuthorityRegistry::new(Arc::clone(&factory) as _));
    let identity = AuthenticatorConfig::default();
    let audiences = ["common", "organizations", "contoso", "fabrikam"];

    let handles: Vec<_> = (0..CALLERS)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let identity = identity.clone();
            let audience = audiences[i % audiences.len()];
            std::thread::spawn(move || {
                registry
                    .get_or_create(AUTHORITY, audience, &identity)
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), audiences.len());
    assert_eq!(factory.creations(), audiences.len());
    for audience in audiences {
        assert!(factory.client_for(AUTHORITY, audience).is_some());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_token_requests_share_one_client() {
    let factory = Arc::new(
        MockClientFactory::new(
            MockClientBuilder::new()
                .with_accounts(["alice", "bob"])
                .with_interactive_token("T", at(1_900_000_000))
                .with_delay(Duration::from_millis(5)),
        )
        .with_construction_delay(Duration::from_millis(10)),
    );
    let auth = fixtures::authenticator(Arc::clone(&factory));

    let tasks: Vec<_> = (0..CALLERS)
        .map(|i| {
            let auth = auth.clone();
            let username = if i % 2 == 0 { "alice" } else { "bob" };
            tokio::spawn(async move {
                auth.get_token(
                    &fixtures::interactive_params(Some(username)),
                    &CancellationToken::new(),
                )
                .await
            })
        })
        .collect();

    for task in tasks {
        let token = task.await.unwrap().unwrap();
        assert_eq!(token.token(), "T");
    }

    assert_eq!(factory.creations(), 1);
    let client = factory.client_for(AUTHORITY, COMMON).unwrap();
    // No silent outcome is scripted, so every request was offered silent
    // acquisition first and then fell back exactly once.
    assert_eq!(client.silent_calls(), CALLERS);
    assert_eq!(client.interactive_calls(), CALLERS);
}
