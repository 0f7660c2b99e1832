//! Cancellation of in-flight token requests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use mssql_aad_auth::{AcquisitionStage, AuthError, BlockingAuthenticator, SilentOutcome};
use mssql_aad_testing::fixtures::{self, AUTHORITY, COMMON, at};
use mssql_aad_testing::{MockCall, MockClientBuilder, MockClientFactory};
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn test_cancel_during_pending_interactive_sign_in() {
    let factory = Arc::new(MockClientFactory::new(
        MockClientBuilder::new().with_pending_interactive(),
    ));
    let auth = fixtures::authenticator(Arc::clone(&factory));
    let cancel = CancellationToken::new();

    let request = {
        let auth = auth.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            auth.get_token(&fixtures::interactive_params(None), &cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_secs(30)).await;
    cancel.cancel();

    let err = request.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        AuthError::Cancelled {
            stage: AcquisitionStage::Interactive
        }
    ));
    assert!(!err.is_retryable());
    assert_eq!(
        factory.client_for(AUTHORITY, COMMON).unwrap().interactive_calls(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_silent_acquisition_skips_fallback() {
    let factory = Arc::new(MockClientFactory::new(
        MockClientBuilder::new()
            .with_accounts(["alice"])
            .with_silent_outcome(SilentOutcome::InteractionRequired {
                reason: "consent".into(),
            })
            .with_interactive_token("unused", at(0))
            .with_delay(Duration::from_secs(10)),
    ));
    let auth = fixtures::authenticator(Arc::clone(&factory));
    let cancel = CancellationToken::new();

    let request = {
        let auth = auth.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            auth.get_token(&fixtures::interactive_params(Some("alice")), &cancel)
                .await
        })
    };

    // Enumeration takes 10s, so 15s in the silent attempt is in flight.
    tokio::time::sleep(Duration::from_secs(15)).await;
    cancel.cancel();

    let err = request.await.unwrap().unwrap_err();
    assert_eq!(err.stage(), Some(AcquisitionStage::Silent));
    assert!(err.is_cancelled());
    let client = factory.client_for(AUTHORITY, COMMON).unwrap();
    assert_eq!(client.silent_calls(), 1);
    assert_eq!(client.interactive_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_account_enumeration() {
    let factory = Arc::new(MockClientFactory::new(
        MockClientBuilder::new()
            .with_accounts(["alice"])
            .with_silent_token("unused", at(0))
            .with_delay(Duration::from_secs(10)),
    ));
    let auth = fixtures::authenticator(Arc::clone(&factory));
    let cancel = CancellationToken::new();

    let request = {
        let auth = auth.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            auth.get_token(&fixtures::interactive_params(Some("alice")), &cancel)
                .await
        })
    };

    tokio::time::sleep(Duration::from_secs(5)).await;
    cancel.cancel();

    let err = request.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        AuthError::Cancelled {
            stage: AcquisitionStage::Enumeration
        }
    ));
    let client = factory.client_for(AUTHORITY, COMMON).unwrap();
    assert_eq!(client.calls(), vec![MockCall::Accounts]);
}

#[tokio::test]
async fn test_cancelled_before_start_creates_nothing() {
    let factory = Arc::new(MockClientFactory::new(MockClientBuilder::new()));
    let auth = fixtures::authenticator(Arc::clone(&factory));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = auth
        .get_token(&fixtures::interactive_params(Some("alice")), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(factory.attempts(), 0);
}

#[test]
fn test_blocking_facade_unblocks_on_cancel() {
    let factory = Arc::new(MockClientFactory::new(
        MockClientBuilder::new()
            .with_accounts(["alice"])
            .with_pending_interactive(),
    ));
    let auth = BlockingAuthenticator::new(fixtures::authenticator(Arc::clone(&factory))).unwrap();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        trigger.cancel();
    });

    let err = auth
        .get_token_blocking(&fixtures::interactive_params(Some("alice")), &cancel)
        .unwrap_err();
    canceller.join().unwrap();

    assert!(err.is_cancelled());
    // The silent attempt ran and asked for interaction before the prompt hung.
    let client = factory.client_for(AUTHORITY, COMMON).unwrap();
    assert_eq!(client.silent_calls(), 1);
    assert_eq!(client.login_hints(), vec![Some("alice".to_string())]);
}

#[test]
fn test_blocking_facade_returns_token() {
    let factory = Arc::new(MockClientFactory::new(
        MockClientBuilder::new()
            .with_accounts(["alice"])
            .with_silent_token("T1", at(1_900_000_000)),
    ));
    let auth = BlockingAuthenticator::new(fixtures::authenticator(factory)).unwrap();

    let token = auth
        .get_token_blocking(
            &fixtures::interactive_params(Some("alice")),
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(token.token(), "T1");
    assert_eq!(token.expires_on(), at(1_900_000_000));
}
