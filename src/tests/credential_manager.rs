use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde_json::json;

use crate::errors::Error;
use crate::tests::test_support::{FakeTransport, ManualClock, TOKEN_URL, json_response};
use crate::token::{CredentialManager, CredentialSource};
use crate::transport::{Credentials, Response};

fn manager(transport: Arc<FakeTransport>, clock: Arc<ManualClock>) -> CredentialManager {
    CredentialManager::with_clock(
        CredentialSource::new(TOKEN_URL, 123, "secret"),
        transport,
        clock,
    )
}

#[tokio::test(flavor = "current_thread")]
async fn starts_expired_without_a_token() {
    let transport = FakeTransport::new(|_, _| json_response(json!({})));
    let mgr = manager(transport.clone(), ManualClock::at_millis(10_000));

    assert!(mgr.is_expired());
    assert_eq!(mgr.token(), None);
    assert_eq!(mgr.expires_at().as_millisecond(), 9_000);
    assert!(!mgr.is_refreshing());
    assert!(transport.calls().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn refresh_posts_client_credentials_as_form() {
    let transport =
        FakeTransport::new(|_, _| json_response(json!({"token": "newToken", "expire": 20_000})));
    let mgr = manager(transport.clone(), ManualClock::at_millis(10_000));

    assert_eq!(mgr.source().url(), TOKEN_URL);
    assert_eq!(mgr.source().client_id(), "123");
    let token = mgr.ensure_valid_token().await.expect("refresh succeeds");
    assert_eq!(token.as_deref(), Some("newToken"));

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    let (url, options) = &calls[0];
    assert_eq!(url, TOKEN_URL);
    assert_eq!(options.method, Some(Method::POST));
    assert_eq!(options.credentials, Some(Credentials::Include));
    assert_eq!(options.body.as_deref(), Some("k=123&s=secret"));
    assert_eq!(
        options.headers.as_ref().unwrap().get(CONTENT_TYPE).unwrap(),
        "application/x-www-form-urlencoded"
    );

    assert_eq!(mgr.token().as_deref(), Some("newToken"));
    assert_eq!(mgr.expires_at().as_millisecond(), 20_000);
    assert!(!mgr.is_refreshing());
}

#[tokio::test(flavor = "current_thread")]
async fn cached_token_is_reused_until_expiry() {
    let transport =
        FakeTransport::new(|_, _| json_response(json!({"token": "cached", "expire": 20_000})));
    let clock = ManualClock::at_millis(10_000);
    let mgr = manager(transport.clone(), clock.clone());

    mgr.ensure_valid_token().await.unwrap();
    clock.set_millis(19_999);
    assert_eq!(mgr.ensure_valid_token().await.unwrap().as_deref(), Some("cached"));
    assert_eq!(transport.calls().len(), 1);

    clock.set_millis(20_000);
    assert!(mgr.is_expired());
    mgr.ensure_valid_token().await.unwrap();
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn concurrent_callers_share_one_refresh() {
    let transport =
        FakeTransport::new(|_, _| json_response(json!({"token": "shared", "expire": 20_000})));
    let mgr = manager(transport.clone(), ManualClock::at_millis(10_000));

    let (a, b, c) = tokio::join!(
        mgr.ensure_valid_token(),
        mgr.ensure_valid_token(),
        mgr.ensure_valid_token()
    );

    assert_eq!(a.unwrap().as_deref(), Some("shared"));
    assert_eq!(b.unwrap().as_deref(), Some("shared"));
    assert_eq!(c.unwrap().as_deref(), Some("shared"));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn missing_token_resolves_none_and_clears_pending() {
    let transport = FakeTransport::new(|_, _| json_response(json!({"foo": "bar"})));
    let mgr = manager(transport.clone(), ManualClock::at_millis(10_000));

    assert_eq!(mgr.ensure_valid_token().await.unwrap(), None);
    assert!(!mgr.is_refreshing());
    assert_eq!(mgr.token(), None);

    // Still expired, so the next call asks again instead of replaying `None`.
    assert_eq!(mgr.ensure_valid_token().await.unwrap(), None);
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn empty_token_counts_as_missing() {
    let transport =
        FakeTransport::new(|_, _| json_response(json!({"token": "", "expire": 20_000})));
    let mgr = manager(transport, ManualClock::at_millis(10_000));

    assert_eq!(mgr.ensure_valid_token().await.unwrap(), None);
    assert!(mgr.is_expired());
}

#[tokio::test(flavor = "current_thread")]
async fn failure_reaches_every_joined_caller() {
    let transport = FakeTransport::new(|_, _| Err(Error::Config("simulated outage".into())));
    let mgr = manager(transport.clone(), ManualClock::at_millis(10_000));

    let (a, b) = tokio::join!(mgr.ensure_valid_token(), mgr.ensure_valid_token());
    for result in [a, b] {
        let err = result.expect_err("refresh must fail");
        match err.credential_cause() {
            Some(Error::Config(msg)) => assert!(msg.contains("simulated")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(transport.calls().len(), 1);
    assert!(!mgr.is_refreshing());
}

#[tokio::test(flavor = "current_thread")]
async fn failure_keeps_previous_token_and_allows_retry() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let transport = FakeTransport::new({
        let attempts = attempts.clone();
        move |_, _| match attempts.fetch_add(1, Ordering::SeqCst) {
            0 => json_response(json!({"token": "first", "expire": 20_000})),
            1 => Err(Error::Config("simulated outage".into())),
            _ => json_response(json!({"token": "second", "expire": 40_000})),
        }
    });
    let clock = ManualClock::at_millis(10_000);
    let mgr = manager(transport.clone(), clock.clone());

    mgr.ensure_valid_token().await.unwrap();
    clock.set_millis(25_000);
    assert!(mgr.ensure_valid_token().await.is_err());
    assert_eq!(mgr.token().as_deref(), Some("first"));
    assert_eq!(mgr.expires_at().as_millisecond(), 20_000);

    assert_eq!(mgr.ensure_valid_token().await.unwrap().as_deref(), Some("second"));
    assert_eq!(transport.calls().len(), 3);
}

#[tokio::test(flavor = "current_thread")]
async fn error_status_is_a_fetch_failure() {
    let transport = FakeTransport::new(|_, _| {
        Ok(Response::from_parts(
            StatusCode::UNAUTHORIZED,
            Default::default(),
            "bad client",
        ))
    });
    let mgr = manager(transport, ManualClock::at_millis(10_000));

    let err = mgr.ensure_valid_token().await.unwrap_err();
    match err.credential_cause() {
        Some(Error::CredentialStatus(status, body)) => {
            assert_eq!(*status, StatusCode::UNAUTHORIZED);
            assert_eq!(body, "bad client");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn malformed_body_is_a_fetch_failure() {
    let transport = FakeTransport::new(|_, _| {
        Ok(Response::from_parts(
            StatusCode::OK,
            Default::default(),
            "<html>",
        ))
    });
    let mgr = manager(transport, ManualClock::at_millis(10_000));

    let err = mgr.ensure_valid_token().await.unwrap_err();
    assert!(matches!(err.credential_cause(), Some(Error::Json(_))));
    assert!(!mgr.is_refreshing());
}

#[tokio::test(flavor = "current_thread")]
async fn token_without_expiry_is_refetched() {
    let transport = FakeTransport::new(|_, _| json_response(json!({"token": "once"})));
    let clock = ManualClock::at_millis(10_000);
    let mgr = manager(transport.clone(), clock.clone());

    assert_eq!(mgr.ensure_valid_token().await.unwrap().as_deref(), Some("once"));
    clock.advance_millis(1);
    mgr.ensure_valid_token().await.unwrap();
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn abandoned_refresh_is_resumed_by_the_next_caller() {
    let transport =
        FakeTransport::new(|_, _| json_response(json!({"token": "resumed", "expire": 20_000})));
    let mgr = manager(transport.clone(), ManualClock::at_millis(10_000));

    {
        let first = mgr.ensure_valid_token();
        tokio::pin!(first);
        // Poll once so the refresh starts, then drop the only waiter.
        assert!(futures::poll!(first.as_mut()).is_pending());
    }
    assert!(mgr.is_refreshing());

    assert_eq!(mgr.ensure_valid_token().await.unwrap().as_deref(), Some("resumed"));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn dropping_the_manager_releases_an_abandoned_refresh() {
    let transport =
        FakeTransport::new(|_, _| json_response(json!({"token": "never", "expire": 20_000})));
    let mgr = manager(transport.clone(), ManualClock::at_millis(10_000));

    {
        let first = mgr.ensure_valid_token();
        tokio::pin!(first);
        assert!(futures::poll!(first.as_mut()).is_pending());
    }
    assert!(mgr.is_refreshing());
    // The manager and the parked refresh future each hold the transport.
    assert!(Arc::strong_count(&transport) >= 3);

    drop(mgr);
    assert_eq!(Arc::strong_count(&transport), 1);
}
