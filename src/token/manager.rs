use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use jiff::{SignedDuration, Timestamp};
use parking_lot::Mutex;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Deserialize;
use tracing::debug;

use crate::errors::Error;
use crate::telemetry::refresh::RefreshTelemetry;
use crate::transport::{Credentials, RequestOptions, Transport};

use super::{Clock, CredentialSource, SystemClock, TokenProvider};

type RefreshOutcome = Result<Option<String>, Arc<Error>>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Body returned by the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenGrant {
    #[serde(default)]
    token: Option<String>,
    /// Expiry as unix epoch milliseconds. When absent the token is handed
    /// out once and treated as already expired, so the next call refetches.
    /// A browser client that stores `undefined` here would instead keep the
    /// token forever; a grant with no stated lifetime is not trusted that long.
    #[serde(default)]
    expire: Option<i64>,
}

struct CredentialState {
    token: Option<String>,
    expires_at: Timestamp,
    /// Set only while a refresh call is outstanding.
    pending: Option<SharedRefresh>,
}

/// Caches a bearer token and refreshes it once expired.
///
/// Concurrent callers that find the token expired while a refresh is in
/// flight await that same refresh, so at most one token request is
/// outstanding at any time.
pub struct CredentialManager {
    source: Arc<CredentialSource>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<CredentialState>>,
}

impl CredentialManager {
    pub fn new(source: CredentialSource, transport: Arc<dyn Transport>) -> Self {
        Self::with_clock(source, transport, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: CredentialSource,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        // Start out expired so the first call always fetches.
        let expires_at = clock.now() - SignedDuration::from_secs(1);
        Self {
            source: Arc::new(source),
            transport,
            clock,
            state: Arc::new(Mutex::new(CredentialState {
                token: None,
                expires_at,
                pending: None,
            })),
        }
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }

    pub fn is_expired(&self) -> bool {
        self.clock.now() >= self.state.lock().expires_at
    }

    pub fn token(&self) -> Option<String> {
        self.state.lock().token.clone()
    }

    pub fn expires_at(&self) -> Timestamp {
        self.state.lock().expires_at
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// Returns the cached token, or refreshes it when expired.
    ///
    /// A refresh failure is returned to every caller awaiting that refresh
    /// and leaves the cached token untouched.
    pub async fn ensure_valid_token(&self) -> Result<Option<String>, Error> {
        let refresh = {
            let mut state = self.state.lock();
            if self.clock.now() < state.expires_at {
                return Ok(state.token.clone());
            }
            match state.pending.clone() {
                Some(pending) => {
                    debug!(endpoint = %self.source.url(), "refresh.join");
                    pending
                }
                None => {
                    let refresh = self.start_refresh();
                    state.pending = Some(refresh.clone());
                    refresh
                }
            }
        };
        refresh.await.map_err(Error::CredentialFetch)
    }

    fn start_refresh(&self) -> SharedRefresh {
        let source = Arc::clone(&self.source);
        let transport = Arc::clone(&self.transport);
        let clock = Arc::clone(&self.clock);
        // Weak: the state owns this future through `pending`.
        let state = Arc::downgrade(&self.state);
        async move {
            let telemetry = RefreshTelemetry::new(source.url());
            telemetry.emit_start(clock.now());
            let fetched = request_grant(&source, transport.as_ref()).await;
            settle(&state, clock.as_ref(), &telemetry, fetched)
        }
        .boxed()
        .shared()
    }
}

#[async_trait]
impl TokenProvider for CredentialManager {
    async fn ensure_valid_token(&self) -> Result<Option<String>, Error> {
        CredentialManager::ensure_valid_token(self).await
    }
}

async fn request_grant(
    source: &CredentialSource,
    transport: &dyn Transport,
) -> Result<TokenGrant, Error> {
    let options = RequestOptions::new()
        .with_method(Method::POST)
        .with_credentials(Credentials::Include)
        .with_header(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        )
        .with_body(source.form_body());
    let resp = transport.send(source.url(), options).await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::CredentialStatus(status, body));
    }
    resp.json().await
}

/// Applies a finished refresh to the shared state and clears the pending slot.
/// A manager dropped mid-refresh still hands the outcome to the waiters.
fn settle(
    state: &Weak<Mutex<CredentialState>>,
    clock: &dyn Clock,
    telemetry: &RefreshTelemetry,
    fetched: Result<TokenGrant, Error>,
) -> RefreshOutcome {
    let granted = evaluate(clock, telemetry, fetched);
    let Some(state) = state.upgrade() else {
        return granted.map(|grant| grant.map(|(token, _)| token));
    };
    let mut state = state.lock();
    state.pending = None;
    match granted? {
        Some((token, expires_at)) => {
            state.token = Some(token.clone());
            state.expires_at = expires_at;
            Ok(Some(token))
        }
        None => Ok(None),
    }
}

fn evaluate(
    clock: &dyn Clock,
    telemetry: &RefreshTelemetry,
    fetched: Result<TokenGrant, Error>,
) -> Result<Option<(String, Timestamp)>, Arc<Error>> {
    let grant = match fetched {
        Ok(grant) => grant,
        Err(err) => {
            telemetry.emit_failure(&err);
            return Err(Arc::new(err));
        }
    };
    let Some(token) = grant.token.filter(|t| !t.is_empty()) else {
        telemetry.emit_empty();
        return Ok(None);
    };
    let expires_at = match grant.expire {
        Some(ms) => match Timestamp::from_millisecond(ms) {
            Ok(at) => at,
            Err(err) => {
                let err = Error::from(err);
                telemetry.emit_failure(&err);
                return Err(Arc::new(err));
            }
        },
        None => clock.now(),
    };
    telemetry.emit_success(expires_at);
    Ok(Some((token, expires_at)))
}
