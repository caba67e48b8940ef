#![allow(dead_code)]

use std::sync::Arc;

use bearer_fetch::transport::{ReqwestTransport, Transport};
use bearer_fetch::{ClientConfig, CredentialManager, CredentialSource, RequestDispatcher, TokenProvider};
use jiff::Timestamp;
use wiremock::MockServer;

pub fn expire_in_millis(ms: i64) -> i64 {
    Timestamp::now().as_millisecond() + ms
}

pub fn manager_for(server: &MockServer, transport: Arc<dyn Transport>) -> Arc<CredentialManager> {
    Arc::new(CredentialManager::new(
        CredentialSource::new(format!("{}/auth/refresh", server.uri()), 22, "secret"),
        transport,
    ))
}

pub fn dispatcher_for(server: &MockServer, with_tokens: bool) -> RequestDispatcher {
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::default());
    let provider = with_tokens
        .then(|| manager_for(server, Arc::clone(&transport)) as Arc<dyn TokenProvider>);
    RequestDispatcher::new(ClientConfig::new(server.uri()), transport, provider)
}
