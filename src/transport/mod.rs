//! The network seam shared by the credential manager and the dispatcher.

mod options;
mod response;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::trace;

use crate::errors::Error;

pub use options::{Credentials, RequestOptions};
pub use response::Response;

/// Issues a single HTTP call. Redirects, retries and TLS are the
/// implementation's business; this layer never retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &str, options: RequestOptions) -> Result<Response, Error>;
}

/// Default transport backed by a shared `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, url: &str, options: RequestOptions) -> Result<Response, Error> {
        let RequestOptions {
            method,
            headers,
            body,
            // reqwest keeps no cookie jar here, so the credentials mode has nothing to drive.
            credentials: _,
        } = options;
        let method = method.unwrap_or(Method::GET);
        trace!(%method, url, "transport.send");

        let mut builder = self.client.request(method, url);
        if let Some(headers) = headers {
            builder = builder.headers(headers);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let resp = builder.send().await?;
        Ok(Response::from_reqwest(resp))
    }
}
