use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::errors::Error;

#[derive(Debug)]
enum Body {
    /// Not read yet; reading drives the underlying connection.
    Pending(reqwest::Response),
    Buffered(Vec<u8>),
}

/// A transport response whose body is read on demand.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    url: Option<String>,
    body: Body,
}

impl Response {
    pub fn from_reqwest(resp: reqwest::Response) -> Self {
        Self {
            status: resp.status(),
            headers: resp.headers().clone(),
            url: Some(resp.url().to_string()),
            body: Body::Pending(resp),
        }
    }

    /// Builds an already-buffered response, for transports that are not reqwest.
    pub fn from_parts(status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            url: None,
            body: Body::Buffered(body.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub async fn bytes(self) -> Result<Vec<u8>, Error> {
        match self.body {
            Body::Pending(resp) => Ok(resp.bytes().await?.to_vec()),
            Body::Buffered(bytes) => Ok(bytes),
        }
    }

    pub async fn text(self) -> Result<String, Error> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T, Error> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
