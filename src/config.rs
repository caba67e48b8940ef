//! read dispatcher and credential configuration from a file or the environment

use std::collections::BTreeMap;
use std::path::Path;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::dispatcher::ClientConfig;
use crate::errors::Error;
use crate::token::CredentialSource;
use crate::transport::RequestOptions;

pub const ENV_BASE_URL: &str = "BEARER_FETCH_BASE_URL";
pub const ENV_TOKEN_URL: &str = "BEARER_FETCH_TOKEN_URL";
pub const ENV_CLIENT_ID: &str = "BEARER_FETCH_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "BEARER_FETCH_CLIENT_SECRET";

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: Option<String>,
    /// Default headers sent with every request.
    pub headers: BTreeMap<String, String>,
    /// Token endpoint; no credential manager is built without it.
    pub token_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Every variable is optional.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var(ENV_BASE_URL).ok(),
            headers: BTreeMap::new(),
            token_url: std::env::var(ENV_TOKEN_URL).ok(),
            client_id: std::env::var(ENV_CLIENT_ID).ok(),
            client_secret: std::env::var(ENV_CLIENT_SECRET).ok(),
        }
    }

    pub fn client_config(&self) -> Result<ClientConfig, Error> {
        let mut options = RequestOptions::new();
        if !self.headers.is_empty() {
            let mut headers = HeaderMap::new();
            for (name, value) in &self.headers {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| Error::Config(format!("Invalid header name '{name}': {e}")))?;
                let value = HeaderValue::from_str(value).map_err(|e| {
                    Error::Config(format!("Invalid value for header '{name}': {e}"))
                })?;
                headers.insert(name, value);
            }
            options = options.with_headers(headers);
        }
        Ok(ClientConfig::new(self.base_url.clone().unwrap_or_default())
            .with_default_options(options))
    }

    pub fn credential_source(&self) -> Option<CredentialSource> {
        let url = self.token_url.as_ref()?;
        Some(CredentialSource::new(
            url.clone(),
            self.client_id.clone().unwrap_or_default(),
            self.client_secret.clone().unwrap_or_default(),
        ))
    }
}
