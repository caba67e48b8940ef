use std::sync::Arc;

use reqwest::Method;
use tracing::{debug, warn};

use crate::{
    RequestDispatcher,
    config::Config,
    dispatcher::{ClientConfig, Reply},
    errors::Error,
    request_context::{Authorization, RequestContext},
    token::{CredentialManager, TokenProvider},
    transport::{ReqwestTransport, RequestOptions, Transport},
    urls::{QueryParams, compose, is_absolute_url},
};

impl RequestDispatcher {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        token_provider: Option<Arc<dyn TokenProvider>>,
    ) -> Self {
        Self {
            config,
            transport,
            token_provider,
        }
    }

    /// A dispatcher over a default `reqwest::Client` with no token provider.
    pub fn with_reqwest(config: ClientConfig) -> Self {
        Self::new(config, Arc::new(ReqwestTransport::default()), None)
    }

    /// Wires a reqwest transport and, when `token_url` is set, a credential
    /// manager sharing that transport.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::default());
        let token_provider = config.credential_source().map(|source| {
            Arc::new(CredentialManager::new(source, Arc::clone(&transport)))
                as Arc<dyn TokenProvider>
        });
        Ok(Self::new(config.client_config()?, transport, token_provider))
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn default_options(&self) -> &RequestOptions {
        &self.config.default_options
    }

    pub fn has_credential_manager(&self) -> bool {
        self.token_provider.is_some()
    }

    /// Replaces the token provider; `None` removes it.
    pub fn set_credential_manager(&mut self, token_provider: Option<Arc<dyn TokenProvider>>) {
        self.token_provider = token_provider;
    }

    /// Prepends the base url unless `url` is already absolute.
    pub fn normalize_url(&self, url: &str) -> Result<String, Error> {
        if url.is_empty() {
            return Err(Error::InvalidArgument("Not valid url given".into()));
        }
        if is_absolute_url(url) {
            Ok(url.to_string())
        } else {
            Ok(format!("{}{}", self.config.base_url, url))
        }
    }

    /// Runs the credential step. Refresh failures never escape: the request
    /// just goes out without an Authorization header.
    pub async fn authorize(&self) -> Authorization {
        let Some(provider) = self.token_provider.as_ref() else {
            return Authorization::Unconfigured;
        };
        match provider.ensure_valid_token().await {
            Ok(Some(token)) => Authorization::Bearer(token),
            Ok(None) => Authorization::Anonymous,
            Err(err) => {
                warn!(error = %err, "token refresh failed; sending request unauthenticated");
                Authorization::Anonymous
            }
        }
    }

    /// Awaits the credential step, then builds the url and issues the call.
    ///
    /// With `parse` the JSON body is returned, otherwise the raw response.
    /// Transport and parse failures propagate unchanged.
    pub async fn perform_request(
        &self,
        url: &str,
        params: &QueryParams,
        options: RequestOptions,
        method: Method,
        parse: bool,
    ) -> Result<Reply, Error> {
        if url.is_empty() {
            return Err(Error::InvalidArgument("Not valid url given".into()));
        }
        let auth = self.authorize().await;
        let full_url = self.normalize_url(&compose(url, params))?;
        let ctx = RequestContext::build(
            full_url,
            &self.config.default_options,
            &auth,
            options,
            method,
        );
        let (url, options) = ctx.into_parts();
        debug!(method = ?options.method, url = %url, "request.dispatch");

        let resp = self.transport.send(&url, options).await?;
        if parse {
            Ok(Reply::Json(resp.json().await?))
        } else {
            Ok(Reply::Raw(resp))
        }
    }

    pub async fn get(
        &self,
        url: &str,
        params: &QueryParams,
        options: RequestOptions,
        parse: bool,
    ) -> Result<Reply, Error> {
        self.perform_request(url, params, options, Method::GET, parse)
            .await
    }

    pub async fn post(
        &self,
        url: &str,
        params: &QueryParams,
        options: RequestOptions,
        parse: bool,
    ) -> Result<Reply, Error> {
        self.perform_request(url, params, options, Method::POST, parse)
            .await
    }

    pub async fn put(
        &self,
        url: &str,
        params: &QueryParams,
        options: RequestOptions,
        parse: bool,
    ) -> Result<Reply, Error> {
        self.perform_request(url, params, options, Method::PUT, parse)
            .await
    }

    pub async fn head(
        &self,
        url: &str,
        params: &QueryParams,
        options: RequestOptions,
        parse: bool,
    ) -> Result<Reply, Error> {
        self.perform_request(url, params, options, Method::HEAD, parse)
            .await
    }

    pub async fn delete(
        &self,
        url: &str,
        params: &QueryParams,
        options: RequestOptions,
        parse: bool,
    ) -> Result<Reply, Error> {
        self.perform_request(url, params, options, Method::DELETE, parse)
            .await
    }
}
