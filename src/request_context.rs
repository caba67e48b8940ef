use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::warn;

use crate::transport::RequestOptions;

/// Outcome of the credential step for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Authorization {
    /// No token provider; default headers are sent as configured.
    Unconfigured,
    Bearer(String),
    /// A provider is configured but produced no token, or failed.
    Anonymous,
}

/// Options for a single dispatch, built fresh for every call from the
/// dispatcher's immutable defaults.
#[derive(Clone, Debug)]
pub struct RequestContext {
    url: String,
    options: RequestOptions,
}

impl RequestContext {
    pub fn build(
        url: String,
        defaults: &RequestOptions,
        auth: &Authorization,
        overrides: RequestOptions,
        method: Method,
    ) -> Self {
        let mut base = defaults.clone();
        match auth {
            Authorization::Unconfigured => {}
            Authorization::Bearer(token) => match bearer_value(token) {
                Some(value) => {
                    base.headers
                        .get_or_insert_with(HeaderMap::new)
                        .insert(AUTHORIZATION, value);
                }
                None => {
                    warn!("token is not a valid header value; sending request unauthenticated");
                    strip_authorization(&mut base);
                }
            },
            Authorization::Anonymous => strip_authorization(&mut base),
        }
        Self {
            url,
            options: base.merge(overrides).with_method(method),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn into_parts(self) -> (String, RequestOptions) {
        (self.url, self.options)
    }
}

fn bearer_value(token: &str) -> Option<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).ok()?;
    value.set_sensitive(true);
    Some(value)
}

fn strip_authorization(options: &mut RequestOptions) {
    if let Some(headers) = options.headers.as_mut() {
        headers.remove(AUTHORIZATION);
    }
}
