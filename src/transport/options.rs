use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Mirrors the credentials mode of a browser fetch call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Credentials {
    Omit,
    SameOrigin,
    Include,
}

/// Per-call options handed to a [`Transport`](super::Transport).
///
/// Every field is optional so that two option sets can be layered with
/// [`RequestOptions::merge`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    pub method: Option<Method>,
    pub headers: Option<HeaderMap>,
    pub body: Option<String>,
    pub credentials: Option<Credentials>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Adds one header, creating the header map if needed.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.get_or_insert_with(HeaderMap::new).insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Shallow merge: any field set on `overrides` replaces the one in `self`.
    /// A header map in `overrides` replaces the whole map.
    pub fn merge(self, overrides: RequestOptions) -> RequestOptions {
        RequestOptions {
            method: overrides.method.or(self.method),
            headers: overrides.headers.or(self.headers),
            body: overrides.body.or(self.body),
            credentials: overrides.credentials.or(self.credentials),
        }
    }
}
