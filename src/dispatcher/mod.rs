use std::sync::Arc;

use serde_json::Value;

use crate::token::TokenProvider;
use crate::transport::{RequestOptions, Response, Transport};

mod impls;

/// Immutable dispatcher configuration.
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    /// Prepended to relative urls. Empty means relative urls are sent as given.
    pub base_url: String,
    pub default_options: RequestOptions,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            default_options: RequestOptions::default(),
        }
    }

    pub fn with_default_options(mut self, options: RequestOptions) -> Self {
        self.default_options = options;
        self
    }
}

/// What a dispatched request hands back.
#[derive(Debug)]
pub enum Reply {
    Json(Value),
    /// The untouched transport response; its body has not been read.
    Raw(Response),
}

impl Reply {
    pub fn into_json(self) -> Option<Value> {
        match self {
            Reply::Json(value) => Some(value),
            Reply::Raw(_) => None,
        }
    }

    pub fn into_raw(self) -> Option<Response> {
        match self {
            Reply::Raw(resp) => Some(resp),
            Reply::Json(_) => None,
        }
    }
}

/// Builds urls, attaches the bearer token and issues HTTP verbs.
pub struct RequestDispatcher {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    token_provider: Option<Arc<dyn TokenProvider>>,
}
