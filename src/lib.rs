mod config;
mod dispatcher;
mod errors;
mod request_context;
pub mod telemetry;
pub mod token;
pub mod transport;
pub mod urls;

pub use config::{Config, ENV_BASE_URL, ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_TOKEN_URL};
pub use dispatcher::{ClientConfig, Reply, RequestDispatcher};
pub use errors::Error;
pub use request_context::{Authorization, RequestContext};
pub use token::{CredentialManager, CredentialSource, TokenProvider};

#[cfg(test)]
mod tests;
