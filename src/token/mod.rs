mod clock;
mod manager;
mod source;

use async_trait::async_trait;

use crate::errors::Error;

pub use clock::{Clock, SystemClock};
pub use manager::CredentialManager;
pub use source::CredentialSource;

/// Anything that can hand out a bearer token on demand.
///
/// `Ok(None)` means the provider is configured but has no token to offer.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn ensure_valid_token(&self) -> Result<Option<String>, Error>;
}
