mod classify;
mod query;

pub use classify::is_absolute_url;
pub use query::{QueryParams, compose};
