use std::fmt;

/// Where and with what client credentials a token is requested.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSource {
    url: String,
    client_id: String,
    client_secret: String,
}

impl CredentialSource {
    /// `client_id` may be a string or a number.
    pub fn new(
        url: impl Into<String>,
        client_id: impl fmt::Display,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            client_id: client_id.to_string(),
            client_secret: client_secret.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The form body posted to the token endpoint: `k=<id>&s=<secret>`.
    pub(crate) fn form_body(&self) -> String {
        format!(
            "k={}&s={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.client_secret)
        )
    }
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSource")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_body_uses_short_keys() {
        let source = CredentialSource::new("http://example.com", 123, "secret");
        assert_eq!(source.form_body(), "k=123&s=secret");
    }

    #[test]
    fn form_body_escapes_reserved_characters() {
        let source = CredentialSource::new("http://example.com", "id", "a&b=c");
        assert_eq!(source.form_body(), "k=id&s=a%26b%3Dc");
    }

    #[test]
    fn debug_hides_the_secret() {
        let source = CredentialSource::new("http://example.com", "id", "hunter2");
        let printed = format!("{source:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }
}
