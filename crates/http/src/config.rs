use std::fmt::{self, Debug};
use std::sync::Arc;

/// A source of the bearer token sent with every request.
///
/// The token is asked for on each request, so implementations may rotate
/// it without rebuilding the clients.
pub trait TokenProvider: Send + Sync {
    /// Returns the current token, or `None` to send the request without
    /// authorization.
    fn token(&self) -> Option<String>;
}

/// A token that never changes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct StaticToken(String);

impl StaticToken {
    /// Creates the provider.
    #[inline]
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self(token.into())
    }
}

impl TokenProvider for StaticToken {
    #[inline]
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

impl Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StaticToken").field(&"<redacted>").finish()
    }
}

/// Builder for [`ApiConfig`].
#[derive(Clone)]
pub struct ApiConfigBuilder {
    base_url: String,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl ApiConfigBuilder {
    /// Creates a builder for the API at `base_url`.
    #[inline]
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            token_provider: None,
        }
    }

    /// Authorizes requests with a fixed token.
    #[inline]
    pub fn with_token<S: Into<String>>(self, token: S) -> Self {
        self.with_token_provider(Arc::new(StaticToken::new(token)))
    }

    /// Authorizes requests with tokens from `provider`.
    #[inline]
    pub fn with_token_provider(
        mut self,
        provider: Arc<dyn TokenProvider>,
    ) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.trim_end_matches('/').to_owned(),
            token_provider: self.token_provider,
        }
    }
}

impl Debug for ApiConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfigBuilder")
            .field("base_url", &self.base_url)
            .field("token_provider", &redacted(&self.token_provider))
            .finish()
    }
}

/// Configuration shared by the clients of the planbook API.
#[derive(Clone)]
pub struct ApiConfig {
    pub(crate) base_url: String,
    pub(crate) token_provider: Option<Arc<dyn TokenProvider>>,
}

impl ApiConfig {
    /// Returns the base URL, without a trailing slash.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[inline]
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub(crate) fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> reqwest::RequestBuilder {
        match self.token_provider.as_ref().and_then(|p| p.token()) {
            Some(token) => builder.bearer_auth(token),
            None => {
                trace!("sending request without a token");
                builder
            }
        }
    }
}

impl Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token_provider", &redacted(&self.token_provider))
            .finish()
    }
}

#[inline]
fn redacted(provider: &Option<Arc<dyn TokenProvider>>) -> Option<&'static str> {
    provider.as_ref().map(|_| "<redacted>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let config = ApiConfigBuilder::with_base_url("http://localhost:8000/")
            .with_token("s3cret")
            .build();
        assert_eq!(config.base_url(), "http://localhost:8000");
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"), "{debug}");
        assert!(debug.contains("<redacted>"));
        assert!(!format!("{:?}", StaticToken::new("s3cret")).contains("s3cret"));
    }
}
