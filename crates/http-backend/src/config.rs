use std::time::Duration;

/// The base URL used when none is configured, matching a backend started
/// locally for development.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// The per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Builder for [`BackendConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BackendConfigBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl BackendConfigBuilder {
    /// Creates a builder with every option unset.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom base URL.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the timeout applied to every request.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> BackendConfig {
        let base_url = self
            .base_url
            .map(|url| url.trim().trim_end_matches('/').to_owned())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        BackendConfig {
            base_url,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

/// Configuration for [`crate::HttpBackend`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BackendConfig {
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
}

impl BackendConfig {
    /// Returns the base URL, without a trailing slash.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the per-request timeout.
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[inline]
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for BackendConfig {
    #[inline]
    fn default() -> Self {
        BackendConfigBuilder::new().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.url("/chat"), "http://127.0.0.1:8000/chat");
    }

    #[test]
    fn test_base_url_is_normalized() {
        let config = BackendConfigBuilder::new()
            .with_base_url(" https://chat.example.com/api/ ")
            .with_timeout(Duration::from_secs(5))
            .build();
        assert_eq!(config.url("/chat"), "https://chat.example.com/api/chat");
        assert_eq!(config.timeout(), Duration::from_secs(5));

        let config = BackendConfigBuilder::new().with_base_url("").build();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    }
}
