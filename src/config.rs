use std::time::Duration;

use url::Url;

/// Default base URL for the BigPanda Resources API (maintenance plans,
/// mapping enrichments).
pub const DEFAULT_RESOURCES_URL: &str = "https://api.bigpanda.io/resources/";

/// Default base URL for the BigPanda Open Integration Manager API.
pub const DEFAULT_OIM_URL: &str = "https://integrations.bigpanda.io/oim/api/";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for a [`BigPandaClient`](crate::BigPandaClient)
///
/// The configuration is immutable once the client is constructed. Callers
/// that need to talk to BigPanda with different credentials (for example
/// an API key for the Resources API and an org token for OIM) build one
/// client per token.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bearer token sent in the `Authorization` header of every request
    pub api_key: String,
    /// Base URL of the Resources API
    pub resources_url: Url,
    /// Base URL of the OIM API
    pub oim_url: Url,
    /// Request timeout
    pub timeout: Duration,
    /// Wait between enrichment-job status polls
    pub poll_interval: Duration,
    /// Maximum number of status polls before giving up
    ///
    /// `None` polls until the job reaches a terminal status, which matches
    /// the upstream API contract but blocks indefinitely on a stuck job.
    pub max_poll_attempts: Option<u32>,
}

impl ClientConfig {
    /// Create a configuration with the production endpoints and default
    /// timings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            resources_url: Url::parse(DEFAULT_RESOURCES_URL).expect("valid default URL"),
            oim_url: Url::parse(DEFAULT_OIM_URL).expect("valid default URL"),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: None,
        }
    }

    /// Start building a configuration with non-default endpoints or timings
    pub fn builder(api_key: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(api_key)
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a builder seeded with the defaults of [`ClientConfig::new`]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            config: ClientConfig::new(api_key),
        }
    }

    /// Override the Resources API base URL
    pub fn resources_url(mut self, url: Url) -> Self {
        self.config.resources_url = ensure_trailing_slash(url);
        self
    }

    /// Override the OIM API base URL
    pub fn oim_url(mut self, url: Url) -> Self {
        self.config.oim_url = ensure_trailing_slash(url);
        self
    }

    /// Override the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Override the wait between job status polls
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Cap the number of job status polls
    pub fn max_poll_attempts(mut self, attempts: u32) -> Self {
        self.config.max_poll_attempts = Some(attempts);
        self
    }

    /// Finish building
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

// Relative joins silently replace the last path segment when the base
// lacks a trailing slash.
fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("token");
        assert_eq!(config.api_key, "token");
        assert_eq!(config.resources_url.as_str(), DEFAULT_RESOURCES_URL);
        assert_eq!(config.oim_url.as_str(), DEFAULT_OIM_URL);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_poll_attempts, None);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::builder("token")
            .resources_url(Url::parse("http://localhost:8080/api").unwrap())
            .poll_interval(Duration::from_millis(10))
            .max_poll_attempts(3)
            .build();

        assert_eq!(config.resources_url.as_str(), "http://localhost:8080/api/");
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert_eq!(config.max_poll_attempts, Some(3));
    }

    #[test]
    fn test_trailing_slash_preserved() {
        let config = ClientConfig::builder("token")
            .oim_url(Url::parse("http://localhost:8080/oim/api/").unwrap())
            .build();
        assert_eq!(config.oim_url.as_str(), "http://localhost:8080/oim/api/");
    }
}
