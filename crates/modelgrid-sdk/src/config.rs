//! Configuration for the Modelgrid client.

use std::time::Duration;

use secrecy::{ExposeSecret, Secret};
use url::Url;

/// Default timeout for a single HTTP request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("modelgrid-sdk-rust/", env!("CARGO_PKG_VERSION"));

/// Environment variable the builder reads the base URL from.
pub const ENV_BASE_URL: &str = "MODELGRID_BASE_URL";

/// Environment variable the builder reads the API key from.
pub const ENV_API_KEY: &str = "MODELGRID_API_KEY";

/// Configuration for the Modelgrid client.
///
/// Built by [`ClientBuilder`](crate::ClientBuilder); the base URL always ends
/// with a trailing slash so relative endpoint paths join underneath it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) api_key: Secret<String>,
    pub(crate) timeout: Duration,
    pub(crate) connect_timeout: Duration,
    pub(crate) user_agent: String,
}

impl ClientConfig {
    /// Creates a configuration with default timeouts.
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            base_url,
            api_key: Secret::new(api_key.into()),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Returns the base URL requests are issued against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the connection timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the user agent string.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Formats the `Authorization` header value for the stored key.
    pub(crate) fn authorization_value(&self) -> String {
        format!("ApiKey {}", self.api_key.expose_secret())
    }
}
