//! HTTP client for the Modelgrid platform.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::accounting::AccountingClient;
use crate::config::{ClientConfig, ENV_API_KEY, ENV_BASE_URL};
use crate::converter::ConverterClient;
use crate::error::{Error, Result};
use crate::jobs::JobsClient;
use crate::models::ModelsClient;
use crate::results::ResultsClient;
use crate::tags::TagsClient;

/// Client for the Modelgrid API.
///
/// Cheap to clone; clones share the configuration and connection pool.
/// Individual API areas are reached through the scoped accessors:
///
/// ```no_run
/// # async fn run() -> modelgrid_sdk::Result<()> {
/// let client = modelgrid_sdk::Client::builder()
///     .base_url("https://modelgrid.example.com/api")
///     .api_key("my-key-id.my-key-body")
///     .build()?;
/// let job = client.jobs().get("my-job-identifier").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl Client {
    /// Creates a client from a finished configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let mut authorization = HeaderValue::from_str(&config.authorization_value())
            .map_err(|e| Error::config(format!("API key is not a valid header value: {e}")))?;
        authorization.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, authorization);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Returns a builder for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the jobs API.
    pub fn jobs(&self) -> JobsClient {
        JobsClient::new(self.clone())
    }

    /// Returns the job results API.
    pub fn results(&self) -> ResultsClient {
        ResultsClient::new(self.clone())
    }

    /// Returns the model catalog API.
    pub fn models(&self) -> ModelsClient {
        ModelsClient::new(self.clone())
    }

    /// Returns the model tags API.
    pub fn tags(&self) -> TagsClient {
        TagsClient::new(self.clone())
    }

    /// Returns the accounting API.
    pub fn accounting(&self) -> AccountingClient {
        AccountingClient::new(self.clone())
    }

    /// Returns the model converter API.
    pub fn converter(&self) -> ConverterClient {
        ConverterClient::new(self.clone())
    }

    /// Verifies the configured base URL by probing the job features endpoint.
    ///
    /// Deployments serve the API under an `api/` path segment that callers
    /// often leave off. When the probe comes back not-found and the
    /// configured URL does not already end in `api`, the probe is retried
    /// once with `api/` appended and the corrected client is returned. Any
    /// other probe failure is propagated.
    pub async fn discover_base_url(self) -> Result<Self> {
        match self.jobs().features().await {
            Ok(_) => {
                debug!(base_url = %self.config.base_url, "base URL verified");
                Ok(self)
            }
            Err(err) if err.is_not_found() && !self.base_path_ends_with_api() => {
                let mut config = (*self.config).clone();
                config.base_url = config
                    .base_url
                    .join("api/")
                    .map_err(|e| Error::config(format!("cannot extend base URL: {e}")))?;
                warn!(
                    base_url = %config.base_url,
                    "configured base URL was not found, retrying under api/"
                );
                let corrected = Client {
                    http: self.http.clone(),
                    config: Arc::new(config),
                };
                corrected.jobs().features().await?;
                Ok(corrected)
            }
            Err(err) => Err(err),
        }
    }

    fn base_path_ends_with_api(&self) -> bool {
        self.config
            .base_url
            .path()
            .trim_end_matches('/')
            .ends_with("/api")
    }

    /// Resolves an endpoint path against the base URL.
    fn url(&self, path: &str) -> Result<Url> {
        self.config
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::config(format!("invalid request path {path:?}: {e}")))
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        let response = self.dispatch(self.http.get(url.clone()), &url).await?;
        Self::decode(&url, response).await
    }

    pub(crate) async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.url(path)?;
        let request = self.http.get(url.clone()).query(query);
        let response = self.dispatch(request, &url).await?;
        Self::decode(&url, response).await
    }

    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let request = self.http.post(url.clone()).json(body);
        let response = self.dispatch(request, &url).await?;
        Self::decode(&url, response).await
    }

    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        let response = self.dispatch(self.http.post(url.clone()), &url).await?;
        Self::decode(&url, response).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        let response = self.dispatch(self.http.delete(url.clone()), &url).await?;
        Self::decode(&url, response).await
    }

    /// Uploads one chunk as a multipart `input` part. The response body is
    /// ignored beyond the status check.
    pub(crate) async fn post_chunk(&self, path: &str, chunk: Vec<u8>) -> Result<()> {
        let url = self.url(path)?;
        let part = reqwest::multipart::Part::bytes(chunk).file_name("input");
        let form = reqwest::multipart::Form::new().part("input", part);
        let request = self.http.post(url.clone()).multipart(form);
        self.dispatch(request, &url).await?;
        Ok(())
    }

    /// Sends a request and maps transport failures and error statuses.
    async fn dispatch(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| Self::network_error(url, e))?;
        let status = response.status();
        debug!(%url, status = status.as_u16(), "received response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let message = serde_json::from_slice::<Value>(&body)
            .ok()
            .and_then(|body| {
                body.get("message")
                    .and_then(Value::as_str)
                    .map(String::from)
            })
            .unwrap_or_else(|| match status.canonical_reason() {
                Some(reason) => format!("HTTP Error {}: {}", status.as_u16(), reason),
                None => format!("HTTP Error {}", status.as_u16()),
            });
        Err(Error::from_status(status.as_u16(), url.as_str(), message))
    }

    fn network_error(url: &Url, error: reqwest::Error) -> Error {
        let message = if error.is_timeout() {
            "request timed out".to_string()
        } else if error.is_connect() {
            format!("connection failed: {error}")
        } else {
            error.to_string()
        };
        Error::Network {
            url: url.to_string(),
            message,
            source: Some(error),
        }
    }

    async fn decode<T: DeserializeOwned>(url: &Url, response: reqwest::Response) -> Result<T> {
        let body = response.bytes().await.map_err(|e| {
            let message = format!("failed to read response body: {e}");
            Error::Network {
                url: url.to_string(),
                message,
                source: Some(e),
            }
        })?;
        serde_json::from_slice(&body).map_err(|e| Error::InvalidResponse {
            url: url.to_string(),
            message: format!("body does not match the expected shape: {e}"),
        })
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.config.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Client`].
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder seeded from `MODELGRID_BASE_URL` and
    /// `MODELGRID_API_KEY`.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var(ENV_BASE_URL).ok(),
            api_key: std::env::var(ENV_API_KEY).ok(),
            ..Self::default()
        }
    }

    /// Sets the base URL of the platform deployment.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }

    /// Overrides the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the base URL or API key is missing,
    /// empty, or unparseable.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "base URL is required; set it on the builder or via {ENV_BASE_URL}"
                ))
            })?;
        let api_key = self
            .api_key
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "API key is required; set it on the builder or via {ENV_API_KEY}"
                ))
            })?;

        let mut url = Url::parse(base_url.trim())
            .map_err(|e| Error::config(format!("invalid base URL {base_url:?}: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(Error::config(format!(
                "base URL {base_url:?} is not an HTTP(S) URL"
            )));
        }
        // Endpoint paths join under the base, so it must end with a slash.
        if !url.path().ends_with('/') {
            url.set_path(&format!("{}/", url.path()));
        }

        let mut config = ClientConfig::new(url, api_key);
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(connect_timeout) = self.connect_timeout {
            config.connect_timeout = connect_timeout;
        }
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }
        Client::new(config)
    }
}
