//! Model converter operations.
//!
//! The converter imports externally trained models (SageMaker, MLflow,
//! Azure) into the platform from artifacts staged in cloud blob storage.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument};

use crate::client::Client;
use crate::error::{Error, Result};

/// Default deadline for [`ConverterClient::block_until_complete`].
/// Conversions build container images, so this is far longer than the job
/// polling default.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(600);

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Statuses a conversion reports while still making progress.
const NON_TERMINAL_STATUSES: [&str; 4] = ["BUSY", "IMAGE_CREATION", "IMPORTER_PROC", "ASSERTION"];

/// Parameters for starting a model conversion.
///
/// The body is sent with snake_case keys, unlike the rest of the API. The
/// registry fields are only meaningful for the `azure` platform and are
/// omitted when unset.
#[derive(Clone, Serialize)]
pub struct ConverterJob {
    /// Access key for the blob storage holding the artifacts.
    pub sp_access_key_id: String,
    /// Secret key for the blob storage holding the artifacts.
    pub sp_secret_access_key: String,
    /// Blob container name.
    pub blobstore_container: String,
    /// Path of the weights archive within the container.
    pub weights_path: String,
    /// Path of the resources archive within the container.
    pub resource_path: String,
    /// Kind of model being converted.
    pub model_type: String,
    /// Provider the artifacts came from: `sagemaker`, `mlflow` or `azure`.
    pub platform: String,
    /// Cloud provider of the blob storage: `gcp`, `azure` or `S3`.
    pub blobstore_provider: String,
    /// Azure base image registry location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_image_registry: Option<String>,
    /// Azure registry user name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_image_registry_user: Option<String>,
    /// Azure registry password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_image_registry_pass: Option<String>,
}

impl ConverterJob {
    /// Creates a conversion request for a non-Azure platform.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sp_access_key_id: impl Into<String>,
        sp_secret_access_key: impl Into<String>,
        blobstore_container: impl Into<String>,
        weights_path: impl Into<String>,
        resource_path: impl Into<String>,
        model_type: impl Into<String>,
        platform: impl Into<String>,
        blobstore_provider: impl Into<String>,
    ) -> Self {
        Self {
            sp_access_key_id: sp_access_key_id.into(),
            sp_secret_access_key: sp_secret_access_key.into(),
            blobstore_container: blobstore_container.into(),
            weights_path: weights_path.into(),
            resource_path: resource_path.into(),
            model_type: model_type.into(),
            platform: platform.into(),
            blobstore_provider: blobstore_provider.into(),
            base_image_registry: None,
            base_image_registry_user: None,
            base_image_registry_pass: None,
        }
    }

    /// Attaches the Azure base image registry credentials.
    pub fn with_azure_registry(
        mut self,
        registry: impl Into<String>,
        user: impl Into<String>,
        pass: impl Into<String>,
    ) -> Self {
        self.base_image_registry = Some(registry.into());
        self.base_image_registry_user = Some(user.into());
        self.base_image_registry_pass = Some(pass.into());
        self
    }
}

impl fmt::Debug for ConverterJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterJob")
            .field("sp_access_key_id", &self.sp_access_key_id)
            .field("sp_secret_access_key", &"<redacted>")
            .field("blobstore_container", &self.blobstore_container)
            .field("weights_path", &self.weights_path)
            .field("resource_path", &self.resource_path)
            .field("model_type", &self.model_type)
            .field("platform", &self.platform)
            .field("blobstore_provider", &self.blobstore_provider)
            .field("base_image_registry", &self.base_image_registry)
            .field("base_image_registry_user", &self.base_image_registry_user)
            .field("base_image_registry_pass", &"<redacted>")
            .finish()
    }
}

/// Acknowledgement returned when a conversion is started.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverterReceipt {
    /// Identifier for polling the conversion status.
    #[serde(default)]
    pub job_id: Option<String>,
    /// Initial status.
    #[serde(default)]
    pub status: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Status of a running or finished conversion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverterStatus {
    /// Current stage of the conversion.
    pub job_status: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

impl ConverterStatus {
    /// Returns `true` once the conversion stopped making progress, whether
    /// it succeeded or failed.
    pub fn is_terminal(&self) -> bool {
        !NON_TERMINAL_STATUSES.contains(&self.job_status.as_str())
    }
}

/// Converter API, reached through [`Client::converter`].
#[derive(Debug, Clone)]
pub struct ConverterClient {
    client: Client,
}

impl ConverterClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Starts a conversion from staged artifacts.
    #[instrument(skip(self, job))]
    pub async fn start(&self, job: &ConverterJob) -> Result<ConverterReceipt> {
        self.client.post("converter/start", job).await
    }

    /// Fetches the status of a conversion.
    #[instrument(skip(self))]
    pub async fn status(&self, job_id: &str) -> Result<ConverterStatus> {
        self.client
            .get_query("converter/get-status", &[("job_id", job_id.to_string())])
            .await
    }

    /// Polls a conversion until it reaches a terminal status.
    ///
    /// Sleeps `poll_interval` before every fetch. Returns [`Error::Timeout`]
    /// when the next poll would land past the deadline; `timeout: None`
    /// waits forever.
    #[instrument(skip(self))]
    pub async fn block_until_complete(
        &self,
        job_id: &str,
        timeout: Option<Duration>,
        poll_interval: Duration,
    ) -> Result<ConverterStatus> {
        let started = Instant::now();
        let deadline = timeout.and_then(|timeout| started.checked_add(timeout));
        loop {
            debug!(job = job_id, "waiting {:?} before polling", poll_interval);
            sleep(poll_interval).await;
            let status = self.status(job_id).await?;
            if status.is_terminal() {
                return Ok(status);
            }
            if let Some(deadline) = deadline {
                let overshoots = Instant::now()
                    .checked_add(poll_interval)
                    .map_or(true, |next_poll| next_poll > deadline);
                if overshoots {
                    return Err(Error::Timeout {
                        waited: started.elapsed(),
                    });
                }
            }
        }
    }
}
