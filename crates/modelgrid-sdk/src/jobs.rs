//! Job submission and lifecycle operations.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument, warn};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::size::parse_data_size;
use crate::sources::{
    encode_embedded_sources, normalize_s3_sources, normalize_text_sources, ByteSources,
    FileInput, FileSources,
};
use crate::util::{chunk_bytes, read_chunk};

/// Default deadline for [`JobsClient::block_until_complete`].
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Chunk size used when the platform does not report a usable maximum.
pub const FALLBACK_CHUNK_SIZE: usize = 1024 * 1024;

/// Lifecycle states reported for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JobStatus {
    /// Accepted by the platform, not yet running.
    #[default]
    #[serde(rename = "SUBMITTED")]
    Submitted,
    /// At least one input is being processed.
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    /// Every input finished, successfully or not.
    #[serde(rename = "COMPLETED")]
    Completed,
    /// Canceled before completion.
    #[serde(rename = "CANCELED")]
    Canceled,
    /// The platform gave up on the job.
    #[serde(rename = "TIMEDOUT", alias = "TIMEOUT")]
    TimedOut,
    /// A status this SDK version does not know. Treated as terminal.
    #[serde(other, rename = "UNKNOWN")]
    Other,
}

impl JobStatus {
    /// Returns `true` once the job can no longer make progress.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Submitted | JobStatus::InProgress)
    }

    /// Returns the platform's name for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Canceled => "CANCELED",
            JobStatus::TimedOut => "TIMEDOUT",
            JobStatus::Other => "UNKNOWN",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a deployed model version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    /// Model identifier.
    pub identifier: String,
    /// Semantic version of the model.
    pub version: String,
    /// Human-readable model name, present in API responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ModelRef {
    /// Creates a reference from an identifier and version.
    pub fn new(identifier: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            version: version.into(),
            name: None,
        }
    }
}

/// A submitted job as reported by the platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job identifier.
    pub job_identifier: String,
    /// Current lifecycle status. Defaults to `SUBMITTED` when the response
    /// omits it.
    #[serde(default)]
    pub status: JobStatus,
    /// The model the job runs against.
    #[serde(default)]
    pub model: Option<ModelRef>,
    /// Whether an explainable result was requested.
    #[serde(default)]
    pub explain: Option<bool>,
    /// API key prefix the job was submitted with.
    #[serde(default)]
    pub access_key: Option<String>,
    /// Platform user that submitted the job.
    #[serde(default)]
    pub submitted_by: Option<String>,
    /// Account the job is billed to.
    #[serde(default)]
    pub account_identifier: Option<String>,
    /// When the job record was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// When the job record last changed.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// When the job was submitted.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    /// Total number of input sources.
    #[serde(default)]
    pub total: Option<u32>,
    /// Sources processed successfully so far.
    #[serde(default)]
    pub completed: Option<u32>,
    /// Sources that failed so far.
    #[serde(default)]
    pub failed: Option<u32>,
    /// Milliseconds spent processing.
    #[serde(default)]
    pub elapsed_time: Option<u64>,
    /// Milliseconds spent queued.
    #[serde(default)]
    pub queue_time: Option<u64>,
}

impl Job {
    /// Returns `true` once the job can no longer change state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Platform limits reported by the job features endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct JobFeatures {
    /// Largest chunk accepted by the chunked upload endpoint, as a
    /// human-readable size such as `"1M"`.
    #[serde(default)]
    pub input_chunk_maximum_size: Option<String>,
    /// Maximum number of chunks per input.
    #[serde(default)]
    pub maximum_input_chunks: Option<u32>,
    /// Maximum number of inputs per job.
    #[serde(default)]
    pub maximum_inputs_per_job: Option<u32>,
}

/// Sort order for job history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Oldest first.
    Ascending,
    /// Newest first.
    Descending,
}

impl SortDirection {
    fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Filters for [`JobsClient::history`].
///
/// Unset fields are omitted from the query. The status filter defaults to
/// `"all"`.
#[derive(Debug, Clone)]
pub struct JobHistoryParams {
    user: Option<String>,
    access_key: Option<String>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    model: Option<String>,
    status: Option<String>,
    sort_by: Option<String>,
    direction: Option<SortDirection>,
    page: Option<u32>,
    per_page: Option<u32>,
}

impl Default for JobHistoryParams {
    fn default() -> Self {
        Self {
            user: None,
            access_key: None,
            start_date: None,
            end_date: None,
            model: None,
            status: Some("all".to_string()),
            sort_by: None,
            direction: None,
            page: None,
            per_page: None,
        }
    }
}

impl JobHistoryParams {
    /// Creates the default filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by the submitting user name.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Filters by the submitting API key prefix.
    pub fn access_key(mut self, access_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self
    }

    /// Includes only jobs submitted at or after this instant.
    pub fn start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Includes only jobs submitted at or before this instant.
    pub fn end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Filters by model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Filters by job status class, e.g. `"all"`, `"pending"` or
    /// `"terminated"`.
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Sorts by the named field.
    pub fn sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }

    /// Sets the sort direction.
    pub fn direction(mut self, direction: SortDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Selects a result page, starting at 1.
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the page size.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(user) = &self.user {
            query.push(("user", user.clone()));
        }
        if let Some(access_key) = &self.access_key {
            query.push(("accessKey", access_key.clone()));
        }
        if let Some(start_date) = &self.start_date {
            query.push((
                "startDate",
                start_date.to_rfc3339_opts(SecondsFormat::Millis, true),
            ));
        }
        if let Some(end_date) = &self.end_date {
            query.push((
                "endDate",
                end_date.to_rfc3339_opts(SecondsFormat::Millis, true),
            ));
        }
        if let Some(model) = &self.model {
            query.push(("model", model.clone()));
        }
        if let Some(status) = &self.status {
            query.push(("status", status.clone()));
        }
        if let Some(sort_by) = &self.sort_by {
            query.push(("sort-by", sort_by.clone()));
        }
        if let Some(direction) = self.direction {
            query.push(("direction", direction.as_str().to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            query.push(("per-page", per_page.to_string()));
        }
        query
    }
}

/// Connection parameters for a JDBC submission.
///
/// The query's result set is handed to the model as its input.
#[derive(Clone, Serialize)]
pub struct JdbcParams {
    /// JDBC connection URL reachable from the platform.
    pub url: String,
    /// Database user name.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Fully qualified JDBC driver class.
    pub driver: String,
    /// SQL query producing the model input.
    pub query: String,
}

impl fmt::Debug for JdbcParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JdbcParams")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("driver", &self.driver)
            .field("query", &self.query)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct JobSubmission {
    model: ModelRef,
    explain: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<JobInput>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum JobInput {
    #[serde(rename = "text")]
    Text { sources: Map<String, Value> },
    #[serde(rename = "embedded")]
    Embedded { sources: Map<String, Value> },
    #[serde(rename = "aws-s3")]
    AwsS3 {
        #[serde(rename = "accessKeyID")]
        access_key_id: String,
        #[serde(rename = "secretAccessKey")]
        secret_access_key: String,
        region: String,
        sources: Map<String, Value>,
    },
    #[serde(rename = "jdbc")]
    Jdbc {
        #[serde(flatten)]
        params: JdbcParams,
    },
}

/// Jobs API, reached through [`Client::jobs`].
#[derive(Debug, Clone)]
pub struct JobsClient {
    client: Client,
}

impl JobsClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches the current state of a job.
    #[instrument(skip(self))]
    pub async fn get(&self, identifier: &str) -> Result<Job> {
        self.client.get(&format!("jobs/{identifier}")).await
    }

    /// Cancels a job that has not finished yet.
    #[instrument(skip(self))]
    pub async fn cancel(&self, identifier: &str) -> Result<Job> {
        self.client.delete(&format!("jobs/{identifier}")).await
    }

    /// Fetches the platform limits for job submission.
    #[instrument(skip(self))]
    pub async fn features(&self) -> Result<JobFeatures> {
        self.client.get("jobs/features").await
    }

    /// Lists previously submitted jobs matching the given filters.
    #[instrument(skip(self, params))]
    pub async fn history(&self, params: &JobHistoryParams) -> Result<Vec<Job>> {
        self.client
            .get_query("jobs/history", &params.to_query())
            .await
    }

    /// Submits text inputs.
    ///
    /// `sources` is either a one-level mapping of input names to strings or
    /// a two-level mapping of source names to such mappings.
    #[instrument(skip(self, sources))]
    pub async fn submit_text(
        &self,
        model: &str,
        version: &str,
        sources: Value,
        explain: bool,
    ) -> Result<Job> {
        let sources = normalize_text_sources(sources)?;
        self.submit(JobSubmission {
            model: ModelRef::new(model, version),
            explain,
            input: Some(JobInput::Text { sources }),
        })
        .await
    }

    /// Submits in-memory binary inputs, embedded in the request body as
    /// base64 data URIs.
    #[instrument(skip(self, sources))]
    pub async fn submit_embedded(
        &self,
        model: &str,
        version: &str,
        sources: ByteSources,
        explain: bool,
    ) -> Result<Job> {
        let sources = encode_embedded_sources(sources);
        self.submit(JobSubmission {
            model: ModelRef::new(model, version),
            explain,
            input: Some(JobInput::Embedded { sources }),
        })
        .await
    }

    /// Submits inputs hosted in S3. Every input value must name a `bucket`
    /// and a `key`.
    #[instrument(skip(self, sources, access_key_id, secret_access_key))]
    pub async fn submit_aws_s3(
        &self,
        model: &str,
        version: &str,
        sources: Value,
        access_key_id: &str,
        secret_access_key: &str,
        region: &str,
        explain: bool,
    ) -> Result<Job> {
        let sources = normalize_s3_sources(sources)?;
        self.submit(JobSubmission {
            model: ModelRef::new(model, version),
            explain,
            input: Some(JobInput::AwsS3 {
                access_key_id: access_key_id.to_string(),
                secret_access_key: secret_access_key.to_string(),
                region: region.to_string(),
                sources,
            }),
        })
        .await
    }

    /// Submits a database query as the job input.
    #[instrument(skip(self, params))]
    pub async fn submit_jdbc(
        &self,
        model: &str,
        version: &str,
        params: JdbcParams,
        explain: bool,
    ) -> Result<Job> {
        self.submit(JobSubmission {
            model: ModelRef::new(model, version),
            explain,
            input: Some(JobInput::Jdbc { params }),
        })
        .await
    }

    /// Submits large inputs through the chunked upload endpoint.
    ///
    /// Opens a job without inputs, uploads every payload in sequential
    /// multipart chunks sized to the platform's reported maximum, then
    /// closes the job. If anything fails after the open, the job is
    /// canceled before the error is returned; a failure of the cancel
    /// itself is logged and swallowed so the original error surfaces.
    #[instrument(skip(self, sources))]
    pub async fn submit_file(
        &self,
        model: &str,
        version: &str,
        sources: FileSources,
        explain: bool,
    ) -> Result<Job> {
        let open_job = self
            .submit(JobSubmission {
                model: ModelRef::new(model, version),
                explain,
                input: None,
            })
            .await?;
        let chunk_size = self.resolve_chunk_size().await;

        match self
            .upload_and_close(&open_job.job_identifier, sources, chunk_size)
            .await
        {
            Ok(job) => Ok(job),
            Err(err) => {
                debug!(job = %open_job.job_identifier, "upload failed, canceling job");
                if let Err(cancel_err) = self.cancel(&open_job.job_identifier).await {
                    warn!(
                        job = %open_job.job_identifier,
                        error = %cancel_err,
                        "could not cancel the partially uploaded job"
                    );
                }
                Err(err)
            }
        }
    }

    /// Polls a job until it reaches a terminal status.
    ///
    /// Sleeps `poll_interval` before every fetch, so the job is polled at
    /// least once even with a zero timeout. Returns [`Error::Timeout`] when
    /// the next poll would land past the deadline; `timeout: None` waits
    /// forever. See [`DEFAULT_POLL_TIMEOUT`] and [`DEFAULT_POLL_INTERVAL`]
    /// for conventional values.
    #[instrument(skip(self))]
    pub async fn block_until_complete(
        &self,
        identifier: &str,
        timeout: Option<Duration>,
        poll_interval: Duration,
    ) -> Result<Job> {
        let started = Instant::now();
        let deadline = timeout.and_then(|timeout| started.checked_add(timeout));
        loop {
            debug!(job = identifier, "waiting {:?} before polling", poll_interval);
            sleep(poll_interval).await;
            let job = self.get(identifier).await?;
            if job.status.is_terminal() {
                return Ok(job);
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

    async fn submit(&self, submission: JobSubmission) -> Result<Job> {
        self.client.post("jobs", &submission).await
    }

    /// Determines the upload chunk size from the features endpoint, falling
    /// back to [`FALLBACK_CHUNK_SIZE`] when the probe or the parse fails.
    async fn resolve_chunk_size(&self) -> usize {
        match self.chunk_size_from_features().await {
            Ok(size) => size,
            Err(err) => {
                warn!(error = %err, "error getting job features, assuming default chunk size");
                FALLBACK_CHUNK_SIZE
            }
        }
    }

    async fn chunk_size_from_features(&self) -> Result<usize> {
        let features = self.features().await?;
        let reported = features.input_chunk_maximum_size.ok_or_else(|| {
            Error::InvalidResponse {
                url: "jobs/features".to_string(),
                message: "missing input_chunk_maximum_size".to_string(),
            }
        })?;
        let bytes = parse_data_size(&reported)?;
        usize::try_from(bytes).map_err(|_| Error::InvalidSize {
            value: reported,
            message: "chunk size does not fit in memory".to_string(),
        })
    }

    async fn upload_and_close(
        &self,
        identifier: &str,
        sources: FileSources,
        chunk_size: usize,
    ) -> Result<Job> {
        for (source, inputs) in sources.into_groups() {
            for (input, value) in inputs {
                self.upload_input(identifier, &source, &input, value, chunk_size)
                    .await?;
            }
        }
        self.client
            .post_empty(&format!("jobs/{identifier}/close"))
            .await
    }

    async fn upload_input(
        &self,
        identifier: &str,
        source: &str,
        input: &str,
        value: FileInput,
        chunk_size: usize,
    ) -> Result<()> {
        let path = format!("jobs/{identifier}/{source}/{input}");
        match value {
            FileInput::Bytes(data) => {
                for (index, chunk) in chunk_bytes(&data, chunk_size).into_iter().enumerate() {
                    debug!(job = identifier, source, input, index, "uploading chunk");
                    self.client.post_chunk(&path, chunk.to_vec()).await?;
                }
            }
            FileInput::Path(file_path) => {
                let mut file = tokio::fs::File::open(&file_path).await.map_err(|e| {
                    Error::Io {
                        path: file_path.display().to_string(),
                        source: e,
                    }
                })?;
                let mut index = 0usize;
                while let Some(chunk) =
                    read_chunk(&mut file, chunk_size).await.map_err(|e| Error::Io {
                        path: file_path.display().to_string(),
                        source: e,
                    })?
                {
                    debug!(job = identifier, source, input, index, "uploading chunk");
                    self.client.post_chunk(&path, chunk).await?;
                    index += 1;
                }
            }
        }
        Ok(())
    }
}
