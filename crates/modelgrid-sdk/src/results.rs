//! Job result retrieval.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument};

use crate::client::Client;
use crate::error::{Error, Result};

/// Model outputs for a job, keyed by source name.
///
/// `results` holds the outputs of sources that succeeded and `failures` the
/// per-source failure records. Output payloads are model-specific, so both
/// are exposed as raw JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    /// Identifier of the job these results belong to.
    pub job_identifier: String,
    /// `true` once every source has been processed or the job was canceled.
    #[serde(default)]
    pub finished: bool,
    /// Account the job ran under.
    #[serde(default)]
    pub account_identifier: Option<String>,
    /// Total number of input sources.
    #[serde(default)]
    pub total: Option<u32>,
    /// Sources processed successfully.
    #[serde(default)]
    pub completed: Option<u32>,
    /// Sources that failed.
    #[serde(default)]
    pub failed: Option<u32>,
    /// Whether an explainable result was requested.
    #[serde(default)]
    pub explained: Option<bool>,
    /// When the job was submitted.
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    /// API key prefix the job was submitted with.
    #[serde(default)]
    pub submitted_by_key: Option<String>,
    /// Milliseconds from submission to the last processed source.
    #[serde(default)]
    pub elapsed_time: Option<u64>,
    /// Milliseconds the first source waited in queue.
    #[serde(default)]
    pub initial_queue_time: Option<u64>,
    /// Total queue milliseconds across sources.
    #[serde(default)]
    pub total_queue_time: Option<u64>,
    /// Mean model latency in milliseconds.
    #[serde(default)]
    pub average_model_latency: Option<f64>,
    /// Summed model latency in milliseconds.
    #[serde(default)]
    pub total_model_latency: Option<f64>,
    /// Total input size in bytes.
    #[serde(default)]
    pub input_size: Option<u64>,
    /// Successful outputs keyed by source name.
    #[serde(default)]
    pub results: Map<String, Value>,
    /// Failure records keyed by source name.
    #[serde(default)]
    pub failures: Map<String, Value>,
}

impl JobResult {
    /// Returns the outputs for one source.
    ///
    /// # Errors
    ///
    /// [`Error::SourceFailed`] when the source is present among the failures
    /// with an error message, [`Error::SourceNotFound`] when the name appears
    /// nowhere.
    pub fn source_outputs(&self, source_name: &str) -> Result<&Value> {
        if let Some(source) = self.results.get(source_name) {
            return Ok(unwrap_legacy_nesting(source, source_name));
        }
        if let Some(failure) = self.failures.get(source_name) {
            let failure = unwrap_legacy_nesting(failure, source_name);
            if let Some(error) = failure.get("error") {
                let message = match error {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                return Err(Error::SourceFailed {
                    source_name: source_name.to_string(),
                    message,
                });
            }
        }
        Err(Error::SourceNotFound {
            source_name: source_name.to_string(),
        })
    }

    /// Returns the outputs of the first source, useful for single-source
    /// jobs where the source name does not matter.
    ///
    /// # Errors
    ///
    /// [`Error::NoOutputs`] when neither outputs nor failures exist yet, and
    /// the same errors as [`JobResult::source_outputs`] otherwise.
    pub fn first_outputs(&self) -> Result<&Value> {
        let source_name = self
            .results
            .keys()
            .next()
            .or_else(|| self.failures.keys().next())
            .ok_or(Error::NoOutputs)?;
        self.source_outputs(source_name)
    }
}

/// Older platform releases repeat the source name one level down.
fn unwrap_legacy_nesting<'a>(source: &'a Value, source_name: &str) -> &'a Value {
    match source.get(source_name) {
        Some(inner) => inner,
        None => source,
    }
}

/// Results API, reached through [`Client::results`].
#[derive(Debug, Clone)]
pub struct ResultsClient {
    client: Client,
}

impl ResultsClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches the current results of a job.
    #[instrument(skip(self))]
    pub async fn get(&self, identifier: &str) -> Result<JobResult> {
        self.client.get(&format!("results/{identifier}")).await
    }

    /// Polls until the result is marked finished.
    ///
    /// Fetches immediately and then every `poll_interval`, so the result is
    /// checked at least once even with a zero timeout. A result can be
    /// not-found for a short window after job submission; the first time
    /// that happens the job itself is fetched to confirm it exists, after
    /// which not-found responses are treated as "not ready yet". Returns
    /// [`Error::Timeout`] when the next poll would land past the deadline;
    /// `timeout: None` waits forever.
    #[instrument(skip(self))]
    pub async fn block_until_complete(
        &self,
        identifier: &str,
        timeout: Option<Duration>,
        poll_interval: Duration,
    ) -> Result<JobResult> {
        let started = Instant::now();
        let deadline = timeout.and_then(|timeout| started.checked_add(timeout));
        let mut ignore_not_found = false;
        loop {
            match self.get(identifier).await {
                Ok(result) if result.finished => return Ok(result),
                Ok(_) => {}
                Err(err) if err.is_not_found() && !ignore_not_found => {
                    // Recently accepted jobs can 404 here before the results
                    // record exists. Confirm the job itself is real, then
                    // keep polling.
                    self.client.jobs().get(identifier).await?;
                    ignore_not_found = true;
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
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
            debug!(job = identifier, "waiting {:?} before polling again", poll_interval);
            sleep(poll_interval).await;
        }
    }
}
