//! gRPC client for edge deployments.

use std::time::Duration;

use http::uri::PathAndQuery;
use modelgrid_sdk::sources::{
    encode_embedded_sources, normalize_s3_sources, normalize_text_sources, ByteSources,
};
use serde_json::Value as JsonValue;
use tokio::time::{sleep, Instant};
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, instrument};

use crate::error::{EdgeError, Result};
use crate::proto;

/// Default deadline for [`EdgeClient::block_until_complete`].
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between status polls. Edge servers are local, so the
/// interval can be tight.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default limit on establishing the channel.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline applied to each RPC.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Statuses an edge job can no longer leave.
const TERMINAL_STATUSES: [&str; 3] = ["COMPLETE", "CANCELED", "FAILED"];

/// Channel settings for [`EdgeClient::connect_with`].
#[derive(Debug, Clone)]
pub struct EdgeOptions {
    /// Maximum time to wait for the channel to come up.
    pub connect_timeout: Duration,
    /// Deadline applied to every RPC sent over the channel.
    pub request_timeout: Duration,
}

impl Default for EdgeOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Client for a model platform running on an edge device.
///
/// Edge servers expose the job lifecycle over gRPC without authentication,
/// so connecting takes only a host and port:
///
/// ```no_run
/// use modelgrid_edge::client::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
/// use modelgrid_edge::EdgeClient;
/// use serde_json::json;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = EdgeClient::connect("localhost", 55000).await?;
/// let job = client
///     .submit_text(
///         "ed542963de",
///         "0.0.27",
///         json!({"input.txt": "Modzy is great!"}),
///         false,
///     )
///     .await?;
/// let details = client
///     .block_until_complete(&job, Some(DEFAULT_POLL_TIMEOUT), DEFAULT_POLL_INTERVAL)
///     .await?;
/// println!("{}", details.status);
/// # Ok(())
/// # }
/// ```
///
/// Cloning is cheap; clones share the underlying channel.
#[derive(Debug, Clone)]
pub struct EdgeClient {
    grpc: Grpc<Channel>,
    origin: String,
}

impl EdgeClient {
    /// Connects to an edge server with default timeouts.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_with(host, port, EdgeOptions::default()).await
    }

    /// Connects to an edge server.
    ///
    /// An open port is not proof of a working server, so a listing RPC is
    /// issued before the client is handed out.
    #[instrument(skip(options))]
    pub async fn connect_with(host: &str, port: u16, options: EdgeOptions) -> Result<Self> {
        let origin = format!("{host}:{port}");
        let endpoint = Endpoint::from_shared(format!("http://{origin}"))
            .map_err(|source| EdgeError::Connect {
                origin: origin.clone(),
                source,
            })?
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout);
        let channel = endpoint
            .connect()
            .await
            .map_err(|source| EdgeError::Connect {
                origin: origin.clone(),
                source,
            })?;

        let client = Self {
            grpc: Grpc::new(channel),
            origin,
        };
        client.get_all_job_details().await?;
        debug!(origin = %client.origin, "connected to edge server");
        Ok(client)
    }

    /// Submits text inputs and returns the accepted job's identifier.
    ///
    /// `sources` takes the same shapes as
    /// [`JobsClient::submit_text`](modelgrid_sdk::JobsClient::submit_text).
    #[instrument(skip(self, sources))]
    pub async fn submit_text(
        &self,
        model: &str,
        version: &str,
        sources: JsonValue,
        explain: bool,
    ) -> Result<String> {
        let input = text_input(sources)?;
        self.submit(model, version, input, explain).await
    }

    /// Submits in-memory binary inputs as base64 data URIs and returns the
    /// accepted job's identifier.
    #[instrument(skip(self, sources))]
    pub async fn submit_embedded(
        &self,
        model: &str,
        version: &str,
        sources: ByteSources,
        explain: bool,
    ) -> Result<String> {
        let input = embedded_input(sources);
        self.submit(model, version, input, explain).await
    }

    /// Submits inputs hosted in S3 and returns the accepted job's
    /// identifier. Every input value must name a `bucket` and a `key`.
    #[instrument(skip(self, sources, access_key_id, secret_access_key))]
    pub async fn submit_aws_s3(
        &self,
        model: &str,
        version: &str,
        sources: JsonValue,
        access_key_id: &str,
        secret_access_key: &str,
        region: &str,
        explain: bool,
    ) -> Result<String> {
        let input = s3_input(sources, access_key_id, secret_access_key, region)?;
        self.submit(model, version, input, explain).await
    }

    /// Fetches the current state of one job.
    #[instrument(skip(self))]
    pub async fn get_job_details(&self, identifier: &str) -> Result<proto::JobDetails> {
        self.unary(
            proto::GET_JOB_PATH,
            proto::JobIdentifier {
                identifier: identifier.to_string(),
            },
        )
        .await
    }

    /// Lists every job the edge server knows about.
    #[instrument(skip(self))]
    pub async fn get_all_job_details(&self) -> Result<Vec<proto::JobDetails>> {
        let list: proto::JobDetailsList = self.unary(proto::GET_JOBS_PATH, proto::Empty {}).await?;
        Ok(list.jobs)
    }

    /// Cancels a job and returns its resulting state.
    #[instrument(skip(self))]
    pub async fn cancel_job(&self, identifier: &str) -> Result<proto::JobDetails> {
        self.unary(
            proto::CANCEL_JOB_PATH,
            proto::JobIdentifier {
                identifier: identifier.to_string(),
            },
        )
        .await
    }

    /// Fetches the results of a job. Partial results are returned while the
    /// job is still running; check [`Results::finished`](proto::Results).
    #[instrument(skip(self))]
    pub async fn get_results(&self, identifier: &str) -> Result<proto::Results> {
        self.unary(
            proto::GET_RESULTS_PATH,
            proto::JobIdentifier {
                identifier: identifier.to_string(),
            },
        )
        .await
    }

    /// Polls a job until it reaches a terminal status.
    ///
    /// Fetches first, so an already-terminal job returns without sleeping.
    /// Returns [`EdgeError::Timeout`] when the next poll would land past the
    /// deadline; `timeout: None` waits forever. See [`DEFAULT_POLL_TIMEOUT`]
    /// and [`DEFAULT_POLL_INTERVAL`] for conventional values.
    #[instrument(skip(self))]
    pub async fn block_until_complete(
        &self,
        identifier: &str,
        timeout: Option<Duration>,
        poll_interval: Duration,
    ) -> Result<proto::JobDetails> {
        let started = Instant::now();
        let deadline = timeout.and_then(|timeout| started.checked_add(timeout));
        loop {
            let details = self.get_job_details(identifier).await?;
            if is_terminal_status(&details.status) {
                return Ok(details);
            }
            debug!(
                job = identifier,
                status = %details.status,
                "waiting {:?} before polling again",
                poll_interval,
            );
            sleep(poll_interval).await;
            if let Some(deadline) = deadline {
                let overshoots = Instant::now()
                    .checked_add(poll_interval)
                    .map_or(true, |next_poll| next_poll > deadline);
                if overshoots {
                    return Err(EdgeError::Timeout {
                        waited: started.elapsed(),
                    });
                }
            }
        }
    }

    async fn submit(
        &self,
        model: &str,
        version: &str,
        input: proto::JobInput,
        explain: bool,
    ) -> Result<String> {
        let submission = proto::JobSubmission {
            model: Some(proto::ModelIdentifier {
                identifier: model.to_string(),
                version: version.to_string(),
            }),
            input: Some(input),
            explain,
        };
        let receipt: proto::JobSubmissionReceipt =
            self.unary(proto::SUBMIT_JOB_PATH, submission).await?;
        debug!(job = %receipt.job_identifier, "job accepted");
        Ok(receipt.job_identifier)
    }

    async fn unary<Req, Resp>(&self, path: &'static str, request: Req) -> Result<Resp>
    where
        Req: prost::Message + 'static,
        Resp: prost::Message + Default + 'static,
    {
        let mut grpc = self.grpc.clone();
        grpc.ready().await.map_err(|source| EdgeError::Connect {
            origin: self.origin.clone(),
            source,
        })?;
        let response = grpc
            .unary(
                tonic::Request::new(request),
                PathAndQuery::from_static(path),
                ProstCodec::<Req, Resp>::default(),
            )
            .await?;
        Ok(response.into_inner())
    }
}

fn is_terminal_status(status: &str) -> bool {
    TERMINAL_STATUSES.contains(&status)
}

fn text_input(sources: JsonValue) -> Result<proto::JobInput> {
    let sources = normalize_text_sources(sources).map_err(invalid_sources)?;
    Ok(proto::JobInput {
        kind: "text".to_string(),
        sources: Some(proto::json_to_struct(&sources)),
        ..Default::default()
    })
}

fn embedded_input(sources: ByteSources) -> proto::JobInput {
    let sources = encode_embedded_sources(sources);
    proto::JobInput {
        kind: "embedded".to_string(),
        sources: Some(proto::json_to_struct(&sources)),
        ..Default::default()
    }
}

fn s3_input(
    sources: JsonValue,
    access_key_id: &str,
    secret_access_key: &str,
    region: &str,
) -> Result<proto::JobInput> {
    let sources = normalize_s3_sources(sources).map_err(invalid_sources)?;
    Ok(proto::JobInput {
        kind: "aws-s3".to_string(),
        sources: Some(proto::json_to_struct(&sources)),
        access_key_id: access_key_id.to_string(),
        secret_access_key: secret_access_key.to_string(),
        region: region.to_string(),
    })
}

fn invalid_sources(err: modelgrid_sdk::Error) -> EdgeError {
    EdgeError::InvalidSources {
        message: err.to_string(),
    }
}
