//! Hand-maintained protobuf messages for the edge gRPC surface.
//!
//! The edge server speaks a small, stable protocol, so the message types
//! are written out here with explicit field tags instead of being generated
//! at build time. Tags must never be renumbered.

use prost::Message;
use serde_json::Value as JsonValue;

/// RPC path for submitting a job.
pub(crate) const SUBMIT_JOB_PATH: &str = "/modelgrid.jobs.v1.JobService/SubmitJob";
/// RPC path for fetching a single job.
pub(crate) const GET_JOB_PATH: &str = "/modelgrid.jobs.v1.JobService/GetJob";
/// RPC path for listing all jobs known to the edge server.
pub(crate) const GET_JOBS_PATH: &str = "/modelgrid.jobs.v1.JobService/GetJobs";
/// RPC path for canceling a job.
pub(crate) const CANCEL_JOB_PATH: &str = "/modelgrid.jobs.v1.JobService/CancelJob";
/// RPC path for fetching job results.
pub(crate) const GET_RESULTS_PATH: &str = "/modelgrid.results.v1.ResultsService/GetResults";

/// Identifies a model by its id and version.
#[derive(Clone, PartialEq, Message)]
pub struct ModelIdentifier {
    /// Model identifier.
    #[prost(string, tag = "1")]
    pub identifier: String,
    /// Semantic version of the model.
    #[prost(string, tag = "2")]
    pub version: String,
}

/// The input section of a submission.
///
/// `kind` is named `type` on the wire; Rust reserves that word.
#[derive(Clone, PartialEq, Message)]
pub struct JobInput {
    /// Input kind, `text`, `embedded` or `aws-s3`.
    #[prost(string, tag = "1")]
    pub kind: String,
    /// Two-level mapping of input name to data-item key to payload.
    #[prost(message, optional, tag = "2")]
    pub sources: Option<prost_types::Struct>,
    /// AWS access key id, only set for `aws-s3` inputs.
    #[prost(string, tag = "3")]
    pub access_key_id: String,
    /// AWS secret access key, only set for `aws-s3` inputs.
    #[prost(string, tag = "4")]
    pub secret_access_key: String,
    /// AWS region, only set for `aws-s3` inputs.
    #[prost(string, tag = "5")]
    pub region: String,
}

/// A complete job submission.
#[derive(Clone, PartialEq, Message)]
pub struct JobSubmission {
    /// Model to run.
    #[prost(message, optional, tag = "1")]
    pub model: Option<ModelIdentifier>,
    /// Input payload.
    #[prost(message, optional, tag = "2")]
    pub input: Option<JobInput>,
    /// Whether to request an explainable run.
    #[prost(bool, tag = "3")]
    pub explain: bool,
}

/// Acknowledgement returned by `SubmitJob`.
#[derive(Clone, PartialEq, Message)]
pub struct JobSubmissionReceipt {
    /// Identifier assigned to the accepted job.
    #[prost(string, tag = "1")]
    pub job_identifier: String,
}

/// Request naming a single job.
#[derive(Clone, PartialEq, Message)]
pub struct JobIdentifier {
    /// Identifier of the job.
    #[prost(string, tag = "1")]
    pub identifier: String,
}

/// Empty request message.
#[derive(Clone, PartialEq, Message)]
pub struct Empty {}

/// Current state of a job on the edge server.
#[derive(Clone, PartialEq, Message)]
pub struct JobDetails {
    /// Identifier of the job.
    #[prost(string, tag = "1")]
    pub job_identifier: String,
    /// Lifecycle status string.
    #[prost(string, tag = "2")]
    pub status: String,
    /// Model the job runs against.
    #[prost(message, optional, tag = "3")]
    pub model: Option<ModelIdentifier>,
    /// Whether the job was submitted with explainability enabled.
    #[prost(bool, tag = "4")]
    pub explain: bool,
    /// Number of inputs in the job.
    #[prost(uint32, tag = "5")]
    pub total: u32,
    /// Number of inputs processed successfully.
    #[prost(uint32, tag = "6")]
    pub completed: u32,
    /// Number of inputs that failed.
    #[prost(uint32, tag = "7")]
    pub failed: u32,
    /// Wall-clock processing time in milliseconds.
    #[prost(uint64, tag = "8")]
    pub elapsed_time: u64,
}

/// Response to `GetJobs`.
#[derive(Clone, PartialEq, Message)]
pub struct JobDetailsList {
    /// All jobs known to the server.
    #[prost(message, repeated, tag = "1")]
    pub jobs: Vec<JobDetails>,
}

/// Per-input outputs of a finished job.
#[derive(Clone, PartialEq, Message)]
pub struct Results {
    /// Identifier of the job.
    #[prost(string, tag = "1")]
    pub job_identifier: String,
    /// Whether processing has finished.
    #[prost(bool, tag = "2")]
    pub finished: bool,
    /// Number of inputs in the job.
    #[prost(uint32, tag = "3")]
    pub total: u32,
    /// Number of inputs processed successfully.
    #[prost(uint32, tag = "4")]
    pub completed: u32,
    /// Number of inputs that failed.
    #[prost(uint32, tag = "5")]
    pub failed: u32,
    /// Outputs keyed by input name.
    #[prost(message, optional, tag = "6")]
    pub results: Option<prost_types::Struct>,
    /// Failure details keyed by input name.
    #[prost(message, optional, tag = "7")]
    pub failures: Option<prost_types::Struct>,
}

/// Converts a JSON object into a protobuf `Struct`.
pub fn json_to_struct(map: &serde_json::Map<String, JsonValue>) -> prost_types::Struct {
    prost_types::Struct {
        fields: map
            .iter()
            .map(|(key, value)| (key.clone(), json_to_proto_value(value)))
            .collect(),
    }
}

/// Converts a JSON value into a protobuf `Value`.
pub fn json_to_proto_value(value: &JsonValue) -> prost_types::Value {
    use prost_types::value::Kind;

    let kind = match value {
        JsonValue::Null => Kind::NullValue(0),
        JsonValue::Bool(flag) => Kind::BoolValue(*flag),
        JsonValue::Number(number) => Kind::NumberValue(number.as_f64().unwrap_or_default()),
        JsonValue::String(text) => Kind::StringValue(text.clone()),
        JsonValue::Array(items) => Kind::ListValue(prost_types::ListValue {
            values: items.iter().map(json_to_proto_value).collect(),
        }),
        JsonValue::Object(map) => Kind::StructValue(json_to_struct(map)),
    };
    prost_types::Value { kind: Some(kind) }
}

/// Converts a protobuf `Struct` back into a JSON object.
pub fn struct_to_json(value: &prost_types::Struct) -> serde_json::Map<String, JsonValue> {
    value
        .fields
        .iter()
        .map(|(key, value)| (key.clone(), proto_value_to_json(value)))
        .collect()
}

/// Converts a protobuf `Value` back into a JSON value.
pub fn proto_value_to_json(value: &prost_types::Value) -> JsonValue {
    use prost_types::value::Kind;

    match &value.kind {
        None | Some(Kind::NullValue(_)) => JsonValue::Null,
        Some(Kind::BoolValue(flag)) => JsonValue::Bool(*flag),
        Some(Kind::NumberValue(number)) => serde_json::Number::from_f64(*number)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Some(Kind::StringValue(text)) => JsonValue::String(text.clone()),
        Some(Kind::ListValue(list)) => {
            JsonValue::Array(list.values.iter().map(proto_value_to_json).collect())
        }
        Some(Kind::StructValue(fields)) => JsonValue::Object(struct_to_json(fields)),
    }
}
