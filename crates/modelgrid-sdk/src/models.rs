//! Model catalog operations.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use crate::client::Client;
use crate::error::Result;
use crate::tags::Tag;

/// A model in the platform catalog.
///
/// Listing endpoints return sparsely populated records; only `model_id` is
/// always present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Model identifier. Some endpoints call this field `identifier`.
    #[serde(alias = "identifier")]
    pub model_id: String,
    /// Human-readable model name.
    #[serde(default)]
    pub name: Option<String>,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
    /// Model author.
    #[serde(default)]
    pub author: Option<String>,
    /// Most recent version string.
    #[serde(default)]
    pub latest_version: Option<String>,
    /// All published version strings.
    #[serde(default)]
    pub versions: Vec<String>,
    /// Whether the model can currently run jobs.
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Whether the platform recommends this model.
    #[serde(default)]
    pub is_recommended: Option<bool>,
    /// Tags attached to the model.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// One published version of a model.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersion {
    /// Semantic version string.
    pub version: String,
    /// When this version was published.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Whether this version accepts jobs.
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Input files the model expects.
    #[serde(default)]
    pub inputs: Vec<ModelIo>,
    /// Output files the model produces.
    #[serde(default)]
    pub outputs: Vec<ModelIo>,
    /// Example submission body.
    #[serde(default)]
    pub sample_input: Option<Value>,
    /// Example result body.
    #[serde(default)]
    pub sample_output: Option<Value>,
    /// Processing deadlines configured for this version.
    #[serde(default)]
    pub timeout: Option<ModelTimeouts>,
}

/// Schema entry for one model input or output file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelIo {
    /// File name the model reads or writes.
    pub name: String,
    /// Media types accepted for an input.
    #[serde(default)]
    pub accepted_media_types: Option<String>,
    /// Media type of an output.
    #[serde(default)]
    pub media_type: Option<String>,
    /// Size limit in bytes.
    #[serde(default)]
    pub maximum_size: Option<u64>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Per-stage timeouts of a model version, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTimeouts {
    /// Time allowed for the status check.
    #[serde(default)]
    pub status: Option<u64>,
    /// Time allowed for a run.
    #[serde(default)]
    pub run: Option<u64>,
}

/// Model catalog API, reached through [`Client::models`].
#[derive(Debug, Clone)]
pub struct ModelsClient {
    client: Client,
}

impl ModelsClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches one model by identifier.
    #[instrument(skip(self))]
    pub async fn get(&self, model_id: &str) -> Result<Model> {
        self.client.get(&format!("models/{model_id}")).await
    }

    /// Lists every model visible to the caller.
    #[instrument(skip(self))]
    pub async fn get_all(&self) -> Result<Vec<Model>> {
        self.client.get("models").await
    }

    /// Lists models related to the given one.
    #[instrument(skip(self))]
    pub async fn get_related(&self, model_id: &str) -> Result<Vec<Model>> {
        self.client
            .get(&format!("models/{model_id}/related-models"))
            .await
    }

    /// Lists the published versions of a model.
    #[instrument(skip(self))]
    pub async fn get_versions(&self, model_id: &str) -> Result<Vec<ModelVersion>> {
        self.client.get(&format!("models/{model_id}/versions")).await
    }

    /// Fetches the full detail of one model version.
    #[instrument(skip(self))]
    pub async fn get_version(&self, model_id: &str, version: &str) -> Result<ModelVersion> {
        self.client
            .get(&format!("models/{model_id}/versions/{version}"))
            .await
    }
}
