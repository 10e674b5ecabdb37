//! Model tag operations.

use serde::Deserialize;
use tracing::instrument;

use crate::client::Client;
use crate::error::Result;
use crate::models::Model;

/// A category tag attached to models.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Tag identifier, e.g. `language_and_text`.
    pub identifier: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Kind of data the tagged models work on.
    #[serde(default)]
    pub data_type: Option<String>,
}

/// Tags together with the models carrying all of them.
#[derive(Debug, Clone, Deserialize)]
pub struct TagsAndModels {
    /// The tags that were queried.
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Models carrying every queried tag.
    #[serde(default)]
    pub models: Vec<Model>,
}

/// Tags API, reached through [`Client::tags`].
#[derive(Debug, Clone)]
pub struct TagsClient {
    client: Client,
}

impl TagsClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Lists every tag.
    #[instrument(skip(self))]
    pub async fn get_all(&self) -> Result<Vec<Tag>> {
        self.client.get("models/tags").await
    }

    /// Fetches the models carrying all of the given tags.
    #[instrument(skip(self))]
    pub async fn get_tags_and_models(&self, identifiers: &[&str]) -> Result<TagsAndModels> {
        let joined = identifiers.join(",");
        self.client.get(&format!("models/tags/{joined}")).await
    }
}
