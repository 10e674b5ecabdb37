//! Account entitlement checks.

use serde::Deserialize;
use tracing::instrument;

use crate::client::Client;
use crate::error::Result;

/// A capability granted to the calling account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    /// Entitlement identifier, e.g. `CAN_USE_MODEL_CONVERTER`.
    pub identifier: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// What the entitlement allows.
    #[serde(default)]
    pub description: Option<String>,
}

/// Accounting API, reached through [`Client::accounting`].
#[derive(Debug, Clone)]
pub struct AccountingClient {
    client: Client,
}

impl AccountingClient {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Lists the entitlements of the calling account.
    #[instrument(skip(self))]
    pub async fn entitlements(&self) -> Result<Vec<Entitlement>> {
        self.client.get("accounting/entitlements").await
    }

    /// Returns `true` when the account holds the given entitlement.
    #[instrument(skip(self))]
    pub async fn has_entitlement(&self, identifier: &str) -> Result<bool> {
        let entitlements = self.entitlements().await?;
        Ok(entitlements
            .iter()
            .any(|entitlement| entitlement.identifier == identifier))
    }
}
