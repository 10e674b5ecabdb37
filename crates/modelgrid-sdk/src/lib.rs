//! Rust SDK for the Modelgrid inference platform.
//!
//! Modelgrid runs machine-learning models as jobs: you submit inputs to a
//! deployed model version, the platform fans them out to model containers,
//! and you collect per-source results. This crate wraps the platform's REST
//! API in a typed async client.
//!
//! ## Features
//!
//! - Job submission for text, embedded binary, S3-hosted and JDBC inputs,
//!   plus chunked uploads for payloads beyond the request size limit
//! - Polling helpers that block until a job or result reaches a terminal
//!   state, with deadline control
//! - Model catalog, tag, entitlement and model converter endpoints
//! - Errors mapped to the platform's HTTP error contract
//! - TLS via `rustls` (default) or `native-tls` (feature flag)
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use modelgrid_sdk::Client;
//! use serde_json::json;
//!
//! # async fn run() -> modelgrid_sdk::Result<()> {
//! let client = Client::builder()
//!     .base_url("https://modelgrid.example.com/api")
//!     .api_key("key-id.key-body")
//!     .build()?;
//!
//! let job = client
//!     .jobs()
//!     .submit_text(
//!         "ed542963de",
//!         "0.0.27",
//!         json!({"input.txt": "a short review to classify"}),
//!         false,
//!     )
//!     .await?;
//!
//! let result = client
//!     .results()
//!     .block_until_complete(&job.job_identifier, None, Duration::from_secs(5))
//!     .await?;
//! println!("{}", result.first_outputs()?);
//! # Ok(())
//! # }
//! ```
//!
//! The builder also reads `MODELGRID_BASE_URL` and `MODELGRID_API_KEY` via
//! [`ClientBuilder::from_env`], and [`Client::discover_base_url`] probes for
//! deployments that serve the API under an `api/` path segment.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod accounting;
pub mod client;
pub mod config;
pub mod converter;
pub mod error;
pub mod jobs;
pub mod models;
pub mod results;
pub mod size;
pub mod sources;
pub mod tags;
mod util;

pub use accounting::{AccountingClient, Entitlement};
pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use converter::{ConverterClient, ConverterJob, ConverterReceipt, ConverterStatus};
pub use error::{Error, Result};
pub use jobs::{
    Job, JobFeatures, JobHistoryParams, JobStatus, JobsClient, JdbcParams, ModelRef,
    SortDirection,
};
pub use models::{Model, ModelIo, ModelTimeouts, ModelVersion, ModelsClient};
pub use results::{JobResult, ResultsClient};
pub use sources::{ByteSources, FileInput, FileSources};
pub use tags::{Tag, TagsAndModels, TagsClient};
