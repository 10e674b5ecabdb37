//! gRPC client for edge deployments of the model platform.
//!
//! Edge servers run the inference engine on-premise or on-device and expose
//! the job lifecycle over gRPC instead of REST. This crate provides
//! [`EdgeClient`], a thin async client mirroring the shape of the hosted
//! API: submit inputs, watch the job, fetch per-input results.
//!
//! Input shapes and validation are shared with the hosted client through
//! [`modelgrid_sdk::sources`], so code can move between the two transports
//! without reshaping its payloads.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use modelgrid_edge::EdgeClient;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = EdgeClient::connect("localhost", 55000).await?;
//! let job = client
//!     .submit_text(
//!         "ed542963de",
//!         "0.0.27",
//!         json!({"input.txt": "Modzy is great!"}),
//!         false,
//!     )
//!     .await?;
//! client
//!     .block_until_complete(&job, None, Duration::from_millis(10))
//!     .await?;
//! let results = client.get_results(&job).await?;
//! println!("{} of {} inputs completed", results.completed, results.total);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod proto;

pub use client::{EdgeClient, EdgeOptions};
pub use error::{EdgeError, Result};
