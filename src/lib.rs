//! # BigPanda API
//!
//! A Rust client library for the [BigPanda](https://www.bigpanda.io/) REST API.
//!
//! ## Features
//!
//! - Maintenance plans: create, list, delete, and stop scheduled alert
//!   suppression windows
//! - Mapping enrichments: define a lookup-table schema and upload table
//!   data, waiting for the server-side processing job to finish
//! - OIM alerts: send alerts with arbitrary key/value properties to an
//!   Open Integration Manager integration
//!
//! ## Example
//!
//! ```rust,no_run
//! use bigpanda_api::{BigPandaClient, ClientConfig};
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BigPandaClient::new(ClientConfig::new("API-KEY"))?;
//!
//!     let rows: Vec<HashMap<String, String>> = vec![
//!         HashMap::from([
//!             ("host".to_string(), "web-1".to_string()),
//!             ("service".to_string(), "billing".to_string()),
//!         ]),
//!     ];
//!
//!     // Uploads the rows as CSV and polls the enrichment job until it
//!     // reaches a terminal status.
//!     client.mapping_update_table(&rows, "service").await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod errors;
mod table;
mod types;

pub use client::BigPandaClient;
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_OIM_URL, DEFAULT_RESOURCES_URL};
pub use errors::{BigPandaError, Result};
pub use types::{
    JobState, MaintenancePlan, MappingEnrichment, MappingEnrichmentConfig, MappingSchema,
    NewMaintenancePlan, OimAlert, OimAlertStatus,
};
