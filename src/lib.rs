//! # AppNexus Client
//!
//! An async Rust client core for the AppNexus REST API.
//!
//! ## Features
//!
//! - Shared session tokens per credential set, refreshed when the server
//!   reports them expired
//! - Username/password and RSA-signed app authentication
//! - Read/write quota tracking from response telemetry, with backoff until the
//!   next quota period on `RATE_EXCEEDED`
//! - Paged collection retrieval with exact-match filtering
//! - A closed error taxonomy mirroring AppNexus `error_id` values
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use appnexus_api_client::auth::StaticCredentials;
//! use appnexus_api_client::rest::AppNexusClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let credentials = Arc::new(StaticCredentials::new("api_user", "password"));
//!     let client = AppNexusClient::builder().credentials(credentials).build()?;
//!
//!     let campaigns = client.get_all("campaigns", "/campaign?advertiser_id=10", &[]).await?;
//!     println!("{} campaigns", campaigns.len());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod rest;
pub mod types;

// Re-export commonly used types at crate root
pub use config::ClientConfig;
pub use error::{ApiError, AppNexusError, ErrorKind};
pub use types::{AuthToken, ClientIdentity, TrafficClass, Values};

/// Result type alias using AppNexusError
pub type Result<T> = std::result::Result<T, AppNexusError>;
