//! AppNexus REST API client.
//!
//! [`AppNexusClient`] is the composition root: it authenticates through the
//! shared token cache, feeds the throttle coordinator, and classifies every
//! response.
//!
//! ```rust,ignore
//! use appnexus_api_client::rest::{AppNexusClient, FieldFilter};
//!
//! let client = AppNexusClient::builder().credentials(credentials).build()?;
//!
//! // Existence check: `None` when the object is absent
//! let profile = client.get("/profile?id=77").await?;
//!
//! // Mutation: any error fails the call
//! let id = client.create("/campaign?advertiser_id=10", &body).await?;
//!
//! // Paged collection
//! let items = client.get_all("line-items", "/line-item", &[FieldFilter::new("state", "active")]).await?;
//! ```

mod client;
pub mod endpoints;
mod operations;
mod pager;
pub mod response;

pub use client::{AppNexusClient, AppNexusClientBuilder};
pub use pager::{CollectionPager, FieldFilter, PageCursor};
pub use response::FatalityPolicy;
