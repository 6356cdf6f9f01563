//! Example: Credential auth and a paged collection fetch.
//!
//! Run with: cargo run --example collection_fetch

use std::sync::Arc;

use appnexus_api_client::auth::EnvCredentials;
use appnexus_api_client::rest::{AppNexusClient, FieldFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Some(credentials) = EnvCredentials::try_from_env() else {
        println!("Set APPNEXUS_USERNAME and APPNEXUS_PASSWORD to run this example.");
        return Ok(());
    };

    let client = AppNexusClient::builder()
        .credentials(Arc::new(credentials))
        .build()?;

    let advertiser_id = std::env::var("APPNEXUS_ADVERTISER_ID").unwrap_or_else(|_| "0".into());

    // Existence check: None when the advertiser is not visible to this user.
    match client.get(&format!("/advertiser?id={advertiser_id}")).await? {
        Some(values) => println!("Advertiser: {}", values["advertiser"]["name"]),
        None => println!("Advertiser {advertiser_id} not found"),
    }

    let active = client
        .get_all(
            "line-items",
            &format!("/line-item?advertiser_id={advertiser_id}"),
            &[FieldFilter::new("state", "active")],
        )
        .await?;
    println!("{} active line items", active.len());

    let quota = client.throttle().snapshot().await;
    println!(
        "Reads used: {}/{}",
        quota.read.requests_made, quota.read.request_limit
    );

    Ok(())
}
