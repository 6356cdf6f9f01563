//! Example: Signed app auth, with clients sharing one session and one quota.
//!
//! Run with: cargo run --example shared_session

use std::sync::Arc;
use std::time::Duration;

use appnexus_api_client::auth::{AppCredentials, AuthStrategy, TokenCache};
use appnexus_api_client::rate_limit::ThrottleCoordinator;
use appnexus_api_client::rest::AppNexusClient;
use appnexus_api_client::AppNexusError;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();

    let Some(credentials) = AppCredentials::try_from_env() else {
        println!(
            "Set APPNEXUS_APP_ID, APPNEXUS_APP_USER_ID and APPNEXUS_PRIVATE_KEY_PEM to run this example."
        );
        return Ok(());
    };
    let strategy = AuthStrategy::signed(credentials)?;

    let tokens = Arc::new(TokenCache::new());
    let throttle = Arc::new(ThrottleCoordinator::new());
    let shutdown = CancellationToken::new();

    let build = || {
        AppNexusClient::builder()
            .auth_strategy(strategy.clone())
            .token_cache(tokens.clone())
            .throttle(throttle.clone())
            .cancellation(shutdown.clone())
            .max_wait(Duration::from_secs(120))
            .build()
    };
    let reporting = build()?;
    let trafficking = build()?;

    let (user, members) = tokio::join!(
        reporting.get("/user/current"),
        trafficking.get_all("members", "/member", &[]),
    );

    match user {
        Ok(Some(values)) => println!("Signed in as {}", values["user"]["username"]),
        Ok(None) => println!("Current user not found"),
        Err(AppNexusError::RateLimitExceeded(e)) => println!("Quota exhausted: {e}"),
        Err(e) => return Err(e.into()),
    }
    println!("{} members visible", members?.len());
    println!("{} session(s) cached", tokens.len().await);

    Ok(())
}
