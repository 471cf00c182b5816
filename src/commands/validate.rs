//! `dog validate` — check the configured credentials against the API.

use anyhow::Result;

use crate::api::DatadogClient;
use crate::config;

/// Runs the validation call and reports the outcome. Returns whether the
/// credentials are valid; config errors propagate normally.
pub async fn run(api_url: Option<String>) -> Result<bool> {
    let config = config::load()?;
    let mut client = DatadogClient::new(&config)?;
    if let Some(url) = api_url {
        client = client.with_base_url(url);
    }

    println!("Validating credentials...");
    let valid = client.validate().await;
    if valid {
        println!("Credentials valid!");
    } else {
        println!("Invalid credentials");
    }
    Ok(valid)
}
