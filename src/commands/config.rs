//! `dog config` — inspect and update the stored configuration.

use anyhow::Result;

use crate::config::{self, DatadogSite, PartialConfig};

/// Prints the resolved configuration with masked keys.
pub fn show() -> Result<()> {
    let path = config::config_path()?;
    let config = config::load()?;

    println!("Config file: {}", path.display());
    println!("api_key: {}", mask(&config.api_key));
    println!("app_key: {}", mask(&config.app_key));
    println!("site: {}", config.site);
    Ok(())
}

/// Persists the given values to the config file.
pub fn set(
    api_key: Option<String>,
    app_key: Option<String>,
    site: Option<DatadogSite>,
) -> Result<()> {
    if api_key.is_none() && app_key.is_none() && site.is_none() {
        anyhow::bail!("Nothing to set. Pass --api-key, --app-key, or --site.");
    }

    let path = config::save(PartialConfig {
        api_key,
        app_key,
        site,
    })?;
    println!("Saved config to {}", path.display());
    Ok(())
}

/// Masks a credential, keeping only the last four characters.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        "****".to_string()
    } else {
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), visible)
    }
}
