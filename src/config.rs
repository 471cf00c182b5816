//! Configuration loading from `~/.dogrc` and `DD_*` environment variables.
//!
//! The config file uses dotenv format (`DD_API_KEY=...` lines). Environment
//! variables take precedence over file values on a per-key basis.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fmt, fs};

use anyhow::{Context, Result};
use log::debug;

const API_KEY_VAR: &str = "DD_API_KEY";
const APP_KEY_VAR: &str = "DD_APP_KEY";
const SITE_VAR: &str = "DD_SITE";

/// Regional and governmental Datadog API domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatadogSite {
    #[default]
    Us1,
    Us3,
    Us5,
    Eu1,
    Ap1,
    Gov,
}

impl DatadogSite {
    pub const ALL: [DatadogSite; 6] = [
        DatadogSite::Us1,
        DatadogSite::Us3,
        DatadogSite::Us5,
        DatadogSite::Eu1,
        DatadogSite::Ap1,
        DatadogSite::Gov,
    ];

    /// The site's API domain.
    pub fn domain(&self) -> &'static str {
        match self {
            DatadogSite::Us1 => "datadoghq.com",
            DatadogSite::Us3 => "us3.datadoghq.com",
            DatadogSite::Us5 => "us5.datadoghq.com",
            DatadogSite::Eu1 => "datadoghq.eu",
            DatadogSite::Ap1 => "ap1.datadoghq.com",
            DatadogSite::Gov => "ddog-gov.com",
        }
    }

    /// Base API URL for this site.
    pub fn base_url(&self) -> String {
        format!("https://api.{}", self.domain())
    }
}

impl fmt::Display for DatadogSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.domain())
    }
}

impl FromStr for DatadogSite {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatadogSite::ALL
            .iter()
            .copied()
            .find(|site| site.domain() == s)
            .ok_or_else(|| ConfigError::InvalidSite(s.to_string()))
    }
}

/// Configuration errors with actionable messages.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Required keys absent from both the config file and the environment.
    MissingKeys(Vec<&'static str>),
    /// A site value outside the known set.
    InvalidSite(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingKeys(keys) => {
                write!(
                    f,
                    "Missing required config: {}. Set them in ~/.dogrc or as environment variables.",
                    keys.join(", ")
                )
            }
            ConfigError::InvalidSite(site) => {
                write!(
                    f,
                    "Invalid {}: {}. Valid values: {}",
                    SITE_VAR,
                    site,
                    valid_sites()
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn valid_sites() -> String {
    DatadogSite::ALL
        .iter()
        .map(|site| site.domain())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolved client configuration. The API client treats this as validated
/// input and performs no further checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: String,
    pub app_key: String,
    pub site: DatadogSite,
}

/// One configuration layer before merging; every field optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialConfig {
    pub api_key: Option<String>,
    pub app_key: Option<String>,
    pub site: Option<DatadogSite>,
}

impl PartialConfig {
    /// Overlays `other` on top of `self`; fields set in `other` win.
    fn merge(self, other: PartialConfig) -> PartialConfig {
        PartialConfig {
            api_key: other.api_key.or(self.api_key),
            app_key: other.app_key.or(self.app_key),
            site: other.site.or(self.site),
        }
    }
}

/// Path of the config file: `~/.dogrc`.
pub fn config_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".dogrc"))
        .context("Could not determine home directory")
}

/// Loads and validates the configuration from `~/.dogrc` merged with `DD_*`
/// environment variables.
pub fn load() -> Result<Config> {
    let merged = load_file(&config_path()?).merge(load_env()?);
    Ok(resolve(merged)?)
}

/// Persists the given values to `~/.dogrc`, preserving existing entries.
/// Returns the path written.
pub fn save(values: PartialConfig) -> Result<PathBuf> {
    let path = config_path()?;
    save_to(&path, values)?;
    Ok(path)
}

fn resolve(merged: PartialConfig) -> Result<Config, ConfigError> {
    match (merged.api_key, merged.app_key) {
        (Some(api_key), Some(app_key)) => Ok(Config {
            api_key,
            app_key,
            site: merged.site.unwrap_or_default(),
        }),
        (api_key, app_key) => {
            let mut missing = Vec::new();
            if api_key.is_none() {
                missing.push(API_KEY_VAR);
            }
            if app_key.is_none() {
                missing.push(APP_KEY_VAR);
            }
            Err(ConfigError::MissingKeys(missing))
        }
    }
}

/// Reads one config layer from a dotenv-format file. A missing or unreadable
/// file yields an empty layer; an unknown site value in the file is ignored.
fn load_file(path: &Path) -> PartialConfig {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(err) => {
            if !err.not_found() {
                debug!("Could not read {}: {}", path.display(), err);
            }
            return PartialConfig::default();
        }
    };

    let mut config = PartialConfig::default();
    for entry in entries {
        let (key, value) = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Skipping malformed line in {}: {}", path.display(), err);
                continue;
            }
        };
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            API_KEY_VAR => config.api_key = Some(value),
            APP_KEY_VAR => config.app_key = Some(value),
            SITE_VAR => config.site = value.parse().ok(),
            _ => {}
        }
    }
    config
}

/// Reads one config layer from the environment. An unknown site value here is
/// an error, unlike in the file.
fn load_env() -> Result<PartialConfig, ConfigError> {
    let mut config = PartialConfig {
        api_key: env::var(API_KEY_VAR).ok().filter(|v| !v.is_empty()),
        app_key: env::var(APP_KEY_VAR).ok().filter(|v| !v.is_empty()),
        site: None,
    };
    if let Some(value) = env::var(SITE_VAR).ok().filter(|v| !v.is_empty()) {
        config.site = Some(value.parse()?);
    }
    Ok(config)
}

fn save_to(path: &Path, values: PartialConfig) -> Result<()> {
    let merged = load_file(path).merge(values);

    let mut lines = Vec::new();
    if let Some(api_key) = &merged.api_key {
        lines.push(format!("{}={}", API_KEY_VAR, api_key));
    }
    if let Some(app_key) = &merged.app_key {
        lines.push(format!("{}={}", APP_KEY_VAR, app_key));
    }
    if let Some(site) = merged.site {
        lines.push(format!("{}={}", SITE_VAR, site));
    }

    fs::write(path, lines.join("\n") + "\n")
        .with_context(|| format!("Failed to write {}", path.display()))?;

    // The file holds credentials; keep it private to the owner
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_site_parse_and_display_roundtrip() {
        for site in DatadogSite::ALL {
            let parsed: DatadogSite = site.domain().parse().unwrap();
            assert_eq!(parsed, site);
            assert_eq!(parsed.to_string(), site.domain());
        }
    }

    #[test]
    fn test_site_parse_rejects_unknown_domain() {
        let err = "datadoghq.invalid".parse::<DatadogSite>().unwrap_err();
        assert!(err.to_string().contains("Invalid DD_SITE"));
        assert!(err.to_string().contains("datadoghq.com"));
    }

    #[test]
    fn test_site_base_url() {
        assert_eq!(
            DatadogSite::Us1.base_url(),
            "https://api.datadoghq.com"
        );
        assert_eq!(
            DatadogSite::Gov.base_url(),
            "https://api.ddog-gov.com"
        );
    }

    #[test]
    fn test_default_site_is_us1() {
        assert_eq!(DatadogSite::default(), DatadogSite::Us1);
    }

    #[test]
    fn test_load_file_handles_dotenv_syntax() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".dogrc");
        fs::write(
            &path,
            "# comment\n\nDD_API_KEY=abc # inline comment\nDD_APP_KEY=\"quoted\"\nDD_SITE=datadoghq.eu\n",
        )
        .unwrap();

        let config = load_file(&path);
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.app_key.as_deref(), Some("quoted"));
        assert_eq!(config.site, Some(DatadogSite::Eu1));
    }

    #[test]
    fn test_load_file_missing_yields_empty_layer() {
        let dir = tempdir().unwrap();
        let config = load_file(&dir.path().join(".dogrc"));
        assert_eq!(config, PartialConfig::default());
    }

    #[test]
    fn test_load_file_reads_known_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".dogrc");
        fs::write(
            &path,
            "DD_API_KEY=aaa\nDD_APP_KEY=bbb\nDD_SITE=datadoghq.eu\nOTHER=ignored\n",
        )
        .unwrap();

        let config = load_file(&path);
        assert_eq!(config.api_key.as_deref(), Some("aaa"));
        assert_eq!(config.app_key.as_deref(), Some("bbb"));
        assert_eq!(config.site, Some(DatadogSite::Eu1));
    }

    #[test]
    fn test_load_file_ignores_invalid_site() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".dogrc");
        fs::write(&path, "DD_API_KEY=aaa\nDD_SITE=nonsense\n").unwrap();

        let config = load_file(&path);
        assert_eq!(config.api_key.as_deref(), Some("aaa"));
        assert_eq!(config.site, None);
    }

    #[test]
    fn test_merge_later_layer_wins_per_key() {
        let file = PartialConfig {
            api_key: Some("file-api".to_string()),
            app_key: Some("file-app".to_string()),
            site: Some(DatadogSite::Eu1),
        };
        let env = PartialConfig {
            api_key: Some("env-api".to_string()),
            app_key: None,
            site: None,
        };

        let merged = file.merge(env);
        assert_eq!(merged.api_key.as_deref(), Some("env-api"));
        assert_eq!(merged.app_key.as_deref(), Some("file-app"));
        assert_eq!(merged.site, Some(DatadogSite::Eu1));
    }

    #[test]
    fn test_resolve_requires_both_keys() {
        let err = resolve(PartialConfig::default()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingKeys(vec![API_KEY_VAR, APP_KEY_VAR])
        );
        assert!(err.to_string().contains("Missing required config"));

        let err = resolve(PartialConfig {
            api_key: Some("aaa".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::MissingKeys(vec![APP_KEY_VAR]));
    }

    #[test]
    fn test_resolve_defaults_site() {
        let config = resolve(PartialConfig {
            api_key: Some("aaa".to_string()),
            app_key: Some("bbb".to_string()),
            site: None,
        })
        .unwrap();
        assert_eq!(config.site, DatadogSite::Us1);
    }

    #[test]
    fn test_save_to_merges_with_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".dogrc");
        fs::write(&path, "DD_API_KEY=old-api\nDD_APP_KEY=old-app\n").unwrap();

        save_to(
            &path,
            PartialConfig {
                api_key: Some("new-api".to_string()),
                app_key: None,
                site: Some(DatadogSite::Ap1),
            },
        )
        .unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("DD_API_KEY=new-api"));
        assert!(written.contains("DD_APP_KEY=old-app"));
        assert!(written.contains("DD_SITE=ap1.datadoghq.com"));
    }

    #[cfg(unix)]
    #[test]
    fn test_save_to_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join(".dogrc");
        save_to(
            &path,
            PartialConfig {
                api_key: Some("secret".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
