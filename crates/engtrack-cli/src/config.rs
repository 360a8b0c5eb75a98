//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `$ENGTRACK_CONFIG` environment variable
//! 2. `<platform config dir>/engtrack/config.toml`
//! 3. Built-in defaults (everything is optional)
//!
//! Command-line flags override whatever the file says.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_DB_PATH: &str = "./engagements.json";
pub const DEFAULT_CSV_PATH: &str = "metrics_report.csv";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub report: ReportConfig,
    pub debug: DebugConfig,
}

/// Engagement file settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON store path. Default: `./engagements.json`.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Where the complete-metrics report writes its CSV copy.
    pub csv_path: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            csv_path: DEFAULT_CSV_PATH.into(),
        }
    }
}

/// Values resolved from config file and flags, handed to the store and the
/// metrics engine at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub csv_path: PathBuf,
    pub debug: bool,
}

impl Settings {
    pub fn resolve(config: &Config, db_flag: Option<PathBuf>, debug_flag: bool) -> Self {
        let db_path = db_flag
            .or_else(|| config.store.path.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        Self {
            db_path,
            csv_path: PathBuf::from(&config.report.csv_path),
            debug: debug_flag || config.debug.enabled,
        }
    }
}

/// Load config from disk. Returns defaults if no config file exists.
pub fn load_config() -> Result<Config> {
    let path = config_path();

    if let Some(p) = &path {
        if p.exists() {
            let content =
                std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            let config: Config =
                toml::from_str(&content).with_context(|| format!("parsing {}", p.display()))?;
            return Ok(config);
        }
    }

    Ok(Config::default())
}

fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("ENGTRACK_CONFIG") {
        return Some(PathBuf::from(p));
    }

    directories::ProjectDirs::from("dev", "engtrack", "engtrack")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Show the active config path (for `engtrack config`).
pub fn show_config_path() -> String {
    match config_path() {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.store.path.is_none());
        assert_eq!(config.report.csv_path, "metrics_report.csv");
        assert!(!config.debug.enabled);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[store]
path = "/srv/assessments/engagements.json"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.store.path.as_deref(),
            Some("/srv/assessments/engagements.json")
        );
        // Other fields should be defaults
        assert_eq!(config.report.csv_path, DEFAULT_CSV_PATH);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[store]
path = "db.json"

[report]
csv_path = "/tmp/report.csv"

[debug]
enabled = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.report.csv_path, "/tmp/report.csv");
        assert!(config.debug.enabled);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::resolve(&Config::default(), None, false);
        assert_eq!(settings.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(settings.csv_path, PathBuf::from(DEFAULT_CSV_PATH));
        assert!(!settings.debug);
    }

    #[test]
    fn test_flags_override_file() {
        let config: Config = toml::from_str("[store]\npath = \"from-file.json\"\n").unwrap();
        let settings = Settings::resolve(&config, Some(PathBuf::from("flag.json")), true);
        assert_eq!(settings.db_path, PathBuf::from("flag.json"));
        assert!(settings.debug);

        let settings = Settings::resolve(&config, None, false);
        assert_eq!(settings.db_path, PathBuf::from("from-file.json"));
    }
}
