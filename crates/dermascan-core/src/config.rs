//! Configuration management for dermascan.
//!
//! Loads configuration from ${DERMASCAN_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the API base URL.
pub const API_URL_ENV: &str = "DERMASCAN_API_URL";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly (or run `cargo xtask`).
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// This ensures new comments/sections from the template are always present,
/// while preserving user's customized values.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;

    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for dermascan configuration and session data.
    //!
    //! DERMASCAN_HOME resolution order:
    //! 1. DERMASCAN_HOME environment variable (if set)
    //! 2. ~/.config/dermascan (default)
    //! 3. ./.dermascan when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the dermascan home directory.
    pub fn dermascan_home() -> PathBuf {
        if let Ok(home) = std::env::var("DERMASCAN_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".dermascan"),
            |h| h.join(".config").join("dermascan"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        dermascan_home().join("config.toml")
    }

    /// Returns the path to the persisted session file.
    pub fn session_path() -> PathBuf {
        dermascan_home().join("session.json")
    }
}

/// Diagnostic service connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the diagnostic service
    pub base_url: String,
    /// Request timeout in seconds (0 disables)
    pub timeout_secs: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: Config::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 0,
        }
    }
}

/// Diagnostic presentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticSettings {
    /// Score used when the service omits a confidence value.
    pub placeholder_confidence: f64,
}

impl Default for DiagnosticSettings {
    fn default() -> Self {
        Self {
            placeholder_confidence: Config::DEFAULT_PLACEHOLDER_CONFIDENCE,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// tracing filter directive
    pub level: String,
    /// Optional log file; stderr when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiSettings,
    pub diagnostic: DiagnosticSettings,
    pub log: LogSettings,
}

impl Config {
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
    const DEFAULT_PLACEHOLDER_CONFIDENCE: f64 = 0.95;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the base URL with precedence: flag > env > config > default.
    ///
    /// # Errors
    /// Returns an error if the winning value is not a valid URL.
    pub fn effective_base_url(&self, flag: Option<&str>) -> Result<String> {
        let env = std::env::var(API_URL_ENV).ok();
        let candidates = [flag, env.as_deref(), Some(self.api.base_url.as_str())];

        let chosen = candidates
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .unwrap_or(Self::DEFAULT_BASE_URL);

        url::Url::parse(chosen).with_context(|| format!("Invalid API base URL: {chosen}"))?;
        Ok(chosen.trim_end_matches('/').to_string())
    }

    pub fn timeout(&self) -> Option<Duration> {
        if self.api.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.api.timeout_secs)))
        }
    }

    /// Placeholder score, clamped into [0, 1].
    pub fn placeholder_confidence(&self) -> f64 {
        let value = self.diagnostic.placeholder_confidence;
        if value.is_nan() {
            Self::DEFAULT_PLACEHOLDER_CONFIDENCE
        } else {
            value.clamp(0.0, 1.0)
        }
    }

    /// Saves only the api.base_url field to the config file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or written.
    pub fn save_base_url(base_url: &str) -> Result<()> {
        Self::save_base_url_to(&paths::config_path(), base_url)
    }

    /// Saves only the api.base_url field to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// If file exists, merges user values into the latest template.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the file cannot be written.
    pub fn save_base_url_to(path: &Path, base_url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let trimmed = base_url.trim();
        url::Url::parse(trimmed).with_context(|| format!("Invalid API base URL: {trimmed}"))?;

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["api"]["base_url"] = value(trimmed);

        Self::write_config(path, &doc.to_string())
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    ///
    /// # Errors
    /// Returns an error if the file exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Used by `cargo xtask update-default-config` to keep
    /// `default_config.toml` in sync with `Config::default()`.
    ///
    /// # Errors
    /// Returns an error if serialization or template parsing fails.
    pub fn generate() -> Result<String> {
        use toml_edit::DocumentMut;

        let generated_toml = toml::to_string(&Config::default())
            .context("Failed to serialize default config to TOML")?;

        let mut doc: DocumentMut = default_config_template()
            .parse()
            .context("Failed to parse default config template")?;

        let generated_doc: DocumentMut = generated_toml
            .parse()
            .context("Failed to parse generated config")?;

        merge_items(doc.as_table_mut(), generated_doc.as_table());

        Ok(doc.to_string())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}
