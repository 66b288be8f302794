//! Configuration file management for muscleden.
//!
//! Provides a TOML-based config file at `~/.config/muscleden/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use muscleden_core::backend::GeminiConfig;
use muscleden_core::session::{SESSION_SECRET_ENV, SessionConfig};
use muscleden_db::config::{DATABASE_URL_ENV, DbConfig};

/// Environment variable overriding the model name.
pub const MODEL_ENV: &str = "MUSCLEDEN_MODEL";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    pub auth: AuthSection,
    #[serde(default)]
    pub generation: GenerationSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSection {
    /// Hex-encoded session secret (64 hex chars = 32 bytes).
    pub session_secret: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the muscleden config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/muscleden` or
/// `~/.config/muscleden`, also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("muscleden");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("muscleden")
}

/// Return the path to the muscleden config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents).context("failed to parse config file")
}

/// Serialize and write the config file, creating parent dirs as needed.
/// The file is owner read/write only on Unix since it holds secrets.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Generate a random session secret: 32 random bytes, hex-encoded (64 chars).
pub fn generate_session_secret() -> String {
    use rand::Rng;
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Settings for the generation backend after resolution.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// Fully resolved configuration, ready for use.
///
/// The session secret and API key are only required by the commands that
/// use them, so their absence is reported lazily.
#[derive(Debug)]
pub struct MuscledenConfig {
    pub db_config: DbConfig,
    session_config: Option<SessionConfig>,
    pub generation: GenerationSettings,
}

impl MuscledenConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `MUSCLEDEN_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Session secret: `MUSCLEDEN_SESSION_SECRET` > `auth.session_secret` (hex-decoded)
    /// - API key: `GEMINI_API_KEY` / `GOOGLE_API_KEY` > `generation.api_key`
    /// - Model: `MUSCLEDEN_MODEL` > `generation.model` > `gemini-2.0-flash`
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();
        Self::resolve_with(cli_db_url, file_config)
    }

    fn resolve_with(cli_db_url: Option<&str>, file_config: Option<ConfigFile>) -> Result<Self> {
        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let db_config = DbConfig::new(db_url);

        let session_config = if let Ok(secret_hex) = std::env::var(SESSION_SECRET_ENV) {
            Some(
                SessionConfig::from_hex(&secret_hex)
                    .with_context(|| format!("{SESSION_SECRET_ENV} env var is not valid"))?,
            )
        } else if let Some(ref cfg) = file_config {
            Some(
                SessionConfig::from_hex(&cfg.auth.session_secret)
                    .context("invalid session_secret in config file")?,
            )
        } else {
            None
        };

        let file_gen = file_config.map(|c| c.generation).unwrap_or_default();
        let api_key = GeminiConfig::api_key_from_env()
            .or(file_gen.api_key)
            .filter(|k| !k.trim().is_empty());
        let model = std::env::var(MODEL_ENV)
            .ok()
            .filter(|m| !m.trim().is_empty())
            .or(file_gen.model)
            .unwrap_or_else(|| GeminiConfig::DEFAULT_MODEL.to_string());
        let base_url = file_gen
            .base_url
            .unwrap_or_else(|| GeminiConfig::DEFAULT_BASE_URL.to_string());
        let timeout = Duration::from_secs(
            file_gen
                .timeout_secs
                .unwrap_or(GeminiConfig::DEFAULT_TIMEOUT_SECS),
        );

        Ok(Self {
            db_config,
            session_config,
            generation: GenerationSettings {
                api_key,
                model,
                base_url,
                timeout,
            },
        })
    }

    /// The session signing config, or an error explaining how to set one.
    pub fn session_config(&self) -> Result<&SessionConfig> {
        match &self.session_config {
            Some(config) => Ok(config),
            None => bail!(
                "session secret not found; set {SESSION_SECRET_ENV} or run `muscleden init` to create a config file"
            ),
        }
    }

    /// Gemini connection settings, or an error if no API key is configured.
    pub fn gemini_config(&self) -> Result<GeminiConfig> {
        let Some(api_key) = self.generation.api_key.clone() else {
            bail!(
                "Gemini API key not found; set GEMINI_API_KEY or run `muscleden init --api-key <KEY>`"
            );
        };
        let mut config = GeminiConfig::new(api_key);
        config.model = self.generation.model.clone();
        config.base_url = self.generation.base_url.clone();
        config.timeout = self.generation.timeout;
        Ok(config)
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
