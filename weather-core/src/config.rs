use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, net::SocketAddr, path::PathBuf};

use crate::error::WeatherError;

pub const DEFAULT_API_URL: &str = "http://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_IMAGE_HOST: &str = "openweathermap.org";

/// Top-level configuration, stored on disk and overridable from the environment.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// bind_address = "0.0.0.0:8080"
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Provider API key. Never printed, see the `Debug` impl.
    pub api_key: Option<String>,

    /// Current-conditions endpoint of the provider.
    pub api_url: String,

    /// Host serving condition icons.
    pub image_host: String,

    pub bind_address: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            image_host: DEFAULT_IMAGE_HOST.to_string(),
            bind_address: default_bind_address(),
        }
    }
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("image_host", &self.image_host)
            .field("bind_address", &self.bind_address)
            .finish()
    }
}

/// Values accepted from `WEATHER_*` environment variables.
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    api_key: Option<String>,
    api_url: Option<String>,
    image_host: Option<String>,
    bind_address: Option<SocketAddr>,
}

/// Unprefixed `API_KEY`, kept for `.env` files written for older deployments.
#[derive(Debug, Default, Deserialize)]
struct LegacyEnv {
    api_key: Option<String>,
}

impl Config {
    /// Load config from disk (if present), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;
        cfg.apply_env(std::env::vars())?;
        Ok(cfg)
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    /// Apply `WEATHER_*` variables (and the legacy `API_KEY`) from `vars`.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();

        let overrides: EnvOverrides = envy::prefixed("WEATHER_")
            .from_iter(vars.clone())
            .context("Invalid WEATHER_* environment variable")?;
        let legacy: LegacyEnv =
            envy::from_iter(vars).context("Invalid API_KEY environment variable")?;

        if let Some(key) = overrides.api_key.or(legacy.api_key).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = overrides.api_url {
            self.api_url = url;
        }
        if let Some(host) = overrides.image_host {
            self.image_host = host;
        }
        if let Some(addr) = overrides.bind_address {
            self.bind_address = addr;
        }

        Ok(())
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-web", "weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Returns the API key, or a configuration error with a hint on how to set it.
    pub fn require_api_key(&self) -> Result<&str, WeatherError> {
        self.api_key.as_deref().ok_or_else(|| {
            WeatherError::Config(
                "No API key configured.\n\
                 Hint: set WEATHER_API_KEY (or API_KEY) or run `weather configure`."
                    .to_string(),
            )
        })
    }
}
