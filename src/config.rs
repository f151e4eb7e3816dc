use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

/// Top-level analyzer configuration, loaded from YAML with kebab-case keys.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    pub roi: RoiOptions,
    pub ai: AiOptions,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RoiOptions {
    /// Half-size used when a center is given without an explicit radius.
    #[serde(default = "RoiOptions::default_radius")]
    pub radius: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct AiOptions {
    #[serde(default = "AiOptions::default_enabled")]
    pub enabled: bool,
    #[serde(default = "AiOptions::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "AiOptions::default_model")]
    pub model: String,
    #[serde(default = "AiOptions::default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "AiOptions::default_include_image")]
    pub include_image: bool,
    #[serde(default = "AiOptions::default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub secrets_file: Option<PathBuf>,
}

impl Default for RoiOptions {
    fn default() -> Self {
        Self {
            radius: Self::default_radius(),
        }
    }
}

impl RoiOptions {
    const fn default_radius() -> usize {
        15
    }
}

impl Default for AiOptions {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            endpoint: Self::default_endpoint(),
            model: Self::default_model(),
            timeout: Self::default_timeout(),
            include_image: Self::default_include_image(),
            api_key_env: Self::default_api_key_env(),
            secrets_file: None,
        }
    }
}

impl AiOptions {
    const fn default_enabled() -> bool {
        true
    }

    fn default_endpoint() -> String {
        "https://generativelanguage.googleapis.com/v1".to_string()
    }

    fn default_model() -> String {
        "gemini-1.5-flash".to_string()
    }

    const fn default_timeout() -> Duration {
        Duration::from_secs(30)
    }

    const fn default_include_image() -> bool {
        true
    }

    fn default_api_key_env() -> String {
        "GEMINI_API_KEY".to_string()
    }
}

impl Configuration {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.roi.radius > 0, "roi.radius must be positive");
        ensure!(
            !self.ai.endpoint.trim().is_empty(),
            "ai.endpoint must not be blank"
        );
        ensure!(
            self.ai.endpoint.starts_with("https://") || self.ai.endpoint.starts_with("http://"),
            "ai.endpoint must be an http(s) URL, got {}",
            self.ai.endpoint
        );
        ensure!(!self.ai.model.trim().is_empty(), "ai.model must not be blank");
        ensure!(
            !self.ai.timeout.is_zero(),
            "ai.timeout must be greater than zero"
        );
        ensure!(
            !self.ai.api_key_env.trim().is_empty(),
            "ai.api-key-env must not be blank"
        );
        Ok(())
    }

    /// Validate and return self, for builder-style loading.
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }
}

pub fn from_yaml_file(path: &Path) -> Result<Configuration> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let cfg: Configuration = serde_yaml::from_slice(&data)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    Ok(cfg)
}

/// Like [`from_yaml_file`], but a missing file yields the defaults.
pub fn from_yaml_file_or_default(path: &Path) -> Result<Configuration> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file absent; using defaults");
        return Ok(Configuration::default());
    }
    from_yaml_file(path)
}
