//! Sources for the API key that gates the optional AI step.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// Supplies the AI endpoint credential, if one is configured.
pub trait CredentialProvider: Send + Sync {
    /// Blank values are reported as `None`.
    fn api_key(&self) -> Option<String>;
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Reads the key from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialProvider for EnvCredentials {
    fn api_key(&self) -> Option<String> {
        std::env::var(&self.var).ok().and_then(non_blank)
    }
}

/// A flat YAML map of secret names to values, e.g. `GEMINI_API_KEY: "..."`.
#[derive(Debug, Clone)]
pub struct SecretsFile {
    path: PathBuf,
    key: String,
    secrets: BTreeMap<String, String>,
}

impl SecretsFile {
    pub fn load(path: &Path, key: impl Into<String>) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read secrets at {}", path.display()))?;
        let secrets: BTreeMap<String, String> = serde_yaml::from_slice(&data)
            .with_context(|| format!("failed to parse secrets at {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            key: key.into(),
            secrets,
        })
    }
}

impl CredentialProvider for SecretsFile {
    fn api_key(&self) -> Option<String> {
        let found = self.secrets.get(&self.key).cloned().and_then(non_blank);
        if found.is_none() {
            debug!(path = %self.path.display(), key = %self.key, "secret not present");
        }
        found
    }
}

/// Fixed value, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub Option<String>);

impl CredentialProvider for StaticCredentials {
    fn api_key(&self) -> Option<String> {
        self.0.clone().and_then(non_blank)
    }
}

/// Tries each provider in order and returns the first key found.
#[derive(Default)]
pub struct ChainedCredentials {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl ChainedCredentials {
    #[must_use]
    pub fn with(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl CredentialProvider for ChainedCredentials {
    fn api_key(&self) -> Option<String> {
        self.providers.iter().find_map(|p| p.api_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_static_key_counts_as_missing() {
        assert_eq!(StaticCredentials(Some("   ".into())).api_key(), None);
        assert_eq!(StaticCredentials(None).api_key(), None);
        assert_eq!(
            StaticCredentials(Some(" abc ".into())).api_key().as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn secrets_file_looks_up_named_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.yaml");
        std::fs::write(&path, "GEMINI_API_KEY: from-file\nOTHER: x\n").unwrap();
        let hit = SecretsFile::load(&path, "GEMINI_API_KEY").unwrap();
        assert_eq!(hit.api_key().as_deref(), Some("from-file"));
        let miss = SecretsFile::load(&path, "NOPE").unwrap();
        assert_eq!(miss.api_key(), None);
    }

    #[test]
    fn chain_returns_first_available() {
        let chain = ChainedCredentials::default()
            .with(StaticCredentials(None))
            .with(StaticCredentials(Some("second".into())))
            .with(StaticCredentials(Some("third".into())));
        assert_eq!(chain.api_key().as_deref(), Some("second"));
        assert_eq!(ChainedCredentials::default().api_key(), None);
    }

    #[test]
    fn unset_env_var_is_missing() {
        let creds = EnvCredentials::new("FLUORO_ANALYZER_TEST_UNSET_KEY_7F3A");
        assert_eq!(creds.api_key(), None);
    }
}
