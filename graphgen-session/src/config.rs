//! Configuration loaded from `graphgen.toml`
//!
//! ```toml
//! [provider]
//! kind = "openai"            # openai | anthropic | gemini | local
//! model = "gpt-4o-mini"
//! timeout_secs = 120
//!
//! [output]
//! path = "graph.svg"
//!
//! [log]
//! file = "graphgen_errors.log"
//!
//! [cache]
//! enabled = true
//! dir = ".graphgen_cache"
//!
//! [params]
//! u = 0
//! a = 9.81
//! ```

use graphgen_core::provider::DEFAULT_TIMEOUT_SECS;
use graphgen_core::{Bindings, ProviderConfig, ProviderType};
use graphgen_error::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "graphgen.toml";

/// Environment variable checked before the provider-specific one
pub const DEFAULT_API_KEY_ENV: &str = "GRAPHGEN_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub provider: ProviderSection,
    pub output: OutputSection,
    pub log: LogSection,
    pub cache: CacheSection,
    /// Values for symbols other than `x`
    pub params: Bindings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderSection {
    pub kind: ProviderType,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            kind: ProviderType::OpenAI,
            model: None,
            base_url: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("graph.svg"),
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    /// Errors are appended here
    pub file: PathBuf,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            file: PathBuf::from("graphgen_errors.log"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    pub enabled: bool,
    /// Keep entries on disk here; in memory when unset
    pub dir: Option<PathBuf>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text).map_err(|e| {
            Error::config_invalid(e.message().to_string())
                .with_operation("config::parse")
                .set_source(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file that must exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("config::load")
                .with_context("path", path.display().to_string())
        })?;
        Self::from_toml_str(&text).map_err(|e| e.with_context("path", path.display().to_string()))
    }

    /// Load `path` if given, else `graphgen.toml` if present, else defaults
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    log::debug!("Using {}", default.display());
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider.timeout_secs == 0 {
            return Err(Error::config_invalid("provider.timeout_secs must be positive")
                .with_operation("config::validate"));
        }
        if self.output.width == 0 || self.output.height == 0 {
            return Err(Error::config_invalid("output.width and output.height must be positive")
                .with_operation("config::validate"));
        }
        Ok(())
    }

    /// First non-empty key from the configured variable, then the
    /// provider's own variable
    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        std::iter::once(self.provider.api_key_env.as_str())
            .chain(self.provider.kind.api_key_env())
            .filter_map(|name| lookup(name))
            .find(|key| !key.trim().is_empty())
    }

    pub fn resolve_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    /// Build the provider config, reading the API key from the environment
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        self.provider_config_with(self.resolve_api_key())
    }

    pub fn provider_config_with(&self, api_key: Option<String>) -> Result<ProviderConfig> {
        let section = &self.provider;
        let mut config = ProviderConfig::for_type(section.kind).with_timeout(section.timeout_secs);

        if let Some(model) = &section.model {
            config = config.with_model(model);
        }
        if let Some(base_url) = &section.base_url {
            config = config.with_base_url(base_url);
        }

        match api_key {
            Some(key) => config = config.with_api_key(key),
            None if section.kind != ProviderType::Local => {
                let mut names = vec![section.api_key_env.clone()];
                names.extend(section.kind.api_key_env().map(str::to_string));
                return Err(Error::new(
                    ErrorKind::ConfigInvalid,
                    format!("no API key for {}; set {}", section.kind, names.join(" or ")),
                )
                .with_operation("config::provider_config"));
            }
            None => {}
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.provider.kind, ProviderType::OpenAI);
        assert_eq!(config.provider.timeout_secs, 120);
        assert_eq!(config.output.path, PathBuf::from("graph.svg"));
        assert_eq!(config.log.file, PathBuf::from("graphgen_errors.log"));
        assert!(config.cache.enabled);
        assert!(config.params.is_empty());
    }

    #[test]
    fn test_parse_full_file() {
        let config = AppConfig::from_toml_str(
            r#"
            [provider]
            kind = "gemini"
            model = "gemini-1.5-pro"
            timeout_secs = 30

            [cache]
            enabled = false

            [params]
            u = 0
            a = 9.81
            "#,
        )
        .unwrap();

        assert_eq!(config.provider.kind, ProviderType::Gemini);
        assert_eq!(config.provider.model.as_deref(), Some("gemini-1.5-pro"));
        assert!(!config.cache.enabled);
        assert_eq!(config.params.get("u"), Some(0.0));
        assert_eq!(config.params.get("a"), Some(9.81));
        assert_eq!(config.output.width, 800);
    }

    #[test]
    fn test_invalid_files() {
        let err = AppConfig::from_toml_str("[provider]\nkind = \"bard\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let err = AppConfig::from_toml_str("[provider]\ntimeout_secs = 0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let err = AppConfig::from_toml_str("[plot]\ncolor = \"red\"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_load_and_discover() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graphgen.toml");
        std::fs::write(&path, "[output]\npath = \"out/plot.svg\"\n").unwrap();

        let config = AppConfig::discover(Some(&path)).unwrap();
        assert_eq!(config.output.path, PathBuf::from("out/plot.svg"));

        let err = AppConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn test_api_key_precedence() {
        let env: HashMap<&str, &str> =
            [("GRAPHGEN_API_KEY", ""), ("OPENAI_API_KEY", "sk-openai")].into_iter().collect();
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());

        let config = AppConfig::default();
        assert_eq!(config.resolve_api_key_with(lookup).as_deref(), Some("sk-openai"));

        let env: HashMap<&str, &str> =
            [("GRAPHGEN_API_KEY", "sk-shared"), ("OPENAI_API_KEY", "sk-openai")].into_iter().collect();
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());
        assert_eq!(config.resolve_api_key_with(lookup).as_deref(), Some("sk-shared"));
    }

    #[test]
    fn test_provider_config() {
        let mut config = AppConfig::default();
        config.provider.kind = ProviderType::Anthropic;
        config.provider.model = Some("claude-sonnet-4-20250514".into());

        let provider = config.provider_config_with(Some("sk-ant".into())).unwrap();
        assert_eq!(provider.provider_type, ProviderType::Anthropic);
        assert_eq!(provider.api_key(), Some("sk-ant"));
        assert_eq!(provider.default_model.as_deref(), Some("claude-sonnet-4-20250514"));

        let err = config.provider_config_with(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.message().contains("ANTHROPIC_API_KEY"));

        config.provider.kind = ProviderType::Local;
        assert!(config.provider_config_with(None).is_ok());
    }
}
