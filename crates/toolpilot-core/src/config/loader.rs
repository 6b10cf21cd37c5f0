use super::types::{Config, LogLevel};
use crate::error::{Error, Result};
use camino::Utf8PathBuf;
use std::path::Path;

const DEFAULT_PATHS: [&str; 3] = [
    "./toolpilot.toml",
    "~/.toolpilot/config.toml",
    "~/.config/toolpilot/config.toml",
];

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn load_default() -> Result<Self> {
        for path in &DEFAULT_PATHS {
            let expanded = shellexpand::tilde(path);
            let path = Path::new(expanded.as_ref());
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading config file");
                return Self::load_from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Reads `path` if given, else the first default location that exists, then applies
    /// `TOOLPILOT_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => {
                let expanded = shellexpand::tilde(&p.to_string_lossy()).into_owned();
                Self::load_from_file(expanded)?
            }
            None => Self::load_default()?,
        };
        config.merge_env()
    }

    pub fn merge_env(self) -> Result<Self> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    fn merge_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(level) = var("TOOLPILOT_LOG_LEVEL") {
            self.general.log_level = LogLevel::parse(&level).unwrap_or(self.general.log_level);
        }

        if let Some(dir) = var("TOOLPILOT_WORKSPACE_DIR") {
            self.general.workspace_dir = dir.into();
        }

        if let Some(url) = var("TOOLPILOT_BASE_URL") {
            self.llm.base_url = url;
        }

        if let Some(model) = var("TOOLPILOT_MODEL") {
            self.llm.model = model;
        }

        if let Some(key) = var("TOOLPILOT_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.llm.api_key = Some(key);
        }

        if let Some(profile) = var("TOOLPILOT_PROFILE") {
            self.agent.profile = profile.parse().map_err(Error::Config)?;
        }

        if let Some(limit) = var("TOOLPILOT_RECURSION_LIMIT") {
            self.agent.recursion_limit = limit.parse().map_err(|_| {
                Error::Config(format!("TOOLPILOT_RECURSION_LIMIT is not a number: {}", limit))
            })?;
        }

        Ok(self)
    }

    /// The provider API key: `llm.api_key` if set, else the variable named by
    /// `llm.api_key_env`.
    pub fn api_key(&self) -> Result<String> {
        self.api_key_from(|key| std::env::var(key).ok())
    }

    fn api_key_from(&self, var: impl Fn(&str) -> Option<String>) -> Result<String> {
        if let Some(key) = self.llm.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.clone());
        }
        var(&self.llm.api_key_env)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::MissingConfig(format!(
                    "llm.api_key (or environment variable {})",
                    self.llm.api_key_env
                ))
            })
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    pub fn workspace_dir(&self) -> Utf8PathBuf {
        let expanded = shellexpand::tilde(self.general.workspace_dir.as_str());
        Utf8PathBuf::from(expanded.as_ref())
    }
}
