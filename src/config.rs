use crate::error::{CompareError, Result};
use crate::models::{ModelTarget, WireFormat};
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_BASE_PATH: &str = "/api/generate/base";
pub const DEFAULT_TRAINED_PATH: &str = "/api/generate/trained";

#[derive(Debug, Clone, PartialEq)]
pub struct CompareConfig {
    pub base_url: String,
    pub base_path: String,
    pub trained_path: String,
    pub wire_format: WireFormat,
    pub timeout: Option<Duration>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        CompareConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            trained_path: DEFAULT_TRAINED_PATH.to_string(),
            wire_format: WireFormat::default(),
            timeout: None,
        }
    }
}

impl CompareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `COMPARE_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = env::var("COMPARE_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(path) = env::var("COMPARE_BASE_PATH") {
            config.base_path = path;
        }
        if let Ok(path) = env::var("COMPARE_TRAINED_PATH") {
            config.trained_path = path;
        }
        if let Ok(format) = env::var("COMPARE_WIRE_FORMAT") {
            config.wire_format = format.parse()?;
        }
        if let Ok(secs) = env::var("COMPARE_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                CompareError::Config(format!("COMPARE_TIMEOUT_SECS must be a number, got '{}'", secs))
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_endpoints(
        mut self,
        base_path: impl Into<String>,
        trained_path: impl Into<String>,
    ) -> Self {
        self.base_path = base_path.into();
        self.trained_path = trained_path.into();
        self
    }

    pub fn with_wire_format(mut self, format: WireFormat) -> Self {
        self.wire_format = format;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CompareError::Config(format!(
                "base url must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.base_path.trim().is_empty() || self.trained_path.trim().is_empty() {
            return Err(CompareError::Config("endpoint paths must not be empty".into()));
        }
        Ok(())
    }

    pub fn endpoint(&self, target: ModelTarget) -> String {
        match target {
            ModelTarget::Base => self.resolve(&self.base_path),
            ModelTarget::Trained => self.resolve(&self.trained_path),
        }
    }

    pub fn health_url(&self) -> String {
        self.resolve("/health")
    }

    /// Joins a path onto the base url. Absolute urls are returned unchanged.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
