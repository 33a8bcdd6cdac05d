use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::conform::DateOrder;
use crate::error::{PipelineError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "retail_star.toml";
pub const DEFAULT_LOG_FILTER: &str = "retail_star=info,info";

/// Everything a run needs, passed explicitly to each stage
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Root of the layer stores (`raw/`, `conformed/`, `model/`)
    pub data_dir: PathBuf,
    pub report_path: PathBuf,
    pub date_order: DateOrder,
    /// Run independent derivations of a stage as concurrent tasks
    pub parallel: bool,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub default_filter: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Prometheus listener address; no listener when unset
    pub listen_addr: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            report_path: PathBuf::from("data/run_report.json"),
            date_order: DateOrder::default(),
            parallel: true,
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            default_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load `path` (defaults when it does not exist), then apply `RETAIL_*` overrides
    pub fn load(path: &Path) -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from the environment; `lookup` is `std::env::var` outside tests
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup("RETAIL_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("RETAIL_REPORT_PATH") {
            self.report_path = PathBuf::from(path);
        }
        if let Some(order) = lookup("RETAIL_DATE_ORDER") {
            self.date_order = order.parse().map_err(PipelineError::Config)?;
        }
        if let Some(parallel) = lookup("RETAIL_PARALLEL") {
            self.parallel = parse_bool(&parallel)
                .ok_or_else(|| PipelineError::Config(format!("RETAIL_PARALLEL: not a boolean: '{}'", parallel)))?;
        }
        if let Some(addr) = lookup("RETAIL_METRICS_ADDR") {
            self.metrics.listen_addr = Some(addr).filter(|a| !a.trim().is_empty());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(PipelineError::Config("data_dir must not be empty".to_string()));
        }
        if self.report_path.as_os_str().is_empty() {
            return Err(PipelineError::Config("report_path must not be empty".to_string()));
        }
        if self.logging.dir.as_os_str().is_empty() {
            return Err(PipelineError::Config("logging.dir must not be empty".to_string()));
        }
        if let Some(addr) = &self.metrics.listen_addr {
            addr.parse::<std::net::SocketAddr>().map_err(|e| {
                PipelineError::Config(format!("metrics.listen_addr '{}': {}", addr, e))
            })?;
        }
        Ok(())
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn conformed_dir(&self) -> PathBuf {
        self.data_dir.join("conformed")
    }

    pub fn model_dir(&self) -> PathBuf {
        self.data_dir.join("model")
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.conformed_dir(), PathBuf::from("data/conformed"));
    }

    #[test]
    fn test_partial_toml() {
        let config = PipelineConfig::from_toml(
            r#"
            date_order = "day_first"
            parallel = false

            [metrics]
            listen_addr = "127.0.0.1:9899"
            "#,
        )
        .unwrap();
        assert_eq!(config.date_order, DateOrder::DayFirst);
        assert!(!config.parallel);
        assert_eq!(config.metrics.listen_addr.as_deref(), Some("127.0.0.1:9899"));
        assert_eq!(config.logging.default_filter, DEFAULT_LOG_FILTER);
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = PipelineConfig::from_toml("data_directory = \"x\"").unwrap_err();
        assert!(matches!(err, PipelineError::Toml(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("RETAIL_DATA_DIR", "/srv/retail"),
            ("RETAIL_DATE_ORDER", "dmy"),
            ("RETAIL_PARALLEL", "off"),
        ]
        .into_iter()
        .collect();
        let mut config = PipelineConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.model_dir(), PathBuf::from("/srv/retail/model"));
        assert_eq!(config.date_order, DateOrder::DayFirst);
        assert!(!config.parallel);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = PipelineConfig::default();
        let err = config
            .apply_env(|key| (key == "RETAIL_PARALLEL").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_listen_addr() {
        let mut config = PipelineConfig::default();
        config.metrics.listen_addr = Some("not-an-addr".to_string());
        assert!(config.validate().is_err());
        config.metrics.listen_addr = None;
        config.data_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }
}
