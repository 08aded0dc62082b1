//! Application configuration
//!
//! Assembled from three layers with fixed precedence: built-in defaults,
//! then the JSON config file, then CLI arguments / environment variables.
//! Unknown file fields are warned about, not rejected.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::domain::pipeline::FailurePolicy;

use super::cli::CliConfig;
use super::constants::{
    CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_QUERY_URL, DEFAULT_QUEUE_URL,
    DEFAULT_STAGE_TIMEOUT_MS, DEFAULT_VALIDATION_URL, STAGE_QUERY, STAGE_QUEUE, STAGE_VALIDATION,
};

// =============================================================================
// Runtime Config Structs
// =============================================================================

/// Server configuration section
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// One configured pipeline stage
#[derive(Debug, Clone)]
pub struct StageConfig {
    pub name: String,
    pub url: String,
    pub policy: FailurePolicy,
    pub timeout_ms: u64,
}

/// Pipeline configuration section
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub stages: Vec<StageConfig>,
}

/// Fully resolved application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    pub debug: bool,
}

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Stage entry (from JSON config file)
#[derive(Debug, Clone, Deserialize)]
pub struct StageFileConfig {
    pub name: String,
    pub url: String,
    /// Failure policy: recoverable or fatal (default)
    pub policy: Option<FailurePolicy>,
    /// Per-stage deadline override in milliseconds
    pub timeout_ms: Option<u64>,
}

/// Pipeline configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PipelineFileConfig {
    pub default_timeout_ms: Option<u64>,
    pub stages: Option<Vec<StageFileConfig>>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub pipeline: Option<PipelineFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

impl AppConfig {
    /// Build the runtime config from file and CLI layers.
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let file = match Self::resolve_config_path(cli) {
            Some(path) => {
                let file = FileConfig::load_from_file(&path)?;
                file.warn_unknown_fields();
                file
            }
            None => FileConfig::default(),
        };

        let server_file = file.server.unwrap_or_default();
        let host = cli
            .host
            .clone()
            .or(server_file.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(server_file.port).unwrap_or(DEFAULT_PORT);

        let pipeline_file = file.pipeline.unwrap_or_default();
        let default_timeout_ms = cli
            .stage_timeout_ms
            .or(pipeline_file.default_timeout_ms)
            .unwrap_or(DEFAULT_STAGE_TIMEOUT_MS);

        let stages = match pipeline_file.stages {
            Some(entries) if !entries.is_empty() => entries
                .into_iter()
                .map(|entry| StageConfig {
                    name: entry.name,
                    url: entry.url,
                    policy: entry.policy.unwrap_or_default(),
                    timeout_ms: entry.timeout_ms.unwrap_or(default_timeout_ms),
                })
                .collect(),
            _ => Self::default_stages(default_timeout_ms),
        };
        validate_stages(&stages)?;

        let debug = cli.debug || file.debug.unwrap_or(false);

        Ok(Self {
            server: ServerConfig { host, port },
            pipeline: PipelineConfig { stages },
            debug,
        })
    }

    /// Explicit `--config` path wins; otherwise the default file name is
    /// used only when it exists in the working directory.
    fn resolve_config_path(cli: &CliConfig) -> Option<PathBuf> {
        if let Some(path) = &cli.config {
            return Some(path.clone());
        }
        let default = PathBuf::from(CONFIG_FILE_NAME);
        default.exists().then_some(default)
    }

    /// The built-in checkout pipeline: catalog query and payment validation
    /// are fatal, the order queue degrades.
    fn default_stages(timeout_ms: u64) -> Vec<StageConfig> {
        vec![
            StageConfig {
                name: STAGE_QUERY.to_string(),
                url: DEFAULT_QUERY_URL.to_string(),
                policy: FailurePolicy::Fatal,
                timeout_ms,
            },
            StageConfig {
                name: STAGE_VALIDATION.to_string(),
                url: DEFAULT_VALIDATION_URL.to_string(),
                policy: FailurePolicy::Fatal,
                timeout_ms,
            },
            StageConfig {
                name: STAGE_QUEUE.to_string(),
                url: DEFAULT_QUEUE_URL.to_string(),
                policy: FailurePolicy::Recoverable,
                timeout_ms,
            },
        ]
    }
}

/// Whether the host binds every interface
pub fn is_all_interfaces(host: &str) -> bool {
    host == "0.0.0.0" || host == "::"
}

fn validate_stages(stages: &[StageConfig]) -> Result<()> {
    if stages.is_empty() {
        bail!("Pipeline must declare at least one stage");
    }
    let mut seen = HashSet::new();
    for stage in stages {
        if stage.name.is_empty() {
            bail!("Stage name must not be empty");
        }
        if !seen.insert(stage.name.as_str()) {
            bail!("Duplicate stage name '{}'", stage.name);
        }
        if stage.url.is_empty() {
            bail!("Stage '{}' must declare a url", stage.name);
        }
        if stage.timeout_ms == 0 {
            bail!("Stage '{}' must have a non-zero deadline", stage.name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(json: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(json.as_bytes()).unwrap();
        (dir, path)
    }

    fn cli_with_config(path: PathBuf) -> CliConfig {
        CliConfig {
            config: Some(path),
            ..CliConfig::default()
        }
    }

    #[test]
    fn test_defaults_without_file() {
        let config = AppConfig::load(&CliConfig::default()).unwrap();
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(!config.debug);
        let names: Vec<&str> = config
            .pipeline
            .stages
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["query", "validation", "queue"]);
        assert_eq!(config.pipeline.stages[0].policy, FailurePolicy::Fatal);
        assert_eq!(config.pipeline.stages[2].policy, FailurePolicy::Recoverable);
    }

    #[test]
    fn test_file_config_overrides_defaults() {
        let (_dir, path) = write_config(
            r#"{
                "server": {"host": "0.0.0.0", "port": 9000},
                "pipeline": {
                    "default_timeout_ms": 750,
                    "stages": [
                        {"name": "query", "url": "http://svc/query"},
                        {"name": "queue", "url": "http://svc/enqueue", "policy": "recoverable", "timeout_ms": 100}
                    ]
                }
            }"#,
        );
        let config = AppConfig::load(&cli_with_config(path)).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.pipeline.stages.len(), 2);
        assert_eq!(config.pipeline.stages[0].policy, FailurePolicy::Fatal);
        assert_eq!(config.pipeline.stages[0].timeout_ms, 750);
        assert_eq!(config.pipeline.stages[1].policy, FailurePolicy::Recoverable);
        assert_eq!(config.pipeline.stages[1].timeout_ms, 100);
    }

    #[test]
    fn test_cli_overrides_file() {
        let (_dir, path) = write_config(r#"{"server": {"port": 9000}}"#);
        let cli = CliConfig {
            port: Some(9001),
            stage_timeout_ms: Some(50),
            ..cli_with_config(path)
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.server.port, 9001);
        assert!(config.pipeline.stages.iter().all(|s| s.timeout_ms == 50));
    }

    #[test]
    fn test_unknown_fields_are_tolerated() {
        let (_dir, path) = write_config(r#"{"serverr": {"port": 9000}, "debug": true}"#);
        let config = AppConfig::load(&cli_with_config(path)).unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.debug);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let cli = cli_with_config(PathBuf::from("/nonexistent/traceloom.json"));
        assert!(AppConfig::load(&cli).is_err());
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let (_dir, path) = write_config("{not json");
        assert!(AppConfig::load(&cli_with_config(path)).is_err());
    }

    #[test]
    fn test_duplicate_stage_names_rejected() {
        let (_dir, path) = write_config(
            r#"{"pipeline": {"stages": [
                {"name": "query", "url": "http://svc/a"},
                {"name": "query", "url": "http://svc/b"}
            ]}}"#,
        );
        let err = AppConfig::load(&cli_with_config(path)).unwrap_err();
        assert!(err.to_string().contains("Duplicate stage name"));
    }

    #[test]
    fn test_zero_deadline_rejected() {
        let (_dir, path) = write_config(
            r#"{"pipeline": {"stages": [
                {"name": "query", "url": "http://svc/a", "timeout_ms": 0}
            ]}}"#,
        );
        assert!(AppConfig::load(&cli_with_config(path)).is_err());
    }
}
