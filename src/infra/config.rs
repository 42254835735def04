//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Upper bound on non-empty lines consumed per run
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Producer deadline in milliseconds
    #[serde(default = "default_max_time_ms")]
    pub max_time_ms: u64,
    /// Consumer workers (0 = available parallelism)
    #[serde(default)]
    pub workers: usize,
    /// Capacity of the bounded line queue
    #[serde(default = "default_line_queue_capacity")]
    pub line_queue_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            max_time_ms: default_max_time_ms(),
            workers: 0,
            line_queue_capacity: default_line_queue_capacity(),
        }
    }
}

fn default_max_events() -> usize {
    100
}

fn default_max_time_ms() -> u64 {
    30_000
}

fn default_line_queue_capacity() -> usize {
    1024
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OutputConfig {
    /// Pretty-print the output document
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Log the ingest summary after each run
    #[serde(default = "default_log_summary")]
    pub log_summary: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { log_summary: default_log_summary() }
    }
}

fn default_log_summary() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    max_events: usize,
    max_time_ms: u64,
    workers: usize,
    line_queue_capacity: usize,
    pretty: bool,
    log_summary: bool,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            max_events: toml_config.ingest.max_events,
            max_time_ms: toml_config.ingest.max_time_ms,
            workers: toml_config.ingest.workers,
            line_queue_capacity: toml_config.ingest.line_queue_capacity,
            pretty: toml_config.output.pretty,
            log_summary: toml_config.metrics.log_summary,
            config_file,
        }
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        // Check for --config argument
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        // Check CONFIG_FILE environment variable
        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        // Default to dev.toml
        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, path.display().to_string()))
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load(args: &[String]) -> Self {
        Self::load_from_path(&Self::resolve_config_path(args))
    }

    /// Load configuration from an explicit path, falling back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    /// Worker count with 0 resolved to available parallelism
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }

    pub fn max_time(&self) -> Duration {
        Duration::from_millis(self.max_time_ms)
    }

    pub fn max_events(&self) -> usize {
        self.max_events
    }

    pub fn max_time_ms(&self) -> u64 {
        self.max_time_ms
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn line_queue_capacity(&self) -> usize {
        self.line_queue_capacity
    }

    pub fn pretty(&self) -> bool {
        self.pretty
    }

    pub fn log_summary(&self) -> bool {
        self.log_summary
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    // Command line overrides

    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    pub fn with_max_time_ms(mut self, ms: u64) -> Self {
        self.max_time_ms = ms;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_events(), 100);
        assert_eq!(config.max_time(), Duration::from_secs(30));
        assert_eq!(config.workers(), 0);
        assert_eq!(config.line_queue_capacity(), 1024);
        assert!(!config.pretty());
        assert!(config.log_summary());
        assert_eq!(config.config_file(), "default");
    }

    #[test]
    fn test_effective_workers() {
        assert!(Config::default().effective_workers() >= 1);
        assert_eq!(Config::default().with_workers(3).effective_workers(), 3);
    }

    #[test]
    fn test_overrides() {
        let config = Config::default().with_max_events(5).with_max_time_ms(250).with_pretty(true);
        assert_eq!(config.max_events(), 5);
        assert_eq!(config.max_time(), Duration::from_millis(250));
        assert!(config.pretty());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_config: TomlConfig = toml::from_str("[ingest]\nmax_events = 7\n").unwrap();
        let config = Config::from_toml(toml_config, "inline".to_string());
        assert_eq!(config.max_events(), 7);
        assert_eq!(config.max_time_ms(), 30_000);
        assert_eq!(config.line_queue_capacity(), 1024);
    }

    #[test]
    fn test_resolve_config_path_from_arg() {
        let args: Vec<String> = vec![
            "picking-stream".to_string(),
            "--config".to_string(),
            "config/prod.toml".to_string(),
        ];
        assert_eq!(Config::resolve_config_path(&args), "config/prod.toml");
    }

    #[test]
    fn test_resolve_config_path_from_arg_equals() {
        let args: Vec<String> =
            vec!["picking-stream".to_string(), "--config=config/night.toml".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "config/night.toml");
    }
}
