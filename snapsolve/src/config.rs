//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `SNAPSOLVE_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `SNAPSOLVE_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `SNAPSOLVE_STORAGE__PATH=/var/lib/snapsolve` sets the `storage.path` field.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! # Override server port
//! SNAPSOLVE_PORT=8080
//!
//! # Point the blob store somewhere else
//! SNAPSOLVE_STORAGE__PATH=/var/lib/snapsolve
//!
//! # Switch the OCR engine
//! SNAPSOLVE_OCR__ENGINE=tesseract
//! SNAPSOLVE_OCR__LANGUAGES=eng+fra
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "SNAPSOLVE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment variables.
/// All fields have sensible defaults defined in the `Default` implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Origins allowed by CORS. The single entry "*" allows any origin.
    pub cors_allowed_origins: Vec<String>,
    /// Maximum accepted upload body size in bytes. Bounds the pixel input
    /// handed to the decoder and OCR engine, which have no timeout of
    /// their own.
    pub max_upload_size: u64,
    /// Blob store backend for transient upload persistence
    pub storage: StorageConfig,
    /// OCR engine selection
    pub ocr: OcrConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: vec!["*".to_string()],
            max_upload_size: 10 * 1024 * 1024,
            storage: StorageConfig::default(),
            ocr: OcrConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Config {
    /// Load configuration from the file named by `args`, then apply
    /// `SNAPSOLVE_`-prefixed environment variable overrides.
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let config: Config = Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("SNAPSOLVE_").ignore(&["config"]).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot serve requests.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_upload_size == 0 {
            anyhow::bail!("max_upload_size must be greater than zero");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Blob store backend selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Local filesystem storage rooted at `path`. The directory is created
    /// on startup if missing.
    Local {
        #[serde(default = "default_storage_path")]
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("media")
}

/// OCR engine selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "engine", rename_all = "snake_case")]
pub enum OcrConfig {
    /// Tesseract via leptonica. Requires the `tesseract` cargo feature and
    /// the native libraries at runtime.
    Tesseract {
        /// Tesseract language codes, e.g. "eng" or "eng+fra"
        #[serde(default = "default_ocr_languages")]
        languages: String,
    },
    /// Engine that returns a fixed text for every image. For local
    /// development and tests.
    Static { text: String },
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig::Tesseract {
            languages: default_ocr_languages(),
        }
    }
}

fn default_ocr_languages() -> String {
    "eng".to_string()
}
