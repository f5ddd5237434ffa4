use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable prefix, e.g. `LOQA_CLIPS__UPLOAD__ENDPOINT`
const ENV_PREFIX: &str = "LOQA_CLIPS";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: CaptureSettings,
    pub upload: UploadConfig,
    pub downloads: DownloadsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSourceKind {
    Microphone,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureSettings {
    pub source: CaptureSourceKind,
    pub file_path: Option<String>,
    pub segment_duration_ms: u64,
    pub file_chunk_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub endpoint: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadsConfig {
    pub path: String,
}

impl Config {
    /// Load defaults, then `path` (any format the config crate detects, optional),
    /// then `LOQA_CLIPS__*` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = Self::builder()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("failed to build configuration")?;

        settings
            .try_deserialize()
            .context("failed to parse configuration")
    }

    /// Defaults only (no file, no environment)
    pub fn defaults() -> Result<Self> {
        Ok(Self::builder()?.build()?.try_deserialize()?)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("service.name", "loqa-clips")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8420_i64)?
            .set_default("capture.source", "microphone")?
            .set_default("capture.segment_duration_ms", 1000_i64)?
            .set_default("capture.file_chunk_bytes", 16384_i64)?
            .set_default("upload.endpoint", "http://127.0.0.1:9000/transcribe")?
            .set_default("downloads.path", "~/.loqa/clips")?)
    }

    pub fn downloads_dir(&self) -> PathBuf {
        expand_path(&self.downloads.path)
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
