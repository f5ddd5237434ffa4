use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::accumulator::ChunkAccumulator;
use crate::audio::Encoding;

/// File stem used when the session name is blank
pub const DEFAULT_FILE_STEM: &str = "new_recording";

/// Finished recording: the concatenation of one phase's segments
///
/// Cloning is cheap; every clone shares the same bytes. The artifact is
/// built once when recording stops and is the only input for both local
/// saves and uploads.
#[derive(Debug, Clone)]
pub struct Artifact {
    id: Uuid,
    data: Arc<[u8]>,
    encoding: Encoding,
    segment_count: usize,
    created_at: DateTime<Utc>,
}

/// Serializable description of an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub id: Uuid,
    pub size_bytes: usize,
    pub mime_type: String,
    pub segment_count: usize,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Concatenate `segments` in order, or `None` if nothing was captured
    pub fn materialize(segments: &ChunkAccumulator, encoding: Encoding) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }

        Some(Self {
            id: Uuid::new_v4(),
            data: Arc::from(segments.concat()),
            encoding,
            segment_count: segments.len(),
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn mime_type(&self) -> String {
        self.encoding.mime_type()
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn info(&self) -> ArtifactInfo {
        ArtifactInfo {
            id: self.id,
            size_bytes: self.data.len(),
            mime_type: self.mime_type(),
            segment_count: self.segment_count,
            created_at: self.created_at,
        }
    }

    /// File name for a local copy of this artifact
    pub fn file_name(&self, name: &str) -> String {
        format!("{}.{}", file_stem(name), self.encoding.file_extension())
    }

    /// Write a local copy into `dir` and return its path
    ///
    /// PCM artifacts are wrapped in a WAV container; everything else is
    /// written verbatim. Existing files are never overwritten: a numeric
    /// suffix is added instead.
    pub async fn save_to(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create download directory: {:?}", dir))?;

        let path = unused_path(dir, &file_stem(name), self.encoding.file_extension()).await?;

        match self.encoding {
            Encoding::Pcm16 {
                sample_rate,
                channels,
            } => {
                let data = Arc::clone(&self.data);
                let target = path.clone();
                tokio::task::spawn_blocking(move || write_wav(&target, &data, sample_rate, channels))
                    .await
                    .context("WAV writer task panicked")??;
            }
            Encoding::WebmOpus => {
                tokio::fs::write(&path, &self.data)
                    .await
                    .with_context(|| format!("Failed to write recording: {:?}", path))?;
            }
        }

        info!(
            "Saved recording {} ({} bytes) to {}",
            self.id,
            self.data.len(),
            path.display()
        );

        Ok(path)
    }
}

/// Session name made safe for use as a file stem
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = stem.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        DEFAULT_FILE_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}

async fn unused_path(dir: &Path, stem: &str, extension: &str) -> Result<PathBuf> {
    let first = dir.join(format!("{}.{}", stem, extension));
    if !tokio::fs::try_exists(&first).await? {
        return Ok(first);
    }

    for n in 1..1000 {
        let candidate = dir.join(format!("{} ({}).{}", stem, n, extension));
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
    }

    anyhow::bail!("Too many existing recordings named {:?} in {:?}", stem, dir)
}

fn write_wav(path: &Path, data: &[u8], sample_rate: u32, channels: u16) -> Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let file = File::create(path)
        .with_context(|| format!("Failed to create WAV file: {:?}", path))?;
    let mut writer = hound::WavWriter::new(BufWriter::new(file), spec)
        .context("Failed to write WAV header")?;

    // A trailing odd byte cannot form a sample and is dropped
    for pair in data.chunks_exact(2) {
        writer
            .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
            .context("Failed to write sample to WAV")?;
    }

    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_falls_back_for_blank_names() {
        assert_eq!(file_stem(""), DEFAULT_FILE_STEM);
        assert_eq!(file_stem("   "), DEFAULT_FILE_STEM);
        assert_eq!(file_stem(".."), DEFAULT_FILE_STEM);
    }

    #[test]
    fn test_file_stem_replaces_separators() {
        assert_eq!(file_stem("team/standup"), "team_standup");
        assert_eq!(file_stem("a\\b:c"), "a_b_c");
        assert_eq!(file_stem("demo"), "demo");
    }

    #[test]
    fn test_materialize_empty_accumulator_yields_nothing() {
        let segments = ChunkAccumulator::new();
        assert!(Artifact::materialize(&segments, Encoding::WebmOpus).is_none());
    }
}
