use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes finished recordings to disk as 16-bit WAV files.
///
/// Archiving is diagnostic only; failures are reported to the caller and
/// never interrupt the capture pipeline.
pub struct RecordingArchive {
    dir: PathBuf,
}

impl RecordingArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write one recording take and return the path of the created file.
    pub fn write(&self, samples: &[i16], sample_rate: u32, channels: u16) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).context("failed to create archive directory")?;

        let path = self
            .dir
            .join(format!("recording-{}.wav", uuid::Uuid::new_v4()));

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("failed to create WAV file: {:?}", path))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .context("failed to write sample to WAV")?;
        }
        writer.finalize().context("failed to finalize WAV file")?;

        info!(path = %path.display(), samples = samples.len(), "recording archived");
        Ok(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
