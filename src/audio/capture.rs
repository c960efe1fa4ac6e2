use crate::error::ConsoleError;
use tokio::sync::mpsc;

/// One slice of captured audio (16-bit PCM, interleaved).
///
/// Chunks carry monotonically increasing sequence numbers within a recording
/// and are consumed exactly once by the capture scheduler.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Position of this chunk within the recording (0-based).
    pub sequence: u64,
    /// Raw audio samples (i16 PCM, interleaved).
    pub samples: Vec<i16>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
}

impl AudioChunk {
    /// Duration of this chunk in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }
}

/// Configuration for a capture source.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (device input is downsampled if needed).
    pub sample_rate: u32,
    /// Target channel count (1 = mono).
    pub channels: u16,
    /// Duration of each emitted chunk in milliseconds.
    pub chunk_duration_ms: u64,
}

impl CaptureConfig {
    /// Samples per emitted chunk at the target format.
    pub fn samples_per_chunk(&self) -> usize {
        (self.sample_rate as u64 * self.channels as u64 * self.chunk_duration_ms / 1000) as usize
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            chunk_duration_ms: 100,
        }
    }
}

/// A source of live audio chunks.
///
/// Implementations:
/// - Microphone: cpal input device on a dedicated thread
/// - Scripted: deterministic in-memory source (tests, mic-less demos)
#[async_trait::async_trait]
pub trait AudioCapture: Send + Sync {
    /// Request the device and start producing chunks.
    ///
    /// Returns a channel receiver fed at roughly chunk-duration intervals for
    /// the lifetime of the recording. Production is lossy if the consumer
    /// falls behind.
    async fn acquire(&mut self) -> Result<mpsc::Receiver<AudioChunk>, ConsoleError>;

    /// Stop hardware capture and release every underlying resource.
    ///
    /// Must be safe to call on every exit path of a recording, including
    /// after a failed acquisition.
    async fn release(&mut self) -> Result<(), ConsoleError>;

    /// Whether the source currently holds the device.
    fn is_capturing(&self) -> bool;

    /// Source name for logging.
    fn name(&self) -> &str;
}

/// Capture source selector.
pub enum CaptureSource {
    /// Default input microphone.
    Microphone,
    /// Replay the given sample buffers instead of opening hardware.
    Scripted(Vec<Vec<i16>>),
}

/// Builds a capture source from a selector.
pub struct CaptureSourceFactory;

impl CaptureSourceFactory {
    pub fn create(source: CaptureSource, config: CaptureConfig) -> Box<dyn AudioCapture> {
        match source {
            CaptureSource::Microphone => Box::new(super::mic::MicCapture::new(config)),
            CaptureSource::Scripted(script) => {
                Box::new(super::scripted::ScriptedCapture::new(config, script))
            }
        }
    }
}
