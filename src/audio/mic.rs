use super::capture::{AudioCapture, AudioChunk, CaptureConfig};
use crate::error::ConsoleError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Microphone capture via cpal.
///
/// The cpal stream is not `Send`, so it lives on a dedicated thread for the
/// whole recording. The callback converts device buffers to mono PCM at the
/// target rate, slices them into fixed-duration chunks and pushes them into a
/// bounded channel; chunks are dropped if the consumer falls behind.
pub struct MicCapture {
    config: CaptureConfig,
    worker: Option<Worker>,
}

struct Worker {
    stop_tx: std_mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl MicCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioCapture for MicCapture {
    async fn acquire(&mut self) -> Result<mpsc::Receiver<AudioChunk>, ConsoleError> {
        if self.worker.is_some() {
            return Err(ConsoleError::RecordingBusy);
        }

        let (chunk_tx, chunk_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();
        let config = self.config.clone();

        let join = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || run_capture_thread(config, chunk_tx, ready_tx, stop_rx))
            .map_err(|e| ConsoleError::DeviceUnavailable(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                self.worker = Some(Worker { stop_tx, join });
                Ok(chunk_rx)
            }
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(_) => {
                let _ = join.join();
                Err(ConsoleError::DeviceUnavailable(
                    "capture thread exited before reporting readiness".into(),
                ))
            }
        }
    }

    async fn release(&mut self) -> Result<(), ConsoleError> {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            // The thread only has to drop the stream, but joining still
            // blocks, so keep it off the runtime threads.
            let joined = tokio::task::spawn_blocking(move || worker.join.join()).await;
            match joined {
                Ok(Ok(())) => debug!("microphone released"),
                Ok(Err(_)) => warn!("microphone capture thread panicked"),
                Err(e) => warn!("failed to join microphone capture thread: {e}"),
            }
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

fn run_capture_thread(
    config: CaptureConfig,
    chunk_tx: mpsc::Sender<AudioChunk>,
    ready_tx: oneshot::Sender<Result<(), ConsoleError>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let stream = match build_input_stream(&config, chunk_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(map_play_error(e)));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Park until release() signals or the handle is dropped; dropping the
    // stream stops the hardware callback and releases the device.
    let _ = stop_rx.recv();
    drop(stream);
}

fn build_input_stream(
    config: &CaptureConfig,
    chunk_tx: mpsc::Sender<AudioChunk>,
) -> Result<cpal::Stream, ConsoleError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| ConsoleError::DeviceUnavailable("no default input device".into()))?;

    let supported = device
        .default_input_config()
        .map_err(|e| ConsoleError::DeviceUnavailable(e.to_string()))?;

    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.config();
    let native_channels = usize::from(stream_config.channels.max(1));
    let native_rate = stream_config.sample_rate.0;

    let mut slicer = ChunkSlicer::new(config.clone(), native_rate);
    let err_fn = |e| warn!("input stream error: {e}");

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _| {
                let mono = mono_from_f32(data, native_channels);
                slicer.push(&mono, &chunk_tx);
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _| {
                let mono = mono_from_i16(data, native_channels);
                slicer.push(&mono, &chunk_tx);
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _| {
                let mono = mono_from_u16(data, native_channels);
                slicer.push(&mono, &chunk_tx);
            },
            err_fn,
            None,
        ),
        other => {
            return Err(ConsoleError::DeviceUnavailable(format!(
                "unsupported input sample format: {other:?}"
            )))
        }
    }
    .map_err(map_build_error)?;

    Ok(stream)
}

fn map_build_error(e: cpal::BuildStreamError) -> ConsoleError {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            ConsoleError::DeviceUnavailable("input device disappeared".into())
        }
        // OS-level microphone denial surfaces as a backend-specific error.
        cpal::BuildStreamError::BackendSpecific { err } => {
            ConsoleError::PermissionDenied(err.to_string())
        }
        other => ConsoleError::DeviceUnavailable(other.to_string()),
    }
}

fn map_play_error(e: cpal::PlayStreamError) -> ConsoleError {
    match e {
        cpal::PlayStreamError::DeviceNotAvailable => {
            ConsoleError::DeviceUnavailable("input device disappeared".into())
        }
        cpal::PlayStreamError::BackendSpecific { err } => {
            ConsoleError::PermissionDenied(err.to_string())
        }
    }
}

/// Accumulates mono samples at the target rate and emits fixed-duration
/// chunks with monotonically increasing sequence numbers.
struct ChunkSlicer {
    config: CaptureConfig,
    native_rate: u32,
    pending: Vec<i16>,
    sequence: u64,
}

impl ChunkSlicer {
    fn new(config: CaptureConfig, native_rate: u32) -> Self {
        Self {
            config,
            native_rate,
            pending: Vec::new(),
            sequence: 0,
        }
    }

    fn push(&mut self, mono: &[f32], chunk_tx: &mpsc::Sender<AudioChunk>) {
        let resampled = downsample(mono, self.native_rate, self.config.sample_rate);
        self.pending.extend(resampled.iter().map(|&s| f32_to_i16(s)));

        let chunk_samples = self.config.samples_per_chunk();
        while self.pending.len() >= chunk_samples {
            let rest = self.pending.split_off(chunk_samples);
            let samples = std::mem::replace(&mut self.pending, rest);
            let chunk = AudioChunk {
                sequence: self.sequence,
                samples,
                sample_rate: self.config.sample_rate,
                channels: self.config.channels,
            };
            self.sequence += 1;
            // Lossy if unconsumed: drop the chunk rather than block the
            // audio callback.
            let _ = chunk_tx.try_send(chunk);
        }
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn mono_from_f32(input: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return input.to_vec();
    }
    input
        .chunks_exact(channels)
        .map(|frame| frame.iter().copied().sum::<f32>() / channels as f32)
        .collect()
}

fn mono_from_i16(input: &[i16], channels: usize) -> Vec<f32> {
    let scale = i16::MAX as f32;
    if channels <= 1 {
        return input.iter().map(|&s| s as f32 / scale).collect();
    }
    input
        .chunks_exact(channels)
        .map(|frame| frame.iter().map(|&s| s as f32 / scale).sum::<f32>() / channels as f32)
        .collect()
}

fn mono_from_u16(input: &[u16], channels: usize) -> Vec<f32> {
    let convert = |s: u16| (s as f32 / u16::MAX as f32) * 2.0 - 1.0;
    if channels <= 1 {
        return input.iter().map(|&s| convert(s)).collect();
    }
    input
        .chunks_exact(channels)
        .map(|frame| frame.iter().map(|&s| convert(s)).sum::<f32>() / channels as f32)
        .collect()
}

/// Downsample by bucket averaging; upsampling is not supported and returns
/// the input unchanged.
fn downsample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate <= to_rate {
        return input.to_vec();
    }

    let ratio = from_rate as f32 / to_rate as f32;
    let output_len = (input.len() as f32 / ratio).floor() as usize;
    let mut output = Vec::with_capacity(output_len);

    let mut position = 0usize;
    for index in 0..output_len {
        let next = (((index + 1) as f32 * ratio).floor() as usize).min(input.len());
        let bucket = &input[position..next];
        let average = if bucket.is_empty() {
            0.0
        } else {
            bucket.iter().sum::<f32>() / bucket.len() as f32
        };
        output.push(average);
        position = next;
    }

    output
}
