use crate::audio::{AudioCapture, AudioChunk, RecordingArchive};
use crate::backend::BackendClient;
use crate::error::ConsoleError;
use crate::session::SessionManager;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Recording lifecycle as seen from outside the scheduler.
///
/// The microphone is held exactly while the state is not Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Acquiring,
    Recording,
    Flushing,
    Stopping,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between interim flush ticks.
    pub flush_interval: Duration,
    /// When set, every finished recording is also written here as a WAV file.
    pub archive_dir: Option<PathBuf>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(1),
            archive_dir: None,
        }
    }
}

/// Drives the capture/flush/transcribe cycle and owns the recording state
/// machine.
///
/// While Recording, one worker task drains the capture channel into a buffer
/// and submits whatever accumulated between flush ticks as an interim
/// transcription. `stop_recording` cancels the ticks, releases the device
/// and submits the buffered remainder as the single final request, the only
/// result that may ever become a dispatched command.
pub struct CaptureScheduler {
    client: Arc<BackendClient>,
    session: Arc<SessionManager>,
    config: SchedulerConfig,
    state: AtomicState,
    /// Re-read by the worker on every tick; flipping it false cancels the
    /// flush activity cooperatively.
    live: watch::Sender<bool>,
    draft: Arc<watch::Sender<Option<String>>>,
    source: Mutex<Box<dyn AudioCapture>>,
    worker: Mutex<Option<JoinHandle<WorkerYield>>>,
}

impl CaptureScheduler {
    pub fn new(
        source: Box<dyn AudioCapture>,
        client: Arc<BackendClient>,
        session: Arc<SessionManager>,
        config: SchedulerConfig,
    ) -> Self {
        let (live, _) = watch::channel(false);
        let (draft, _) = watch::channel(None);
        Self {
            client,
            session,
            config,
            state: AtomicState::new(),
            live,
            draft: Arc::new(draft),
            source: Mutex::new(source),
            worker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state.load()
    }

    pub fn is_recording(&self) -> bool {
        self.state.load() == CaptureState::Recording
    }

    /// Live draft text from interim transcriptions, last write wins. Cleared
    /// on start and stop.
    pub fn draft(&self) -> watch::Receiver<Option<String>> {
        self.draft.subscribe()
    }

    /// Begin a recording. Valid only from Idle; a concurrent recording is
    /// rejected with `RecordingBusy`.
    pub async fn start_recording(&self) -> Result<(), ConsoleError> {
        if !self
            .state
            .transition(CaptureState::Idle, CaptureState::Acquiring)
        {
            return Err(ConsoleError::RecordingBusy);
        }

        self.draft.send_replace(None);

        let (chunks_rx, source_name) = {
            let mut source = self.source.lock().await;
            match source.acquire().await {
                Ok(rx) => (rx, source.name().to_string()),
                Err(e) => {
                    // A failed acquisition leaves nothing held.
                    self.state.store(CaptureState::Idle);
                    return Err(e);
                }
            }
        };

        self.live.send_replace(true);
        let handle = tokio::spawn(flush_loop(
            chunks_rx,
            self.live.subscribe(),
            Arc::clone(&self.client),
            Arc::clone(&self.session),
            Arc::clone(&self.draft),
            self.config.flush_interval,
            self.config.archive_dir.is_some(),
        ));
        *self.worker.lock().await = Some(handle);

        self.state.store(CaptureState::Recording);
        info!(source = %source_name, "recording started");
        Ok(())
    }

    /// End the recording and return the final transcript, if any.
    ///
    /// Stops the flush activity, releases the device, then submits the
    /// buffered remainder as the final transcription. Returns to Idle on
    /// every path, including a final-request failure, so the console is
    /// never left in a stuck listening state. Calling this while not
    /// Recording is a no-op.
    pub async fn stop_recording(&self) -> Result<Option<String>, ConsoleError> {
        if !self
            .state
            .transition(CaptureState::Recording, CaptureState::Stopping)
        {
            debug!("stop requested while not recording");
            return Ok(None);
        }

        // Cancel the flush activity before the device goes away, so no
        // pending tick can observe a released source.
        self.live.send_replace(false);

        if let Err(e) = self.source.lock().await.release().await {
            warn!("capture source release failed: {e}");
        }

        let yielded = match self.worker.lock().await.take() {
            Some(handle) => match handle.await {
                Ok(yielded) => yielded,
                Err(e) => {
                    warn!("capture worker failed: {e}");
                    WorkerYield::default()
                }
            },
            None => WorkerYield::default(),
        };

        self.archive_take(&yielded.take);

        self.state.store(CaptureState::Flushing);
        let outcome = if yielded.remainder.is_empty() {
            debug!("no buffered audio at stop, skipping final transcription");
            Ok(None)
        } else {
            let session_id = self.session.session_id().await;
            match self
                .client
                .transcribe(&yielded.remainder, session_id.as_deref(), true)
                .await
            {
                Ok(text) => {
                    let text = text.trim().to_string();
                    Ok((!text.is_empty()).then_some(text))
                }
                Err(e) => Err(e),
            }
        };

        self.draft.send_replace(None);
        self.state.store(CaptureState::Idle);
        info!("recording stopped");
        outcome
    }

    fn archive_take(&self, take: &RecordingTake) {
        let Some(dir) = &self.config.archive_dir else {
            return;
        };
        if take.samples.is_empty() {
            return;
        }
        let archive = RecordingArchive::new(dir.clone());
        if let Err(e) = archive.write(&take.samples, take.sample_rate, take.channels) {
            warn!("failed to archive recording: {e}");
        }
    }
}

/// Everything the worker hands back when it exits: chunks buffered since the
/// last tick, plus the whole take when archiving is on.
#[derive(Default)]
struct WorkerYield {
    remainder: Vec<AudioChunk>,
    take: RecordingTake,
}

#[derive(Default)]
struct RecordingTake {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

impl RecordingTake {
    fn extend(&mut self, chunk: &AudioChunk) {
        if self.samples.is_empty() {
            self.sample_rate = chunk.sample_rate;
            self.channels = chunk.channels;
        }
        self.samples.extend_from_slice(&chunk.samples);
    }
}

async fn flush_loop(
    mut chunks_rx: mpsc::Receiver<AudioChunk>,
    live: watch::Receiver<bool>,
    client: Arc<BackendClient>,
    session: Arc<SessionManager>,
    draft: Arc<watch::Sender<Option<String>>>,
    flush_interval: Duration,
    keep_take: bool,
) -> WorkerYield {
    let mut ticker = interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the first flush
    // waits a full interval.
    ticker.tick().await;

    let mut buffer: Vec<AudioChunk> = Vec::new();
    let mut take = RecordingTake::default();

    loop {
        tokio::select! {
            maybe = chunks_rx.recv() => match maybe {
                Some(chunk) => {
                    if keep_take {
                        take.extend(&chunk);
                    }
                    buffer.push(chunk);
                }
                // The channel closes when the device is released; whatever
                // buffered after the last tick rides the final request.
                None => break,
            },
            _ = ticker.tick() => {
                // Re-read the shared flag on every tick: a stop requested
                // between ticks must not produce another interim submission.
                if !*live.borrow() {
                    continue;
                }
                if buffer.is_empty() {
                    continue;
                }
                let batch = std::mem::take(&mut buffer);
                spawn_interim(batch, &client, &session, &draft);
            }
        }
    }

    WorkerYield {
        remainder: buffer,
        take,
    }
}

/// Interim submissions ride detached tasks so a slow transcription never
/// stalls the flush cycle; failures are non-fatal to the recording.
fn spawn_interim(
    batch: Vec<AudioChunk>,
    client: &Arc<BackendClient>,
    session: &Arc<SessionManager>,
    draft: &Arc<watch::Sender<Option<String>>>,
) {
    let client = Arc::clone(client);
    let session = Arc::clone(session);
    let draft = Arc::clone(draft);
    tokio::spawn(async move {
        let session_id = session.session_id().await;
        match client.transcribe(&batch, session_id.as_deref(), false).await {
            Ok(text) => {
                if !text.trim().is_empty() {
                    draft.send_replace(Some(text));
                }
            }
            Err(e) => warn!("interim transcription failed, recording continues: {e}"),
        }
    });
}

struct AtomicState(AtomicU8);

impl AtomicState {
    fn new() -> Self {
        Self(AtomicU8::new(encode(CaptureState::Idle)))
    }

    fn load(&self) -> CaptureState {
        decode(self.0.load(Ordering::SeqCst))
    }

    fn store(&self, state: CaptureState) {
        self.0.store(encode(state), Ordering::SeqCst);
    }

    fn transition(&self, from: CaptureState, to: CaptureState) -> bool {
        self.0
            .compare_exchange(encode(from), encode(to), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

fn encode(state: CaptureState) -> u8 {
    match state {
        CaptureState::Idle => 0,
        CaptureState::Acquiring => 1,
        CaptureState::Recording => 2,
        CaptureState::Flushing => 3,
        CaptureState::Stopping => 4,
    }
}

fn decode(value: u8) -> CaptureState {
    match value {
        0 => CaptureState::Idle,
        1 => CaptureState::Acquiring,
        2 => CaptureState::Recording,
        3 => CaptureState::Flushing,
        _ => CaptureState::Stopping,
    }
}
