use super::capture::{AudioCapture, AudioChunk, CaptureConfig};
use crate::error::ConsoleError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Deterministic capture source that replays a prepared script of sample
/// buffers, one per cadence interval. Stands in for real hardware in tests
/// and mic-less demos.
///
/// After the script is exhausted the channel stays open, like a live
/// microphone over silence, until `release()`.
pub struct ScriptedCapture {
    config: CaptureConfig,
    script: Vec<Vec<i16>>,
    cadence: Duration,
    deny_acquire: bool,
    releases: Arc<AtomicUsize>,
    feeder: Option<JoinHandle<()>>,
}

impl ScriptedCapture {
    pub fn new(config: CaptureConfig, script: Vec<Vec<i16>>) -> Self {
        let cadence = Duration::from_millis(config.chunk_duration_ms.max(1));
        Self {
            config,
            script,
            cadence,
            deny_acquire: false,
            releases: Arc::new(AtomicUsize::new(0)),
            feeder: None,
        }
    }

    /// Override the interval between emitted chunks.
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    /// Make `acquire()` fail, emulating a denied microphone prompt.
    pub fn denying(config: CaptureConfig) -> Self {
        let mut source = Self::new(config, Vec::new());
        source.deny_acquire = true;
        source
    }

    /// Counter incremented once per `release()` of an acquired source.
    pub fn release_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.releases)
    }
}

#[async_trait::async_trait]
impl AudioCapture for ScriptedCapture {
    async fn acquire(&mut self) -> Result<mpsc::Receiver<AudioChunk>, ConsoleError> {
        if self.deny_acquire {
            return Err(ConsoleError::PermissionDenied(
                "scripted source configured to deny".into(),
            ));
        }
        if self.feeder.is_some() {
            return Err(ConsoleError::RecordingBusy);
        }

        let (tx, rx) = mpsc::channel(64);
        let script = self.script.clone();
        let cadence = self.cadence;
        let sample_rate = self.config.sample_rate;
        let channels = self.config.channels;

        self.feeder = Some(tokio::spawn(async move {
            for (sequence, samples) in script.into_iter().enumerate() {
                tokio::time::sleep(cadence).await;
                let chunk = AudioChunk {
                    sequence: sequence as u64,
                    samples,
                    sample_rate,
                    channels,
                };
                if tx.send(chunk).await.is_err() {
                    return;
                }
            }
            // Keep the channel open until release() aborts us.
            std::future::pending::<()>().await;
        }));

        Ok(rx)
    }

    async fn release(&mut self) -> Result<(), ConsoleError> {
        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
            self.releases.fetch_add(1, Ordering::SeqCst);
            debug!("scripted source released");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.feeder.is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_script_in_order() {
        let config = CaptureConfig::default();
        let script = vec![vec![1i16; 4], vec![2i16; 4]];
        let mut source =
            ScriptedCapture::new(config, script).with_cadence(Duration::from_millis(1));

        let mut rx = source.acquire().await.expect("acquire");
        let first = rx.recv().await.expect("first chunk");
        let second = rx.recv().await.expect("second chunk");
        assert_eq!(first.sequence, 0);
        assert_eq!(first.samples, vec![1i16; 4]);
        assert_eq!(second.sequence, 1);

        source.release().await.expect("release");
        assert_eq!(source.release_count().load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn channel_closes_only_on_release() {
        let config = CaptureConfig::default();
        let mut source = ScriptedCapture::new(config, vec![vec![0i16; 2]])
            .with_cadence(Duration::from_millis(1));

        let mut rx = source.acquire().await.expect("acquire");
        assert!(rx.recv().await.is_some());

        source.release().await.expect("release");
        assert!(rx.recv().await.is_none(), "channel closes after release");
    }

    #[tokio::test]
    async fn denying_source_fails_acquisition() {
        let mut source = ScriptedCapture::denying(CaptureConfig::default());
        let err = source.acquire().await.expect_err("must deny");
        assert!(matches!(err, ConsoleError::PermissionDenied(_)));
        assert!(!source.is_capturing());

        // Releasing an unacquired source is a no-op, not a count.
        source.release().await.expect("release");
        assert_eq!(source.release_count().load(Ordering::SeqCst), 0);
    }
}
