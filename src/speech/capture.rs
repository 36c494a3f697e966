use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::errors::AppError;
use crate::speech::{
    ActiveRecognition, RecognitionEvent, RecognitionSession, RecognitionSettings, SpeechRecognizer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
}

/// Receives each finalized transcript while capture is running.
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    async fn on_transcript(&self, transcript: String);
}

struct RecordingSession {
    active: Arc<AtomicBool>,
    elapsed: Arc<AtomicU64>,
    ticker: JoinHandle<()>,
    pump: JoinHandle<()>,
}

/// Start/stop controls around a [`SpeechRecognizer`], with an elapsed-seconds
/// counter. At most one recording session exists at a time, and the
/// recognizer is released on stop, on recognition error and on drop.
pub struct SpeechCapture {
    recognizer: Arc<dyn SpeechRecognizer>,
    settings: RecognitionSettings,
    session: Option<RecordingSession>,
    /// Final count of the last released session.
    last_elapsed: u64,
}

impl SpeechCapture {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, settings: RecognitionSettings) -> Self {
        Self { recognizer, settings, session: None, last_elapsed: 0 }
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_available()
    }

    pub fn state(&self) -> CaptureState {
        match &self.session {
            Some(s) if s.active.load(Ordering::SeqCst) => CaptureState::Capturing,
            _ => CaptureState::Idle,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.state() == CaptureState::Capturing
    }

    /// Seconds counted by the current session, or by the last one once it
    /// has ended.
    pub fn elapsed_seconds(&self) -> u64 {
        self.session
            .as_ref()
            .map_or(self.last_elapsed, |s| s.elapsed.load(Ordering::SeqCst))
    }

    /// Begins capturing. Returns `Ok(false)` when already capturing, in which
    /// case nothing new is started.
    pub fn start(&mut self, sink: Arc<dyn TranscriptSink>) -> Result<bool, AppError> {
        if !self.recognizer.is_available() {
            warn!("Speech recognition requested but unsupported on this platform");
            return Err(AppError::CapabilityUnavailable);
        }
        if self.is_capturing() {
            debug!("capture already running");
            return Ok(false);
        }
        // A session that ended on a recognition error is still parked here.
        self.release();

        let recognition = self.recognizer.start(&self.settings).map_err(|e| {
            error!("Failed to start speech recognition: {e}");
            e
        })?;

        let ActiveRecognition { events, session } = recognition;
        // Owned by the pump future, so even an unpolled abort releases it.
        let guard = StopOnDrop(session);

        let active = Arc::new(AtomicBool::new(true));
        let elapsed = Arc::new(AtomicU64::new(0));
        let ticker = tokio::spawn(count_seconds(elapsed.clone()));
        let pump = tokio::spawn(pump_events(
            events,
            guard,
            sink,
            active.clone(),
            ticker.abort_handle(),
        ));

        self.session = Some(RecordingSession { active, elapsed, ticker, pump });
        info!(language = %self.settings.language, "speech capture started");
        Ok(true)
    }

    /// Stops capturing and returns the seconds recorded.
    pub fn stop(&mut self) -> u64 {
        if self.session.is_some() {
            info!(seconds = self.elapsed_seconds(), "speech capture stopped");
        }
        self.release();
        self.last_elapsed
    }

    fn release(&mut self) {
        if let Some(session) = self.session.take() {
            self.last_elapsed = session.elapsed.load(Ordering::SeqCst);
            session.active.store(false, Ordering::SeqCst);
            session.ticker.abort();
            // Dropping the pump future drops its guard, which stops the recognizer.
            session.pump.abort();
        }
    }
}

impl Drop for SpeechCapture {
    fn drop(&mut self) {
        self.release();
    }
}

async fn count_seconds(elapsed: Arc<AtomicU64>) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        elapsed.fetch_add(1, Ordering::SeqCst);
    }
}

struct StopOnDrop(Box<dyn RecognitionSession>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.stop();
    }
}

async fn pump_events(
    mut events: mpsc::Receiver<RecognitionEvent>,
    guard: StopOnDrop,
    sink: Arc<dyn TranscriptSink>,
    active: Arc<AtomicBool>,
    ticker: AbortHandle,
) {
    while let Some(event) = events.recv().await {
        match event {
            RecognitionEvent::Final(transcript) => {
                if transcript.trim().is_empty() {
                    continue;
                }
                sink.on_transcript(transcript).await;
            }
            RecognitionEvent::Error(message) => {
                error!("Speech recognition error: {message}");
                break;
            }
        }
    }

    active.store(false, Ordering::SeqCst);
    ticker.abort();
    drop(guard);
}

#[cfg(test)]
mod tests {
    use tokio::sync::Mutex;

    use super::*;
    use crate::speech::{ScriptedRecognizer, UnavailableRecognizer};

    /// Lets aborted tasks be dropped by the runtime.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[derive(Default)]
    struct Collected(Mutex<Vec<String>>);

    #[async_trait]
    impl TranscriptSink for Collected {
        async fn on_transcript(&self, transcript: String) {
            self.0.lock().await.push(transcript);
        }
    }

    fn capture_with(recognizer: ScriptedRecognizer) -> SpeechCapture {
        SpeechCapture::new(Arc::new(recognizer), RecognitionSettings::default())
    }

    #[tokio::test]
    async fn unsupported_platform_fails_fast() {
        let mut capture =
            SpeechCapture::new(Arc::new(UnavailableRecognizer), RecognitionSettings::default());
        let err = capture.start(Arc::new(Collected::default())).unwrap_err();
        assert!(err.is_capability_unavailable());
        assert_eq!(capture.state(), CaptureState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn counter_ticks_once_per_second() {
        let mut capture = capture_with(ScriptedRecognizer::new(Vec::<String>::new()));
        assert!(capture.start(Arc::new(Collected::default())).unwrap());

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(capture.state(), CaptureState::Capturing);
        assert_eq!(capture.elapsed_seconds(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_does_not_add_a_counter() {
        let recognizer = ScriptedRecognizer::new(Vec::<String>::new());
        let mut capture = capture_with(recognizer.clone());
        let sink = Arc::new(Collected::default());

        assert!(capture.start(sink.clone()).unwrap());
        tokio::time::sleep(Duration::from_millis(1_200)).await;
        assert!(!capture.start(sink).unwrap());
        tokio::time::sleep(Duration::from_millis(1_000)).await;

        assert_eq!(capture.elapsed_seconds(), 2);
        assert_eq!(capture.stop(), 2);
        assert_eq!(capture.elapsed_seconds(), 2);
        settle().await;
        assert_eq!(recognizer.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transcripts_reach_the_sink_until_stopped() {
        let recognizer =
            ScriptedRecognizer::new(["one", "two", "three"]).with_gap(Duration::from_secs(1));
        let mut capture = capture_with(recognizer.clone());
        let sink = Arc::new(Collected::default());
        capture.start(sink.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        capture.stop();
        settle().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(*sink.0.lock().await, vec!["one".to_string(), "two".to_string()]);
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(recognizer.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn recognition_error_returns_to_idle_and_releases() {
        let recognizer = ScriptedRecognizer::new(["hello"])
            .with_gap(Duration::from_secs(1))
            .failing_with("no-speech");
        let mut capture = capture_with(recognizer.clone());
        let sink = Arc::new(Collected::default());
        capture.start(sink.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(recognizer.stop_count(), 1);
        let frozen = capture.elapsed_seconds();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(capture.elapsed_seconds(), frozen);
        assert_eq!(*sink.0.lock().await, vec!["hello".to_string()]);

        // A fresh start after the error works.
        assert!(capture.start(sink).unwrap());
        assert!(capture.is_capturing());
    }

    #[tokio::test]
    async fn dropping_the_adapter_releases_the_recognizer() {
        let recognizer = ScriptedRecognizer::new(Vec::<String>::new());
        {
            let mut capture = capture_with(recognizer.clone());
            capture.start(Arc::new(Collected::default())).unwrap();
        }
        settle().await;
        assert_eq!(recognizer.stop_count(), 1);
    }
}
