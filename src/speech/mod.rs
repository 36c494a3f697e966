//! Speech input behind a capability interface.
//!
//! A [`SpeechRecognizer`] is the platform capability; [`capture::SpeechCapture`]
//! drives it for a chat screen. Platforms without recognition use
//! [`UnavailableRecognizer`], so the rest of the pipeline never has to care.

pub mod capture;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::errors::AppError;

pub use capture::{CaptureState, SpeechCapture, TranscriptSink};

const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSettings {
    pub language: String,
    /// Deliver partial hypotheses. Capture only ever asks for final results.
    pub interim_results: bool,
    /// Keep listening after the first result until stopped.
    pub continuous: bool,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self { language: "en-US".to_string(), interim_results: false, continuous: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// A finalized utterance.
    Final(String),
    Error(String),
}

/// Live handle on the microphone / recognizer. Must be stopped on every exit.
pub trait RecognitionSession: Send {
    fn stop(&mut self);
}

pub struct ActiveRecognition {
    pub events: mpsc::Receiver<RecognitionEvent>,
    pub session: Box<dyn RecognitionSession>,
}

pub trait SpeechRecognizer: Send + Sync {
    fn is_available(&self) -> bool;

    fn start(&self, settings: &RecognitionSettings) -> Result<ActiveRecognition, AppError>;
}

/// Recognizer for platforms without speech support.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRecognizer;

impl SpeechRecognizer for UnavailableRecognizer {
    fn is_available(&self) -> bool {
        false
    }

    fn start(&self, _settings: &RecognitionSettings) -> Result<ActiveRecognition, AppError> {
        Err(AppError::CapabilityUnavailable)
    }
}

/// Plays back a fixed list of utterances, one every `gap`, then keeps the
/// session open (continuous mode) or ends it. Optionally finishes with an error.
#[derive(Debug, Clone)]
pub struct ScriptedRecognizer {
    transcripts: Vec<String>,
    gap: Duration,
    failure: Option<String>,
    stops: Arc<AtomicUsize>,
}

impl ScriptedRecognizer {
    pub fn new<I, S>(transcripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            transcripts: transcripts.into_iter().map(Into::into).collect(),
            gap: Duration::from_millis(500),
            failure: None,
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_gap(mut self, gap: Duration) -> Self {
        self.gap = gap;
        self
    }

    pub fn failing_with(mut self, error: impl Into<String>) -> Self {
        self.failure = Some(error.into());
        self
    }

    /// How many sessions have been released so far.
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

struct ScriptedSession {
    feeder: JoinHandle<()>,
    stops: Arc<AtomicUsize>,
}

impl RecognitionSession for ScriptedSession {
    fn stop(&mut self) {
        self.feeder.abort();
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn is_available(&self) -> bool {
        true
    }

    fn start(&self, settings: &RecognitionSettings) -> Result<ActiveRecognition, AppError> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let transcripts = self.transcripts.clone();
        let failure = self.failure.clone();
        let gap = self.gap;
        let continuous = settings.continuous;

        let feeder = tokio::spawn(async move {
            for transcript in transcripts {
                tokio::time::sleep(gap).await;
                if tx.send(RecognitionEvent::Final(transcript)).await.is_err() {
                    return;
                }
                if !continuous {
                    return;
                }
            }
            if let Some(message) = failure {
                tokio::time::sleep(gap).await;
                let _ = tx.send(RecognitionEvent::Error(message)).await;
                return;
            }
            if continuous {
                // Hold the sender so the session stays open until stopped.
                std::future::pending::<()>().await;
            }
        });

        Ok(ActiveRecognition {
            events: rx,
            session: Box::new(ScriptedSession { feeder, stops: self.stops.clone() }),
        })
    }
}
