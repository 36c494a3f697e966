use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::client::{HttpIntakeClient, IntakeBackend, SimulatedIntake};
use crate::errors::AppError;
use crate::models::{ChatMessage, NewMessage, ScreenKind, Specialist};
use crate::service::intake_service::IntakeService;
use crate::speech::{CaptureState, RecognitionSettings, SpeechCapture, SpeechRecognizer, TranscriptSink};
use crate::store::message_thread::MessageThread;

const ATTACHMENT_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

/// Picks the backend a screen talks to: the landing assistant is simulated,
/// the other screens use the intake service.
pub fn backend_for(
    kind: ScreenKind,
    http: &HttpIntakeClient,
    simulated_delay: Duration,
) -> Arc<dyn IntakeBackend> {
    match kind {
        ScreenKind::Landing => Arc::new(SimulatedIntake::new(simulated_delay)),
        ScreenKind::SignUp | ScreenKind::Verify => Arc::new(http.clone()),
    }
}

struct ScreenInner {
    kind: ScreenKind,
    thread: MessageThread,
    intake: IntakeService,
    input: Mutex<String>,
    specialist: Mutex<Specialist>,
}

impl ScreenInner {
    async fn context(&self) -> Option<String> {
        match self.kind {
            ScreenKind::Verify => Some(self.specialist.lock().await.specialty.to_string()),
            ScreenKind::Landing | ScreenKind::SignUp => None,
        }
    }
}

/// Speech results go straight into the pipeline, without a send step.
struct SpokenInput {
    inner: Arc<ScreenInner>,
}

#[async_trait]
impl TranscriptSink for SpokenInput {
    async fn on_transcript(&self, transcript: String) {
        let transcript = transcript.trim().to_string();
        *self.inner.input.lock().await = transcript.clone();
        self.inner.thread.append(NewMessage::user(transcript.clone())).await;

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let context = inner.context().await;
            inner.intake.submit(&inner.thread, &transcript, context.as_deref()).await;
            // Cleared once resolved, unless something newer has been typed or spoken.
            let mut input = inner.input.lock().await;
            if *input == transcript {
                input.clear();
            }
        });
    }
}

/// One chat screen: its own thread, input field, specialist selection and
/// speech capture. Dropping the screen stops any running capture.
pub struct ChatScreen {
    inner: Arc<ScreenInner>,
    speech: SpeechCapture,
}

impl ChatScreen {
    /// Opens the screen with its greeting as the first bot turn.
    pub async fn open(
        kind: ScreenKind,
        intake: IntakeService,
        recognizer: Arc<dyn SpeechRecognizer>,
        settings: RecognitionSettings,
    ) -> Self {
        let thread = MessageThread::new();
        thread.append(NewMessage::bot(kind.greeting())).await;
        info!(screen = %kind, "chat screen opened");

        Self {
            inner: Arc::new(ScreenInner {
                kind,
                thread,
                intake,
                input: Mutex::new(String::new()),
                specialist: Mutex::new(Specialist::default()),
            }),
            speech: SpeechCapture::new(recognizer, settings),
        }
    }

    pub fn kind(&self) -> ScreenKind {
        self.inner.kind
    }

    pub fn thread(&self) -> &MessageThread {
        &self.inner.thread
    }

    pub async fn input(&self) -> String {
        self.inner.input.lock().await.clone()
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        *self.inner.input.lock().await = text.into();
    }

    pub async fn specialist(&self) -> Specialist {
        *self.inner.specialist.lock().await
    }

    pub async fn select_specialist(&self, query: &str) -> Result<Specialist, AppError> {
        let chosen = Specialist::find(query)?;
        *self.inner.specialist.lock().await = chosen;
        debug!(name = chosen.name, "specialist selected");
        Ok(chosen)
    }

    /// Sends the input field: appends the user turn, clears the field and
    /// waits for the bot turn. A blank field does nothing.
    pub async fn send_input(&self) -> Option<ChatMessage> {
        let utterance = {
            let mut input = self.inner.input.lock().await;
            let utterance = input.trim().to_string();
            if utterance.is_empty() {
                return None;
            }
            input.clear();
            utterance
        };

        self.inner.thread.append(NewMessage::user(utterance.clone())).await;
        let context = self.inner.context().await;
        self.inner.intake.submit(&self.inner.thread, &utterance, context.as_deref()).await
    }

    /// Types `text` into the field and sends it.
    pub async fn send(&self, text: &str) -> Option<ChatMessage> {
        self.set_input(text).await;
        self.send_input().await
    }

    /// Records an uploaded document as a user turn. Nothing is sent.
    pub async fn attach(&self, path: &Path) -> Result<ChatMessage, AppError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ATTACHMENT_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)));
        if file_name.is_empty() || !supported {
            return Err(AppError::UnsupportedAttachment { file_name });
        }
        Ok(self.inner.thread.append(NewMessage::attachment(&file_name)).await)
    }

    pub fn speech_supported(&self) -> bool {
        self.speech.is_supported()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.speech.state()
    }

    pub fn recording_seconds(&self) -> u64 {
        self.speech.elapsed_seconds()
    }

    pub fn start_recording(&mut self) -> Result<bool, AppError> {
        let sink = Arc::new(SpokenInput { inner: self.inner.clone() });
        self.speech.start(sink)
    }

    pub fn stop_recording(&mut self) {
        self.speech.stop();
    }

    /// Mic button: starts when idle, stops when capturing. An unsupported
    /// platform just stays idle.
    pub fn toggle_recording(&mut self) -> CaptureState {
        if self.speech.is_capturing() {
            self.stop_recording();
        } else if let Err(e) = self.start_recording() {
            warn!("Speech capture unavailable: {e}");
        }
        self.speech.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IntakeRequest, IntakeResponse, MessageRole};
    use crate::speech::{ScriptedRecognizer, UnavailableRecognizer};

    struct Echo;

    #[async_trait]
    impl IntakeBackend for Echo {
        async fn exchange(&self, request: &IntakeRequest) -> Result<IntakeResponse, AppError> {
            Ok(IntakeResponse {
                reply_text: format!("{} | {}", request.utterance(), request.context().unwrap_or("-")),
            })
        }
    }

    async fn screen(kind: ScreenKind, recognizer: Arc<dyn SpeechRecognizer>) -> ChatScreen {
        ChatScreen::open(
            kind,
            IntakeService::new(Arc::new(Echo)),
            recognizer,
            RecognitionSettings::default(),
        )
        .await
    }

    #[tokio::test]
    async fn opens_with_the_screen_greeting() {
        let screen = screen(ScreenKind::SignUp, Arc::new(UnavailableRecognizer)).await;
        let all = screen.thread().all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].role, MessageRole::Bot);
        assert!(all[0].text.contains("SecureLife"));
    }

    #[tokio::test]
    async fn typed_send_appends_user_then_bot() {
        let screen = screen(ScreenKind::SignUp, Arc::new(UnavailableRecognizer)).await;
        let reply = screen.send("  I want a policy ").await.unwrap();

        let all = screen.thread().all().await;
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].role, MessageRole::User);
        assert_eq!(all[1].text, "I want a policy");
        assert_eq!(reply.text, "I want a policy | -");
        assert!(screen.input().await.is_empty());
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let screen = screen(ScreenKind::SignUp, Arc::new(UnavailableRecognizer)).await;
        assert!(screen.send("   ").await.is_none());
        assert_eq!(screen.thread().len().await, 1);
    }

    #[tokio::test]
    async fn verify_screen_sends_the_selected_specialty() {
        let screen = screen(ScreenKind::Verify, Arc::new(UnavailableRecognizer)).await;
        let reply = screen.send("Is my claim valid?").await.unwrap();
        assert_eq!(reply.text, "Is my claim valid? | Cardiovascular");

        screen.select_specialist("Dr. Organ").await.unwrap();
        let reply = screen.send("And now?").await.unwrap();
        assert_eq!(reply.text, "And now? | Major Organ Diseases");
        assert!(screen.select_specialist("Dr. Nobody").await.is_err());
    }

    #[tokio::test]
    async fn attachments_are_recorded_without_dispatch() {
        let screen = screen(ScreenKind::Verify, Arc::new(UnavailableRecognizer)).await;
        let turn = screen.attach(Path::new("/tmp/Discharge Summary.PDF")).await.unwrap();
        assert!(turn.is_attachment);
        assert_eq!(turn.text, "Uploaded document: Discharge Summary.PDF");
        assert_eq!(screen.thread().len().await, 2);

        let err = screen.attach(Path::new("photo.png")).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(screen.thread().len().await, 2);
    }

    #[tokio::test]
    async fn toggle_on_unsupported_platform_stays_idle() {
        let mut screen = screen(ScreenKind::SignUp, Arc::new(UnavailableRecognizer)).await;
        assert!(!screen.speech_supported());
        assert_eq!(screen.toggle_recording(), CaptureState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn spoken_transcript_is_sent_without_confirmation() {
        let recognizer = ScriptedRecognizer::new(["My claim was rejected, why?"])
            .with_gap(Duration::from_secs(1));
        let mut screen = screen(ScreenKind::Verify, Arc::new(recognizer.clone())).await;

        assert_eq!(screen.toggle_recording(), CaptureState::Capturing);
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert!(screen.input().await.is_empty());
        let all = screen.thread().all().await;
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].role, MessageRole::User);
        assert_eq!(all[2].text, "My claim was rejected, why? | Cardiovascular");
        assert_eq!(screen.recording_seconds(), 1);

        assert_eq!(screen.toggle_recording(), CaptureState::Idle);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(recognizer.stop_count(), 1);
    }

    struct SlowEcho;

    #[async_trait]
    impl IntakeBackend for SlowEcho {
        async fn exchange(&self, request: &IntakeRequest) -> Result<IntakeResponse, AppError> {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(IntakeResponse { reply_text: format!("re: {}", request.utterance()) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spoken_transcript_fills_the_field_until_the_reply_lands() {
        let recognizer =
            ScriptedRecognizer::new(["  claim for knee surgery \n"]).with_gap(Duration::from_secs(1));
        let mut screen = ChatScreen::open(
            ScreenKind::SignUp,
            IntakeService::new(Arc::new(SlowEcho)),
            Arc::new(recognizer),
            RecognitionSettings::default(),
        )
        .await;
        screen.toggle_recording();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(screen.input().await, "claim for knee surgery");
        let all = screen.thread().all().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].text, "claim for knee surgery");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(screen.input().await.is_empty());
        assert_eq!(screen.thread().last().await.unwrap().text, "re: claim for knee surgery");
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_keeps_the_recorded_duration() {
        let recognizer = ScriptedRecognizer::new(Vec::<String>::new());
        let mut screen = screen(ScreenKind::SignUp, Arc::new(recognizer)).await;

        assert_eq!(screen.toggle_recording(), CaptureState::Capturing);
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(screen.toggle_recording(), CaptureState::Idle);
        assert_eq!(screen.recording_seconds(), 3);
    }
}
