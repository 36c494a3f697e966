use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, error};

use crate::client::IntakeBackend;
use crate::errors::AppError;
use crate::models::{ChatMessage, IntakeRequest, NewMessage};
use crate::store::message_thread::MessageThread;

/// Shown when an error carries no description of its own.
pub const FALLBACK_ERROR_TEXT: &str = "An error occurred while fetching the response";

/// Turns an intake failure into the text of a bot turn.
pub fn error_turn_text(err: &AppError) -> String {
    let description = err.to_string();
    if description.trim().is_empty() {
        FALLBACK_ERROR_TEXT.to_string()
    } else {
        format!("Error: {description}")
    }
}

/// One request/response exchange per accepted utterance, shared by every
/// chat screen and parameterized only by the backend it talks to.
#[derive(Clone)]
pub struct IntakeService {
    backend: Arc<dyn IntakeBackend>,
    submissions: Arc<AtomicU64>,
}

impl IntakeService {
    pub fn new(backend: Arc<dyn IntakeBackend>) -> Self {
        Self { backend, submissions: Arc::new(AtomicU64::new(0)) }
    }

    /// Sends `utterance` (plus an optional specialty) and appends exactly one
    /// bot turn to `thread`: the reply, or a readable error.
    ///
    /// Blank utterances are dropped before dispatch and `None` is returned.
    /// Failures never escape; they become the appended turn.
    pub async fn submit(
        &self,
        thread: &MessageThread,
        utterance: &str,
        context: Option<&str>,
    ) -> Option<ChatMessage> {
        let request = match IntakeRequest::new(utterance, context) {
            Ok(r) => r,
            Err(e) => {
                debug!("ignoring submission: {e}");
                return None;
            }
        };

        let submission = self.submissions.fetch_add(1, Ordering::SeqCst);
        debug!(submission, endpoint = request.endpoint().path(), "submitting utterance");

        let turn = match self.backend.exchange(&request).await {
            Ok(response) => NewMessage::bot(response.reply_text),
            Err(e) => {
                error!("Intake submission {submission} failed: {e:?}");
                NewMessage::bot(error_turn_text(&e))
            }
        };

        Some(thread.append(turn.replying_to(submission)).await)
    }
}
