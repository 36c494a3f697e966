use std::time::Duration;

use async_trait::async_trait;

use crate::client::IntakeBackend;
use crate::errors::AppError;
use crate::models::{IntakeRequest, IntakeResponse};

pub const CANNED_REPLY: &str =
    "Thank you for your message. Our AI is processing your request and will assist you shortly.";

/// Local stand-in for the landing page assistant: waits, then answers with a
/// fixed reply regardless of the utterance.
#[derive(Debug, Clone)]
pub struct SimulatedIntake {
    delay: Duration,
}

impl SimulatedIntake {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl IntakeBackend for SimulatedIntake {
    async fn exchange(&self, _request: &IntakeRequest) -> Result<IntakeResponse, AppError> {
        tokio::time::sleep(self.delay).await;
        Ok(IntakeResponse { reply_text: CANNED_REPLY.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn replies_after_the_configured_delay() {
        let backend = SimulatedIntake::new(Duration::from_secs(1));
        let req = IntakeRequest::new("hi", None).unwrap();
        let started = tokio::time::Instant::now();
        let reply = backend.exchange(&req).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(reply.reply_text, CANNED_REPLY);
    }
}
