pub mod http_intake;
pub mod simulated;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{IntakeRequest, IntakeResponse};

pub use http_intake::HttpIntakeClient;
pub use simulated::SimulatedIntake;

/// The external collaborator that turns an utterance into a reply.
/// One attempt per call: no retry, timeout or cancellation.
#[async_trait]
pub trait IntakeBackend: Send + Sync {
    async fn exchange(&self, request: &IntakeRequest) -> Result<IntakeResponse, AppError>;
}

/// Source of the terms and conditions text shown by the terms gate.
#[async_trait]
pub trait TermsSource: Send + Sync {
    async fn fetch_terms(&self) -> Result<String, AppError>;
}
