use std::sync::Arc;

use tracing::{info, warn};

use crate::client::TermsSource;
use crate::errors::AppError;
use crate::store::terms_store::TermsStore;

pub const TERMS_FETCH_FAILED: &str = "An error occurred while fetching the Terms and Conditions.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unknown,
    /// Blocking dialog is up.
    Shown,
    Accepted,
    /// Acceptance was recorded in an earlier session.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermsContent {
    Loading,
    Loaded(String),
    Failed(String),
}

/// One-time terms acceptance checkpoint.
///
/// `accept` depends only on the checkbox, never on whether the terms text
/// could be fetched.
pub struct TermsGate {
    store: Arc<dyn TermsStore>,
    state: GateState,
    checked: bool,
    content: TermsContent,
}

impl TermsGate {
    pub fn new(store: Arc<dyn TermsStore>) -> Self {
        Self { store, state: GateState::Unknown, checked: false, content: TermsContent::Loading }
    }

    /// Reads the persisted flag once and resolves to `Shown` or `Skipped`.
    /// An unreadable flag is treated as absent.
    pub async fn startup(store: Arc<dyn TermsStore>) -> Self {
        let mut gate = Self::new(store);
        let accepted = gate.store.is_accepted().await.unwrap_or_else(|e| {
            warn!("Could not read terms acceptance, asking again: {e}");
            false
        });
        gate.state = if accepted { GateState::Skipped } else { GateState::Shown };
        info!(state = ?gate.state, "terms gate resolved");
        gate
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self.state, GateState::Unknown | GateState::Shown)
    }

    pub fn content(&self) -> &TermsContent {
        &self.content
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }

    pub fn toggle_checked(&mut self) {
        self.checked = !self.checked;
    }

    /// Fills the dialog body. Failure degrades to an inline message.
    pub async fn load_content(&mut self, source: &dyn TermsSource) {
        self.content = match source.fetch_terms().await {
            Ok(terms) => TermsContent::Loaded(terms),
            Err(e) => {
                warn!("Terms fetch failed: {e}");
                TermsContent::Failed(TERMS_FETCH_FAILED.to_string())
            }
        };
    }

    /// Records acceptance. Requires the checkbox; a no-op once the gate is
    /// no longer shown.
    pub async fn accept(&mut self) -> Result<(), AppError> {
        match self.state {
            GateState::Accepted | GateState::Skipped => return Ok(()),
            GateState::Unknown | GateState::Shown => {}
        }
        if !self.checked {
            return Err(AppError::TermsNotAcknowledged);
        }
        self.store.record_acceptance().await?;
        self.state = GateState::Accepted;
        info!("terms accepted");
        Ok(())
    }
}
