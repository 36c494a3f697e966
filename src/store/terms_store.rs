use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::errors::AppError;

/// Durable storage for the one-time terms acceptance flag.
#[async_trait]
pub trait TermsStore: Send + Sync {
    /// `true` once acceptance has been recorded for this client.
    async fn is_accepted(&self) -> Result<bool, AppError>;

    async fn record_acceptance(&self) -> Result<(), AppError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientState {
    #[serde(default)]
    terms_accepted: bool,
}

/// Stores the flag in a small JSON file, e.g. `~/.config/claim-intake/terms.json`.
#[derive(Debug, Clone)]
pub struct FileTermsStore {
    path: PathBuf,
}

impl FileTermsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

#[async_trait]
impl TermsStore for FileTermsStore {
    async fn is_accepted(&self) -> Result<bool, AppError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                error!("Failed to read terms state {}: {e}", self.display_path());
                return Err(AppError::storage(self.display_path(), e));
            }
        };
        let state: ClientState = serde_json::from_str(&raw).map_err(AppError::StateFormat)?;
        Ok(state.terms_accepted)
    }

    async fn record_acceptance(&self) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::storage(parent.display().to_string(), e))?;
        }
        let body = serde_json::to_string_pretty(&ClientState { terms_accepted: true })
            .map_err(AppError::StateFormat)?;
        tokio::fs::write(&self.path, body).await.map_err(|e| {
            error!("Failed to persist terms acceptance to {}: {e}", self.display_path());
            AppError::storage(self.display_path(), e)
        })?;
        debug!(path = %self.display_path(), "terms acceptance persisted");
        Ok(())
    }
}

/// Process-local store; clones share the flag. Used by tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryTermsStore {
    accepted: Arc<Mutex<bool>>,
}

impl MemoryTermsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TermsStore for MemoryTermsStore {
    async fn is_accepted(&self) -> Result<bool, AppError> {
        Ok(*self.accepted.lock().await)
    }

    async fn record_acceptance(&self) -> Result<(), AppError> {
        *self.accepted.lock().await = true;
        Ok(())
    }
}
