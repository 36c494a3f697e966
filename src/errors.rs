use thiserror::Error;

/// Top-level application error.
/// Every variant renders a human-readable message, since intake failures end up
/// as chat turns rather than propagating.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Intake transport errors ──────────────────────────────────────────────
    #[error("{message}")]
    Network { message: String },

    #[error("HTTP error! status: {status}")]
    HttpStatus { status: u16 },

    #[error("Unexpected response format")]
    MalformedResponse { detail: String },

    // ── Speech errors ────────────────────────────────────────────────────────
    #[error("Speech recognition is not available on this platform")]
    CapabilityUnavailable,

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    #[error("Unsupported document '{file_name}' (expected .pdf, .doc or .docx)")]
    UnsupportedAttachment { file_name: String },

    #[error("Unknown specialist '{name}'")]
    UnknownSpecialist { name: String },

    // ── Terms errors ─────────────────────────────────────────────────────────
    #[error("You must accept the Terms and Conditions to proceed.")]
    TermsNotAcknowledged,

    #[error("Failed to fetch Terms and Conditions: {message}")]
    TermsUnavailable { message: String },

    // ── Storage errors ───────────────────────────────────────────────────────
    #[error("Storage failure at {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt state file: {0}")]
    StateFormat(#[source] serde_json::Error),
}

impl AppError {
    pub fn storage(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Storage { path: path.into(), source }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        AppError::MalformedResponse { detail: detail.into() }
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::Network { .. } | AppError::HttpStatus { .. } | AppError::MalformedResponse { .. }
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::EmptyField { .. }
                | AppError::UnsupportedAttachment { .. }
                | AppError::UnknownSpecialist { .. }
        )
    }

    pub fn is_capability_unavailable(&self) -> bool {
        matches!(self, AppError::CapabilityUnavailable)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AppError::malformed(e.to_string())
        } else if let Some(status) = e.status() {
            AppError::HttpStatus { status: status.as_u16() }
        } else {
            AppError::Network { message: e.to_string() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_messages_match_chat_wording() {
        assert_eq!(AppError::HttpStatus { status: 500 }.to_string(), "HTTP error! status: 500");
        assert_eq!(AppError::malformed("no botMessage").to_string(), "Unexpected response format");
        assert!(AppError::malformed("x").is_transport());
        assert!(!AppError::TermsNotAcknowledged.is_transport());
    }

    #[test]
    fn validation_classification() {
        let err = AppError::EmptyField { field_name: "utterance".into() };
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Field 'utterance' cannot be empty");
        assert!(AppError::CapabilityUnavailable.is_capability_unavailable());
    }
}
