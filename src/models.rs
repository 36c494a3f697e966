use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Bot,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Bot => "bot",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MessageRole {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "bot" => Ok(MessageRole::Bot),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// One turn of a chat thread. Turns are never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    /// Position in the owning thread, starting at 0.
    pub seq: u64,
    pub role: MessageRole,
    pub text: String,
    pub is_attachment: bool,
    /// Submission sequence this bot turn answers, if any.
    pub in_reply_to: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// A turn before the thread assigns it a position.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub role: MessageRole,
    pub text: String,
    pub is_attachment: bool,
    pub in_reply_to: Option<u64>,
}

impl NewMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: MessageRole::User, text: text.into(), is_attachment: false, in_reply_to: None }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self { role: MessageRole::Bot, text: text.into(), is_attachment: false, in_reply_to: None }
    }

    pub fn attachment(file_name: &str) -> Self {
        Self {
            role: MessageRole::User,
            text: format!("Uploaded document: {file_name}"),
            is_attachment: true,
            in_reply_to: None,
        }
    }

    pub fn replying_to(mut self, submission: u64) -> Self {
        self.in_reply_to = Some(submission);
        self
    }
}

// ── Intake exchange ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeEndpoint {
    Chat,
    Verify,
}

impl IntakeEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            IntakeEndpoint::Chat => "/chat",
            IntakeEndpoint::Verify => "/verify",
        }
    }
}

/// A validated user utterance ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeRequest {
    utterance: String,
    context: Option<String>,
}

impl IntakeRequest {
    /// Rejects empty and whitespace-only utterances.
    pub fn new(utterance: &str, context: Option<&str>) -> Result<Self, AppError> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(AppError::EmptyField { field_name: "utterance".to_string() });
        }
        Ok(Self {
            utterance: utterance.to_string(),
            context: context.map(str::to_string),
        })
    }

    pub fn utterance(&self) -> &str {
        &self.utterance
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Requests carrying a specialty go to the verification endpoint.
    pub fn endpoint(&self) -> IntakeEndpoint {
        match self.context {
            Some(_) => IntakeEndpoint::Verify,
            None => IntakeEndpoint::Chat,
        }
    }

    pub fn payload(&self) -> IntakePayload<'_> {
        IntakePayload { user_message: &self.utterance, specialty: self.context.as_deref() }
    }
}

/// JSON body of `POST /chat` and `POST /verify`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakePayload<'a> {
    pub user_message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeResponse {
    pub reply_text: String,
}

impl IntakeResponse {
    /// Parses a `{ "botMessage": "..." }` body. A missing, blank or non-string
    /// `botMessage` is a malformed response.
    pub fn from_body(body: &str) -> Result<Self, AppError> {
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| AppError::malformed(format!("invalid JSON: {e}")))?;
        match value.get("botMessage").and_then(serde_json::Value::as_str) {
            Some(text) if !text.is_empty() => Ok(Self { reply_text: text.to_string() }),
            _ => Err(AppError::malformed("missing botMessage")),
        }
    }
}

/// JSON body of `GET /terms`.
#[derive(Debug, Clone, Deserialize)]
pub struct TermsResponse {
    pub terms: String,
}

// ── Screens ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Specialist {
    pub name: &'static str,
    pub specialty: &'static str,
}

pub const SPECIALISTS: [Specialist; 3] = [
    Specialist { name: "Dr. Heart", specialty: "Cardiovascular" },
    Specialist { name: "Dr. Metabolism", specialty: "Metabolic Diseases" },
    Specialist { name: "Dr. Organ", specialty: "Major Organ Diseases" },
];

impl Specialist {
    /// Looks up a specialist by name or specialty, ignoring case.
    pub fn find(query: &str) -> Result<Specialist, AppError> {
        let query = query.trim();
        SPECIALISTS
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(query) || s.specialty.eq_ignore_ascii_case(query))
            .copied()
            .ok_or_else(|| AppError::UnknownSpecialist { name: query.to_string() })
    }
}

impl Default for Specialist {
    fn default() -> Self {
        SPECIALISTS[0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    Landing,
    SignUp,
    Verify,
}

impl ScreenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenKind::Landing => "landing",
            ScreenKind::SignUp => "signup",
            ScreenKind::Verify => "verify",
        }
    }

    pub fn greeting(&self) -> &'static str {
        match self {
            ScreenKind::Landing => "Hello! I'm your AI assistant. How can I help you today?",
            ScreenKind::SignUp => {
                "Welcome! I'll help you sign up for SecureLife insurance. I'll ask you a few \
                 questions to understand your needs better. Ready to begin?"
            }
            ScreenKind::Verify => {
                "Welcome! I'll help you verify your if your claim is valid or not. I'll ask you \
                 a few questions to understand your needs better. Ready to begin?"
            }
        }
    }
}

impl std::fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScreenKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "landing" => Ok(ScreenKind::Landing),
            "signup" | "sign-up" => Ok(ScreenKind::SignUp),
            "verify" => Ok(ScreenKind::Verify),
            other => Err(format!("Unknown screen: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_utterances_are_rejected() {
        assert!(IntakeRequest::new("   \n\t", None).is_err());
        assert!(IntakeRequest::new("", Some("Cardiovascular")).is_err());
    }

    #[test]
    fn verify_payload_carries_specialty() {
        let req = IntakeRequest::new("My claim was rejected, why?", Some("Cardiovascular")).unwrap();
        assert_eq!(req.endpoint(), IntakeEndpoint::Verify);
        let json = serde_json::to_value(req.payload()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "userMessage": "My claim was rejected, why?", "specialty": "Cardiovascular" })
        );
    }

    #[test]
    fn chat_payload_omits_specialty() {
        let req = IntakeRequest::new("hello", None).unwrap();
        assert_eq!(req.endpoint().path(), "/chat");
        let json = serde_json::to_value(req.payload()).unwrap();
        assert_eq!(json, serde_json::json!({ "userMessage": "hello" }));
    }

    #[test]
    fn response_without_bot_message_is_malformed() {
        assert!(matches!(
            IntakeResponse::from_body(r#"{"reply":"hi"}"#),
            Err(AppError::MalformedResponse { .. })
        ));
        assert!(IntakeResponse::from_body(r#"{"botMessage":""}"#).is_err());
        assert!(IntakeResponse::from_body(r#"{"botMessage":42}"#).is_err());
        assert!(IntakeResponse::from_body("<html>").is_err());
        assert_eq!(
            IntakeResponse::from_body(r#"{"botMessage":"Let me check that."}"#).unwrap().reply_text,
            "Let me check that."
        );
    }

    #[test]
    fn specialist_lookup_by_name_or_specialty() {
        assert_eq!(Specialist::find("dr. organ").unwrap().specialty, "Major Organ Diseases");
        assert_eq!(Specialist::find("metabolic diseases").unwrap().name, "Dr. Metabolism");
        assert!(Specialist::find("Dr. Who").is_err());
        assert_eq!(Specialist::default().specialty, "Cardiovascular");
    }

    #[test]
    fn role_round_trips_through_strings() {
        assert_eq!(MessageRole::try_from("BOT".to_string()), Ok(MessageRole::Bot));
        assert!(MessageRole::try_from("system".to_string()).is_err());
    }
}
