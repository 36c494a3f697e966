use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::client::http_intake::DEFAULT_BASE_URL;
use crate::speech::RecognitionSettings;

const DEFAULT_SIMULATED_DELAY_MS: u64 = 1000;
const DEFAULT_SPEECH_LANG: &str = "en-US";
const STATE_DIR: &str = "claim-intake";
const TERMS_FILE: &str = "terms.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
    #[error("Could not determine a config directory; set TERMS_STATE_PATH")]
    NoStateDir,
}

/// Settings read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub intake_base_url: String,
    pub terms_state_path: PathBuf,
    pub simulated_reply_delay: Duration,
    pub speech_language: String,
}

impl AppConfig {
    /// Loads `.env` when present, then reads process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let intake_base_url =
            lookup("INTAKE_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let terms_state_path = match lookup("TERMS_STATE_PATH") {
            Some(path) => PathBuf::from(path),
            None => dirs::config_dir()
                .ok_or(ConfigError::NoStateDir)?
                .join(STATE_DIR)
                .join(TERMS_FILE),
        };

        let simulated_reply_delay = match lookup("SIMULATED_REPLY_DELAY_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::Invalid { name: "SIMULATED_REPLY_DELAY_MS", value: raw })?,
            None => Duration::from_millis(DEFAULT_SIMULATED_DELAY_MS),
        };

        let speech_language =
            lookup("SPEECH_LANG").unwrap_or_else(|| DEFAULT_SPEECH_LANG.to_string());

        Ok(Self { intake_base_url, terms_state_path, simulated_reply_delay, speech_language })
    }

    pub fn recognition_settings(&self) -> RecognitionSettings {
        RecognitionSettings { language: self.speech_language.clone(), ..RecognitionSettings::default() }
    }
}
