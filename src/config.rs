//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default model used for message drafting.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Default simulated dispatch latency for automated sends.
pub const DEFAULT_SEND_DELAY: Duration = Duration::from_millis(1500);

/// Tone requested from the text generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Urgent,
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Professional => write!(f, "professional"),
            Self::Casual => write!(f, "casual"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for Tone {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "professional" => Ok(Self::Professional),
            "casual" => Ok(Self::Casual),
            "urgent" => Ok(Self::Urgent),
            other => Err(ConfigError::InvalidValue {
                key: "tone".to_string(),
                message: format!("unknown tone '{other}' (expected professional, casual or urgent)"),
            }),
        }
    }
}

/// What we're asking every contact about. Passed explicitly to the draft pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryConfig {
    /// Product to ask about. Must be non-empty before drafting.
    pub product_name: String,
    /// Extra context handed to the generator.
    pub additional_notes: String,
    pub tone: Tone,
}

impl InquiryConfig {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            ..Self::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.additional_notes = notes.into();
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    /// Whether generation is allowed to run.
    pub fn has_product(&self) -> bool {
        !self.product_name.trim().is_empty()
    }
}

/// Process configuration for the binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// JSON file the contact list is persisted to.
    pub db_path: PathBuf,
    /// Directory for rolling log files.
    pub log_dir: PathBuf,
    /// Anthropic API key. `None` selects the offline template generator.
    pub api_key: Option<secrecy::SecretString>,
    pub model: String,
    /// Simulated latency per automated send.
    pub send_delay: Duration,
    /// Initial inquiry settings.
    pub inquiry: InquiryConfig,
}

impl AppConfig {
    /// Build configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = std::env::var("INQUIRY_DB_PATH")
            .unwrap_or_else(|_| "./data/contacts.json".to_string())
            .into();

        let log_dir = std::env::var("INQUIRY_LOG_DIR")
            .unwrap_or_else(|_| "./logs".to_string())
            .into();

        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(secrecy::SecretString::from);

        let model = std::env::var("INQUIRY_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let send_delay = std::env::var("INQUIRY_SEND_DELAY_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_SEND_DELAY);

        let tone = match std::env::var("INQUIRY_TONE") {
            Ok(raw) => raw.parse::<Tone>()?,
            Err(_) => Tone::default(),
        };

        let inquiry = InquiryConfig {
            product_name: std::env::var("INQUIRY_PRODUCT").unwrap_or_default(),
            additional_notes: std::env::var("INQUIRY_NOTES").unwrap_or_default(),
            tone,
        };

        Ok(Self {
            db_path,
            log_dir,
            api_key,
            model,
            send_delay,
            inquiry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_parses_case_insensitively() {
        assert_eq!("Casual".parse::<Tone>().unwrap(), Tone::Casual);
        assert_eq!(" urgent ".parse::<Tone>().unwrap(), Tone::Urgent);
        assert!("shouty".parse::<Tone>().is_err());
    }

    #[test]
    fn product_must_be_non_blank() {
        assert!(!InquiryConfig::default().has_product());
        assert!(!InquiryConfig::new("   ").has_product());
        assert!(InquiryConfig::new("Ozempic 1mg").has_product());
    }

    #[test]
    fn builder_sets_fields() {
        let config = InquiryConfig::new("Ozempic")
            .with_notes("generic is fine")
            .with_tone(Tone::Urgent);
        assert_eq!(config.additional_notes, "generic is fine");
        assert_eq!(config.tone, Tone::Urgent);
        assert_eq!(config.tone.to_string(), "urgent");
    }
}
