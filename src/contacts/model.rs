//! Contact data model: statuses, records, and partial updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a contact's outbound message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftStatus {
    /// No draft requested yet.
    #[default]
    Idle,
    /// Drafting, or in flight during an automated send.
    Generating,
    /// Draft available and not yet sent.
    Ready,
    /// Message was dispatched.
    Sent,
    /// Reserved. Nothing currently produces it.
    Failed,
}

impl DraftStatus {
    /// Status while a draft is being produced.
    pub const DRAFTING: Self = Self::Generating;
    /// Status while the campaign runner is dispatching a message.
    pub const DISPATCHING: Self = Self::Generating;

    /// Whether an operation is currently working on this contact.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Generating)
    }
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "IDLE",
            Self::Generating => "GENERATING",
            Self::Ready => "READY",
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

/// How the contact answered our inquiry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplyStatus {
    /// Nothing sent yet.
    #[default]
    Unknown,
    /// Sent, waiting for a reply.
    Pending,
    Available,
    Unavailable,
    NoReply,
}

impl std::fmt::Display for ReplyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "UNKNOWN",
            Self::Pending => "PENDING",
            Self::Available => "AVAILABLE",
            Self::Unavailable => "UNAVAILABLE",
            Self::NoReply => "NO_REPLY",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ReplyStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "unknown" => Ok(Self::Unknown),
            "pending" => Ok(Self::Pending),
            "available" => Ok(Self::Available),
            "unavailable" => Ok(Self::Unavailable),
            "no_reply" | "noreply" => Ok(Self::NoReply),
            _ => Err(format!("Unknown reply status: {}", s)),
        }
    }
}

/// A tracked business contact.
///
/// Serialized with the keys of the saved key-value blob, so an
/// existing saved list loads unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    /// Phone exactly as entered or imported.
    pub phone: String,
    #[serde(rename = "status")]
    pub draft_status: DraftStatus,
    #[serde(rename = "responseStatus")]
    pub reply_status: ReplyStatus,
    /// Current drafted text, possibly empty.
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
}

impl Contact {
    /// Create a fresh contact with no draft.
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            phone: phone.into(),
            draft_status: DraftStatus::Idle,
            reply_status: ReplyStatus::Unknown,
            message: String::new(),
            notes: None,
            last_updated: now_millis(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = (!notes.is_empty()).then_some(notes);
        self
    }

    /// Digits-only phone used for dedup and deep links.
    pub fn normalized_phone(&self) -> String {
        normalize_phone(&self.phone)
    }

    /// Eligible for an automated campaign run.
    pub fn is_sendable(&self) -> bool {
        self.draft_status != DraftStatus::Sent && !self.message.is_empty()
    }

    /// Short id prefix for display.
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }

    /// Apply a patch, returning the new record. Refreshes `last_updated` only
    /// when a status value actually changes, and never moves it backwards.
    pub fn patched(&self, patch: &ContactPatch) -> Self {
        let mut next = self.clone();
        if let Some(name) = &patch.name {
            next.name = name.clone();
        }
        if let Some(phone) = &patch.phone {
            next.phone = phone.clone();
        }
        if let Some(message) = &patch.message {
            next.message = message.clone();
        }
        if let Some(notes) = &patch.notes {
            next.notes = notes.clone();
        }
        if let Some(status) = patch.draft_status {
            next.draft_status = status;
        }
        if let Some(status) = patch.reply_status {
            next.reply_status = status;
        }

        if next.draft_status != self.draft_status || next.reply_status != self.reply_status {
            next.last_updated = now_millis().max(self.last_updated);
        }
        next
    }
}

/// Partial mutation of a contact. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub notes: Option<Option<String>>,
    pub draft_status: Option<DraftStatus>,
    pub reply_status: Option<ReplyStatus>,
}

impl ContactPatch {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn draft_status(status: DraftStatus) -> Self {
        Self {
            draft_status: Some(status),
            ..Self::default()
        }
    }

    pub fn reply_status(status: ReplyStatus) -> Self {
        Self {
            reply_status: Some(status),
            ..Self::default()
        }
    }

    /// Dispatched: `Sent` and awaiting a reply.
    pub fn sent() -> Self {
        Self {
            draft_status: Some(DraftStatus::Sent),
            reply_status: Some(ReplyStatus::Pending),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        self.message = Some(text.into());
        self
    }

    pub fn with_draft_status(mut self, status: DraftStatus) -> Self {
        self.draft_status = Some(status);
        self
    }
}

/// Current time truncated to the millisecond precision we persist.
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Reduce a phone string to its ASCII digits.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}
