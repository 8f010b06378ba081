//! Read-side projections over a store snapshot: list filters and dashboard counters.

use serde::Serialize;

use crate::contacts::model::{Contact, ReplyStatus};

/// Which contacts a list view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactFilter {
    #[default]
    All,
    PendingReply,
    AvailableReply,
}

impl ContactFilter {
    pub fn matches(&self, contact: &Contact) -> bool {
        match self {
            Self::All => true,
            Self::PendingReply => contact.reply_status == ReplyStatus::Pending,
            Self::AvailableReply => contact.reply_status == ReplyStatus::Available,
        }
    }
}

impl std::fmt::Display for ContactFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::PendingReply => write!(f, "pending"),
            Self::AvailableReply => write!(f, "available"),
        }
    }
}

impl std::str::FromStr for ContactFilter {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "pending" => Ok(Self::PendingReply),
            "available" => Ok(Self::AvailableReply),
            _ => Err(format!("Unknown filter: {}", s)),
        }
    }
}

/// Contacts passing `filter`, in store order.
pub fn filter_contacts(contacts: &[Contact], filter: ContactFilter) -> Vec<&Contact> {
    contacts.iter().filter(|c| filter.matches(c)).collect()
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    /// Sent and awaiting a reply.
    pub pending: usize,
    pub available: usize,
    pub unavailable: usize,
    /// `round(100 * available / (available + unavailable))`, 0 when nothing resolved.
    pub success_rate: u8,
    /// Reply status still unknown, i.e. not yet contacted.
    pub unsent: usize,
}

impl DashboardStats {
    pub fn compute(contacts: &[Contact]) -> Self {
        let count = |status: ReplyStatus| contacts.iter().filter(|c| c.reply_status == status).count();
        let available = count(ReplyStatus::Available);
        let unavailable = count(ReplyStatus::Unavailable);
        Self {
            total: contacts.len(),
            pending: count(ReplyStatus::Pending),
            available,
            unavailable,
            success_rate: success_rate(available, unavailable),
            unsent: count(ReplyStatus::Unknown),
        }
    }
}

/// Share of resolved inquiries that found stock, rounded half up.
pub fn success_rate(available: usize, unavailable: usize) -> u8 {
    let resolved = available + unavailable;
    if resolved == 0 {
        return 0;
    }
    ((200 * available + resolved) / (2 * resolved)) as u8
}
