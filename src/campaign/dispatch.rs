//! Manual send: hands a WhatsApp deep link to the user and records the send.

use std::sync::Mutex;

use tracing::info;
use uuid::Uuid;

use crate::contacts::model::{Contact, ContactPatch, normalize_phone};
use crate::contacts::store::ContactStore;
use crate::error::{CampaignError, StoreError};

/// Base URL for WhatsApp click-to-chat links.
pub const WHATSAPP_BASE: &str = "https://wa.me/";

/// Side channel that presents a deep link to the user.
pub trait LinkOpener: Send + Sync {
    fn open(&self, url: &str);
}

/// Keeps every opened link, for tests and dry runs.
#[derive(Default)]
pub struct RecordingOpener {
    links: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn links(&self) -> Vec<String> {
        self.links.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl LinkOpener for RecordingOpener {
    fn open(&self, url: &str) {
        if let Ok(mut links) = self.links.lock() {
            links.push(url.to_string());
        }
    }
}

/// Build a click-to-chat link for `phone` prefilled with `message`.
pub fn whatsapp_link(phone: &str, message: &str) -> Result<String, CampaignError> {
    let base = format!("{WHATSAPP_BASE}{}", normalize_phone(phone));
    let mut url =
        reqwest::Url::parse(&base).map_err(|e| CampaignError::InvalidLink(e.to_string()))?;
    url.query_pairs_mut().append_pair("text", message);
    // Form encoding writes spaces as '+'; literal '+' is already %2B.
    Ok(url.as_str().replace('+', "%20"))
}

/// Open the deep link for a contact and mark it sent, awaiting a reply.
///
/// Refused while the contact is being drafted or dispatched.
pub async fn send_manually(
    store: &ContactStore,
    id: Uuid,
    opener: &dyn LinkOpener,
) -> Result<Contact, CampaignError> {
    let contact = store.get(id).await.ok_or(StoreError::NotFound { id })?;
    if contact.draft_status.is_busy() {
        return Err(CampaignError::Busy { id });
    }
    if contact.message.is_empty() {
        return Err(StoreError::EmptyMessage { id }.into());
    }

    let link = whatsapp_link(&contact.phone, &contact.message)?;
    opener.open(&link);

    let updated = store.update(id, ContactPatch::sent()).await?;
    info!(contact_id = %id, "Message sent manually");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::contacts::model::{DraftStatus, ReplyStatus};
    use crate::store::MemoryStore;

    #[test]
    fn link_uses_digits_and_percent_encoding() {
        let link = whatsapp_link("+1 (555) 0100", "Hi Acme, any 1+1 deals & stock?").unwrap();
        assert_eq!(
            link,
            "https://wa.me/15550100?text=Hi%20Acme%2C%20any%201%2B1%20deals%20%26%20stock%3F"
        );
    }

    #[tokio::test]
    async fn manual_send_opens_link_and_marks_sent() {
        let store = ContactStore::open(Arc::new(MemoryStore::new())).await;
        let c = store.add_contact("Acme", "555-0100").await.unwrap();
        store.set_message(c.id, "Hello there").await.unwrap();
        let opener = RecordingOpener::new();

        let sent = send_manually(&store, c.id, &opener).await.unwrap();
        assert_eq!(sent.draft_status, DraftStatus::Sent);
        assert_eq!(sent.reply_status, ReplyStatus::Pending);
        assert_eq!(opener.links(), vec!["https://wa.me/5550100?text=Hello%20there"]);
    }

    #[tokio::test]
    async fn manual_send_requires_message() {
        let store = ContactStore::open(Arc::new(MemoryStore::new())).await;
        let c = store.add_contact("Acme", "555-0100").await.unwrap();
        let opener = RecordingOpener::new();

        let result = send_manually(&store, c.id, &opener).await;
        assert!(matches!(
            result,
            Err(CampaignError::Store(StoreError::EmptyMessage { .. }))
        ));
        assert!(opener.links().is_empty());
    }

    #[tokio::test]
    async fn manual_send_refuses_busy_contact() {
        let store = ContactStore::open(Arc::new(MemoryStore::new())).await;
        let c = store.add_contact("Acme", "555-0100").await.unwrap();
        store
            .update(
                c.id,
                ContactPatch::message("Hello").with_draft_status(DraftStatus::Generating),
            )
            .await
            .unwrap();
        let opener = RecordingOpener::new();

        let result = send_manually(&store, c.id, &opener).await;
        assert!(matches!(result, Err(CampaignError::Busy { id }) if id == c.id));
        assert!(opener.links().is_empty());

        let after = store.get(c.id).await.unwrap();
        assert_eq!(after.draft_status, DraftStatus::Generating);
        assert_eq!(after.reply_status, ReplyStatus::Unknown);
    }
}
