//! Contact store — the single in-memory source of truth for tracked contacts.
//!
//! Every mutation is applied as a whole-record replacement under one write
//! lock, then a snapshot is queued for the background writer task and a
//! [`StoreEvent`] is broadcast to subscribers.

use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::csv::{ImportSummary, dedupe_imports};
use crate::error::StoreError;
use crate::store::ContactPersistence;

use super::model::{Contact, ContactPatch, DraftStatus, ReplyStatus};

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Change notifications published after each mutation.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    Added { contact: Contact },
    Updated { contact: Contact },
    Removed { id: Uuid },
    Cleared,
    Imported { accepted: usize, duplicates: usize },
}

enum PersistCommand {
    Save(Vec<Contact>),
    Flush(oneshot::Sender<()>),
}

/// Ordered contact collection, newest first.
pub struct ContactStore {
    contacts: RwLock<Vec<Contact>>,
    tx: broadcast::Sender<StoreEvent>,
    persist_tx: mpsc::UnboundedSender<PersistCommand>,
}

impl ContactStore {
    /// Seed the store from `persistence` and start the background writer.
    ///
    /// A load failure is logged and yields an empty store.
    pub async fn open(persistence: Arc<dyn ContactPersistence>) -> Arc<Self> {
        let contacts = match persistence.load().await {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!(error = %e, "Failed to load contacts, starting empty");
                Vec::new()
            }
        };
        info!(count = contacts.len(), "Contact store opened");

        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(persistence, persist_rx));

        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            contacts: RwLock::new(contacts),
            tx,
            persist_tx,
        })
    }

    /// Subscribe to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    /// Wait until every save queued so far has been attempted.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.persist_tx.send(PersistCommand::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Copy of the current list, in store order.
    pub async fn snapshot(&self) -> Vec<Contact> {
        self.contacts.read().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<Contact> {
        self.contacts.read().await.iter().find(|c| c.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.contacts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.contacts.read().await.is_empty()
    }

    /// Resolve a unique id prefix (as typed by a user) to a full id.
    pub async fn resolve_prefix(&self, prefix: &str) -> Option<Uuid> {
        let prefix = prefix.trim().to_ascii_lowercase().replace('-', "");
        if prefix.is_empty() {
            return None;
        }
        let contacts = self.contacts.read().await;
        let mut matches = contacts
            .iter()
            .filter(|c| c.id.simple().to_string().starts_with(&prefix));
        match (matches.next(), matches.next()) {
            (Some(c), None) => Some(c.id),
            _ => None,
        }
    }

    // ── Mutations ───────────────────────────────────────────────────

    /// Prepend a contact.
    pub async fn add(&self, contact: Contact) -> Contact {
        {
            let mut contacts = self.contacts.write().await;
            contacts.insert(0, contact.clone());
            self.queue_save(&contacts);
        }
        info!(contact_id = %contact.id, name = %contact.name, "Contact added");
        let _ = self.tx.send(StoreEvent::Added {
            contact: contact.clone(),
        });
        contact
    }

    /// Manual add. No duplicate check is performed.
    pub async fn add_contact(
        &self,
        name: &str,
        phone: &str,
    ) -> Result<Contact, StoreError> {
        let (name, phone) = (name.trim(), phone.trim());
        if name.is_empty() || phone.is_empty() {
            return Err(StoreError::MissingField);
        }
        Ok(self.add(Contact::new(name, phone)).await)
    }

    /// Delete a contact. Unknown ids are a no-op.
    pub async fn remove(&self, id: Uuid) -> Option<Contact> {
        let removed = {
            let mut contacts = self.contacts.write().await;
            let idx = contacts.iter().position(|c| c.id == id)?;
            let removed = contacts.remove(idx);
            self.queue_save(&contacts);
            removed
        };
        info!(contact_id = %id, "Contact removed");
        let _ = self.tx.send(StoreEvent::Removed { id });
        Some(removed)
    }

    /// Apply a partial update and return the new record.
    pub async fn update(&self, id: Uuid, patch: ContactPatch) -> Result<Contact, StoreError> {
        let updated = {
            let mut contacts = self.contacts.write().await;
            let slot = contacts
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(StoreError::NotFound { id })?;
            let next = checked_patch(slot, &patch)?;
            *slot = next.clone();
            self.queue_save(&contacts);
            next
        };
        debug!(
            contact_id = %id,
            draft_status = %updated.draft_status,
            reply_status = %updated.reply_status,
            "Contact updated"
        );
        let _ = self.tx.send(StoreEvent::Updated {
            contact: updated.clone(),
        });
        Ok(updated)
    }

    /// Apply several updates under one lock with a single save.
    ///
    /// Missing ids and patches that would break an invariant are skipped.
    pub async fn update_many(&self, patches: Vec<(Uuid, ContactPatch)>) -> Vec<Contact> {
        let updated: Vec<Contact> = {
            let mut contacts = self.contacts.write().await;
            let mut updated = Vec::with_capacity(patches.len());
            for (id, patch) in &patches {
                let Some(slot) = contacts.iter_mut().find(|c| c.id == *id) else {
                    debug!(contact_id = %id, "Skipping update for removed contact");
                    continue;
                };
                match checked_patch(slot, patch) {
                    Ok(next) => {
                        *slot = next.clone();
                        updated.push(next);
                    }
                    Err(e) => warn!(contact_id = %id, error = %e, "Skipping invalid update"),
                }
            }
            if !updated.is_empty() {
                self.queue_save(&contacts);
            }
            updated
        };
        for contact in &updated {
            let _ = self.tx.send(StoreEvent::Updated {
                contact: contact.clone(),
            });
        }
        updated
    }

    /// Replace the drafted text. Cosmetic: does not touch `last_updated`.
    pub async fn set_message(&self, id: Uuid, message: impl Into<String>) -> Result<Contact, StoreError> {
        self.update(id, ContactPatch::message(message)).await
    }

    pub async fn set_draft_status(&self, id: Uuid, status: DraftStatus) -> Result<Contact, StoreError> {
        self.update(id, ContactPatch::draft_status(status)).await
    }

    pub async fn set_reply_status(&self, id: Uuid, status: ReplyStatus) -> Result<Contact, StoreError> {
        self.update(id, ContactPatch::reply_status(status)).await
    }

    /// Empty the store atomically. Returns how many contacts were dropped.
    pub async fn clear(&self) -> usize {
        let dropped = {
            let mut contacts = self.contacts.write().await;
            let dropped = contacts.len();
            contacts.clear();
            self.queue_save(&contacts);
            dropped
        };
        info!(count = dropped, "Contact store cleared");
        let _ = self.tx.send(StoreEvent::Cleared);
        dropped
    }

    /// Merge parsed CSV records, skipping duplicates and fake phone numbers.
    ///
    /// Accepted records are prepended newest-first: the last accepted row of
    /// the file ends up at the top, as if each had been added by hand.
    pub async fn import(&self, records: Vec<Contact>) -> ImportSummary {
        let summary = {
            let mut contacts = self.contacts.write().await;
            let (accepted, summary) = dedupe_imports(&contacts, records);
            if !accepted.is_empty() {
                let mut merged: Vec<Contact> = accepted.into_iter().rev().collect();
                merged.append(&mut contacts);
                *contacts = merged;
                self.queue_save(&contacts);
            }
            summary
        };
        info!(
            accepted = summary.accepted,
            duplicates = summary.duplicates,
            "Contacts imported"
        );
        let _ = self.tx.send(StoreEvent::Imported {
            accepted: summary.accepted,
            duplicates: summary.duplicates,
        });
        summary
    }

    fn queue_save(&self, contacts: &[Contact]) {
        if self
            .persist_tx
            .send(PersistCommand::Save(contacts.to_vec()))
            .is_err()
        {
            warn!("Persistence writer is gone, change not saved");
        }
    }
}

/// Patch `current`, enforcing that `Sent` is only reached with a message.
fn checked_patch(current: &Contact, patch: &ContactPatch) -> Result<Contact, StoreError> {
    let next = current.patched(patch);
    if next.draft_status == DraftStatus::Sent
        && current.draft_status != DraftStatus::Sent
        && next.message.is_empty()
    {
        return Err(StoreError::EmptyMessage { id: current.id });
    }
    Ok(next)
}

/// Background writer: saves snapshots in order, coalescing bursts to the latest.
async fn run_writer(
    persistence: Arc<dyn ContactPersistence>,
    mut rx: mpsc::UnboundedReceiver<PersistCommand>,
) {
    while let Some(first) = rx.recv().await {
        let mut latest = None;
        let mut waiters = Vec::new();

        let mut next = Some(first);
        while let Some(cmd) = next {
            match cmd {
                PersistCommand::Save(snapshot) => latest = Some(snapshot),
                PersistCommand::Flush(done) => waiters.push(done),
            }
            next = rx.try_recv().ok();
        }

        if let Some(snapshot) = latest {
            if let Err(e) = persistence.save(&snapshot).await {
                warn!(error = %e, count = snapshot.len(), "Failed to save contacts");
            }
        }
        for done in waiters {
            let _ = done.send(());
        }
    }
    debug!("Persistence writer stopped");
}
