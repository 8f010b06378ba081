//! Draft pipeline — maps generator output back into the contact store.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::InquiryConfig;
use crate::contacts::model::{Contact, ContactPatch, DraftStatus};
use crate::contacts::store::ContactStore;
use crate::error::{DraftError, StoreError};

use super::generator::MessageGenerator;

/// Outcome of a bulk drafting pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkDraftReport {
    /// Contacts in the snapshot the batch was issued for.
    pub requested: usize,
    /// Contacts that received a new message.
    pub drafted: usize,
    /// Contacts that kept their previous message (no result at their index).
    pub retained: usize,
    /// Contacts removed while the batch was in flight.
    pub vanished: usize,
}

/// Clears the busy flag when a bulk pass ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Single and bulk message drafting.
pub struct DraftPipeline {
    store: Arc<ContactStore>,
    generator: Arc<dyn MessageGenerator>,
    bulk_busy: AtomicBool,
}

impl DraftPipeline {
    pub fn new(store: Arc<ContactStore>, generator: Arc<dyn MessageGenerator>) -> Self {
        Self {
            store,
            generator,
            bulk_busy: AtomicBool::new(false),
        }
    }

    /// Whether a bulk pass is in flight.
    pub fn is_bulk_generating(&self) -> bool {
        self.bulk_busy.load(Ordering::SeqCst)
    }

    /// Redraft one contact's message.
    pub async fn regenerate(&self, id: Uuid, config: &InquiryConfig) -> Result<Contact, DraftError> {
        if !config.has_product() {
            return Err(DraftError::MissingProduct);
        }
        let contact = self.store.get(id).await.ok_or(DraftError::NotFound { id })?;
        if contact.draft_status.is_busy() {
            return Err(DraftError::Busy { id: Some(id) });
        }

        self.store
            .update(id, ContactPatch::draft_status(DraftStatus::DRAFTING))
            .await?;

        let message = self.generator.generate_one(&contact.name, config).await;

        let patch = ContactPatch::message(message).with_draft_status(DraftStatus::Ready);
        let updated = self.store.update(id, patch).await.map_err(|e| match e {
            StoreError::NotFound { id } => DraftError::NotFound { id },
            other => DraftError::Store(other),
        })?;

        info!(contact_id = %id, "Draft regenerated");
        Ok(updated)
    }

    /// Draft every contact with one batched generator call.
    ///
    /// Results are matched to the snapshot taken before the call, so contacts
    /// added or removed while the call is in flight do not shift alignment.
    pub async fn generate_all(&self, config: &InquiryConfig) -> Result<BulkDraftReport, DraftError> {
        if !config.has_product() {
            return Err(DraftError::MissingProduct);
        }
        if self
            .bulk_busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(DraftError::Busy { id: None });
        }
        let _guard = BusyGuard(&self.bulk_busy);

        let snapshot: Vec<(Uuid, String)> = self
            .store
            .snapshot()
            .await
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        if snapshot.is_empty() {
            return Err(DraftError::EmptyStore);
        }

        self.store
            .update_many(
                snapshot
                    .iter()
                    .map(|(id, _)| (*id, ContactPatch::draft_status(DraftStatus::DRAFTING)))
                    .collect(),
            )
            .await;

        let names: Vec<String> = snapshot.iter().map(|(_, name)| name.clone()).collect();
        info!(count = names.len(), "Bulk drafting");
        let messages = self.generator.generate_batch(&names, config).await;
        if messages.len() < names.len() {
            warn!(
                requested = names.len(),
                returned = messages.len(),
                "Batch returned fewer messages than contacts"
            );
        }

        let mut drafted_ids = HashSet::new();
        let patches: Vec<(Uuid, ContactPatch)> = snapshot
            .iter()
            .enumerate()
            .map(|(i, (id, _))| {
                let mut patch = ContactPatch::draft_status(DraftStatus::Ready);
                if let Some(text) = messages.get(i).filter(|m| !m.is_empty()) {
                    patch.message = Some(text.clone());
                    drafted_ids.insert(*id);
                }
                (*id, patch)
            })
            .collect();

        let applied = self.store.update_many(patches).await;
        let drafted = applied.iter().filter(|c| drafted_ids.contains(&c.id)).count();

        let report = BulkDraftReport {
            requested: snapshot.len(),
            drafted,
            retained: applied.len() - drafted,
            vanished: snapshot.len() - applied.len(),
        };
        info!(
            drafted = report.drafted,
            retained = report.retained,
            vanished = report.vanished,
            "Bulk drafting finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::contacts::model::ReplyStatus;
    use crate::drafts::generator::TemplateGenerator;
    use crate::store::MemoryStore;

    /// Returns at most `limit` batch results, optionally waiting on `gate`
    /// first so a test can mutate the store mid-flight.
    struct ScriptedGenerator {
        limit: usize,
        gate: Option<Arc<Notify>>,
        entered: Arc<Notify>,
    }

    impl ScriptedGenerator {
        fn limited(limit: usize) -> Self {
            Self {
                limit,
                gate: None,
                entered: Arc::new(Notify::new()),
            }
        }
    }

    #[async_trait]
    impl MessageGenerator for ScriptedGenerator {
        async fn generate_one(&self, name: &str, _config: &InquiryConfig) -> String {
            format!("single for {name}")
        }

        async fn generate_batch(&self, names: &[String], _config: &InquiryConfig) -> Vec<String> {
            self.entered.notify_one();
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            names
                .iter()
                .take(self.limit)
                .map(|n| format!("batch for {n}"))
                .collect()
        }
    }

    async fn store_with(names: &[&str]) -> Arc<ContactStore> {
        let store = ContactStore::open(Arc::new(MemoryStore::new())).await;
        for (i, name) in names.iter().rev().enumerate() {
            store
                .add_contact(name, &format!("555-01{i:02}"))
                .await
                .unwrap();
        }
        store
    }

    fn config() -> InquiryConfig {
        InquiryConfig::new("Ozempic")
    }

    #[tokio::test]
    async fn regenerate_requires_product() {
        let store = store_with(&["A"]).await;
        let id = store.snapshot().await[0].id;
        let pipeline = DraftPipeline::new(store, Arc::new(TemplateGenerator));
        let result = pipeline.regenerate(id, &InquiryConfig::default()).await;
        assert!(matches!(result, Err(DraftError::MissingProduct)));
    }

    #[tokio::test]
    async fn regenerate_requires_existing_contact() {
        let store = store_with(&["A"]).await;
        let pipeline = DraftPipeline::new(store, Arc::new(TemplateGenerator));
        let result = pipeline.regenerate(Uuid::new_v4(), &config()).await;
        assert!(matches!(result, Err(DraftError::NotFound { .. })));
    }

    #[tokio::test]
    async fn regenerate_sets_message_and_ready() {
        let store = store_with(&["Acme"]).await;
        let id = store.snapshot().await[0].id;
        let pipeline = DraftPipeline::new(store.clone(), Arc::new(TemplateGenerator));

        let updated = pipeline.regenerate(id, &config()).await.unwrap();
        assert_eq!(updated.message, "Hello Acme, do you have Ozempic in stock?");
        assert_eq!(updated.draft_status, DraftStatus::Ready);
        assert_eq!(updated.reply_status, ReplyStatus::Unknown);
    }

    #[tokio::test]
    async fn regenerate_refuses_busy_contact() {
        let store = store_with(&["Acme"]).await;
        let id = store.snapshot().await[0].id;
        store.set_draft_status(id, DraftStatus::Generating).await.unwrap();
        let pipeline = DraftPipeline::new(store, Arc::new(TemplateGenerator));
        let result = pipeline.regenerate(id, &config()).await;
        assert!(matches!(result, Err(DraftError::Busy { id: Some(_) })));
    }

    #[tokio::test]
    async fn bulk_requires_product_and_contacts() {
        let empty = ContactStore::open(Arc::new(MemoryStore::new())).await;
        let pipeline = DraftPipeline::new(empty, Arc::new(TemplateGenerator));
        assert!(matches!(
            pipeline.generate_all(&InquiryConfig::default()).await,
            Err(DraftError::MissingProduct)
        ));
        assert!(matches!(
            pipeline.generate_all(&config()).await,
            Err(DraftError::EmptyStore)
        ));
        assert!(!pipeline.is_bulk_generating());
    }

    #[tokio::test]
    async fn bulk_drafts_everyone() {
        let store = store_with(&["A", "B", "C"]).await;
        let pipeline = DraftPipeline::new(store.clone(), Arc::new(TemplateGenerator));

        let report = pipeline.generate_all(&config()).await.unwrap();
        assert_eq!(report.requested, 3);
        assert_eq!(report.drafted, 3);
        assert!(!pipeline.is_bulk_generating());

        for c in store.snapshot().await {
            assert_eq!(c.draft_status, DraftStatus::Ready);
            assert_eq!(c.message, format!("Hi {}, do you have availability for Ozempic?", c.name));
        }
    }

    #[tokio::test]
    async fn short_batch_keeps_prior_messages() {
        let store = store_with(&["A", "B", "C"]).await;
        let snapshot = store.snapshot().await;
        store.set_message(snapshot[2].id, "old C").await.unwrap();

        let pipeline = DraftPipeline::new(store.clone(), Arc::new(ScriptedGenerator::limited(2)));
        let report = pipeline.generate_all(&config()).await.unwrap();
        assert_eq!(report.drafted, 2);
        assert_eq!(report.retained, 1);

        let after = store.snapshot().await;
        assert_eq!(after[0].message, "batch for A");
        assert_eq!(after[1].message, "batch for B");
        assert_eq!(after[2].message, "old C");
        assert!(after.iter().all(|c| c.draft_status == DraftStatus::Ready));
    }

    #[tokio::test]
    async fn results_follow_snapshot_not_live_store() {
        let store = store_with(&["A", "B"]).await;
        let gate = Arc::new(Notify::new());
        let generator = ScriptedGenerator {
            limit: usize::MAX,
            gate: Some(gate.clone()),
            entered: Arc::new(Notify::new()),
        };
        let entered = generator.entered.clone();
        let pipeline = Arc::new(DraftPipeline::new(store.clone(), Arc::new(generator)));

        let task = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.generate_all(&config()).await })
        };

        entered.notified().await;
        assert!(pipeline.is_bulk_generating());
        assert!(matches!(
            pipeline.generate_all(&config()).await,
            Err(DraftError::Busy { id: None })
        ));
        let newcomer = store.add_contact("Newcomer", "555-0999").await.unwrap();
        let b_id = store.snapshot().await[2].id;
        store.remove(b_id).await;
        gate.notify_one();

        let report = task.await.unwrap().unwrap();
        assert_eq!(report.requested, 2);
        assert_eq!(report.vanished, 1);

        let after = store.snapshot().await;
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].id, newcomer.id);
        assert!(after[0].message.is_empty());
        assert_eq!(after[0].draft_status, DraftStatus::Idle);
        assert_eq!(after[1].name, "A");
        assert_eq!(after[1].message, "batch for A");
    }
}
