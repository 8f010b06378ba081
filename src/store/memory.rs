//! In-memory persistence backend, mainly for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::contacts::model::Contact;
use crate::error::StoreError;

use super::traits::ContactPersistence;

/// Keeps the last saved list in memory.
#[derive(Default)]
pub struct MemoryStore {
    saved: Mutex<Vec<Contact>>,
    fail: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing list.
    pub fn with_contacts(contacts: Vec<Contact>) -> Self {
        Self {
            saved: Mutex::new(contacts),
            ..Self::default()
        }
    }

    /// A backend whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Last list written by `save`.
    pub fn saved(&self) -> Vec<Contact> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn failure() -> StoreError {
        StoreError::Io(std::io::Error::other("memory store configured to fail"))
    }
}

#[async_trait]
impl ContactPersistence for MemoryStore {
    async fn load(&self) -> Result<Vec<Contact>, StoreError> {
        if self.fail {
            return Err(Self::failure());
        }
        Ok(self.saved())
    }

    async fn save(&self, contacts: &[Contact]) -> Result<(), StoreError> {
        if self.fail {
            return Err(Self::failure());
        }
        if let Ok(mut saved) = self.saved.lock() {
            *saved = contacts.to_vec();
        }
        Ok(())
    }
}
