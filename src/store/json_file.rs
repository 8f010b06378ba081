//! JSON file backend — stores the contact list as one JSON array on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::contacts::model::Contact;
use crate::error::StoreError;

use super::traits::ContactPersistence;

/// Contact list persisted to a single JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "contacts.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ContactPersistence for JsonFileStore {
    async fn load(&self) -> Result<Vec<Contact>, StoreError> {
        if !fs::try_exists(&self.path).await? {
            debug!(path = %self.path.display(), "No saved contacts yet");
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path).await?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let contacts: Vec<Contact> = serde_json::from_str(&raw)?;
        info!(path = %self.path.display(), count = contacts.len(), "Contacts loaded");
        Ok(contacts)
    }

    async fn save(&self, contacts: &[Contact]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string(contacts)?;
        let tmp = self.temp_path();
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), count = contacts.len(), "Contacts saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("contacts.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/contacts.json"));

        let contacts = vec![
            Contact::new("Acme Pharmacy", "555-0100").with_notes("Address: 1 Main St"),
            Contact::new("Corner Drugs", "555-0199"),
        ];
        store.save(&contacts).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, contacts);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contacts.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::new(path);
        assert!(matches!(
            store.load().await,
            Err(StoreError::Serialization(_))
        ));
    }
}
