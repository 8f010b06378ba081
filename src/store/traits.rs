//! The async interface the contact store saves through.

use async_trait::async_trait;

use crate::contacts::model::Contact;
use crate::error::StoreError;

/// Backend-agnostic persistence for the contact list.
///
/// The whole list is loaded once at startup and saved in full after every
/// mutation.
#[async_trait]
pub trait ContactPersistence: Send + Sync {
    /// Load the saved contact list. A missing store is an empty list.
    async fn load(&self) -> Result<Vec<Contact>, StoreError>;

    /// Replace the saved contact list.
    async fn save(&self, contacts: &[Contact]) -> Result<(), StoreError>;
}
