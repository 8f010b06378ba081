//! Tracked contact records and the store that owns them.

pub mod model;
pub mod store;

pub use model::{Contact, ContactPatch, DraftStatus, ReplyStatus, normalize_phone};
pub use store::{ContactStore, StoreEvent};
