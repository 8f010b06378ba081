//! CSV import/export for the contact list.
//!
//! Import is positional and not quote-aware: a line is split on every comma.
//! Addresses with embedded commas survive because everything between the
//! name and the phone column is rejoined, but quoted names or phones that
//! contain commas are not supported.

pub mod dedup;
pub mod export;
pub mod import;

pub use dedup::{ImportSummary, MIN_PHONE_DIGITS, dedupe_imports};
pub use export::{EXPORT_HEADER, export_csv, export_filename};
pub use import::parse_csv;
