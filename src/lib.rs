//! Contact tracking, message drafting, and campaign sending for stock inquiries.

pub mod campaign;
pub mod config;
pub mod contacts;
pub mod csv;
pub mod drafts;
pub mod error;
pub mod llm;
pub mod query;
pub mod repl;
pub mod store;
