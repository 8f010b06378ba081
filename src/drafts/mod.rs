//! Message generators and the pipeline that applies their output.

pub mod generator;
pub mod pipeline;

pub use generator::{LlmMessageGenerator, MessageGenerator, TemplateGenerator};
pub use pipeline::{BulkDraftReport, DraftPipeline};
