//! Automated sequential sending and manual send deep links.

pub mod dispatch;
pub mod runner;

pub use dispatch::{LinkOpener, RecordingOpener, send_manually, whatsapp_link};
pub use runner::{
    CampaignEvent, CampaignProgress, CampaignReport, CampaignRunner, CampaignState,
    DispatchDelay, NoDelay, TokioDelay,
};
