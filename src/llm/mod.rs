//! LLM access for message drafting.
//!
//! `RigAdapter` wraps a rig-core completion model behind our `LlmProvider`
//! trait, so the drafting code never touches rig types directly.

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use rig::providers::anthropic;
use secrecy::{ExposeSecret, SecretString};

use crate::error::LlmError;

/// Drafting provider backed by an Anthropic model.
pub fn anthropic_provider(api_key: &SecretString, model: &str) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        anthropic::Client::new(api_key.expose_secret()).map_err(|e| LlmError::RequestFailed {
            provider: "anthropic".to_string(),
            reason: e.to_string(),
        })?;
    tracing::info!(model, "Drafting with Anthropic");
    Ok(Arc::new(RigAdapter::new(client.completion_model(model), model)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anthropic_provider_reports_model() {
        // The key is only checked when a request is made.
        let provider = anthropic_provider(&SecretString::from("test-key"), "claude-sonnet-4-20250514").unwrap();
        assert_eq!(provider.model_name(), "claude-sonnet-4-20250514");
    }
}
