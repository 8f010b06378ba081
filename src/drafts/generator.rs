//! Message generators — produce inquiry text for one or many contacts.
//!
//! Generators never fail: any provider error or empty output falls back to a
//! fixed template so the draft pipeline always has usable text.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::InquiryConfig;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

/// Placeholder the batch template uses for the contact's name.
pub const NAME_PLACEHOLDER: &str = "{{PHARMACY_NAME}}";

/// Preamble sent with every drafting request.
const SYSTEM_PROMPT: &str = "You write short WhatsApp messages asking pharmacies whether a product \
     is in stock. Reply with the message text only, without quotes or commentary.";

/// Produces inquiry messages. Implementations must always return usable text.
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    /// Draft one message for `name`.
    async fn generate_one(&self, name: &str, config: &InquiryConfig) -> String;

    /// Draft messages for `names` in one call. Output index `i` belongs to
    /// `names[i]`; the result may be shorter than the input.
    async fn generate_batch(&self, names: &[String], config: &InquiryConfig) -> Vec<String>;
}

/// Fallback for a single draft.
pub fn fallback_single(name: &str, config: &InquiryConfig) -> String {
    format!("Hello {}, do you have {} in stock?", name, config.product_name)
}

/// Fallback template when the model returns an empty batch template.
pub fn fallback_template(config: &InquiryConfig) -> String {
    format!(
        "Hi {NAME_PLACEHOLDER}, do you have availability for {}?",
        config.product_name
    )
}

/// Fallback for every name when the batch request itself fails.
pub fn fallback_batch_message(name: &str, config: &InquiryConfig) -> String {
    format!("Hi {}, checking stock for {}.", name, config.product_name)
}

/// Fill the first placeholder occurrence with `name`.
pub fn apply_template(template: &str, name: &str) -> String {
    template.replacen(NAME_PLACEHOLDER, name, 1)
}

/// Offline generator producing the fixed fallback texts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGenerator;

#[async_trait]
impl MessageGenerator for TemplateGenerator {
    async fn generate_one(&self, name: &str, config: &InquiryConfig) -> String {
        fallback_single(name, config)
    }

    async fn generate_batch(&self, names: &[String], config: &InquiryConfig) -> Vec<String> {
        let template = fallback_template(config);
        names.iter().map(|n| apply_template(&template, n)).collect()
    }
}

/// Settings for LLM-backed drafting.
#[derive(Debug, Clone)]
pub struct LlmGeneratorConfig {
    pub temperature: f32,
    /// Token limit for a single draft.
    pub max_tokens: u32,
    /// Token limit for the batch template.
    pub template_max_tokens: u32,
}

impl Default for LlmGeneratorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 100,
            template_max_tokens: 256,
        }
    }
}

/// Drafts messages with an LLM, falling back to templates on any failure.
pub struct LlmMessageGenerator {
    llm: Arc<dyn LlmProvider>,
    config: LlmGeneratorConfig,
}

impl LlmMessageGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self::with_config(llm, LlmGeneratorConfig::default())
    }

    pub fn with_config(llm: Arc<dyn LlmProvider>, config: LlmGeneratorConfig) -> Self {
        Self { llm, config }
    }
}

fn single_prompt(name: &str, config: &InquiryConfig) -> String {
    format!(
        "Write a WhatsApp message to a pharmacy named \"{name}\".\n\
         I am inquiring about the availability of the product: \"{product}\".\n\
         Additional context: {notes}.\n\
         Tone: {tone}.\n\n\
         Keep it short, direct, and ready to send. Do not include placeholders like \
         \"[Your Name]\" unless absolutely necessary, but prefer generic closings like \"Thanks\".\n\
         Maximum 3 sentences.",
        product = config.product_name,
        notes = config.additional_notes,
        tone = config.tone,
    )
}

fn template_prompt(config: &InquiryConfig) -> String {
    format!(
        "Create a generic WhatsApp message template to ask a pharmacy if they have a product.\n\
         Product: \"{product}\"\n\
         Notes: {notes}\n\
         Tone: {tone}\n\n\
         Use \"{NAME_PLACEHOLDER}\" as the placeholder for the pharmacy name.\n\
         Keep it short and concise.",
        product = config.product_name,
        notes = config.additional_notes,
        tone = config.tone,
    )
}

#[async_trait]
impl MessageGenerator for LlmMessageGenerator {
    async fn generate_one(&self, name: &str, config: &InquiryConfig) -> String {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(single_prompt(name, config)),
        ])
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        match self.llm.complete(request).await {
            Ok(response) => {
                let text = response.content.trim();
                if text.is_empty() {
                    warn!(name = name, "Empty draft from model, using fallback");
                    fallback_single(name, config)
                } else {
                    debug!(name = name, "Drafted message");
                    text.to_string()
                }
            }
            Err(e) => {
                warn!(name = name, error = %e, "Error generating message, using fallback");
                fallback_single(name, config)
            }
        }
    }

    async fn generate_batch(&self, names: &[String], config: &InquiryConfig) -> Vec<String> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(template_prompt(config)),
        ])
            .with_max_tokens(self.config.template_max_tokens);

        match self.llm.complete(request).await {
            Ok(response) => {
                let trimmed = response.content.trim();
                let template = if trimmed.is_empty() {
                    warn!("Empty template from model, using fallback");
                    fallback_template(config)
                } else {
                    trimmed.to_string()
                };
                info!(count = names.len(), "Applying drafted template");
                names.iter().map(|n| apply_template(&template, n)).collect()
            }
            Err(e) => {
                warn!(error = %e, count = names.len(), "Batch generation failed, using fallback");
                names
                    .iter()
                    .map(|n| fallback_batch_message(n, config))
                    .collect()
            }
        }
    }
}
