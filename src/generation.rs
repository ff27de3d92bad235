//! Answer generation from retrieved context.
//!
//! The [`Generator`] receives the top-K chunk texts in rank order plus the
//! raw question and returns a natural-language answer. The prompt is the
//! fixed instruction template in [`build_prompt`]. Without credentials
//! the generation step is skipped and a fixed notice is returned in place
//! of an answer.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::GenerationConfig;
use crate::http::{post_json_with_retry, JsonRequest};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Placeholder value shipped in sample `.env` files; treated as unset.
const PLACEHOLDER_API_KEY: &str = "GIVE_API_KEY";

/// Returned instead of an answer when no model can be called.
pub const SKIPPED_MESSAGE: &str = "LLM step skipped because no API key was provided.\n\n\
The retrieved context contains the information needed to answer the question.";

#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce an answer to `question` from `context`, most relevant first.
    async fn generate(&self, context: &[String], question: &str) -> Result<String>;
}

/// Embed `context` and `question` in the answer-instruction template.
pub fn build_prompt(context: &[String], question: &str) -> String {
    let context = context.join("\n\n");
    format!(
        r#"
You are an AI assistant helping answer user questions by extracting and inferring information from internal email communications.

You are given a set of email excerpts retrieved based on semantic similarity to the user's question.

Instructions:
- The context consists of email subjects and email body content.
- Use ONLY the information present in the context.
- You MAY make reasonable inferences that a human reader would naturally make from emails
  (e.g., project status, progress, blockers, next steps, intent).
- Do NOT introduce facts that are not supported or implied by the context.
- Do NOT say "I don't know" if the context is clearly related to the question.
- If the context is relevant but incomplete, explain what can be inferred and state any limitations.
- Say "I don't know" ONLY if the context is completely unrelated to the question.

Context (email excerpts):
{context}

User Question:
{question}

Answer:
- Provide a concise, clear answer.
- Prefer summarization over quotation.
- If multiple emails say similar things, synthesize them into a single coherent response.
"#
    )
}

/// Skips generation and returns [`SKIPPED_MESSAGE`].
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    async fn generate(&self, _context: &[String], _question: &str) -> Result<String> {
        Ok(SKIPPED_MESSAGE.to_string())
    }
}

/// Chat completions via `POST /v1/chat/completions`.
pub struct OpenAiGenerator {
    api_key: String,
    model: String,
    temperature: f32,
    timeout_secs: u64,
    max_retries: u32,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, context: &[String], question: &str) -> Result<String> {
        let prompt = build_prompt(context, question);
        debug!(model = %self.model, context_chunks = context.len(), "requesting completion");

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
        });
        let json = post_json_with_retry(JsonRequest {
            service: "OpenAI",
            url: OPENAI_CHAT_URL,
            bearer: Some(&self.api_key),
            body: &body,
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
        })
        .await?;

        parse_chat_response(&json)
    }
}

fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    let content = json
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))?;
    Ok(content.trim().to_string())
}

/// A usable API key, ignoring empty values and the placeholder.
fn usable_api_key(value: Option<String>) -> Option<String> {
    value
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && k != PLACEHOLDER_API_KEY)
}

/// Build the generator named by `config.provider`.
///
/// `"openai"` without a usable `OPENAI_API_KEY` falls back to
/// [`DisabledGenerator`].
pub fn create_generator(config: &GenerationConfig) -> Result<Box<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGenerator)),
        "openai" => match usable_api_key(std::env::var("OPENAI_API_KEY").ok()) {
            Some(key) => Ok(Box::new(OpenAiGenerator::new(config, key))),
            None => {
                warn!("OPENAI_API_KEY not set; answer generation will be skipped");
                Ok(Box::new(DisabledGenerator))
            }
        },
        other => anyhow::bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_context_in_order() {
        let context = vec!["first chunk".to_string(), "second chunk".to_string()];
        let prompt = build_prompt(&context, "What is late?");
        assert!(prompt.contains("Context (email excerpts):\nfirst chunk\n\nsecond chunk\n"));
        assert!(prompt.contains("User Question:\nWhat is late?\n"));
        assert!(prompt.contains("Use ONLY the information present in the context."));
    }

    #[tokio::test]
    async fn test_disabled_returns_skip_message() {
        let answer = DisabledGenerator.generate(&[], "q").await.unwrap();
        assert!(answer.starts_with("LLM step skipped because no API key was provided."));
        assert!(answer.ends_with("needed to answer the question."));
    }

    #[test]
    fn test_placeholder_key_unusable() {
        assert_eq!(usable_api_key(None), None);
        assert_eq!(usable_api_key(Some("GIVE_API_KEY".into())), None);
        assert_eq!(usable_api_key(Some("  ".into())), None);
        assert_eq!(usable_api_key(Some("sk-abc".into())), Some("sk-abc".to_string()));
    }

    #[test]
    fn test_parse_chat_response_trims() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  Friday.\n"}}]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "Friday.");
        assert!(parse_chat_response(&serde_json::json!({"choices": []})).is_err());
    }

    #[test]
    fn test_create_disabled() {
        let config = GenerationConfig {
            provider: "disabled".to_string(),
            ..GenerationConfig::default()
        };
        assert!(create_generator(&config).is_ok());
    }
}
