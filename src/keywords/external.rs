use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use tracing::{debug, warn};

use crate::llm::{clean_llm_response, create_llm, ChatMessage, ChatRequest, LLMConfig, LLM};

/// Capability that turns prose into labels from a fixed vocabulary.
///
/// Implementations may fail freely; the orchestrator degrades to the
/// substring fallback.
#[async_trait]
pub trait ExternalKeywordExtractor: Send + Sync {
    /// Raw labels as returned by the service, at most `limit` expected
    async fn extract(&self, description: &str, available: &[String], limit: usize) -> Result<Vec<String>>;

    fn name(&self) -> &str;
}

/// Request/response contract of the extraction call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordExtractionRequest {
    pub description: String,
    pub available_keywords: Vec<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordExtractionResponse {
    pub keywords: Vec<String>,
}

/// Keyword extraction through a chat LLM with schema-constrained output
pub struct LlmKeywordExtractor {
    llm: Box<dyn LLM>,
    prompt: String,
}

impl LlmKeywordExtractor {
    pub async fn new(config: &LLMConfig, prompt_path: Option<&Path>) -> Result<Self> {
        let llm = create_llm(config)?;

        let prompt = match prompt_path.filter(|p| p.exists()) {
            Some(path) => tokio::fs::read_to_string(path).await.unwrap_or_else(|e| {
                warn!("Failed to read keyword prompt {}: {}, using default prompt", path.display(), e);
                Self::default_prompt().to_string()
            }),
            None => Self::default_prompt().to_string(),
        };

        Ok(Self { llm, prompt })
    }

    pub fn with_llm(llm: Box<dyn LLM>) -> Self {
        Self {
            llm,
            prompt: Self::default_prompt().to_string(),
        }
    }

    /// Schema restricting the answer to the supplied vocabulary
    pub fn response_schema(available: &[String], limit: usize) -> serde_json::Value {
        json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["keywords"],
            "properties": {
                "keywords": {
                    "type": "array",
                    "maxItems": limit,
                    "items": { "type": "string", "enum": available }
                }
            }
        })
    }

    fn parse_response(content: &str) -> Result<Vec<String>> {
        let cleaned = clean_llm_response(content);
        if let Ok(parsed) = serde_json::from_str::<KeywordExtractionResponse>(&cleaned) {
            return Ok(parsed.keywords);
        }
        if let Ok(list) = serde_json::from_str::<Vec<String>>(&cleaned) {
            return Ok(list);
        }
        Err(anyhow!("Unparseable keyword extraction response: {}", cleaned))
    }

    fn default_prompt() -> &'static str {
        r#"You help a video production studio pick reference videos for a prospective client.

Given the client's project description and a list of available keywords, return the
keywords from that list that best describe the project.

Rules:
1. Only return keywords copied exactly from the provided list
2. Return at most the requested number of keywords, most relevant first
3. Return an empty list when nothing is relevant
4. Answer with JSON only: {"keywords": ["..."]}"#
    }
}

#[async_trait]
impl ExternalKeywordExtractor for LlmKeywordExtractor {
    async fn extract(&self, description: &str, available: &[String], limit: usize) -> Result<Vec<String>> {
        let payload = KeywordExtractionRequest {
            description: description.to_string(),
            available_keywords: available.to_vec(),
            limit,
        };

        let request = ChatRequest::new(vec![
            ChatMessage::system(self.prompt.clone()),
            ChatMessage::user(serde_json::to_string(&payload)?),
        ])
        .with_schema("keyword_extraction", Self::response_schema(available, limit));

        let response = self.llm.chat(request).await?;
        debug!(
            "Keyword extraction answered by {:?} (tokens: {:?})",
            self.llm.provider_type(),
            response.tokens_used
        );

        Self::parse_response(&response.content)
    }

    fn name(&self) -> &str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMProvider, LLMResponse};

    struct CannedLLM(String);

    #[async_trait]
    impl LLM for CannedLLM {
        async fn chat(&self, request: ChatRequest) -> Result<LLMResponse> {
            assert!(request.response_schema.is_some());
            assert_eq!(request.messages.len(), 2);
            Ok(LLMResponse {
                content: self.0.clone(),
                tokens_used: Some(42),
            })
        }

        fn provider_type(&self) -> LLMProvider {
            LLMProvider::LMStudio
        }
    }

    fn vocabulary() -> Vec<String> {
        vec!["café".to_string(), "drone".to_string()]
    }

    #[tokio::test]
    async fn test_parses_structured_answer() {
        let extractor = LlmKeywordExtractor::with_llm(Box::new(CannedLLM(
            "```json\n{\"keywords\": [\"café\"]}\n```".to_string(),
        )));
        let found = extractor.extract("promo café", &vocabulary(), 4).await.unwrap();
        assert_eq!(found, vec!["café"]);
    }

    #[tokio::test]
    async fn test_accepts_bare_array() {
        let extractor = LlmKeywordExtractor::with_llm(Box::new(CannedLLM("[\"drone\"]".to_string())));
        let found = extractor.extract("vue aérienne", &vocabulary(), 4).await.unwrap();
        assert_eq!(found, vec!["drone"]);
    }

    #[tokio::test]
    async fn test_rejects_prose() {
        let extractor = LlmKeywordExtractor::with_llm(Box::new(CannedLLM("I think café".to_string())));
        assert!(extractor.extract("promo café", &vocabulary(), 4).await.is_err());
    }

    #[test]
    fn test_schema_constrains_vocabulary() {
        let schema = LlmKeywordExtractor::response_schema(&vocabulary(), 3);
        assert_eq!(schema["properties"]["keywords"]["maxItems"], 3);
        assert_eq!(schema["properties"]["keywords"]["items"]["enum"][1], "drone");
    }
}
