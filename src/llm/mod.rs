pub mod providers;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// LLM provider types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LLMProvider {
    LMStudio,
    Gemini,
    OpenAI,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::LMStudio,
            endpoint: Some("http://localhost:1234/v1/chat/completions".to_string()),
            api_key: None,
            model: "local-model".to_string(),
            max_tokens: 512,
            temperature: 0.0,
            timeout_seconds: 10,
        }
    }
}

/// Chat message for LLM communication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A chat call, optionally constrained to a JSON schema
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Name and JSON schema the answer must satisfy
    pub response_schema: Option<(String, Value)>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            response_schema: None,
        }
    }

    pub fn with_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.response_schema = Some((name.into(), schema));
        self
    }
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// Trait for LLM providers
#[async_trait]
pub trait LLM: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<LLMResponse>;
    fn provider_type(&self) -> LLMProvider;
}

/// Create LLM instance based on configuration
pub fn create_llm(config: &LLMConfig) -> Result<Box<dyn LLM>> {
    match config.provider {
        LLMProvider::LMStudio => Ok(Box::new(providers::OpenAICompatibleProvider::lmstudio(config.clone())?)),
        LLMProvider::OpenAI => Ok(Box::new(providers::OpenAICompatibleProvider::openai(config.clone())?)),
        LLMProvider::Gemini => Ok(Box::new(providers::GeminiProvider::new(config.clone())?)),
    }
}

/// Strip markdown code fences some models wrap around JSON answers
pub fn clean_llm_response(content: &str) -> String {
    let content = content.trim();

    if content.starts_with("```") {
        if let Some(start) = content.find('\n') {
            if let Some(end) = content.rfind("```") {
                if end > start {
                    return content[start + 1..end].trim().to_string();
                }
            }
        }
    }

    content.replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_llm_response_with_markdown() {
        let input = "```json\n{\"keywords\": [\"café\"]}\n```";
        assert_eq!(clean_llm_response(input), "{\"keywords\": [\"café\"]}");
    }

    #[test]
    fn test_clean_llm_response_without_markdown() {
        let input = "  {\"keywords\": []}  ";
        assert_eq!(clean_llm_response(input), "{\"keywords\": []}");
    }

    #[test]
    fn test_create_llm_factory() {
        let config = LLMConfig::default();
        let llm = create_llm(&config).unwrap();
        assert_eq!(llm.provider_type(), LLMProvider::LMStudio);

        let config = LLMConfig {
            provider: LLMProvider::OpenAI,
            api_key: None,
            ..LLMConfig::default()
        };
        assert!(create_llm(&config).is_err());
    }
}
