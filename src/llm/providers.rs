use super::{ChatMessage, ChatRequest, LLMConfig, LLMProvider, LLMResponse, LLM};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI chat completions and compatible servers (LMStudio)
pub struct OpenAICompatibleProvider {
    config: LLMConfig,
    provider: LLMProvider,
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    total_tokens: u32,
}

fn build_client(config: &LLMConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?)
}

impl OpenAICompatibleProvider {
    pub fn openai(config: LLMConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("OpenAI API key required"));
        }
        let endpoint = config.endpoint.clone().unwrap_or_else(|| OPENAI_CHAT_URL.to_string());
        let client = build_client(&config)?;

        Ok(Self {
            config,
            provider: LLMProvider::OpenAI,
            endpoint,
            client,
        })
    }

    pub fn lmstudio(config: LLMConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| anyhow!("LMStudio endpoint not configured"))?;
        let client = build_client(&config)?;

        Ok(Self {
            config,
            provider: LLMProvider::LMStudio,
            endpoint,
            client,
        })
    }

    fn response_format(request: &ChatRequest) -> Option<Value> {
        request.response_schema.as_ref().map(|(name, schema)| {
            json!({
                "type": "json_schema",
                "json_schema": { "name": name, "strict": true, "schema": schema }
            })
        })
    }
}

#[async_trait]
impl LLM for OpenAICompatibleProvider {
    async fn chat(&self, request: ChatRequest) -> Result<LLMResponse> {
        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            response_format: Self::response_format(&request),
            messages: request.messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending request to {:?} at {}", self.provider, self.endpoint);

        let mut http = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.config.api_key {
            http = http.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = http.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("{:?} API error {}: {}", self.provider, status, text));
        }

        let completion: ChatCompletionResponse = response.json().await?;

        let content = completion
            .choices
            .first()
            .ok_or_else(|| anyhow!("No response from {:?}", self.provider))?
            .message
            .content
            .clone();

        Ok(LLMResponse {
            content,
            tokens_used: completion.usage.map(|u| u.total_tokens),
        })
    }

    fn provider_type(&self) -> LLMProvider {
        self.provider
    }
}

/// Gemini provider implementation
pub struct GeminiProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "totalTokenCount")]
    total_token_count: u32,
}

impl GeminiProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("Gemini API key required"));
        }

        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    /// Gemini's schema dialect has no `additionalProperties`
    fn gemini_schema(schema: &Value) -> Value {
        match schema {
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter(|(k, _)| k.as_str() != "additionalProperties")
                    .map(|(k, v)| (k.clone(), Self::gemini_schema(v)))
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(Self::gemini_schema).collect()),
            other => other.clone(),
        }
    }
}

#[async_trait]
impl LLM for GeminiProvider {
    async fn chat(&self, request: ChatRequest) -> Result<LLMResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("Gemini API key not configured"))?;

        let mut system_parts = Vec::new();
        let mut contents = Vec::new();
        for msg in &request.messages {
            let part = GeminiPart {
                text: msg.content.clone(),
            };
            if msg.role == "system" {
                system_parts.push(part);
            } else {
                contents.push(GeminiContent {
                    role: Some(if msg.role == "assistant" { "model" } else { "user" }.to_string()),
                    parts: vec![part],
                });
            }
        }

        let body = GeminiRequest {
            contents,
            system_instruction: (!system_parts.is_empty()).then(|| GeminiContent {
                role: None,
                parts: system_parts,
            }),
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
                response_mime_type: request
                    .response_schema
                    .as_ref()
                    .map(|_| "application/json".to_string()),
                response_schema: request
                    .response_schema
                    .as_ref()
                    .map(|(_, schema)| Self::gemini_schema(schema)),
            },
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.config.model
        );

        debug!("Sending request to Gemini API");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error {}: {}", status, text));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        let content = gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| anyhow!("No response from Gemini"))?;

        Ok(LLMResponse {
            content,
            tokens_used: gemini_response.usage_metadata.map(|u| u.total_token_count),
        })
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::Gemini
    }
}
