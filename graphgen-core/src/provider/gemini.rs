//! Google Gemini provider (Generative Language API)

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Gemini provider using `models/{model}:generateContent`
pub struct GeminiProvider {
    client: Client,
    config: ProviderConfig,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = build_client(&config)?;
        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or("https://generativelanguage.googleapis.com/v1beta")
            .trim_end_matches('/')
    }

    fn build_request(&self, request: CompletionRequest) -> (String, GeminiRequest) {
        let model = request
            .model
            .unwrap_or_else(|| self.default_model().to_string());

        let mut system_instruction = None;
        let mut contents = Vec::new();
        for msg in request.messages {
            let part = GeminiPart { text: msg.content };
            match msg.role {
                Role::System => {
                    system_instruction = Some(GeminiContent {
                        role: None,
                        parts: vec![part],
                    })
                }
                Role::User => contents.push(GeminiContent {
                    role: Some("user".into()),
                    parts: vec![part],
                }),
                Role::Assistant => contents.push(GeminiContent {
                    role: Some("model".into()),
                    parts: vec![part],
                }),
            }
        }

        let generation_config = if request.temperature.is_some()
            || request.max_tokens.is_some()
            || request.stop.is_some()
        {
            Some(GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                stop_sequences: request.stop,
            })
        } else {
            None
        };

        (
            model,
            GeminiRequest {
                contents,
                system_instruction,
                generation_config,
            },
        )
    }
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn models(&self) -> Vec<String> {
        vec![
            "gemini-1.5-flash".into(),
            "gemini-1.5-pro".into(),
            "gemini-2.0-flash".into(),
        ]
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or("gemini-1.5-flash")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let api_key = self
            .config
            .api_key()
            .ok_or(ProviderError::AuthenticationFailed)?;

        let (model, api_request) = self.build_request(request);

        let mut req = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url(), model))
            .header("x-goog-api-key", api_key)
            .json(&api_request);

        for (key, value) in &self.config.headers {
            req = req.header(key, value);
        }

        let response = req
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let api_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        api_response.into_completion(model)
    }
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    response_id: String,
}

impl GeminiResponse {
    fn into_completion(self, model: String) -> Result<CompletionResponse, ProviderError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Other("No candidates in response".into()))?;

        let finish_reason = match candidate.finish_reason.as_deref() {
            Some("STOP") => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") => FinishReason::ContentFilter,
            _ => FinishReason::Unknown,
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        let usage = self
            .usage_metadata
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: self.response_id,
            model,
            content: if text.is_empty() { None } else { Some(text) },
            finish_reason,
            usage,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
    #[serde(default)]
    total_token_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body() {
        let provider = GeminiProvider::new(ProviderConfig::gemini("key")).unwrap();
        let request = CompletionRequest::new(vec![
            ChatMessage::system("JSON only"),
            ChatMessage::user("y = 3x + 1"),
        ])
        .with_max_tokens(200);
        let (model, body) = provider.build_request(request);
        let body = serde_json::to_value(body).unwrap();

        assert_eq!(model, "gemini-1.5-flash");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "y = 3x + 1");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "JSON only");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 200);
        assert!(body["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn test_plain_request_has_no_generation_config() {
        let provider = GeminiProvider::new(ProviderConfig::gemini("key")).unwrap();
        let (_, body) = provider.build_request(CompletionRequest::new(vec![ChatMessage::user("hi")]));
        let body = serde_json::to_value(body).unwrap();
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_decoding() {
        let raw = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"equation\": "}, {"text": "\"sin(x)\"}"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 30, "candidatesTokenCount": 7, "totalTokenCount": 37},
            "responseId": "abc"
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let completion = response.into_completion("gemini-1.5-flash".into()).unwrap();

        assert_eq!(completion.content.as_deref(), Some("{\"equation\": \"sin(x)\"}"));
        assert_eq!(completion.finish_reason, FinishReason::Stop);
        assert_eq!(completion.usage.total_tokens, 37);
        assert_eq!(completion.id, "abc");
    }

    #[test]
    fn test_blocked_response() {
        let raw = json!({"candidates": [{"finishReason": "SAFETY"}]});
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let completion = response.into_completion("m".into()).unwrap();
        assert_eq!(completion.content, None);
        assert_eq!(completion.finish_reason, FinishReason::ContentFilter);

        let empty: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert!(empty.into_completion("m".into()).is_err());
    }
}
