use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{ImageEncoding, LlmCall, LlmError, LlmResult, ProviderClient};

/// A provider speaking the OpenAI-compatible chat-completions wire format
/// (shape shared by most hosted providers). Grounded on the teacher's
/// `OpenRouterClient`: a thin `reqwest::Client` wrapper with one `complete`
/// entry point.
pub struct OpenAiCompatibleClient {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    multimodal: bool,
}

impl OpenAiCompatibleClient {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>, multimodal: bool) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            multimodal,
        }
    }

    fn content_payload(&self, call: &LlmCall) -> Value {
        if call.images.is_empty() {
            return json!(call.prompt);
        }

        let mut parts = vec![json!({ "type": "text", "text": call.prompt })];
        for image in &call.images {
            let url = match image.encoding {
                ImageEncoding::Url => image.data.clone(),
                ImageEncoding::Base64 => {
                    let mime = image.mime.as_deref().unwrap_or("image/png");
                    format!("data:{mime};base64,{}", image.data)
                }
            };
            parts.push(json!({ "type": "image_url", "image_url": { "url": url } }));
        }
        json!(parts)
    }
}

#[async_trait]
impl ProviderClient for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_multimodal(&self) -> bool {
        self.multimodal
    }

    async fn complete(&self, call: &LlmCall, model: &str) -> Result<LlmResult, LlmError> {
        let body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": call.task_type.provider_scene() },
                { "role": "user", "content": self.content_payload(call) },
            ],
            "max_tokens": call.max_tokens.unwrap_or(call.quality.max_reply_tokens()),
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| LlmError::Transport {
                provider: self.name.clone(),
                source: anyhow::anyhow!(err),
            })?;

        if !response.status().is_success() {
            return Err(LlmError::Transport {
                provider: self.name.clone(),
                source: anyhow::anyhow!("http status {}", response.status()),
            });
        }

        let value: Value = response.json().await.map_err(|err| LlmError::Transport {
            provider: self.name.clone(),
            source: anyhow::anyhow!(err),
        })?;

        parse_chat_response(&self.name, model, &value)
    }
}

fn parse_chat_response(provider: &str, model: &str, value: &Value) -> Result<LlmResult, LlmError> {
    let text = value["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let input_tokens = value["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32;
    let output_tokens = value["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32;

    Ok(LlmResult {
        text,
        provider: provider.to_string(),
        model: model.to_string(),
        input_tokens,
        output_tokens,
        cost_usd: 0.0,
        latency_ms: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_and_token_usage() {
        let raw = json!({
            "choices": [{ "message": { "content": "hello there" } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 4 }
        });
        let result = parse_chat_response("acme", "gpt", &raw).unwrap();
        assert_eq!(result.text, "hello there");
        assert_eq!(result.input_tokens, 12);
        assert_eq!(result.output_tokens, 4);
    }

    #[test]
    fn missing_fields_default_to_empty_and_zero() {
        let raw = json!({});
        let result = parse_chat_response("acme", "gpt", &raw).unwrap();
        assert_eq!(result.text, "");
        assert_eq!(result.input_tokens, 0);
        assert_eq!(result.output_tokens, 0);
    }
}
