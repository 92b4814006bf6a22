use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::json;

use locomo_core::{BenchError, BenchResult, Completion, LlmBackend, Message, TokenMetrics};

use crate::config::LlmConfig;

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionClient {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

impl ChatCompletionClient {
    pub fn new(base_url: &str, model: &str, api_key: String, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
        }
    }

    /// Build from config, reading the API key from the environment.
    pub fn from_config(cfg: &LlmConfig) -> BenchResult<Self> {
        Ok(Self::new(
            &cfg.base_url,
            &cfg.model,
            cfg.api_key()?,
            Duration::from_secs(cfg.timeout_secs),
        ))
    }
}

impl LlmBackend for ChatCompletionClient {
    fn complete(
        &self,
        messages: &[Message],
        temperature: f32,
        max_tokens: u32,
    ) -> BenchResult<Completion> {
        let start = Instant::now();
        let resp = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(json!({
                "model": self.model,
                "messages": messages,
                "temperature": temperature,
                "max_tokens": max_tokens,
                "top_p": 1,
            }))
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => BenchError::Collaborator(format!(
                    "LLM HTTP {code}: {}",
                    resp.into_string().unwrap_or_default()
                )),
                ureq::Error::Transport(t) => {
                    BenchError::Collaborator(format!("LLM transport: {t}"))
                }
            })?;
        let body: ChatResponse = resp
            .into_json()
            .map_err(|e| BenchError::Collaborator(format!("malformed LLM response: {e}")))?;
        parse_completion(body, start.elapsed().as_secs_f64())
    }
}

fn parse_completion(body: ChatResponse, latency_seconds: f64) -> BenchResult<Completion> {
    let text = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| BenchError::Collaborator("LLM response has no choices".into()))?
        .message
        .content
        .unwrap_or_default();
    let usage = body.usage.unwrap_or_default();
    Ok(Completion {
        text: text.trim().to_string(),
        tokens: TokenMetrics::reported(
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total_tokens,
        ),
        latency_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_keeps_reported_usage() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "  Paris \n"}}],
                "usage": {"prompt_tokens": 812, "completion_tokens": 3, "total_tokens": 900}}"#,
        )
        .unwrap();
        let c = parse_completion(body, 0.4).unwrap();
        assert_eq!(c.text, "Paris");
        assert_eq!(c.tokens, TokenMetrics::reported(812, 3, 900));
        assert_eq!(c.latency_seconds, 0.4);
    }

    #[test]
    fn test_parse_completion_without_usage_or_choices() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        let c = parse_completion(body, 0.0).unwrap();
        assert_eq!(c.text, "");
        assert_eq!(c.tokens, TokenMetrics::default());

        let body: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(parse_completion(body, 0.0).is_err());
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let c = ChatCompletionClient::new(
            "https://api.example.com/",
            "m",
            "k".into(),
            Duration::from_secs(1),
        );
        assert_eq!(c.endpoint, "https://api.example.com/chat/completions");
    }
}
