use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };

use super::{ ChatClient, CompletionRequest, CompletionResponse, GatewayError };
use crate::llm::LlmConfig;
use crate::models::chat::ChatMessage;

pub struct OpenAIChatClient {
    http: HttpClient,
    api_key: Option<String>,
    url: String,
    timeout_secs: Option<u64>,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

fn completions_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{}/chat/completions", trimmed)
    }
}

fn parse_completion(body: &str) -> Result<String, GatewayError> {
    let resp: OpenAIResponse = serde_json
        ::from_str(body)
        .map_err(|e| GatewayError::Malformed(e.to_string()))?;

    resp.choices
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::Malformed("response has no choices".to_string()))?
        .message.content
        .ok_or_else(|| GatewayError::Malformed("first choice has no content".to_string()))
}

impl OpenAIChatClient {
    pub fn new(
        api_key: Option<String>,
        base_url: String,
        timeout_secs: Option<u64>
    ) -> Result<Self, GatewayError> {
        let api_key = api_key.filter(|k| !k.trim().is_empty());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|e|
                GatewayError::Config(format!("Invalid API key format: {}", e))
            )?;
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = HttpClient::builder().default_headers(headers);
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            api_key,
            url: completions_url(&base_url),
            timeout_secs,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, GatewayError> {
        let base_url = config.base_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| config.llm_type.default_base_url().to_string());

        Self::new(
            config.api_key.clone(),
            base_url,
            config.timeout.map(|t| t.as_secs())
        )
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(
        &self,
        request: &CompletionRequest
    ) -> Result<CompletionResponse, GatewayError> {
        if self.api_key.is_none() {
            return Err(GatewayError::Config("API key is not configured".to_string()));
        }

        let req = OpenAIChatRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!("Sending {} messages to {}", request.messages.len(), self.url);
        let resp = self.http
            .post(&self.url)
            .json(&req)
            .send().await
            .map_err(|e| self.map_transport_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.map_transport_error(e))?;
        if !status.is_success() {
            return Err(GatewayError::Api { status: status.as_u16(), body });
        }

        let content = parse_completion(&body)?;
        Ok(CompletionResponse { response: content })
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.url.clone())
    }
}

impl OpenAIChatClient {
    fn map_transport_error(&self, err: reqwest::Error) -> GatewayError {
        match self.timeout_secs {
            Some(secs) if err.is_timeout() => GatewayError::Timeout(secs),
            _ => GatewayError::Network(err),
        }
    }
}
