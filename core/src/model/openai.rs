use crate::agent::AgentError;
use crate::config::Config;
use crate::model::{ChatModel, ChatRequest};
use crate::tools::executor::ToolDefinition;
use crate::transcript::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const ACCESS_DETAILS_PATH: &str = "api/svc/v1/llm-gateway/access-details";

/// Sampling parameters sent with every completion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.01,
            frequency_penalty: 0.01,
            max_tokens: 4096,
        }
    }
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    sampling: SamplingParams,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Configuration(format!("http client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            sampling: SamplingParams::default(),
        })
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    /// Use explicit OpenAI credentials when configured, otherwise ask the
    /// platform's LLM gateway for short-lived ones.
    pub async fn from_config(config: &Config) -> Result<Self, AgentError> {
        if let (Some(base_url), Some(api_key)) = (&config.openai_base_url, &config.openai_api_key) {
            info!(base_url = %base_url, "using configured OpenAI endpoint");
            return Self::new(base_url.clone(), api_key.clone(), config.request_timeout);
        }

        let (Some(platform_url), Some(platform_key)) = (&config.platform_base_url, &config.platform_api_key) else {
            return Err(AgentError::Configuration(
                "set AUTODEPLOY_OPENAI_BASE_URL and AUTODEPLOY_OPENAI_API_KEY, \
                 or AUTODEPLOY_PLATFORM_BASE_URL and AUTODEPLOY_PLATFORM_API_KEY"
                    .to_string(),
            ));
        };

        let access = fetch_access_details(platform_url, platform_key, config.request_timeout).await?;
        info!(base_url = %access.inference_base_url, "using platform LLM gateway");
        Self::new(access.inference_base_url, access.jwt_token, config.request_timeout)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessDetails {
    jwt_token: String,
    #[serde(rename = "inferenceBaseURL")]
    inference_base_url: String,
}

async fn fetch_access_details(
    platform_url: &str,
    platform_key: &str,
    timeout: Duration,
) -> Result<AccessDetails, AgentError> {
    let url = format!("{}/{}", platform_url.trim_end_matches('/'), ACCESS_DETAILS_PATH);
    let resp = reqwest::Client::new()
        .get(&url)
        .bearer_auth(platform_key)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| AgentError::Network(format!("platform request error: {}", e)))?;

    if !resp.status().is_success() {
        return Err(AgentError::Network(format!(
            "platform responded with status code {}",
            resp.status()
        )));
    }

    resp.json()
        .await
        .map_err(|e| AgentError::Network(format!("platform decode error: {}", e)))
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [ToolDefinition],
    stream: bool,
    n: u32,
    #[serde(flatten)]
    sampling: &'a SamplingParams,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    usage: Option<Usage>,
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    finish_reason: Option<String>,
    message: ChatMessage,
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatMessage, AgentError> {
        let body = CompletionBody {
            model: request.model,
            messages: request.messages,
            tools: request.tools,
            stream: false,
            n: 1,
            sampling: &self.sampling,
        };

        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Network(format!("request error: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(AgentError::Network(format!("{}: {}", status, text)));
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Model(format!("decode error: {}", e)))?;
        if let Some(usage) = &parsed.usage {
            debug!(
                input_tokens = usage.prompt_tokens,
                output_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "completion usage"
            );
        }

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Model("no choices".to_string()))?;
        debug!(finish_reason = ?choice.finish_reason, "completion finished");
        Ok(choice.message)
    }
}
