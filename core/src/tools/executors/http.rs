use crate::agent::AgentError;
use crate::events::Message;
use crate::execution::Emitter;
use crate::tools::executors::shell::tail_chars;
use crate::tools::types::{SendRequestRequest, SendRequestResponse};
use crate::tools::Tool;
use async_trait::async_trait;
use reqwest::Method;
use std::time::Duration;
use tracing::debug;

/// Characters of the response body handed back to the model.
const BODY_TAIL: usize = 50;

/// Send an HTTP request, usually to a container under test.
pub struct SendRequest {
    client: reqwest::Client,
}

impl SendRequest {
    pub fn new(timeout: Duration) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Configuration(format!("http client: {}", e)))?;
        Ok(Self { client })
    }

    async fn send(&self, request: &SendRequestRequest) -> Result<(u16, String), String> {
        let method = Method::from_bytes(request.method.trim().to_uppercase().as_bytes())
            .map_err(|_| format!("unsupported method {}", request.method))?;
        let response = self
            .client
            .request(method, &request.url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| e.to_string())?;
        Ok((status, body))
    }
}

#[async_trait]
impl Tool for SendRequest {
    type Request = SendRequestRequest;
    type Response = SendRequestResponse;

    fn name(&self) -> &str {
        "SendRequest"
    }

    fn description(&self) -> &str {
        "Send an HTTP request."
    }

    async fn run(&self, request: SendRequestRequest, emitter: &Emitter) -> Result<SendRequestResponse, AgentError> {
        emitter
            .emit(Message::info(format!(
                "Sending a {} request to {}...",
                request.method.to_uppercase(),
                request.url
            )))
            .await?;

        match self.send(&request).await {
            Ok((status, body)) => {
                emitter
                    .emit(Message::success(format!(
                        "Received response with status code {}",
                        status
                    )))
                    .await?;
                Ok(SendRequestResponse {
                    response_code: Some(status),
                    response_body: Some(tail_chars(&body, BODY_TAIL).to_string()),
                    error: None,
                })
            }
            Err(error) => {
                debug!(url = %request.url, error = %error, "request failed");
                emitter
                    .emit(Message::alert("Request could not be completed successfully."))
                    .await?;
                Ok(SendRequestResponse {
                    error: Some(error),
                    ..Default::default()
                })
            }
        }
    }
}
