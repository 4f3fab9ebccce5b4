use async_trait::async_trait;
use dotenv::dotenv;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use std::env;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::backend::GenerativeBackend;
use super::endpoints::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Provider,
};
use crate::config::BackendConfig;
use crate::streaming::{BackendResponse, StreamEvent};

const STREAM_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum ApiConnectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("API error {status}: {error_body}")]
    ApiError {
        status: StatusCode,
        error_body: String,
    },

    #[error("API returned no content")]
    EmptyResponse,
}

impl Provider {
    pub fn openrouter(config: &BackendConfig) -> Self {
        dotenv().ok();
        Self::OpenRouter {
            api_key: config.api_key_env_var.clone(),
            url: config.chat_completions_url(),
            model: config.model.clone(),
            site_url: config.site_url.clone(),
            app_name: config.app_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::OpenRouter { model, .. } => model,
        }
    }

    /// Single-message request for `prompt` with the configured sampling settings.
    pub fn prompt_request(&self, prompt: &str, stream: bool) -> ChatCompletionRequest {
        match self {
            Provider::OpenRouter {
                model,
                temperature,
                max_tokens,
                ..
            } => ChatCompletionRequest {
                model: model.clone(),
                messages: vec![ChatMessage::user(prompt)],
                temperature: Some(*temperature),
                max_tokens: Some(*max_tokens),
                stream: stream.then_some(true),
            },
        }
    }

    async fn send(&self, request: &ChatCompletionRequest) -> Result<Response, ApiConnectionError> {
        match self {
            Provider::OpenRouter {
                api_key: api_key_env_var_name,
                url,
                site_url,
                app_name,
                client,
                ..
            } => {
                dotenv().ok();
                let actual_api_key = env::var(api_key_env_var_name)
                    .map_err(|_| ApiConnectionError::MissingApiKey(api_key_env_var_name.clone()))?;

                debug!(model = %request.model, stream = request.stream.unwrap_or(false), "sending chat completion");
                let response = client
                    .post(url.as_str())
                    .bearer_auth(actual_api_key)
                    .header("HTTP-Referer", site_url.as_str())
                    .header("X-Title", app_name.as_str())
                    .json(request)
                    .send()
                    .await?;

                if response.status().is_success() {
                    Ok(response)
                } else {
                    let status = response.status();
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body".to_string());
                    Err(ApiConnectionError::ApiError { status, error_body })
                }
            }
        }
    }

    pub async fn call_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ApiConnectionError> {
        let response = self.send(&request).await?;
        let chat_response = response.json::<ChatCompletionResponse>().await?;
        Ok(chat_response)
    }

    /// Starts a streamed completion. Server-sent events are decoded on a
    /// spawned task and content deltas are pushed into the returned channel.
    pub async fn stream_chat_completion(
        &self,
        mut request: ChatCompletionRequest,
    ) -> Result<BackendResponse, ApiConnectionError> {
        request.stream = Some(true);
        let response = self.send(&request).await?;
        let (events, receiver) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(forward_sse(response, events));
        Ok(BackendResponse::Push(receiver))
    }
}

#[async_trait]
impl GenerativeBackend for Provider {
    async fn complete(&self, prompt: &str) -> Result<String, ApiConnectionError> {
        let response = self
            .call_chat_completion(self.prompt_request(prompt, false))
            .await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ApiConnectionError::EmptyResponse)?;
        Ok(content)
    }

    async fn open_stream(&self, prompt: &str) -> Result<BackendResponse, ApiConnectionError> {
        self.stream_chat_completion(self.prompt_request(prompt, true))
            .await
    }
}

/// A decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    Delta(String),
    Done,
    Error(String),
}

/// Line-oriented decoder for the chat completion event stream.
///
/// Only `data:` lines carry payloads; comments (`:`), other fields and blank
/// separators are skipped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            frames.extend(decode_sse_line(&line));
        }
        frames
    }

    /// Decodes a final line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let line = std::mem::take(&mut self.buffer);
        decode_sse_line(&line)
    }
}

fn decode_sse_line(line: &[u8]) -> Option<SseFrame> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);
    let data = line.strip_prefix("data:")?.trim_start();

    if data == "[DONE]" {
        return Some(SseFrame::Done);
    }
    if data.is_empty() {
        return None;
    }

    match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => {
            if let Some(error) = chunk.error {
                return Some(SseFrame::Error(error.to_string()));
            }
            let text: String = chunk
                .choices
                .iter()
                .filter_map(|choice| choice.delta.content.as_deref())
                .collect();
            (!text.is_empty()).then_some(SseFrame::Delta(text))
        }
        Err(e) => Some(SseFrame::Error(format!("malformed stream frame: {}", e))),
    }
}

async fn forward_sse(response: Response, events: mpsc::Sender<StreamEvent>) {
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::default();

    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "backend stream interrupted");
                let _ = events.send(StreamEvent::Error(e.to_string())).await;
                return;
            }
        };
        for frame in decoder.push(&bytes) {
            if !deliver(&events, frame).await {
                return;
            }
        }
    }

    if let Some(frame) = decoder.finish() {
        if !deliver(&events, frame).await {
            return;
        }
    }
    let _ = events.send(StreamEvent::End).await;
}

/// Pushes one frame downstream. Returns `false` once forwarding should stop.
async fn deliver(events: &mpsc::Sender<StreamEvent>, frame: SseFrame) -> bool {
    match frame {
        SseFrame::Delta(text) => events.send(StreamEvent::Data(text.into_bytes())).await.is_ok(),
        SseFrame::Done => {
            let _ = events.send(StreamEvent::End).await;
            false
        }
        SseFrame::Error(message) => {
            let _ = events.send(StreamEvent::Error(message)).await;
            false
        }
    }
}
