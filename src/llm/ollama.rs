//! Streaming chat client for a local Ollama server.
//!
//! Behaviour:
//! - `POST /api/chat` with `stream: true`; the reply is newline-delimited JSON.
//! - Every line carries `message.content` (one delta) and `done`.
//! - The request timeout bounds the wait for the response head and the gap
//!   between two consecutive deltas, never the whole reply.
//! - Readiness is checked with `GET /api/version`.

use std::collections::VecDeque;
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::error::ChatError;
use crate::chat::message::ChatMessage;

use super::device::{Device, ExecutionMode};
use super::{CompletionClient, DeltaStream, StreamDelta};

/// Default Ollama API base URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default wait for the response head and between deltas.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_mins(5);

/// TCP connect timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Readiness check timeout.
const READY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        Self {
            role: message.role.as_str(),
            content: &message.content,
        }
    }
}

#[derive(Serialize)]
struct ChatOptions {
    num_gpu: u32,
}

impl ChatOptions {
    /// GPU runs use the server default; CPU runs disable layer offload.
    const fn for_device(device: Device) -> Option<Self> {
        match device {
            Device::Gpu => None,
            Device::Cpu => Some(Self { num_gpu: 0 }),
        }
    }
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// Decoded stream line.
#[derive(Debug, Default, PartialEq, Eq)]
struct ParsedLine {
    delta: Option<String>,
    done: bool,
}

/// Async Ollama client streaming chat completions.
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    execution_mode: ExecutionMode,
}

impl OllamaClient {
    /// Create a client for the Ollama server at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ChatError> {
        let base_url = base_url.into();
        Url::parse(&base_url)?;

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ChatError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            execution_mode: ExecutionMode::default(),
        })
    }

    /// Create a client for the local Ollama server.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new_default() -> Result<Self, ChatError> {
        Self::new(DEFAULT_OLLAMA_URL)
    }

    /// Set the per-step request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the execution-mode hint.
    #[must_use]
    pub const fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

#[async_trait::async_trait]
impl CompletionClient for OllamaClient {
    async fn stream(&self, model: &str, messages: &[ChatMessage]) -> Result<DeltaStream, ChatError> {
        let device = self.execution_mode.resolve();
        tracing::info!("Using device: {device}");

        let request = ChatRequest {
            model,
            messages: messages.iter().map(WireMessage::from).collect(),
            stream: true,
            options: ChatOptions::for_device(device),
        };

        let timeout = self.request_timeout;
        let response = tokio::time::timeout(
            timeout,
            self.client.post(self.endpoint("api/chat")).json(&request).send(),
        )
        .await
        .map_err(|_| ChatError::Timeout(timeout))??;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(ndjson_deltas(Box::pin(response.bytes_stream()), timeout))
    }

    async fn is_available(&self) -> bool {
        let check = self
            .client
            .get(self.endpoint("api/version"))
            .timeout(READY_TIMEOUT)
            .send()
            .await;
        matches!(check, Ok(response) if response.status().is_success())
    }
}

/// Turn a raw NDJSON body into a delta stream.
fn ndjson_deltas<S, B>(body: S, timeout: Duration) -> DeltaStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let reader = NdjsonReader {
        body,
        timeout,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        failure: None,
        finished: false,
    };

    Box::pin(futures::stream::unfold(reader, |mut reader| async move {
        let item = reader.next_delta().await?;
        Some((item, reader))
    }))
}

struct NdjsonReader<S> {
    body: S,
    timeout: Duration,
    buffer: Vec<u8>,
    pending: VecDeque<StreamDelta>,
    failure: Option<ChatError>,
    finished: bool,
}

impl<S, B> NdjsonReader<S>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
{
    async fn next_delta(&mut self) -> Option<Result<StreamDelta, ChatError>> {
        loop {
            if let Some(delta) = self.pending.pop_front() {
                return Some(Ok(delta));
            }
            if let Some(err) = self.failure.take() {
                return Some(Err(err));
            }
            if self.finished {
                return None;
            }
            if let Err(err) = self.fill().await {
                self.finished = true;
                self.failure = Some(err);
            }
        }
    }

    async fn fill(&mut self) -> Result<(), ChatError> {
        let next = tokio::time::timeout(self.timeout, self.body.next())
            .await
            .map_err(|_| ChatError::Timeout(self.timeout))?;

        let Some(chunk) = next else {
            // Last line may lack its newline.
            let rest = std::mem::take(&mut self.buffer);
            self.finished = true;
            return self.accept(&rest);
        };

        self.buffer.extend_from_slice(chunk?.as_ref());
        while let Some(line) = take_line(&mut self.buffer) {
            self.accept(&line)?;
            if self.finished {
                break;
            }
        }
        Ok(())
    }

    fn accept(&mut self, line: &[u8]) -> Result<(), ChatError> {
        let parsed = parse_line(line)?;
        if let Some(delta) = parsed.delta {
            self.pending.push_back(StreamDelta::new(delta));
        }
        if parsed.done {
            self.finished = true;
        }
        Ok(())
    }
}

/// Split the first complete line off the buffer.
fn take_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = buffer.iter().position(|b| *b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=end).collect();
    line.pop();
    Some(line)
}

fn parse_line(line: &[u8]) -> Result<ParsedLine, ChatError> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(ParsedLine::default());
    }

    let chunk: ChatChunk = serde_json::from_slice(line)?;
    if let Some(error) = chunk.error {
        return Err(ChatError::Model(error));
    }

    let delta = chunk
        .message
        .map(|m| m.content)
        .filter(|content| !content.is_empty());

    Ok(ParsedLine {
        delta,
        done: chunk.done,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(parts: Vec<&'static str>) -> impl Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send + Unpin + 'static {
        let parts: Vec<Result<Vec<u8>, reqwest::Error>> =
            parts.into_iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        futures::stream::iter(parts)
    }

    async fn collect(stream: DeltaStream) -> Vec<Result<StreamDelta, ChatError>> {
        stream.collect().await
    }

    #[test]
    fn test_parse_line_delta() {
        let parsed = parse_line(br#"{"message":{"role":"assistant","content":"He"},"done":false}"#);
        assert_eq!(
            parsed.ok(),
            Some(ParsedLine {
                delta: Some("He".to_string()),
                done: false
            })
        );
    }

    #[test]
    fn test_parse_line_done_and_blank() {
        let done = parse_line(br#"{"message":{"role":"assistant","content":""},"done":true}"#);
        assert_eq!(
            done.ok(),
            Some(ParsedLine {
                delta: None,
                done: true
            })
        );
        assert_eq!(parse_line(b"  \r").ok(), Some(ParsedLine::default()));
    }

    #[test]
    fn test_parse_line_error() {
        let parsed = parse_line(br#"{"error":"model 'nope' not found"}"#);
        assert!(matches!(parsed, Err(ChatError::Model(msg)) if msg.contains("nope")));
    }

    #[test]
    fn test_take_line() {
        let mut buffer = b"one\ntwo\nthr".to_vec();
        assert_eq!(take_line(&mut buffer), Some(b"one".to_vec()));
        assert_eq!(take_line(&mut buffer), Some(b"two".to_vec()));
        assert_eq!(take_line(&mut buffer), None);
        assert_eq!(buffer, b"thr".to_vec());
    }

    #[test]
    fn test_cpu_device_disables_gpu_layers() {
        let json = serde_json::to_value(ChatOptions::for_device(Device::Cpu)).unwrap_or_default();
        assert_eq!(json["num_gpu"], 0);
        assert!(ChatOptions::for_device(Device::Gpu).is_none());
    }

    #[tokio::test]
    async fn test_deltas_split_across_chunks() {
        let stream = ndjson_deltas(
            body(vec![
                "{\"message\":{\"content\":\"He\"},\"done\":false}\n{\"mess",
                "age\":{\"content\":\"llo\"},\"done\":false}\n",
                "{\"message\":{\"content\":\"\"},\"done\":true}\n",
            ]),
            Duration::from_secs(5),
        );

        let items = collect(stream).await;
        let text: String = items
            .into_iter()
            .filter_map(Result::ok)
            .map(|d| d.content)
            .collect();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let stream = ndjson_deltas(
            body(vec!["{\"message\":{\"content\":\"tail\"},\"done\":false}"]),
            Duration::from_secs(5),
        );
        let items = collect(stream).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Ok(d) if d.content == "tail"));
    }

    #[tokio::test]
    async fn test_error_after_deltas_keeps_order() {
        let stream = ndjson_deltas(
            body(vec!["{\"message\":{\"content\":\"A\"}}\n{\"error\":\"out of memory\"}\n"]),
            Duration::from_secs(5),
        );
        let items = collect(stream).await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Ok(d) if d.content == "A"));
        assert!(matches!(&items[1], Err(ChatError::Model(_))));
    }

    #[tokio::test]
    async fn test_stalled_body_times_out() {
        let stalled = futures::stream::pending::<Result<Vec<u8>, reqwest::Error>>();
        let stream = ndjson_deltas(stalled, Duration::from_millis(20));
        let items = collect(stream).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Err(ChatError::Timeout(_))));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = OllamaClient::new("http://localhost:11434/");
        assert!(client.is_ok());
        if let Ok(client) = client {
            assert_eq!(client.base_url(), "http://localhost:11434");
            assert_eq!(client.endpoint("api/chat"), "http://localhost:11434/api/chat");
        }
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(matches!(
            OllamaClient::new("not a url"),
            Err(ChatError::InvalidUrl(_))
        ));
    }
}
