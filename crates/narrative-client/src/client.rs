use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::Serialize;

use crate::error::{NarrativeError, NarrativeResult};
use crate::prompt::NarrativePrompt;
use crate::sse::{SseDecoder, SseEvent};
use crate::{NarrativeConfig, NarrativeGenerator, NarrativeStream};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

struct StreamState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    queued: VecDeque<NarrativeResult<String>>,
    done: bool,
}

impl<S> StreamState<S> {
    fn enqueue(&mut self, events: Vec<SseEvent>) {
        for event in events {
            match event {
                SseEvent::Text(text) => self.queued.push_back(Ok(text)),
                SseEvent::Error(detail) => {
                    self.queued.push_back(Err(NarrativeError::Stream(detail)));
                    self.done = true;
                }
                SseEvent::Done => self.done = true,
            }
        }
    }
}

/// Turn a raw event-stream body into a stream of text chunks. The stream
/// ends at `message_stop`, and yields one error and ends on an upstream
/// error event or transport failure.
pub fn text_stream<S, B, E>(body: S) -> NarrativeStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<NarrativeError> + Send + 'static,
{
    let state = StreamState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        queued: VecDeque::new(),
        done: false,
    };

    let stream = futures_util::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.queued.pop_front() {
                return Some((item, st));
            }
            if st.done {
                return None;
            }

            match st.body.next().await {
                Some(Ok(chunk)) => {
                    let events = st.decoder.decode(chunk.as_ref());
                    st.enqueue(events);
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e.into()), st));
                }
                None => {
                    let events = st.decoder.finish();
                    st.enqueue(events);
                    st.done = true;
                }
            }
        }
    });

    Box::pin(stream)
}

/// Streams commentary from the Anthropic Messages API
#[derive(Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(config: NarrativeConfig) -> NarrativeResult<Self> {
        let api_key = config
            .api_key
            .ok_or_else(|| NarrativeError::NotConfigured("ANTHROPIC_API_KEY is not set".to_string()))?;

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_key,
            api_url: config.api_url,
            model: config.model,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl NarrativeGenerator for AnthropicClient {
    async fn generate(&self, prompt: &NarrativePrompt) -> NarrativeResult<NarrativeStream> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: &prompt.system,
            messages: vec![Message {
                role: "user",
                content: &prompt.user,
            }],
            stream: true,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %body, "Anthropic request failed");
            return Err(NarrativeError::ServiceUnavailable(format!("Status: {}", status)));
        }

        let is_event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/event-stream"))
            .unwrap_or(false);
        if !is_event_stream {
            return Err(NarrativeError::InvalidResponse(
                "expected an event stream".to_string(),
            ));
        }

        tracing::debug!(model = %self.model, "Streaming narrative");
        Ok(text_stream(response.bytes_stream()))
    }

    fn backend_name(&self) -> &'static str {
        "anthropic"
    }
}
