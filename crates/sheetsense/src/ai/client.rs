//! Blocking client for an OpenAI-compatible chat completion endpoint.
//!
//! Pipeline workers are plain threads, so the blocking reqwest API is used
//! rather than the async one.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::ai::{CompletionRequest, CompletionService};
use crate::error::CompletionError;

/// Default connect timeout for HTTP requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout. Vision requests over multi-page documents can
/// take minutes.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Maximum length for error bodies carried into errors and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Truncates an error response body to keep errors and logs readable.
fn sanitize_error_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let cut = body
            .char_indices()
            .take_while(|(i, _)| *i < MAX_ERROR_BODY_LENGTH)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}... (truncated)", &body[..cut])
    } else {
        body.to_string()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for a request/response text+vision completion API.
pub struct ChatCompletionClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

impl CompletionService for ChatCompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let mut content = vec![ContentPart::Text {
            text: &request.instruction,
        }];
        for image in &request.images {
            content.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: &image.data_url,
                },
            });
        }

        let body = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content,
            }],
        };

        debug!(
            "Completion request: {} image(s), {} instruction chars",
            request.images.len(),
            request.instruction.len()
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(CompletionError::Api {
                status,
                body: sanitize_error_body(&body),
            });
        }

        let parsed: ChatResponse = response.json()?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                CompletionError::MalformedResponse(
                    "response contained no message content".to_string(),
                )
            })
    }
}
