use super::sse::SseDecoder;
use crate::{
    analysis::{FragmentStream, RemoteFault, VisionModel, VisionRequest},
    config::GeminiConfig,
    models::{ApiErrorEnvelope, Content, GenerateContentRequest, GenerateContentResponse, InlineData, Part},
    session::Credential,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use tokio::sync::mpsc::Sender;
use tokio_stream::wrappers::ReceiverStream;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct VisionClient {
    http: Client,
    api_base: String,
    model: String,
}

impl VisionClient {
    pub fn new(http: Client, config: &GeminiConfig) -> Self {
        let model = config.model.trim();
        let model = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };

        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model,
        }
    }

    /// Vision-capable models this client has been used with, newest first.
    pub fn known_models() -> Vec<(&'static str, &'static str)> {
        vec![
            ("gemini-2.5-pro", "Gemini 2.5 Pro"),
            ("gemini-2.5-flash", "Gemini 2.5 Flash"),
            ("gemini-pro", "Gemini Pro (limited vision)"),
        ]
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}:{}", self.api_base, self.model, method)
    }

    fn build_payload(request: &VisionRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::Text {
                        text: request.prompt.clone(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: request.mime_type.clone(),
                            data: BASE64.encode(&request.image),
                        },
                    },
                ],
            }],
            safety_settings: request.safety_settings.clone(),
        }
    }

    async fn post(
        &self,
        credential: &Credential,
        method: &str,
        query: &[(&str, &str)],
        request: &VisionRequest,
    ) -> Result<Response, RemoteFault> {
        let url = self.endpoint(method);
        log::debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, credential.expose())
            .query(query)
            .json(&Self::build_payload(request))
            .send()
            .await
            .map_err(transport_fault)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(self.classify_error(response).await)
        }
    }

    async fn classify_error(&self, response: Response) -> RemoteFault {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let api_error = serde_json::from_str::<ApiErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        log::error!("Gemini error response ({}): {}", status, body);

        let not_found = status == StatusCode::NOT_FOUND
            || api_error
                .as_ref()
                .and_then(|error| error.status.as_deref())
                == Some("NOT_FOUND");
        if not_found {
            return RemoteFault::ModelNotFound(self.model.clone());
        }

        let message = api_error
            .map(|error| error.message)
            .filter(|message| !message.is_empty())
            .unwrap_or(body);
        RemoteFault::Transport(format!("HTTP {}: {}", status.as_u16(), message))
    }
}

#[async_trait]
impl VisionModel for VisionClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_stream(
        &self,
        credential: &Credential,
        request: &VisionRequest,
    ) -> Result<FragmentStream, RemoteFault> {
        log::info!("Invoking streaming model: {}", self.model);
        let response = self
            .post(credential, "streamGenerateContent", &[("alt", "sse")], request)
            .await?;

        let (tx, rx) = tokio::sync::mpsc::channel(32);
        let mut body = response.bytes_stream();

        tokio::spawn(async move {
            let mut decoder = SseDecoder::new();
            let mut finished = false;

            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx.send(Err(transport_fault(e))).await;
                        return;
                    }
                };
                for payload in decoder.push(&bytes) {
                    if !forward_event(&tx, &payload, &mut finished).await {
                        return;
                    }
                }
            }
            for payload in decoder.finish() {
                if !forward_event(&tx, &payload, &mut finished).await {
                    return;
                }
            }

            if !finished {
                let _ = tx.send(Err(RemoteFault::IncompleteStream)).await;
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn generate(
        &self,
        credential: &Credential,
        request: &VisionRequest,
    ) -> Result<String, RemoteFault> {
        log::info!("Invoking model: {}", self.model);
        let response = self
            .post(credential, "generateContent", &[], request)
            .await?;

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| RemoteFault::Transport(format!("malformed response: {}", e)))?;

        if let Some(reason) = parsed.block_reason() {
            return Err(RemoteFault::SafetyBlocked(reason));
        }
        Ok(parsed.text())
    }
}

struct StreamEvent {
    text: String,
    finished: bool,
}

fn decode_event(payload: &str) -> Result<StreamEvent, RemoteFault> {
    if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(payload) {
        return Err(RemoteFault::Transport(format!(
            "stream error: {}",
            envelope.error.message
        )));
    }

    let parsed: GenerateContentResponse = serde_json::from_str(payload)
        .map_err(|e| RemoteFault::Transport(format!("malformed stream event: {}", e)))?;

    if let Some(reason) = parsed.block_reason() {
        return Err(RemoteFault::SafetyBlocked(reason));
    }

    Ok(StreamEvent {
        text: parsed.text(),
        finished: parsed.finish_reason().is_some(),
    })
}

/// Sends the event's text on; false once the stream should stop.
async fn forward_event(
    tx: &Sender<Result<String, RemoteFault>>,
    payload: &str,
    finished: &mut bool,
) -> bool {
    match decode_event(payload) {
        Ok(event) => {
            *finished |= event.finished;
            event.text.is_empty() || tx.send(Ok(event.text)).await.is_ok()
        }
        Err(fault) => {
            let _ = tx.send(Err(fault)).await;
            false
        }
    }
}

fn transport_fault(e: reqwest::Error) -> RemoteFault {
    if e.is_timeout() {
        RemoteFault::Transport(format!("request timed out: {}", e))
    } else {
        RemoteFault::Transport(e.to_string())
    }
}
