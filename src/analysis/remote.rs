use crate::{
    error::{AnalystError, Result},
    imaging::Thumbnail,
    models::{default_safety_settings, SafetySetting},
    session::Credential,
};
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

/// Fault kinds a remote model adapter resolves its failures into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteFault {
    /// Output withheld by content-safety filtering.
    SafetyBlocked(String),
    /// The configured model name does not resolve.
    ModelNotFound(String),
    /// The stream closed before the model signalled completion.
    IncompleteStream,
    Transport(String),
}

impl From<RemoteFault> for AnalystError {
    fn from(fault: RemoteFault) -> Self {
        match fault {
            RemoteFault::SafetyBlocked(reason) => AnalystError::SafetyBlocked(reason),
            RemoteFault::ModelNotFound(model) => AnalystError::CapabilityUnavailable(model),
            RemoteFault::IncompleteStream => {
                AnalystError::TransportFault("response stream ended early".into())
            }
            RemoteFault::Transport(msg) => AnalystError::TransportFault(msg),
        }
    }
}

pub type FragmentStream = Pin<Box<dyn Stream<Item = std::result::Result<String, RemoteFault>> + Send>>;

/// Everything sent to the model for one analysis. Built once and reused
/// unchanged by the fallback call.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub prompt: String,
    pub image: Vec<u8>,
    pub mime_type: String,
    pub safety_settings: Vec<SafetySetting>,
}

impl VisionRequest {
    pub fn new(prompt: impl Into<String>, thumbnail: &Thumbnail) -> Result<Self> {
        Ok(Self {
            prompt: prompt.into(),
            image: thumbnail.to_png()?,
            mime_type: thumbnail.mime_type().to_string(),
            safety_settings: default_safety_settings(),
        })
    }
}

#[async_trait]
pub trait VisionModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Incremental delivery: text fragments in arrival order.
    async fn generate_stream(
        &self,
        credential: &Credential,
        request: &VisionRequest,
    ) -> std::result::Result<FragmentStream, RemoteFault>;

    /// One complete response. May be empty when the model produced no text.
    async fn generate(
        &self,
        credential: &Credential,
        request: &VisionRequest,
    ) -> std::result::Result<String, RemoteFault>;
}
