use super::{
    prompt::build_prompt,
    remote::{RemoteFault, VisionModel, VisionRequest},
    typewriter::{ResponseBuffer, Typewriter},
    view::AnalysisView,
};
use crate::{error::AnalystError, imaging::Thumbnail, logger, session::{Credential, SessionState}};
use futures::StreamExt;
use uuid::Uuid;

pub const ANALYZING_STATUS: &str = "Analyzing image...";
pub const FALLBACK_STATUS: &str = "Streaming interrupted, requesting the complete response...";
pub const BLOCKED_MESSAGE: &str = "The response was withheld by the model's safety filters.";
pub const UNAVAILABLE_HINT: &str =
    "The Gemini vision model may have been renamed. Check the Gemini API docs for current model names and pass one with --model or GEMINI_MODEL.";

/// Terminal state of one analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Completed(String),
    /// A precondition failed; the model was never called.
    Rejected(AnalystError),
    Blocked(String),
    Unavailable(String),
    Failed(AnalystError),
}

impl AnalysisOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, AnalysisOutcome::Completed(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            AnalysisOutcome::Completed(text) => Some(text),
            _ => None,
        }
    }
}

/// Runs the stream-then-fallback protocol for one question at a time.
pub struct AnalysisController {
    typewriter: Typewriter,
}

impl AnalysisController {
    pub fn new(typewriter: Typewriter) -> Self {
        Self { typewriter }
    }

    pub async fn analyze(
        &mut self,
        model: &dyn VisionModel,
        state: &mut SessionState,
        question: &str,
        thumbnail: Option<&Thumbnail>,
        view: &mut dyn AnalysisView,
    ) -> AnalysisOutcome {
        let credential = match state.credential() {
            Some(credential) => credential.clone(),
            None => return reject(AnalystError::MissingCredential, view),
        };
        let thumbnail = match thumbnail {
            Some(thumbnail) => thumbnail,
            None => return reject(AnalystError::NoImage, view),
        };
        let question = question.trim();
        if question.is_empty() {
            return reject(AnalystError::EmptyQuestion, view);
        }

        let request_id = Uuid::new_v4().to_string();
        state.begin_request();
        view.question(question);
        view.status(ANALYZING_STATUS);

        let outcome = match VisionRequest::new(build_prompt(question), thumbnail) {
            Ok(request) => {
                log::info!(
                    "🔄 [{}] Analyzing with {} ({} byte thumbnail)",
                    &request_id[..8],
                    model.model_name(),
                    request.image.len()
                );
                self.run(model, &credential, &request, &request_id, view).await
            }
            Err(e) => AnalysisOutcome::Failed(e),
        };

        state.finish_request(question, &outcome);
        report(&outcome, view);
        log::info!("🏁 [{}] Finished: {}", &request_id[..8], outcome_label(&outcome));
        outcome
    }

    async fn run(
        &mut self,
        model: &dyn VisionModel,
        credential: &Credential,
        request: &VisionRequest,
        request_id: &str,
        view: &mut dyn AnalysisView,
    ) -> AnalysisOutcome {
        let timer = logger::timer("streamed analysis");
        let streamed = self.attempt_stream(model, credential, request, view).await;
        drop(timer);

        match streamed {
            Ok(text) => AnalysisOutcome::Completed(text),
            Err(RemoteFault::SafetyBlocked(reason)) => AnalysisOutcome::Blocked(reason),
            Err(RemoteFault::ModelNotFound(model)) => AnalysisOutcome::Unavailable(model),
            Err(fault) => {
                log::warn!(
                    "⚠️  [{}] Stream failed ({:?}), falling back to a single response",
                    &request_id[..8],
                    fault
                );
                view.status(FALLBACK_STATUS);
                let _timer = logger::timer("fallback analysis");
                attempt_complete(model, credential, request).await
            }
        }
    }

    async fn attempt_stream(
        &mut self,
        model: &dyn VisionModel,
        credential: &Credential,
        request: &VisionRequest,
        view: &mut dyn AnalysisView,
    ) -> Result<String, RemoteFault> {
        let mut stream = model.generate_stream(credential, request).await?;
        // Dropped on any early return, which discards the partial text.
        let mut buffer = ResponseBuffer::new();

        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            self.typewriter.reveal(&fragment, &mut buffer, view).await;
        }

        if buffer.is_empty() {
            return Err(RemoteFault::IncompleteStream);
        }
        log::debug!("Stream delivered {} characters", buffer.char_count());
        Ok(buffer.finish())
    }
}

async fn attempt_complete(
    model: &dyn VisionModel,
    credential: &Credential,
    request: &VisionRequest,
) -> AnalysisOutcome {
    match model.generate(credential, request).await {
        Ok(text) if text.trim().is_empty() => {
            AnalysisOutcome::Blocked("the model returned no text".into())
        }
        Ok(text) => AnalysisOutcome::Completed(text),
        Err(RemoteFault::SafetyBlocked(reason)) => AnalysisOutcome::Blocked(reason),
        Err(RemoteFault::ModelNotFound(model)) => AnalysisOutcome::Unavailable(model),
        Err(fault) => AnalysisOutcome::Failed(fault.into()),
    }
}

fn reject(error: AnalystError, view: &mut dyn AnalysisView) -> AnalysisOutcome {
    log::debug!("Analysis rejected: {}", error);
    view.warning(&error.to_string());
    AnalysisOutcome::Rejected(error)
}

/// The single display update made for every outcome that reached the model.
fn report(outcome: &AnalysisOutcome, view: &mut dyn AnalysisView) {
    match outcome {
        AnalysisOutcome::Completed(text) => view.complete(text),
        AnalysisOutcome::Blocked(reason) => {
            log::warn!("Blocked: {}", reason);
            view.error(BLOCKED_MESSAGE, None);
        }
        AnalysisOutcome::Unavailable(model) => view.error(
            &AnalystError::CapabilityUnavailable(model.clone()).to_string(),
            Some(UNAVAILABLE_HINT),
        ),
        AnalysisOutcome::Failed(error) => view.error(&error.to_string(), None),
        AnalysisOutcome::Rejected(_) => {}
    }
}

fn outcome_label(outcome: &AnalysisOutcome) -> &'static str {
    match outcome {
        AnalysisOutcome::Completed(_) => "completed",
        AnalysisOutcome::Rejected(_) => "rejected",
        AnalysisOutcome::Blocked(_) => "blocked",
        AnalysisOutcome::Unavailable(_) => "unavailable",
        AnalysisOutcome::Failed(_) => "failed",
    }
}
