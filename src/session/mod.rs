pub mod state;

use crate::{
    analysis::{AnalysisController, AnalysisOutcome, AnalysisView, Preset, Typewriter, VisionModel},
    config::AnalystConfig,
    error::AnalystError,
    imaging::{normalize, NormalizedImage, Thumbnail, UploadedImage},
};

pub use state::{Credential, LastAnalysis, SessionState};

/// Discrete user interactions; each is one transition over the session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    CredentialEntered(String),
    ImageUploaded(UploadedImage),
    QuestionChanged(String),
    PresetClicked(Preset),
    TriggerClicked,
}

#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub name: String,
    pub image: NormalizedImage,
    pub thumbnail: Thumbnail,
}

/// What a render needs to know about the session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSnapshot<'a> {
    pub has_credential: bool,
    pub image_name: Option<&'a str>,
    pub question: &'a str,
    pub trigger_enabled: bool,
    pub last_analysis: Option<&'a LastAnalysis>,
    pub pending: bool,
}

pub struct AnalystSession {
    state: SessionState,
    image: Option<LoadedImage>,
    question: String,
    controller: AnalysisController,
}

impl AnalystSession {
    pub fn new(typewriter: Typewriter) -> Self {
        Self {
            state: SessionState::new(),
            image: None,
            question: String::new(),
            controller: AnalysisController::new(typewriter),
        }
    }

    /// Starts a session, taking the credential from configuration when present.
    pub fn from_config(config: &AnalystConfig) -> Self {
        let mut session = Self::new(Typewriter::new(config.reveal_delay));
        if let Some(credential) = config
            .api_key
            .as_deref()
            .and_then(|key| Credential::new(key).ok())
        {
            log::info!("✅ API key loaded from environment");
            session.state.set_credential(credential);
        }
        session
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn has_credential(&self) -> bool {
        self.state.credential().is_some()
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn snapshot(&self) -> SessionSnapshot<'_> {
        SessionSnapshot {
            has_credential: self.has_credential(),
            image_name: self.image.as_ref().map(|loaded| loaded.name.as_str()),
            question: &self.question,
            trigger_enabled: self.image.is_some(),
            last_analysis: self.state.last_analysis(),
            pending: self.state.is_pending(),
        }
    }

    /// Applies one event, then renders the resulting state once. Returns the
    /// outcome when the event started an analysis.
    pub async fn handle(
        &mut self,
        event: SessionEvent,
        model: &dyn VisionModel,
        view: &mut dyn AnalysisView,
    ) -> Option<AnalysisOutcome> {
        let outcome = self.apply(event, model, view).await;
        view.render(&self.snapshot());
        outcome
    }

    async fn apply(
        &mut self,
        event: SessionEvent,
        model: &dyn VisionModel,
        view: &mut dyn AnalysisView,
    ) -> Option<AnalysisOutcome> {
        if let SessionEvent::CredentialEntered(secret) = event {
            match Credential::new(secret) {
                Ok(credential) => {
                    log::info!("✅ API key accepted");
                    self.state.set_credential(credential);
                }
                Err(e) => notify(&e, view),
            }
            return None;
        }

        if !self.has_credential() {
            notify(&AnalystError::MissingCredential, view);
            return None;
        }

        match event {
            SessionEvent::CredentialEntered(_) => None,
            SessionEvent::ImageUploaded(upload) => {
                self.load_image(upload, view);
                None
            }
            SessionEvent::QuestionChanged(question) => {
                self.question = question;
                None
            }
            SessionEvent::PresetClicked(preset) => {
                if self.image.is_none() {
                    notify(&AnalystError::NoImage, view);
                    return None;
                }
                log::debug!("Preset selected: {}", preset.label());
                self.question = preset.question().to_string();
                Some(self.run_analysis(model, view).await)
            }
            SessionEvent::TriggerClicked => Some(self.run_analysis(model, view).await),
        }
    }

    fn load_image(&mut self, upload: UploadedImage, view: &mut dyn AnalysisView) {
        let loaded = normalize(&upload).and_then(|image| {
            let thumbnail = image.thumbnail()?;
            Ok(LoadedImage {
                name: upload.name.clone(),
                image,
                thumbnail,
            })
        });

        match loaded {
            Ok(loaded) => {
                view.image_loaded(&loaded.name, &loaded.image, &loaded.thumbnail);
                self.image = Some(loaded);
            }
            Err(e) => {
                log::error!("❌ Upload {} rejected: {}", upload.name, e);
                self.image = None;
                notify(&e, view);
            }
        }
    }

    async fn run_analysis(
        &mut self,
        model: &dyn VisionModel,
        view: &mut dyn AnalysisView,
    ) -> AnalysisOutcome {
        let thumbnail = self.image.as_ref().map(|loaded| &loaded.thumbnail);
        self.controller
            .analyze(model, &mut self.state, &self.question, thumbnail, view)
            .await
    }
}

/// Missing inputs are warnings next to the input; anything else is an error.
fn notify(error: &AnalystError, view: &mut dyn AnalysisView) {
    if error.is_precondition() {
        view.warning(&error.to_string());
    } else {
        view.error(&error.to_string(), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{sample_upload, RecordingView, ScriptedModel, ViewEvent};
    use std::time::Duration;

    fn session() -> AnalystSession {
        AnalystSession::new(Typewriter::seeded(Duration::ZERO, 9))
    }

    async fn keyed_session(model: &ScriptedModel, view: &mut RecordingView) -> AnalystSession {
        let mut session = session();
        session
            .handle(SessionEvent::CredentialEntered("key-123".into()), model, view)
            .await;
        session
    }

    #[tokio::test]
    async fn test_manual_trigger_scenario() {
        let model = ScriptedModel::streaming(vec!["Sentiment is ", "mostly greedy."]);
        let mut view = RecordingView::default();
        let mut session = keyed_session(&model, &mut view).await;

        session
            .handle(SessionEvent::ImageUploaded(sample_upload(400, 200)), &model, &mut view)
            .await;
        assert!(view
            .events
            .contains(&ViewEvent::ImageLoaded("chart.png".into(), 128, 64)));

        session
            .handle(
                SessionEvent::QuestionChanged("Analyze sentiment distribution".into()),
                &model,
                &mut view,
            )
            .await;
        let outcome = session
            .handle(SessionEvent::TriggerClicked, &model, &mut view)
            .await;

        assert_eq!(
            outcome,
            Some(AnalysisOutcome::Completed("Sentiment is mostly greedy.".into()))
        );
        assert_eq!(model.stream_calls(), 1);
        assert_eq!(model.api_keys(), vec!["key-123".to_string()]);
        assert!(model.prompts()[0].contains("Analyze sentiment distribution"));
        assert_eq!(
            session.state().last_analysis().unwrap().question,
            "Analyze sentiment distribution"
        );
        assert_eq!(
            view.events.last(),
            Some(&ViewEvent::Render {
                trigger_enabled: true,
                last_question: Some("Analyze sentiment distribution".into()),
                pending: false,
            })
        );
    }

    #[tokio::test]
    async fn test_preset_uses_fixed_question() {
        let model = ScriptedModel::streaming(vec!["Full report."]);
        let mut view = RecordingView::default();
        let mut session = keyed_session(&model, &mut view).await;

        session
            .handle(SessionEvent::ImageUploaded(sample_upload(200, 200)), &model, &mut view)
            .await;
        let outcome = session
            .handle(SessionEvent::PresetClicked(Preset::Comprehensive), &model, &mut view)
            .await;

        assert!(outcome.unwrap().is_completed());
        assert_eq!(session.question(), Preset::Comprehensive.question());
        assert!(model.prompts()[0].contains(Preset::Comprehensive.question()));
        assert!(view
            .events
            .contains(&ViewEvent::Question(Preset::Comprehensive.question().into())));
    }

    #[tokio::test]
    async fn test_trigger_without_image_warns() {
        let model = ScriptedModel::streaming(vec!["first"]);
        let mut view = RecordingView::default();
        let mut session = keyed_session(&model, &mut view).await;

        session
            .handle(SessionEvent::ImageUploaded(sample_upload(100, 100)), &model, &mut view)
            .await;
        session
            .handle(SessionEvent::QuestionChanged("Trend?".into()), &model, &mut view)
            .await;
        session
            .handle(SessionEvent::TriggerClicked, &model, &mut view)
            .await;
        assert_eq!(model.stream_calls(), 1);

        // A failed upload clears the image; the earlier analysis stays.
        let broken = UploadedImage::new("broken.png", b"garbage".to_vec()).unwrap();
        session
            .handle(SessionEvent::ImageUploaded(broken), &model, &mut view)
            .await;
        assert!(session.image().is_none());

        let mut view = RecordingView::default();
        let outcome = session
            .handle(SessionEvent::TriggerClicked, &model, &mut view)
            .await;

        assert_eq!(outcome, Some(AnalysisOutcome::Rejected(AnalystError::NoImage)));
        assert_eq!(model.stream_calls(), 1);
        assert_eq!(view.warnings(), vec!["Please upload a chart image first"]);
        assert_eq!(session.state().last_analysis().unwrap().question, "Trend?");
        assert_eq!(
            view.events.last(),
            Some(&ViewEvent::Render {
                trigger_enabled: false,
                last_question: Some("Trend?".into()),
                pending: false,
            })
        );
    }

    #[tokio::test]
    async fn test_preset_without_image_keeps_question() {
        let model = ScriptedModel::streaming(vec!["unused"]);
        let mut view = RecordingView::default();
        let mut session = keyed_session(&model, &mut view).await;

        session
            .handle(SessionEvent::QuestionChanged("mine".into()), &model, &mut view)
            .await;
        let outcome = session
            .handle(SessionEvent::PresetClicked(Preset::Risk), &model, &mut view)
            .await;

        assert!(outcome.is_none());
        assert_eq!(session.question(), "mine");
        assert_eq!(model.stream_calls(), 0);
        assert_eq!(view.warnings(), vec!["Please upload a chart image first"]);
    }

    #[tokio::test]
    async fn test_no_credential_refuses_everything() {
        let model = ScriptedModel::streaming(vec!["unused"]);
        let mut view = RecordingView::default();
        let mut session = session();

        session
            .handle(SessionEvent::CredentialEntered("   ".into()), &model, &mut view)
            .await;
        session
            .handle(SessionEvent::ImageUploaded(sample_upload(10, 10)), &model, &mut view)
            .await;
        let outcome = session
            .handle(SessionEvent::TriggerClicked, &model, &mut view)
            .await;

        assert!(outcome.is_none());
        assert!(!session.has_credential());
        assert!(session.image().is_none());
        assert_eq!(model.stream_calls() + model.complete_calls(), 0);
        assert_eq!(view.warnings().len(), 3);
    }

    #[tokio::test]
    async fn test_bad_upload_is_error_not_warning() {
        let model = ScriptedModel::streaming(vec!["unused"]);
        let mut view = RecordingView::default();
        let mut session = keyed_session(&model, &mut view).await;

        let broken = UploadedImage::new("broken.png", b"garbage".to_vec()).unwrap();
        session
            .handle(SessionEvent::ImageUploaded(broken), &model, &mut view)
            .await;

        assert!(view.warnings().is_empty());
        assert!(view
            .events
            .iter()
            .any(|event| matches!(event, ViewEvent::Error(message, None) if message.starts_with("Could not decode image"))));
    }

    #[test]
    fn test_from_config_takes_env_key() {
        let config = AnalystConfig::new().with_api_key("from-env").without_typing();
        let session = AnalystSession::from_config(&config);
        assert!(session.has_credential());
        assert!(!session.snapshot().trigger_enabled);

        let blank = AnalystSession::from_config(&AnalystConfig::new().with_api_key(" "));
        assert!(!blank.has_credential());
    }
}
