pub mod controller;
pub mod prompt;
pub mod remote;
pub mod typewriter;
pub mod view;

pub use controller::{AnalysisController, AnalysisOutcome};
pub use prompt::{build_prompt, Preset};
pub use remote::{FragmentStream, RemoteFault, VisionModel, VisionRequest};
pub use typewriter::{ResponseBuffer, Typewriter, CURSOR};
pub use view::{AnalysisView, TerminalView};

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::{
        imaging::{normalize, NormalizedImage, Thumbnail, UploadedImage},
        session::{Credential, SessionSnapshot},
    };
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ViewEvent {
        ImageLoaded(String, u32, u32),
        Question(String),
        Status(String),
        Partial(String),
        Complete(String),
        Warning(String),
        Error(String, Option<String>),
        Render {
            trigger_enabled: bool,
            last_question: Option<String>,
            pending: bool,
        },
    }

    #[derive(Debug, Default)]
    pub struct RecordingView {
        pub events: Vec<ViewEvent>,
    }

    impl RecordingView {
        pub fn warnings(&self) -> Vec<&str> {
            self.events
                .iter()
                .filter_map(|event| match event {
                    ViewEvent::Warning(message) => Some(message.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    impl AnalysisView for RecordingView {
        fn image_loaded(&mut self, name: &str, _image: &NormalizedImage, thumbnail: &Thumbnail) {
            self.events.push(ViewEvent::ImageLoaded(
                name.to_string(),
                thumbnail.width(),
                thumbnail.height(),
            ));
        }

        fn question(&mut self, question: &str) {
            self.events.push(ViewEvent::Question(question.to_string()));
        }

        fn status(&mut self, message: &str) {
            self.events.push(ViewEvent::Status(message.to_string()));
        }

        fn partial(&mut self, text: &str) {
            self.events.push(ViewEvent::Partial(text.to_string()));
        }

        fn complete(&mut self, text: &str) {
            self.events.push(ViewEvent::Complete(text.to_string()));
        }

        fn warning(&mut self, message: &str) {
            self.events.push(ViewEvent::Warning(message.to_string()));
        }

        fn error(&mut self, message: &str, hint: Option<&str>) {
            self.events
                .push(ViewEvent::Error(message.to_string(), hint.map(String::from)));
        }

        fn render(&mut self, snapshot: &SessionSnapshot<'_>) {
            self.events.push(ViewEvent::Render {
                trigger_enabled: snapshot.trigger_enabled,
                last_question: snapshot.last_analysis.map(|last| last.question.clone()),
                pending: snapshot.pending,
            });
        }
    }

    pub enum StreamScript {
        Items(Vec<Result<String, RemoteFault>>),
        OpenFails(RemoteFault),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum CallKind {
        Stream,
        Complete,
    }

    /// Replays a fixed script and records every request it receives.
    pub struct ScriptedModel {
        stream: StreamScript,
        complete: Result<String, RemoteFault>,
        calls: Mutex<Vec<(CallKind, String, VisionRequest)>>,
    }

    impl ScriptedModel {
        pub fn new(stream: StreamScript, complete: Result<String, RemoteFault>) -> Self {
            Self {
                stream,
                complete,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn streaming(fragments: Vec<&str>) -> Self {
            Self::new(
                StreamScript::Items(fragments.into_iter().map(|f| Ok(f.to_string())).collect()),
                Err(RemoteFault::Transport("fallback not scripted".into())),
            )
        }

        fn count(&self, kind: CallKind) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(k, _, _)| *k == kind)
                .count()
        }

        pub fn stream_calls(&self) -> usize {
            self.count(CallKind::Stream)
        }

        pub fn complete_calls(&self) -> usize {
            self.count(CallKind::Complete)
        }

        pub fn requests(&self) -> Vec<VisionRequest> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(_, _, request)| request.clone())
                .collect()
        }

        pub fn prompts(&self) -> Vec<String> {
            self.requests().into_iter().map(|r| r.prompt).collect()
        }

        pub fn api_keys(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(_, key, _)| key.clone())
                .collect()
        }

        fn record(&self, kind: CallKind, credential: &Credential, request: &VisionRequest) {
            self.calls.lock().unwrap().push((
                kind,
                credential.expose().to_string(),
                request.clone(),
            ));
        }
    }

    #[async_trait]
    impl VisionModel for ScriptedModel {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn generate_stream(
            &self,
            credential: &Credential,
            request: &VisionRequest,
        ) -> Result<FragmentStream, RemoteFault> {
            self.record(CallKind::Stream, credential, request);
            match &self.stream {
                StreamScript::Items(items) => Ok(Box::pin(futures::stream::iter(items.clone()))),
                StreamScript::OpenFails(fault) => Err(fault.clone()),
            }
        }

        async fn generate(
            &self,
            credential: &Credential,
            request: &VisionRequest,
        ) -> Result<String, RemoteFault> {
            self.record(CallKind::Complete, credential, request);
            self.complete.clone()
        }
    }

    pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([20, 80, 160])))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    pub fn sample_upload(width: u32, height: u32) -> UploadedImage {
        UploadedImage::new("chart.png", sample_png(width, height)).unwrap()
    }

    pub fn sample_thumbnail(width: u32, height: u32) -> Thumbnail {
        normalize(&sample_upload(width, height))
            .unwrap()
            .thumbnail()
            .unwrap()
    }
}
