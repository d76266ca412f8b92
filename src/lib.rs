pub mod analysis;
pub mod config;
pub mod error;
pub mod gemini;
pub mod imaging;
pub mod logger;
pub mod models;
pub mod session;

pub use analysis::{
    AnalysisController, AnalysisOutcome, AnalysisView, Preset, RemoteFault, TerminalView,
    Typewriter, VisionModel, VisionRequest,
};
pub use config::{AnalystConfig, GeminiConfig};
pub use error::{AnalystError, Result};
pub use gemini::{GeminiClient, VisionClient};
pub use imaging::{normalize, NormalizedImage, Thumbnail, UploadFormat, UploadedImage};
pub use session::{AnalystSession, Credential, SessionEvent};
