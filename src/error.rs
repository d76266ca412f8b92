use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalystError {
    #[error("Please put your Gemini API key first")]
    MissingCredential,
    #[error("Please upload a chart image first")]
    NoImage,
    #[error("Please enter an analysis question or select a quick analysis option")]
    EmptyQuestion,
    #[error("Unsupported upload format: {0} (expected jpg, jpeg, png or gif)")]
    UnsupportedFormat(String),
    #[error("Could not decode image: {0}")]
    DecodeError(String),
    #[error("Response withheld by safety filtering: {0}")]
    SafetyBlocked(String),
    #[error("Model not available: {0}")]
    CapabilityUnavailable(String),
    #[error("Request failed: {0}")]
    TransportFault(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl AnalystError {
    /// Precondition failures are shown as warnings next to the input and never
    /// reach the remote model.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            AnalystError::MissingCredential | AnalystError::NoImage | AnalystError::EmptyQuestion
        )
    }
}

impl From<std::io::Error> for AnalystError {
    fn from(err: std::io::Error) -> Self {
        AnalystError::IoError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalystError>;
