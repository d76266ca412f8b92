use crate::analysis::AnalysisOutcome;
use crate::error::{AnalystError, Result};
use std::fmt;

/// Gemini API key. Never logged and never written to disk.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Result<Self> {
        let secret = secret.into().trim().to_string();
        if secret.is_empty() {
            return Err(AnalystError::MissingCredential);
        }
        Ok(Self(secret))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(***{} chars)", self.0.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastAnalysis {
    pub question: String,
    pub result: String,
}

/// Per-session context threaded through every operation.
#[derive(Debug, Default)]
pub struct SessionState {
    credential: Option<Credential>,
    last_analysis: Option<LastAnalysis>,
    pending: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = Some(credential);
    }

    pub fn last_analysis(&self) -> Option<&LastAnalysis> {
        self.last_analysis.as_ref()
    }

    pub fn set_last_analysis(&mut self, question: String, result: String) {
        self.last_analysis = Some(LastAnalysis { question, result });
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn begin_request(&mut self) {
        self.pending = true;
    }

    /// Clears the pending flag whatever the outcome; only a completed
    /// analysis replaces the stored one.
    pub fn finish_request(&mut self, question: &str, outcome: &AnalysisOutcome) {
        self.pending = false;
        if let AnalysisOutcome::Completed(text) = outcome {
            self.set_last_analysis(question.to_string(), text.clone());
        }
    }
}
