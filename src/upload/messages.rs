use serde::{Deserialize, Serialize};

/// Successful response body from the transcription service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub transcript: String,
}

/// Error body the transcription service may attach to a failure status
///
/// Services differ in which field they fill, so both are accepted.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ServiceErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message).filter(|m| !m.trim().is_empty())
    }
}
