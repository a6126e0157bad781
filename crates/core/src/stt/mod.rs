pub mod assemblyai;
mod error;

pub use assemblyai::AssemblyAi;
pub use error::SttError;

use crate::domain::TimedWord;
use async_trait::async_trait;
use std::path::Path;

/// Opaque reference to media already uploaded to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHandle(pub String);

impl UploadHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscribeOptions {
    pub language_detection: bool,
    pub format_text: bool,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            language_detection: true,
            format_text: true,
        }
    }
}

/// Terminal state of a transcription job.
#[derive(Debug, Clone, PartialEq)]
pub enum Transcript {
    Completed {
        words: Vec<TimedWord>,
        language_code: Option<String>,
        confidence: Option<f64>,
    },
    Failed {
        message: Option<String>,
    },
}

#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Sends the file's bytes to the provider.
    async fn upload(&self, path: &Path) -> Result<UploadHandle, SttError>;

    /// Requests a transcript for uploaded media and waits until the job is
    /// completed or has failed.
    async fn transcribe(
        &self,
        handle: &UploadHandle,
        options: &TranscribeOptions,
    ) -> Result<Transcript, SttError>;
}
