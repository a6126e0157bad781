use crate::stt::SttError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum GroupError {
    #[error("group size must be at least 1, got {0}")]
    InvalidGroupSize(usize),
}

#[derive(Debug, Error, Diagnostic)]
pub enum CaptionError {
    #[error("provider not configured")]
    #[diagnostic(help("Set ASSEMBLYAI_API_KEY in the environment, .env or captioner.toml"))]
    NotConfigured,

    #[error("media file not found: {0}")]
    #[diagnostic(help("Upload the video first and pass the returned filename"))]
    MediaNotFound(String),

    #[error("transcription failed: {0}")]
    Transcription(#[from] SttError),

    #[error("No speech detected in the video")]
    NoSpeechDetected,

    #[error(transparent)]
    InvalidArgument(#[from] GroupError),
}

/// Stable classification of a [`CaptionError`], for callers that map errors
/// to statuses or exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    NotFound,
    Unauthorized,
    RateLimited,
    Transcription,
    NoSpeech,
    InvalidArgument,
}

impl CaptionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaptionError::NotConfigured => ErrorKind::Configuration,
            CaptionError::MediaNotFound(_) => ErrorKind::NotFound,
            CaptionError::Transcription(SttError::Unauthorized) => ErrorKind::Unauthorized,
            CaptionError::Transcription(SttError::RateLimited) => ErrorKind::RateLimited,
            CaptionError::Transcription(_) => ErrorKind::Transcription,
            CaptionError::NoSpeechDetected => ErrorKind::NoSpeech,
            CaptionError::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }
}
