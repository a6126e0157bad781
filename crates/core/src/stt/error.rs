use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SttError {
    #[error("Failed to reach transcription provider: {0}")]
    #[diagnostic(help("Check network connectivity and the configured provider base URL"))]
    Request(#[source] reqwest::Error),

    #[error("Transcription provider rejected the API key")]
    #[diagnostic(help("Set a valid ASSEMBLYAI_API_KEY in the environment or .env"))]
    Unauthorized,

    #[error("Transcription provider rate limit exceeded")]
    #[diagnostic(help("Wait a moment and try again"))]
    RateLimited,

    #[error("Transcription provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected response from transcription provider: {0}")]
    Decode(String),

    #[error("Transcription did not finish in time")]
    Timeout,

    #[error("{0}")]
    JobFailed(String),

    #[error("Could not read media file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SttError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SttError::Timeout
        } else if err.is_decode() {
            SttError::Decode(err.to_string())
        } else {
            SttError::Request(err)
        }
    }
}
