use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use captioner_core::{CaptionError, ErrorKind, MediaError};
use serde::Serialize;

const LOGS_HINT: &str = "Check server logs for more information";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    Caption(CaptionError),
    Media(MediaError),
    Multipart { source: MultipartError, limit_mb: u64 },
}

impl From<CaptionError> for ApiError {
    fn from(err: CaptionError) -> Self {
        ApiError::Caption(err)
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        ApiError::Media(err)
    }
}

fn body(status: StatusCode, error: impl Into<String>, details: Option<&str>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: error.into(),
            details: details.map(str::to_string),
        }),
    )
        .into_response()
}

fn caption_response(err: CaptionError) -> Response {
    match err.kind() {
        ErrorKind::Configuration => {
            tracing::warn!(error = %err, "caption_generation_unconfigured");
            body(
                StatusCode::UNAUTHORIZED,
                "AssemblyAI API key not configured",
                None,
            )
        }
        ErrorKind::Unauthorized => {
            tracing::warn!(error = %err, "caption_generation_unauthorized");
            body(StatusCode::UNAUTHORIZED, "Invalid AssemblyAI API key", None)
        }
        ErrorKind::RateLimited => {
            tracing::warn!(error = %err, "caption_generation_rate_limited");
            body(
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded. Please wait and try again.",
                None,
            )
        }
        ErrorKind::NotFound => body(StatusCode::BAD_REQUEST, err.to_string(), None),
        ErrorKind::NoSpeech => body(StatusCode::UNPROCESSABLE_ENTITY, err.to_string(), None),
        ErrorKind::Transcription | ErrorKind::InvalidArgument => {
            tracing::error!(error = %err, error_debug = ?err, "caption_generation_failed");
            body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate captions",
                Some(LOGS_HINT),
            )
        }
    }
}

fn media_response(err: MediaError) -> Response {
    match err {
        MediaError::Io(ref io) => {
            tracing::error!(error = %io, "upload_failed");
            body(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upload video", None)
        }
        other => body(StatusCode::BAD_REQUEST, other.to_string(), None),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => body(StatusCode::BAD_REQUEST, message, None),
            ApiError::Caption(err) => caption_response(err),
            ApiError::Media(err) => media_response(err),
            ApiError::Multipart { source, limit_mb } => {
                if source.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    return media_response(MediaError::FileTooLarge { limit_mb });
                }
                tracing::warn!(error = %source, "multipart_rejected");
                body(
                    StatusCode::BAD_REQUEST,
                    format!("File upload error: {}", source.body_text()),
                    None,
                )
            }
        }
    }
}
