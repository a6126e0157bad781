use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError, rejection::JsonRejection},
    routing::{get, post},
};
use captioner_core::{CaptionService, StoredMedia, TranscriptionResult};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{self, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::error::ApiError;

const UPLOAD_FIELD: &str = "video";
// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub captions: CaptionService,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    success: bool,
    video_url: String,
    filename: String,
    size: u64,
    path: String,
}

impl From<StoredMedia> for UploadResponse {
    fn from(stored: StoredMedia) -> Self {
        Self {
            success: true,
            video_url: format!("/uploads/{}", stored.filename),
            path: stored.path.display().to_string(),
            filename: stored.filename,
            size: stored.size,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(default)]
    video_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct CaptionResponse {
    success: bool,
    #[serde(flatten)]
    result: TranscriptionResult,
}

pub fn router(state: AppState) -> Router {
    let store = state.captions.store();
    let body_limit = store.max_file_size().saturating_add(MULTIPART_OVERHEAD);
    let uploads = ServeDir::new(store.dir());

    Router::new()
        .route("/health", get(health))
        .route("/api/upload", post(upload_video))
        .route("/api/captions/generate", post(generate_captions))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(
            usize::try_from(body_limit).unwrap_or(usize::MAX),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods(cors::Any)
                .allow_headers(cors::Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Backend server is running",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let store = state.captions.store();
    let limit_mb = store.max_file_size() / (1024 * 1024);
    let multipart_err = |source: MultipartError| ApiError::Multipart { source, limit_mb };

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_err)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let mut writer = store
            .begin_upload(original_name.as_deref(), content_type.as_deref())
            .await?;

        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => writer.write(&chunk).await?,
                Ok(None) => break,
                Err(err) => {
                    writer.discard().await;
                    return Err(multipart_err(err));
                }
            }
        }

        let stored = writer.finish().await?;
        tracing::info!(
            filename = %stored.filename,
            size_bytes = stored.size,
            original_name = ?original_name,
            "video_uploaded"
        );
        return Ok(Json(stored.into()));
    }

    Err(ApiError::BadRequest("No video file provided"))
}

async fn generate_captions(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<CaptionResponse>, ApiError> {
    let video_path = payload
        .ok()
        .and_then(|Json(req)| req.video_path)
        .filter(|p| !p.trim().is_empty())
        .ok_or(ApiError::BadRequest("No video path provided"))?;

    tracing::info!(video_path = %video_path, "caption_generation_started");

    let result = state.captions.generate_captions(&video_path).await?;

    Ok(Json(CaptionResponse {
        success: true,
        result,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use captioner_core::MediaStore;
    use captioner_core::domain::TimedWord;
    use captioner_core::stt::{
        SttError, TranscribeOptions, Transcript, TranscriptionProvider, UploadHandle,
    };
    use serde_json::{Value, json};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "captioner-test-boundary";

    struct ScriptedProvider(fn() -> Result<Transcript, SttError>);

    #[async_trait]
    impl TranscriptionProvider for ScriptedProvider {
        async fn upload(&self, _path: &Path) -> Result<UploadHandle, SttError> {
            Ok(UploadHandle("https://cdn.test/upload".to_string()))
        }

        async fn transcribe(
            &self,
            _handle: &UploadHandle,
            _options: &TranscribeOptions,
        ) -> Result<Transcript, SttError> {
            (self.0)()
        }
    }

    fn ten_words() -> Result<Transcript, SttError> {
        Ok(Transcript::Completed {
            words: (0..10)
                .map(|i| TimedWord::new(format!("w{i}"), i * 200, (i + 1) * 200))
                .collect(),
            language_code: Some("en".to_string()),
            confidence: Some(0.9),
        })
    }

    fn app(
        provider: Option<fn() -> Result<Transcript, SttError>>,
        max_file_size: u64,
    ) -> (TempDir, Router) {
        let tmp = TempDir::new().unwrap();
        let store = MediaStore::open(tmp.path().join("uploads"), max_file_size).unwrap();
        std::fs::write(store.dir().join("clip.mp4"), b"video bytes").unwrap();

        let provider =
            provider.map(|f| Arc::new(ScriptedProvider(f)) as Arc<dyn TranscriptionProvider>);
        let state = AppState {
            captions: CaptionService::new(store, provider),
        };
        (tmp, router(state))
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = send(router, request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn generate(body: Value) -> Request<Body> {
        Request::post("/api/captions/generate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/api/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (_tmp, router) = app(None, 1024);
        let (status, body) =
            send_json(router, Request::get("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_generate_returns_captions() {
        let (_tmp, router) = app(Some(ten_words), 1024);
        let (status, body) = send_json(router, generate(json!({ "videoPath": "clip.mp4" }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["language"], "en");
        assert_eq!(body["duration"], 2.0);
        assert_eq!(body["confidence"], 0.9);
        assert_eq!(body["captions"].as_array().unwrap().len(), 2);
        assert_eq!(body["captions"][1]["text"], "w8 w9");
        assert_eq!(body["captions"][1]["words"][0]["word"], "w8");
        assert_eq!(body["captions"][1]["start"], 1.6);
    }

    #[tokio::test]
    async fn test_generate_requires_video_path() {
        let (_tmp, router) = app(Some(ten_words), 1024);
        let (status, body) = send_json(router.clone(), generate(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No video path provided");

        let request = Request::post("/api/captions/generate")
            .body(Body::from("not json"))
            .unwrap();
        let (status, body) = send_json(router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No video path provided");
    }

    #[tokio::test]
    async fn test_generate_error_statuses() {
        let cases: [(Option<fn() -> Result<Transcript, SttError>>, &str, StatusCode); 6] = [
            (None, "clip.mp4", StatusCode::UNAUTHORIZED),
            (Some(ten_words), "missing.mp4", StatusCode::BAD_REQUEST),
            (Some(|| Err(SttError::Unauthorized)), "clip.mp4", StatusCode::UNAUTHORIZED),
            (Some(|| Err(SttError::RateLimited)), "clip.mp4", StatusCode::TOO_MANY_REQUESTS),
            (
                Some(|| {
                    Ok(Transcript::Completed {
                        words: vec![],
                        language_code: None,
                        confidence: None,
                    })
                }),
                "clip.mp4",
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                Some(|| Ok(Transcript::Failed { message: None })),
                "clip.mp4",
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (provider, video_path, expected) in cases {
            let (_tmp, router) = app(provider, 1024);
            let (status, _) = send_json(router, generate(json!({ "videoPath": video_path }))).await;
            assert_eq!(status, expected, "videoPath={video_path}");
        }
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let (_tmp, router) = app(Some(|| Err(SttError::Timeout)), 1024);
        let (status, body) = send_json(router, generate(json!({ "videoPath": "clip.mp4" }))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to generate captions");
        assert_eq!(body["details"], "Check server logs for more information");
    }

    #[tokio::test]
    async fn test_generate_never_leaves_upload_dir() {
        let (tmp, router) = app(Some(ten_words), 1024);
        std::fs::write(tmp.path().join("outside.mp4"), b"x").unwrap();

        let (status, body) =
            send_json(router, generate(json!({ "videoPath": "../outside.mp4" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "media file not found: ../outside.mp4");
    }

    #[tokio::test]
    async fn test_upload_then_serve() {
        let (_tmp, router) = app(None, 1024);
        let (status, body) = send_json(
            router.clone(),
            multipart("video", "My Clip.mp4", "video/mp4", b"some video"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["size"], 10);
        let filename = body["filename"].as_str().unwrap().to_string();
        assert!(filename.ends_with("-My_Clip.mp4"));
        assert_eq!(body["videoUrl"], format!("/uploads/{filename}"));

        let request = Request::get(format!("/uploads/{filename}"))
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = send(router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"some video");
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let (_tmp, router) = app(None, 16);

        let (status, body) = send_json(
            router.clone(),
            multipart("video", "notes.txt", "text/plain", b"hello"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Only video files are allowed");

        let (status, body) = send_json(
            router.clone(),
            multipart("document", "clip.mp4", "video/mp4", b"hello"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No video file provided");

        let (status, body) = send_json(
            router,
            multipart("video", "big.mp4", "video/mp4", &[0u8; 64]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "File too large. Maximum size is 0MB.");
    }
}
