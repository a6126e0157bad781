use super::{SttError, TranscribeOptions, Transcript, TranscriptionProvider, UploadHandle};
use crate::config::Settings;
use crate::domain::TimedWord;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// AssemblyAI REST client: upload, create a transcript job, poll it to completion.
///
/// This is the only place that knows the provider's JSON shapes; everything
/// it returns is already a [`Transcript`].
#[derive(Debug, Clone)]
pub struct AssemblyAi {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
    language_detection: bool,
    format_text: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: JobStatus,
    #[serde(default)]
    words: Option<Vec<WordResponse>>,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WordResponse {
    text: String,
    start: u64,
    end: u64,
}

impl TranscriptResponse {
    fn into_transcript(self) -> Result<Transcript, SttError> {
        if self.status == JobStatus::Error {
            return Ok(Transcript::Failed {
                message: self.error,
            });
        }

        let words = self
            .words
            .unwrap_or_default()
            .into_iter()
            .map(|w| {
                if w.start > w.end {
                    return Err(SttError::Decode(format!(
                        "word {:?} ends at {}ms before it starts at {}ms",
                        w.text, w.end, w.start
                    )));
                }
                Ok(TimedWord::new(w.text, w.start, w.end))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Transcript::Completed {
            words,
            language_code: self.language_code,
            confidence: self.confidence,
        })
    }
}

impl AssemblyAi {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: crate::config::DEFAULT_ASSEMBLYAI_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(3),
            timeout: Duration::from_secs(600),
        }
    }

    /// Builds a client from settings, or `None` when no API key is configured.
    ///
    /// Base URL, poll interval and overall transcription timeout are taken from
    /// `settings`; a blank `assemblyai_api_key` counts as missing.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use captioner_core::Settings;
    /// # use captioner_core::stt::AssemblyAi;
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let settings = Settings::load()?;
    /// match AssemblyAi::from_settings(&settings) {
    ///     Some(_client) => println!("AssemblyAI configured"),
    ///     None => eprintln!("ASSEMBLYAI_API_KEY is not set"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let key = settings.api_key()?;

        Some(
            Self::new(key)
                .with_base_url(&settings.assemblyai_base_url)
                .with_poll_interval(settings.poll_interval())
                .with_timeout(settings.transcription_timeout()),
        )
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Upper bound on how long a transcript job may take to reach a terminal state.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SttError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SttError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(SttError::RateLimited),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(SttError::Api {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn fetch(&self, id: &str) -> Result<TranscriptResponse, SttError> {
        let response = self
            .client
            .get(self.url(&format!("/v2/transcript/{id}")))
            .header(AUTHORIZATION, &self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn wait_for(&self, mut job: TranscriptResponse) -> Result<TranscriptResponse, SttError> {
        while !job.status.is_terminal() {
            tracing::debug!(transcript_id = %job.id, status = ?job.status, "transcription_pending");
            tokio::time::sleep(self.poll_interval).await;
            job = self.fetch(&job.id).await?;
        }

        Ok(job)
    }
}

#[async_trait]
impl TranscriptionProvider for AssemblyAi {
    async fn upload(&self, path: &Path) -> Result<UploadHandle, SttError> {
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();

        tracing::debug!(path = %path.display(), size_bytes = size, "assemblyai_upload");

        let response = self
            .client
            .post(self.url("/v2/upload"))
            .header(AUTHORIZATION, &self.api_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::from(file))
            .send()
            .await?;

        let uploaded: UploadResponse = Self::check(response).await?.json().await?;
        Ok(UploadHandle(uploaded.upload_url))
    }

    async fn transcribe(
        &self,
        handle: &UploadHandle,
        options: &TranscribeOptions,
    ) -> Result<Transcript, SttError> {
        let request = TranscriptRequest {
            audio_url: handle.as_str(),
            language_detection: options.language_detection,
            format_text: options.format_text,
        };

        let response = self
            .client
            .post(self.url("/v2/transcript"))
            .header(AUTHORIZATION, &self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let job: TranscriptResponse = Self::check(response).await?.json().await?;
        tracing::info!(transcript_id = %job.id, "assemblyai_transcript_created");

        let finished = tokio::time::timeout(self.timeout, self.wait_for(job))
            .await
            .map_err(|_| SttError::Timeout)??;

        finished.into_transcript()
    }
}
