mod error;
pub mod grouping;

pub use error::{CaptionError, ErrorKind, GroupError};
pub use grouping::group_words;

use crate::config::Settings;
use crate::domain::{TranscriptionResult, UNDETECTED_LANGUAGE, ms_to_seconds};
use crate::media::MediaStore;
use crate::stt::{AssemblyAi, SttError, TranscribeOptions, Transcript, TranscriptionProvider};
use std::sync::Arc;

pub const WORDS_PER_SEGMENT: usize = 8;

/// Turns a stored media reference into caption segments via the transcription provider.
#[derive(Clone)]
pub struct CaptionService {
    store: MediaStore,
    provider: Option<Arc<dyn TranscriptionProvider>>,
}

impl CaptionService {
    /// `provider` is `None` when no credential is configured; every call then
    /// fails with [`CaptionError::NotConfigured`].
    pub fn new(store: MediaStore, provider: Option<Arc<dyn TranscriptionProvider>>) -> Self {
        Self { store, provider }
    }

    pub fn from_settings(settings: &Settings, store: MediaStore) -> Self {
        let provider = AssemblyAi::from_settings(settings)
            .map(|client| Arc::new(client) as Arc<dyn TranscriptionProvider>);
        Self::new(store, provider)
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn store(&self) -> &MediaStore {
        &self.store
    }

    /// Uploads the referenced media, waits for its transcript, and groups the
    /// words into segments of [`WORDS_PER_SEGMENT`].
    ///
    /// # Errors
    ///
    /// - [`CaptionError::NotConfigured`] before any I/O when no provider is set.
    /// - [`CaptionError::MediaNotFound`] when the reference does not name a
    ///   file in the upload directory. Directory components are ignored.
    /// - [`CaptionError::Transcription`] for any provider failure, including
    ///   a job that ends in the error state.
    /// - [`CaptionError::NoSpeechDetected`] when the transcript has no words.
    pub async fn generate_captions(
        &self,
        media_reference: &str,
    ) -> Result<TranscriptionResult, CaptionError> {
        let provider = self.provider.as_ref().ok_or(CaptionError::NotConfigured)?;

        let path = self
            .store
            .resolve(media_reference)
            .filter(|p| self.store.exists(p))
            .ok_or_else(|| CaptionError::MediaNotFound(media_reference.to_string()))?;

        tracing::info!(reference = %media_reference, path = %path.display(), "media_upload_started");
        let handle = provider.upload(&path).await?;

        tracing::info!(reference = %media_reference, "transcription_requested");
        let transcript = provider
            .transcribe(&handle, &TranscribeOptions::default())
            .await?;

        let (words, language_code, confidence) = match transcript {
            Transcript::Failed { message } => {
                let message = message.unwrap_or_else(|| "Transcription failed".to_string());
                tracing::warn!(reference = %media_reference, error = %message, "transcription_failed");
                return Err(SttError::JobFailed(message).into());
            }
            Transcript::Completed {
                words,
                language_code,
                confidence,
            } => (words, language_code, confidence),
        };

        tracing::info!(reference = %media_reference, word_count = words.len(), "transcription_completed");

        let Some(last) = words.last() else {
            return Err(CaptionError::NoSpeechDetected);
        };
        let duration = ms_to_seconds(last.end_ms);

        let captions = group_words(&words, WORDS_PER_SEGMENT)?;
        let language = language_code.unwrap_or_else(|| UNDETECTED_LANGUAGE.to_string());

        tracing::info!(
            reference = %media_reference,
            segments = captions.len(),
            language = %language,
            duration,
            "captions_generated"
        );

        Ok(TranscriptionResult {
            captions,
            language,
            duration,
            confidence,
        })
    }
}
