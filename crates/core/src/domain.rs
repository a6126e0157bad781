use serde::{Deserialize, Serialize};

/// Language reported when the provider does not detect one.
pub const UNDETECTED_LANGUAGE: &str = "auto-detected";

/// A word as reported by the transcription provider, timed in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedWord {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TimedWord {
    pub fn new(text: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            text: text.into(),
            start_ms,
            end_ms,
        }
    }
}

/// Converts a provider timestamp in milliseconds to seconds.
pub fn ms_to_seconds(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl From<&TimedWord> for CaptionWord {
    fn from(w: &TimedWord) -> Self {
        Self {
            word: w.text.clone(),
            start: ms_to_seconds(w.start_ms),
            end: ms_to_seconds(w.end_ms),
        }
    }
}

/// A contiguous run of words shown together as one subtitle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub words: Vec<CaptionWord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub captions: Vec<CaptionSegment>,
    pub language: String,
    /// End of the last spoken word, in seconds.
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}
