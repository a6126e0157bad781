pub mod captions;
pub mod config;
pub mod domain;
pub mod media;
pub mod stt;

pub use captions::{CaptionError, CaptionService, ErrorKind};
pub use config::Settings;
pub use domain::{CaptionSegment, CaptionWord, TimedWord, TranscriptionResult};
pub use media::{MediaError, MediaStore, StoredMedia};
