use crate::config::Settings;
use miette::Diagnostic;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

const FALLBACK_NAME: &str = "video";

#[derive(Error, Debug, Diagnostic)]
pub enum MediaError {
    #[error("File not found: {0}")]
    #[diagnostic(help("Check that the file path is correct and the file exists"))]
    FileNotFound(String),

    #[error("File is empty")]
    FileEmpty,

    #[error("File too large. Maximum size is {limit_mb}MB.")]
    FileTooLarge { limit_mb: u64 },

    #[error("Only video files are allowed")]
    NotVideo,

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file written into the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

/// The server-controlled directory holding uploaded media, addressed by filename.
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
    max_file_size: u64,
}

impl MediaStore {
    /// Opens the upload directory, creating it when missing.
    ///
    /// The directory is canonicalized so every resolved reference can be
    /// compared against an absolute prefix.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Io` if the directory cannot be created or canonicalized.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use captioner_core::{MediaError, MediaStore};
    /// # fn example() -> Result<(), MediaError> {
    /// let store = MediaStore::open("uploads", 500 * 1024 * 1024)?;
    /// assert!(store.dir().is_absolute());
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(dir: impl AsRef<Path>, max_file_size: u64) -> Result<Self, MediaError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        Ok(Self {
            dir: std::fs::canonicalize(dir)?,
            max_file_size,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, MediaError> {
        Self::open(&settings.upload_dir, settings.max_file_size)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    fn limit_error(&self) -> MediaError {
        MediaError::FileTooLarge {
            limit_mb: self.max_file_size / (1024 * 1024),
        }
    }

    /// Maps a caller-supplied reference to a path inside the upload directory.
    ///
    /// Only the final path component of `reference` is used, so
    /// `"../../etc/passwd"` resolves to `<upload dir>/passwd`. Returns `None`
    /// when the reference has no filename at all (`""`, `".."`, `"/"`).
    pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
        Path::new(reference)
            .file_name()
            .map(|name| self.dir.join(name))
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Starts writing a new upload. `content_type` is the type declared by the client.
    ///
    /// Bytes go to a hidden temporary file inside the upload directory; the
    /// stored name only appears once [`UploadWriter::finish`] succeeds.
    pub async fn begin_upload(
        &self,
        original_name: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<UploadWriter, MediaError> {
        if !content_type.is_some_and(is_video_mime) {
            tracing::debug!(content_type = ?content_type, "upload_rejected_content_type");
            return Err(MediaError::NotVideo);
        }

        let filename = stored_filename(original_name.unwrap_or(FALLBACK_NAME));
        let path = self.dir.join(&filename);
        let (file, temp) = tempfile::Builder::new()
            .prefix(".upload-")
            .tempfile_in(&self.dir)?
            .into_parts();

        Ok(UploadWriter {
            file: fs::File::from_std(file),
            temp: Some(temp),
            filename,
            path,
            size: 0,
            limit: self.max_file_size,
        })
    }

    /// Copies a local video file into the upload directory.
    ///
    /// # Errors
    ///
    /// - `MediaError::FileNotFound` if `source` does not exist
    /// - `MediaError::FileEmpty` / `MediaError::FileTooLarge` on size checks
    /// - `MediaError::NotVideo` unless the file signature is a video type
    /// - `MediaError::Io` if the copy fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use captioner_core::{MediaError, MediaStore};
    /// # async fn example() -> Result<(), MediaError> {
    /// let store = MediaStore::open("uploads", 500 * 1024 * 1024)?;
    /// let stored = store.import_file("talk.mp4".as_ref()).await?;
    /// println!("stored as {}", stored.filename);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn import_file(&self, source: &Path) -> Result<StoredMedia, MediaError> {
        if !source.exists() {
            return Err(MediaError::FileNotFound(source.display().to_string()));
        }

        let metadata = fs::metadata(source).await?;
        if metadata.len() == 0 {
            return Err(MediaError::FileEmpty);
        }
        if metadata.len() > self.max_file_size {
            return Err(self.limit_error());
        }

        let kind = infer::get_from_path(source)?.ok_or(MediaError::NotVideo)?;
        if !is_video_mime(kind.mime_type()) {
            return Err(MediaError::NotVideo);
        }

        let original = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(FALLBACK_NAME);
        let filename = stored_filename(original);
        let path = self.dir.join(&filename);
        let temp = tempfile::Builder::new()
            .prefix(".import-")
            .tempfile_in(&self.dir)?
            .into_temp_path();
        let size = fs::copy(source, &temp).await?;
        persist_new(temp, &path)?;

        tracing::info!(source = %source.display(), stored = %filename, size_bytes = size, "media_imported");

        Ok(StoredMedia {
            filename,
            path,
            size,
        })
    }
}

/// Streams one upload to disk, enforcing the size limit and sniffing the
/// first chunk for a non-video signature.
///
/// Dropping the writer before `finish` removes the temporary file.
#[derive(Debug)]
pub struct UploadWriter {
    file: fs::File,
    temp: Option<TempPath>,
    filename: String,
    path: PathBuf,
    size: u64,
    limit: u64,
}

impl UploadWriter {
    /// Appends a chunk. On error the partial file is removed.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), MediaError> {
        if self.temp.is_none() {
            return Err(discarded());
        }

        if self.size == 0
            && let Some(kind) = infer::get(chunk)
            && !is_video_mime(kind.mime_type())
        {
            tracing::debug!(detected = kind.mime_type(), "upload_rejected_signature");
            self.remove();
            return Err(MediaError::NotVideo);
        }

        self.size += chunk.len() as u64;
        if self.size > self.limit {
            self.remove();
            return Err(MediaError::FileTooLarge {
                limit_mb: self.limit / (1024 * 1024),
            });
        }

        if let Err(err) = self.file.write_all(chunk).await {
            self.remove();
            return Err(err.into());
        }
        Ok(())
    }

    /// Moves the completed upload to its stored name. Never replaces an existing file.
    pub async fn finish(mut self) -> Result<StoredMedia, MediaError> {
        if self.size == 0 {
            self.remove();
            return Err(MediaError::FileEmpty);
        }

        self.file.flush().await?;

        let UploadWriter {
            file,
            temp,
            filename,
            path,
            size,
            ..
        } = self;
        drop(file);
        persist_new(temp.ok_or_else(discarded)?, &path)?;

        Ok(StoredMedia {
            filename,
            path,
            size,
        })
    }

    /// Drops the partially written file.
    pub async fn discard(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if let Some(temp) = self.temp.take()
            && let Err(err) = temp.close()
        {
            tracing::warn!(path = %self.path.display(), error = %err, "upload_cleanup_failed");
        }
    }
}

fn discarded() -> MediaError {
    MediaError::Io(std::io::Error::other("upload was already discarded"))
}

/// Renames `temp` to `target`, failing if `target` already exists.
fn persist_new(temp: TempPath, target: &Path) -> Result<(), MediaError> {
    temp.persist_noclobber(target)
        .map_err(|err| MediaError::Io(err.error))
}

fn is_video_mime(mime: &str) -> bool {
    mime.starts_with("video/")
}

/// Replaces every character outside `[A-Za-z0-9.-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `<unix millis>-<sanitized name>`
pub fn stored_filename(original: &str) -> String {
    format!(
        "{}-{}",
        chrono::Utc::now().timestamp_millis(),
        sanitize_filename(original)
    )
}
