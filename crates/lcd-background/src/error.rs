use std::fmt;
use std::path::PathBuf;

/// Reasons a lower-level decode step can fail. Never surfaces from
/// [`crate::Compositor::get_background_bytes`] itself -- that entry point
/// swallows every variant and falls back to another source or the synthetic
/// gradient. It exists so tests (and callers probing a file directly) can
/// see *why* a fallback was taken.
#[derive(Debug)]
pub enum DecodeError {
    /// The path does not exist or could not be opened.
    NotFound(PathBuf),
    /// The `image` crate failed to decode a still image.
    Image(image::ImageError),
    /// OpenCV failed to open or decode a video.
    Video(opencv::Error),
    /// The path's extension is not one of the supported video extensions.
    UnsupportedExtension(PathBuf),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::NotFound(p) => write!(f, "path not found: {}", p.display()),
            DecodeError::Image(e) => write!(f, "image decode failed: {e}"),
            DecodeError::Video(e) => write!(f, "video decode failed: {e}"),
            DecodeError::UnsupportedExtension(p) => {
                write!(f, "unsupported video extension: {}", p.display())
            }
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Image(e) => Some(e),
            DecodeError::Video(e) => Some(e),
            DecodeError::NotFound(_) | DecodeError::UnsupportedExtension(_) => None,
        }
    }
}

impl From<image::ImageError> for DecodeError {
    fn from(e: image::ImageError) -> Self {
        DecodeError::Image(e)
    }
}

impl From<opencv::Error> for DecodeError {
    fn from(e: opencv::Error) -> Self {
        DecodeError::Video(e)
    }
}
