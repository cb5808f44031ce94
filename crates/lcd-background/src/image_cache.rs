use std::path::{Path, PathBuf};
use std::time::SystemTime;

use image::imageops::FilterType;
use image::{ImageBuffer, Rgb, Rgba};

use crate::error::DecodeError;

/// A decoded still image resized to the panel's frame size, keeping whatever
/// channel count the source had (BGR vs BGRA in spec terms; this crate keeps
/// `image`'s native RGB/RGBA ordering internally and only the compositor's
/// public boundary deals in the device's RGB-out contract).
#[derive(Clone)]
pub enum CachedImage {
    Rgb(ImageBuffer<Rgb<u8>, Vec<u8>>),
    Rgba(ImageBuffer<Rgba<u8>, Vec<u8>>),
}

impl CachedImage {
    pub fn width(&self) -> u32 {
        match self {
            CachedImage::Rgb(b) => b.width(),
            CachedImage::Rgba(b) => b.width(),
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, CachedImage::Rgba(_))
    }
}

/// Cache key: the path plus its last-modified time. Any mismatch -- a
/// different path, or the same path with a changed mtime -- invalidates the
/// cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheKey {
    pub path: PathBuf,
    pub mtime: Option<SystemTime>,
}

impl CacheKey {
    pub fn for_path(path: &Path) -> Self {
        let mtime = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        CacheKey { path: path.to_path_buf(), mtime }
    }
}

/// Load, decode, and resize an image to the panel's fixed frame size,
/// preserving its alpha channel if the source had one.
pub fn load_image(path: &Path, width: u32, height: u32) -> Result<CachedImage, DecodeError> {
    if !path.exists() {
        return Err(DecodeError::NotFound(path.to_path_buf()));
    }
    let dynamic = image::open(path)?;
    if dynamic.color().has_alpha() {
        let resized = image::imageops::resize(&dynamic.to_rgba8(), width, height, FilterType::Lanczos3);
        Ok(CachedImage::Rgba(resized))
    } else {
        let resized = image::imageops::resize(&dynamic.to_rgb8(), width, height, FilterType::Lanczos3);
        Ok(CachedImage::Rgb(resized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_differs_on_path() {
        let a = CacheKey { path: PathBuf::from("a.png"), mtime: None };
        let b = CacheKey { path: PathBuf::from("b.png"), mtime: None };
        assert_ne!(a, b);
    }

    #[test]
    fn cache_key_differs_on_mtime() {
        let a = CacheKey { path: PathBuf::from("a.png"), mtime: Some(SystemTime::UNIX_EPOCH) };
        let b = CacheKey { path: PathBuf::from("a.png"), mtime: None };
        assert_ne!(a, b);
    }

    #[test]
    fn missing_path_is_not_found() {
        let err = load_image(Path::new("/nonexistent/path/does-not-exist.png"), 320, 240).unwrap_err();
        assert!(matches!(err, DecodeError::NotFound(_)));
    }
}
