//! Produces the next 320x240 RGB frame to show on the panel before the host
//! GUI draws its text overlays on top: a cached static image, a video
//! (preloaded or streamed depending on length), an alpha composite of the
//! two, or a deterministic synthetic gradient when nothing else is
//! available. [`Compositor::get_background_bytes`] never fails.

mod error;
mod gradient;
mod image_cache;
mod video;

pub use error::DecodeError;
pub use gradient::{default_gradient, synthetic_gradient_rgb};
pub use image_cache::{CacheKey, CachedImage};
pub use video::{choose_source_kind, PlaybackMode, SourceKind, VideoBackground, PRELOAD_THRESHOLD_SECS};

use std::path::{Path, PathBuf};

use lcd_pixel::{FRAME_HEIGHT, FRAME_WIDTH};

const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

/// Owns the static-image cache and the current video source, and produces
/// composited 320x240 RGB frames on demand. Intended to be called from a
/// single thread (the host's frame pump).
pub struct Compositor {
    cache: Option<(CacheKey, CachedImage)>,
    video: Option<VideoBackground>,
    video_path: Option<PathBuf>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    pub fn new() -> Self {
        Compositor { cache: None, video: None, video_path: None }
    }

    /// Produce the next 320x240 RGB frame. Never fails: any decode error or
    /// absent source falls back to the synthetic gradient.
    pub fn get_background_bytes(&mut self, video_path: &str, image_path: &str) -> Vec<u8> {
        let image = self.resolve_image(image_path);
        let video_rgb = self.resolve_video(video_path);

        match (image, video_rgb) {
            (Some(img), Some(video_rgb)) if img.has_alpha() => {
                alpha_composite(&img, &video_rgb)
            }
            (Some(img), _) => image_to_rgb_bytes(&img),
            (None, Some(video_rgb)) => video_rgb,
            (None, None) => default_gradient(),
        }
    }

    /// Stop and join any active video worker.
    pub fn stop(&mut self) {
        if let Some(video) = &mut self.video {
            video.stop();
        }
    }

    fn resolve_image(&mut self, image_path: &str) -> Option<CachedImage> {
        if image_path.is_empty() {
            return None;
        }
        let path = Path::new(image_path);
        if !path.exists() {
            return None;
        }
        let key = CacheKey::for_path(path);
        if let Some((cached_key, cached)) = &self.cache {
            if cached_key == &key {
                return Some(cached.clone());
            }
        }
        match image_cache::load_image(path, FRAME_WIDTH as u32, FRAME_HEIGHT as u32) {
            Ok(img) => {
                self.cache = Some((key, img.clone()));
                Some(img)
            }
            Err(e) => {
                log::warn!("lcd-background: image decode failed for {image_path}: {e}");
                None
            }
        }
    }

    fn resolve_video(&mut self, video_path: &str) -> Option<Vec<u8>> {
        if video_path.is_empty() {
            self.teardown_video();
            return None;
        }
        if !has_video_extension(video_path) {
            let err = DecodeError::UnsupportedExtension(PathBuf::from(video_path));
            log::warn!("lcd-background: {err}");
            self.teardown_video();
            return None;
        }
        let path = PathBuf::from(video_path);
        if self.video_path.as_deref() != Some(path.as_path()) {
            self.teardown_video();
            match VideoBackground::new(&path, PlaybackMode::Loop, FRAME_WIDTH as u32, FRAME_HEIGHT as u32) {
                Ok(mut vb) => {
                    vb.start();
                    self.video = Some(vb);
                    self.video_path = Some(path);
                }
                Err(e) => {
                    log::warn!("lcd-background: video open failed for {video_path}: {e}");
                    return None;
                }
            }
        }
        self.video.as_ref().and_then(VideoBackground::get_current_frame).map(|bgr| bgr_to_rgb(&bgr))
    }

    /// Stop and drop the active video worker, if any. Called whenever the
    /// caller's `video_path` goes away or stops being a usable video so the
    /// playback thread doesn't keep running with nothing reading its frames.
    fn teardown_video(&mut self) {
        if let Some(mut old) = self.video.take() {
            old.stop();
        }
        self.video_path = None;
    }
}

impl Drop for Compositor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn has_video_extension(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn bgr_to_rgb(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    for px in out.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    out
}

fn image_to_rgb_bytes(img: &CachedImage) -> Vec<u8> {
    match img {
        CachedImage::Rgb(buf) => buf.as_raw().clone(),
        CachedImage::Rgba(buf) => buf.pixels().flat_map(|p| [p[0], p[1], p[2]]).collect(),
    }
}

/// `F.rgb * alpha + V.rgb * (1 - alpha)`, per pixel, alpha taken from the
/// foreground's alpha channel. `video_rgb` must already be 320x240 RGB.
fn alpha_composite(fg: &CachedImage, video_rgb: &[u8]) -> Vec<u8> {
    let CachedImage::Rgba(buf) = fg else {
        return image_to_rgb_bytes(fg);
    };
    let mut out = Vec::with_capacity(video_rgb.len());
    for (i, px) in buf.pixels().enumerate() {
        let alpha = px[3] as f32 / 255.0;
        let base = i * 3;
        for c in 0..3 {
            let f = px[c] as f32;
            let v = *video_rgb.get(base + c).unwrap_or(&0) as f32;
            let blended = f * alpha + v * (1.0 - alpha);
            out.push(blended.round().clamp(0.0, 255.0) as u8);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    #[test]
    fn neither_path_falls_back_to_gradient() {
        let mut c = Compositor::new();
        let a = c.get_background_bytes("", "");
        assert_eq!(a.len(), FRAME_WIDTH * FRAME_HEIGHT * 3);
        assert!(a.iter().any(|&b| b != 0));
        let b = c.get_background_bytes("", "");
        assert_eq!(a, b);
    }

    #[test]
    fn unsupported_video_extension_is_ignored() {
        assert!(!has_video_extension("clip.gif"));
        assert!(has_video_extension("clip.MP4"));
        assert!(has_video_extension("clip.mkv"));
    }

    #[test]
    fn alpha_compose_splits_left_right() {
        let width = FRAME_WIDTH as u32;
        let height = FRAME_HEIGHT as u32;
        let mut buf: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(width, height);
        for (x, _y, px) in buf.enumerate_pixels_mut() {
            let alpha = if x < width / 2 { 0 } else { 255 };
            *px = Rgba([0, 0, 0, alpha]);
        }
        let fg = CachedImage::Rgba(buf);
        let video_rgb = vec![100u8; FRAME_WIDTH * FRAME_HEIGHT * 3];
        let out = alpha_composite(&fg, &video_rgb);

        let left_px = &out[0..3];
        assert_eq!(left_px, &[100, 100, 100]);
        let right_col = (width - 1) as usize;
        let right_base = right_col * 3;
        assert_eq!(&out[right_base..right_base + 3], &[0, 0, 0]);
    }

    #[test]
    fn bgr_to_rgb_swaps_channels() {
        let bgr = vec![1u8, 2, 3, 4, 5, 6];
        let rgb = bgr_to_rgb(&bgr);
        assert_eq!(rgb, vec![3, 2, 1, 6, 5, 4]);
    }
}
