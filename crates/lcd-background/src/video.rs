use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use opencv::core::Size;
use opencv::prelude::*;
use opencv::{imgproc, videoio};

use crate::error::DecodeError;

/// A clip ≤ this many seconds is decoded entirely into memory up front;
/// longer clips are streamed frame by frame. Matches the vendor library's
/// own preload threshold.
pub const PRELOAD_THRESHOLD_SECS: f64 = 10.0;

/// Playback direction for a preloaded clip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackMode {
    Loop,
    Bounce,
}

/// Which internal state a [`VideoBackground`] picked at construction time.
/// Exposed separately from `VideoBackground` so the 10-second threshold can
/// be unit tested without opening a real video file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Preloaded,
    Streaming,
}

/// Pick [`SourceKind`] for a clip of the given duration. `<= 10.0s` preloads;
/// anything longer streams.
pub fn choose_source_kind(duration_secs: f64) -> SourceKind {
    if duration_secs <= PRELOAD_THRESHOLD_SECS {
        SourceKind::Preloaded
    } else {
        SourceKind::Streaming
    }
}

/// Advance a preloaded clip's frame index by one tick and return the next
/// index plus direction, given the current index/direction and frame count.
/// Pure state transition, factored out so the loop/bounce sequences are
/// unit-testable without a worker thread.
fn advance(index: usize, forward: bool, len: usize) -> (usize, bool) {
    if len <= 1 {
        return (0, forward);
    }
    if forward {
        if index + 1 >= len {
            (len - 2, false)
        } else {
            (index + 1, true)
        }
    } else if index == 0 {
        (1.min(len - 1), true)
    } else {
        (index - 1, false)
    }
}

fn next_index_loop(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        (index + 1) % len
    }
}

enum Source {
    Preloaded { frames: Vec<Vec<u8>>, mode: PlaybackMode },
    Streaming { capture: videoio::VideoCapture },
}

struct Shared {
    current: Mutex<Option<Vec<u8>>>,
    running: AtomicBool,
}

/// One video background source: either a fully-decoded short clip played
/// back from memory, or a long clip decoded on demand. Owns exactly one
/// playback worker thread, started on demand and joined on [`VideoBackground::stop`].
pub struct VideoBackground {
    path: PathBuf,
    fps: f64,
    width: u32,
    height: u32,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    source: Option<Source>,
}

impl VideoBackground {
    /// Open `path`, probe its duration, and decide preload vs. stream.
    /// Does not start the playback worker -- call [`VideoBackground::start`].
    pub fn new(path: &Path, mode: PlaybackMode, width: u32, height: u32) -> Result<Self, DecodeError> {
        if !path.exists() {
            return Err(DecodeError::NotFound(path.to_path_buf()));
        }
        let path_str = path.to_string_lossy().into_owned();
        let mut capture = videoio::VideoCapture::from_file(&path_str, videoio::CAP_ANY)?;
        let opened = videoio::VideoCapture::is_opened(&capture)?;
        if !opened {
            return Err(DecodeError::Video(opencv::Error::new(
                opencv::core::StsError,
                format!("could not open video {path_str}"),
            )));
        }

        let raw_fps = capture.get(videoio::CAP_PROP_FPS)?;
        let fps = if raw_fps > 0.0 { raw_fps } else { 24.0 };
        let frame_count = capture.get(videoio::CAP_PROP_FRAME_COUNT)?;
        let duration = if raw_fps > 0.0 { frame_count / raw_fps } else { 0.0 };

        let source = match choose_source_kind(duration) {
            SourceKind::Preloaded => {
                let frames = decode_all_frames(&mut capture, width, height)?;
                Source::Preloaded { frames, mode }
            }
            SourceKind::Streaming => Source::Streaming { capture },
        };

        Ok(VideoBackground {
            path: path.to_path_buf(),
            fps,
            width,
            height,
            shared: Arc::new(Shared { current: Mutex::new(None), running: AtomicBool::new(false) }),
            worker: None,
            source: Some(source),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start the playback worker. No-op if already running.
    pub fn start(&mut self) {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(source) = self.source.take() else { return };
        let shared = Arc::clone(&self.shared);
        let fps = self.fps;
        let (width, height) = (self.width, self.height);
        self.worker = Some(thread::spawn(move || run_worker(source, shared, fps, width, height)));
    }

    /// Stop the worker and join it. Safe to call when not running.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }

    /// A copy of the current BGR frame, or `None` if the worker hasn't
    /// produced one yet.
    pub fn get_current_frame(&self) -> Option<Vec<u8>> {
        self.shared.current.lock().unwrap().clone()
    }
}

impl Drop for VideoBackground {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(mut source: Source, shared: Arc<Shared>, fps: f64, width: u32, height: u32) {
    match &mut source {
        Source::Preloaded { frames, mode } => {
            if frames.is_empty() {
                return;
            }
            let tick = Duration::from_millis((1000.0 / fps).max(1.0) as u64);
            let mut index = 0usize;
            let mut forward = true;
            while shared.running.load(Ordering::SeqCst) {
                *shared.current.lock().unwrap() = Some(frames[index].clone());
                index = match mode {
                    PlaybackMode::Loop => next_index_loop(index, frames.len()),
                    PlaybackMode::Bounce => {
                        let (next, dir) = advance(index, forward, frames.len());
                        forward = dir;
                        next
                    }
                };
                thread::sleep(tick);
            }
        }
        Source::Streaming { capture } => {
            let tick = Duration::from_millis((1000.0 / fps).max(1.0) as u64);
            while shared.running.load(Ordering::SeqCst) {
                match decode_one_frame(capture, width, height) {
                    Ok(Some(bytes)) => {
                        *shared.current.lock().unwrap() = Some(bytes);
                    }
                    Ok(None) => {
                        let _ = capture.set(videoio::CAP_PROP_POS_FRAMES, 0.0);
                    }
                    Err(e) => {
                        log::warn!("lcd-background: streaming decode failed: {e}");
                    }
                }
                thread::sleep(tick);
            }
        }
    }
}

fn decode_one_frame(
    capture: &mut videoio::VideoCapture,
    width: u32,
    height: u32,
) -> Result<Option<Vec<u8>>, DecodeError> {
    let mut frame = opencv::core::Mat::default();
    capture.read(&mut frame)?;
    if frame.empty() {
        return Ok(None);
    }
    let mut resized = opencv::core::Mat::default();
    imgproc::resize(
        &frame,
        &mut resized,
        Size::new(width as i32, height as i32),
        0.0,
        0.0,
        imgproc::INTER_LANCZOS4,
    )?;
    Ok(Some(resized.data_bytes()?.to_vec()))
}

fn decode_all_frames(
    capture: &mut videoio::VideoCapture,
    width: u32,
    height: u32,
) -> Result<Vec<Vec<u8>>, DecodeError> {
    let mut frames = Vec::new();
    loop {
        match decode_one_frame(capture, width, height)? {
            Some(bytes) => frames.push(bytes),
            None => break,
        }
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_seconds_exactly_preloads() {
        assert_eq!(choose_source_kind(10.0), SourceKind::Preloaded);
    }

    #[test]
    fn just_over_ten_seconds_streams() {
        assert_eq!(choose_source_kind(10.001), SourceKind::Streaming);
    }

    #[test]
    fn loop_sequence_wraps_modulo_len() {
        let mut idx = 0usize;
        let mut seq = Vec::new();
        for _ in 0..53 {
            seq.push(idx);
            idx = next_index_loop(idx, 48);
        }
        let mut expected: Vec<usize> = (0..48).collect();
        expected.extend(0..5);
        assert_eq!(seq, expected);
    }

    #[test]
    fn bounce_sequence_reverses_at_endpoints() {
        let len = 5usize;
        let mut idx = 0usize;
        let mut forward = true;
        let mut seq = Vec::new();
        for _ in 0..9 {
            seq.push(idx);
            let (next, dir) = advance(idx, forward, len);
            idx = next;
            forward = dir;
        }
        assert_eq!(seq, vec![0, 1, 2, 3, 4, 3, 2, 1, 0]);
    }
}
