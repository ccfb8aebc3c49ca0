//! Video adapter: seek-and-capture sampling over an ffmpeg subprocess.
//!
//! Video frames are not decoded sequentially. A bounded set of timestamps
//! is planned from the duration and target fps, and each one is captured by
//! an independent seek that is abandoned if it does not complete in time.

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use image::RgbaImage;
use serde::Deserialize;

use super::still::flatten_onto_black;
use super::types::{IngestSettings, MediaError};
use crate::pipeline::CancelToken;

/// A video that can report its length and produce the frame at any time.
pub trait SeekableVideo: fmt::Debug + Send + Sync {
    fn duration(&self) -> Duration;

    /// Natural `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Capture the frame at `timestamp`, failing with
    /// [`MediaError::SeekTimeout`] if it takes longer than `timeout`.
    fn capture_at(&self, timestamp: Duration, timeout: Duration) -> Result<RgbaImage, MediaError>;
}

/// Evenly spaced capture timestamps covering the video.
///
/// `min(limit, floor(duration * fps))` frames, with at least one frame for
/// any positive duration. Frame `i` is taken at `i * duration / count`.
pub fn frame_timestamps(duration: Duration, fps: u32, limit: u32) -> Vec<Duration> {
    let secs = duration.as_secs_f64();
    if secs <= 0.0 || fps == 0 || limit == 0 {
        return Vec::new();
    }
    let count = ((secs * fps as f64).floor() as u64).min(limit as u64).max(1);
    let interval = secs / count as f64;
    (0..count)
        .map(|i| Duration::from_secs_f64(i as f64 * interval))
        .collect()
}

/// Capture every planned frame in order, handing each to `sink`.
///
/// Timed-out or missing frames are skipped with a warning; anything else
/// aborts. Returns the number of frames handed over.
pub fn capture_frames(
    video: &dyn SeekableVideo,
    settings: &IngestSettings,
    cancel: &CancelToken,
    mut sink: impl FnMut(RgbaImage),
) -> Result<usize, MediaError> {
    let timestamps = frame_timestamps(video.duration(), settings.target_fps, settings.frame_limit);
    log::info!(
        "Capturing {} frames from {:?} video",
        timestamps.len(),
        video.duration()
    );

    let mut captured = 0;
    for (i, ts) in timestamps.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(MediaError::Cancelled);
        }
        match video.capture_at(*ts, settings.seek_timeout) {
            Ok(mut frame) => {
                flatten_onto_black(&mut frame);
                sink(frame);
                captured += 1;
            }
            Err(e) if e.is_frame_skippable() => {
                log::warn!("Skipping video frame {} at {:?}: {}", i, ts, e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(captured)
}

/// Video backed by `ffprobe` for metadata and one `ffmpeg` run per seek.
#[derive(Debug, Clone)]
pub struct FfmpegVideo {
    locator: String,
    duration: Duration,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl FfmpegVideo {
    /// Read duration and frame size with `ffprobe`.
    pub fn probe(locator: &str, timeout: Duration) -> Result<Self, MediaError> {
        let mut cmd = Command::new("ffprobe");
        cmd.args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height:format=duration",
            "-of",
            "json",
            locator,
        ]);
        let output = run_with_timeout(cmd, timeout, locator)?
            .ok_or_else(|| MediaError::load(locator, format!("probe timed out after {:?}", timeout)))?;
        Self::from_probe_json(locator, &output)
    }

    fn from_probe_json(locator: &str, json: &[u8]) -> Result<Self, MediaError> {
        let probe: ProbeOutput = serde_json::from_slice(json)
            .map_err(|e| MediaError::load(locator, format!("unreadable probe output: {}", e)))?;

        let stream = probe
            .streams
            .first()
            .ok_or_else(|| MediaError::load(locator, "no video stream"))?;
        let (width, height) = match (stream.width, stream.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
            _ => return Err(MediaError::load(locator, "video stream has no frame size")),
        };
        let seconds = probe
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| MediaError::load(locator, "unknown duration"))?;

        log::info!(
            "Probed video {}: {}x{}, {:.2}s",
            locator,
            width,
            height,
            seconds
        );
        Ok(Self {
            locator: locator.to_string(),
            duration: Duration::from_secs_f64(seconds),
            width,
            height,
        })
    }
}

impl SeekableVideo for FfmpegVideo {
    fn duration(&self) -> Duration {
        self.duration
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn capture_at(&self, timestamp: Duration, timeout: Duration) -> Result<RgbaImage, MediaError> {
        let seek = format!("{:.3}", timestamp.as_secs_f64());
        let scale = format!("scale={}:{}", self.width, self.height);
        let mut cmd = Command::new("ffmpeg");
        cmd.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostdin",
            "-ss",
            seek.as_str(),
            "-i",
            self.locator.as_str(),
            "-frames:v",
            "1",
            "-vf",
            scale.as_str(),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-",
        ]);

        let mut raw = run_with_timeout(cmd, timeout, &self.locator)?
            .ok_or(MediaError::SeekTimeout { timestamp, timeout })?;
        // seeking past the last frame produces no output
        let expected = self.width as usize * self.height as usize * 4;
        if raw.len() < expected {
            return Err(MediaError::NoFrame { timestamp });
        }
        raw.truncate(expected);
        RgbaImage::from_raw(self.width, self.height, raw).ok_or(MediaError::NoFrame { timestamp })
    }
}

/// Run `cmd` to completion and return its stdout, or `None` if it did not
/// finish within `timeout` (the process is killed).
fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    locator: &str,
) -> Result<Option<Vec<u8>>, MediaError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MediaError::FfmpegNotFound
        } else {
            MediaError::Io(e)
        }
    })?;

    let mut stdout = match child.stdout.take() {
        Some(s) => s,
        None => {
            reap(&mut child);
            return Err(MediaError::load(locator, "subprocess has no stdout"));
        }
    };

    // stderr gets its own reader so a chatty process never blocks on a full pipe
    let stderr_thread = child.stderr.take().map(|stderr| {
        thread::spawn(move || {
            let reader = BufReader::new(stderr);
            let mut lines = Vec::new();
            for line in reader.lines() {
                match line {
                    Ok(l) => {
                        log::trace!("[ffmpeg] {}", l);
                        lines.push(l);
                    }
                    Err(_) => break,
                }
            }
            lines
        })
    });

    // stdout is drained on its own thread so the wait below can time out
    let (tx, rx) = mpsc::sync_channel(1);
    let spawned = thread::Builder::new()
        .name("textreel-ffmpeg-reader".to_string())
        .spawn(move || {
            let mut buf = Vec::new();
            let result = stdout.read_to_end(&mut buf).map(|_| buf);
            let _ = tx.send(result);
        });
    if let Err(e) = spawned {
        reap(&mut child);
        return Err(MediaError::Io(e));
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(buf)) => {
            let status = child.wait()?;
            if status.success() {
                Ok(Some(buf))
            } else {
                let stderr = stderr_thread
                    .and_then(|h| h.join().ok())
                    .unwrap_or_default()
                    .join("\n");
                Err(MediaError::load(
                    locator,
                    format!("exited with {}: {}", status, stderr.trim()),
                ))
            }
        }
        Ok(Err(e)) => {
            reap(&mut child);
            Err(MediaError::Io(e))
        }
        Err(RecvTimeoutError::Timeout) => {
            log::debug!("Subprocess for {} timed out after {:?}", locator, timeout);
            reap(&mut child);
            Ok(None)
        }
        Err(RecvTimeoutError::Disconnected) => {
            reap(&mut child);
            Err(MediaError::load(locator, "reader thread exited unexpectedly"))
        }
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
