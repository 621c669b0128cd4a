//! FFmpeg recording backend
//!
//! Samples the composite stream at the recording frame rate and pipes raw
//! RGBA frames into an FFmpeg child process. The container is written to a
//! scratch directory that is removed once the artifact has been read back
//! into memory.

use super::engine::{RecorderBackend, RecorderOptions, RecordingEngine};
use super::{RecordedArtifact, SinkError};
use crate::capture::StreamHandle;
use crate::geometry::Dimension;
use anyhow::Context;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Backend spawning one FFmpeg process per recording
#[derive(Debug, Clone)]
pub struct FfmpegRecorderBackend {
    binary: PathBuf,
}

impl FfmpegRecorderBackend {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegRecorderBackend {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl RecorderBackend for FfmpegRecorderBackend {
    fn create(
        &self,
        stream: StreamHandle,
        options: &RecorderOptions,
    ) -> Result<Box<dyn RecordingEngine>, SinkError> {
        Ok(Box::new(FfmpegEngine::new(
            self.binary.clone(),
            stream,
            *options,
        )))
    }
}

/// Build the FFmpeg argument list for raw RGBA input on stdin
pub fn build_ffmpeg_args(options: &RecorderOptions, dimension: Dimension, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pixel_format".into(),
        "rgba".into(),
        "-video_size".into(),
        dimension.to_string(),
        "-framerate".into(),
        options.frame_rate.to_string(),
        "-i".into(),
        "-".into(),
        // yuv420p needs even dimensions
        "-vf".into(),
        "pad=ceil(iw/2)*2:ceil(ih/2)*2".into(),
        "-c:v".into(),
        options.format.video_codec().into(),
    ];

    match options.format {
        super::ContainerFormat::Mp4 => args.extend(
            ["-preset", "veryfast", "-crf", "18", "-movflags", "+faststart"]
                .map(String::from),
        ),
        super::ContainerFormat::Webm => args.extend(
            ["-b:v", "0", "-crf", "32", "-deadline", "realtime"].map(String::from),
        ),
    }

    args.extend(["-pix_fmt".to_string(), "yuv420p".to_string()]);
    args.push(output.to_string_lossy().to_string());
    args
}

fn spawn_encoder(binary: &Path, args: &[String]) -> anyhow::Result<Child> {
    Command::new(binary)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to start {}", binary.display()))
}

/// Running encoder state, present between `start` and `stop`
struct Encoder {
    child: Child,
    writer: thread::JoinHandle<std::io::Result<()>>,
    scratch: TempDir,
    output: PathBuf,
}

struct FfmpegEngine {
    binary: PathBuf,
    stream: StreamHandle,
    options: RecorderOptions,
    dimension: Dimension,
    encoder: Option<Encoder>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
}

impl FfmpegEngine {
    fn new(binary: PathBuf, stream: StreamHandle, options: RecorderOptions) -> Self {
        let dimension = stream.dimension();
        Self {
            binary,
            stream,
            options,
            dimension,
            encoder: None,
            running: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            frames: Arc::new(AtomicU64::new(0)),
        }
    }
}

#[async_trait]
impl RecordingEngine for FfmpegEngine {
    fn start(&mut self) -> Result<(), SinkError> {
        if self.encoder.is_some() {
            return Err(SinkError::AlreadyStarted);
        }

        let scratch = tempfile::Builder::new().prefix("screencam-").tempdir()?;
        let output = scratch
            .path()
            .join(format!("recording.{}", self.options.format.extension()));
        let args = build_ffmpeg_args(&self.options, self.dimension, &output);

        let mut child = spawn_encoder(&self.binary, &args)
            .map_err(|e| SinkError::Engine(format!("{e:#}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SinkError::Engine("FFmpeg stdin unavailable".to_string()))?;

        self.running.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.frames.store(0, Ordering::SeqCst);

        let feeder = FrameFeeder {
            stream: self.stream.clone(),
            dimension: self.dimension,
            period: Duration::from_secs_f64(1.0 / self.options.frame_rate.max(1) as f64),
            running: self.running.clone(),
            paused: self.paused.clone(),
            frames: self.frames.clone(),
        };
        let writer = match thread::Builder::new()
            .name("screencam-recorder".to_string())
            .spawn(move || feeder.run(stdin))
        {
            Ok(writer) => writer,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = child.kill();
                return Err(e.into());
            }
        };

        tracing::info!(
            "Started FFmpeg recorder: {} @ {}fps, output: {}",
            self.dimension,
            self.options.frame_rate,
            output.display()
        );

        self.encoder = Some(Encoder {
            child,
            writer,
            scratch,
            output,
        });
        Ok(())
    }

    fn pause(&mut self) -> Result<(), SinkError> {
        if self.encoder.is_none() {
            return Err(SinkError::NotRunning);
        }
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), SinkError> {
        if self.encoder.is_none() {
            return Err(SinkError::NotRunning);
        }
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> Result<RecordedArtifact, SinkError> {
        let Encoder {
            child,
            writer,
            scratch,
            output,
        } = self.encoder.take().ok_or(SinkError::NotRunning)?;

        self.running.store(false, Ordering::SeqCst);

        // The feeder closes stdin when it returns, which lets FFmpeg flush
        let fed = tokio::task::spawn_blocking(move || writer.join())
            .await
            .map_err(|e| SinkError::Engine(format!("Recorder thread failed: {e}")))?
            .map_err(|_| SinkError::Engine("Recorder thread panicked".to_string()))?;
        if let Err(e) = fed {
            tracing::warn!("Frame feeder stopped early: {}", e);
        }

        let result = tokio::task::spawn_blocking(move || child.wait_with_output())
            .await
            .map_err(|e| SinkError::Engine(format!("FFmpeg wait failed: {e}")))??;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(SinkError::Engine(format!(
                "FFmpeg exited with status {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        let bytes = tokio::fs::read(&output).await?;
        drop(scratch);

        let frame_count = self.frames.load(Ordering::SeqCst);
        let duration_ms = frame_count as f64 * 1000.0 / self.options.frame_rate.max(1) as f64;

        Ok(RecordedArtifact::new(
            self.options.format.mime_type(),
            self.dimension,
            frame_count,
            duration_ms,
            bytes,
        ))
    }
}

impl Drop for FfmpegEngine {
    fn drop(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            tracing::warn!("FFmpeg recorder dropped while running, killing encoder");
            self.running.store(false, Ordering::SeqCst);
            let _ = encoder.child.kill();
            let _ = encoder.child.wait();
        }
    }
}

/// Pulls frames off the stream on a fixed cadence and writes them to FFmpeg
struct FrameFeeder {
    stream: StreamHandle,
    dimension: Dimension,
    period: Duration,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
}

impl FrameFeeder {
    fn run(self, mut stdin: ChildStdin) -> std::io::Result<()> {
        let mut next = Instant::now();

        while self.running.load(Ordering::SeqCst) {
            if !self.paused.load(Ordering::SeqCst) {
                match self.stream.latest_frame() {
                    Some(frame) if frame.dimension() == self.dimension => {
                        stdin.write_all(frame.data())?;
                        self.frames.fetch_add(1, Ordering::Relaxed);
                    }
                    Some(frame) => {
                        tracing::debug!(
                            "Skipping {} frame, recorder expects {}",
                            frame.dimension(),
                            self.dimension
                        );
                    }
                    None => {}
                }
            }

            next += self.period;
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            } else {
                next = now;
            }
        }

        stdin.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{StreamKind, SyntheticStream};
    use crate::sink::ContainerFormat;

    fn stream() -> StreamHandle {
        Arc::new(SyntheticStream::new(
            StreamKind::Composite,
            Dimension::new(64, 48).unwrap(),
            [0, 0, 0, 255],
        ))
    }

    #[test]
    fn test_args_describe_raw_input() {
        let options = RecorderOptions::default();
        let args = build_ffmpeg_args(
            &options,
            Dimension::new(1024, 768).unwrap(),
            Path::new("/tmp/out.webm"),
        );

        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo -pixel_format rgba -video_size 1024x768"));
        assert!(joined.contains("-framerate 30"));
        assert!(joined.contains("-c:v libvpx-vp9"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.webm"));
    }

    #[test]
    fn test_mp4_args() {
        let options = RecorderOptions {
            format: ContainerFormat::Mp4,
            ..Default::default()
        };
        let args = build_ffmpeg_args(&options, Dimension::new(64, 64).unwrap(), Path::new("o.mp4"));
        assert!(args.iter().any(|a| a == "libx264"));
        assert!(args.iter().any(|a| a == "+faststart"));
    }

    #[test]
    fn test_missing_binary_fails_to_start() {
        let backend = FfmpegRecorderBackend::new("/nonexistent/screencam-ffmpeg");
        let mut engine = backend.create(stream(), &RecorderOptions::default()).unwrap();

        let err = engine.start().unwrap_err();
        assert!(matches!(err, SinkError::Engine(msg) if msg.contains("Failed to start")));
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let backend = FfmpegRecorderBackend::default();
        let mut engine = backend.create(stream(), &RecorderOptions::default()).unwrap();

        assert!(matches!(engine.pause(), Err(SinkError::NotRunning)));
        assert!(matches!(engine.stop().await, Err(SinkError::NotRunning)));
    }
}
