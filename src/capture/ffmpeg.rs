//! FFmpeg capture backend
//!
//! Screen, microphone and camera are captured by an `ffmpeg` child process
//! that muxes VP9/Opus WebM to its stdout. The encoder reads that pipe in
//! fixed-size fragments; stopping writes `q` to ffmpeg's stdin so the
//! container is finalized before the pipe closes.

use crate::capture::devices::{
    parse_avfoundation_devices, parse_dshow_devices, parse_pactl_sources, parse_xrandr_monitors,
};
use crate::capture::permissions;
use crate::capture::traits::{
    AudioDevice, CameraDevice, CaptureBackend, CaptureSource, MediaEncoder, MediaKind,
    PermissionStatus, StreamPlan, TrackKind,
};
use crate::config::CaptureConfig;
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

/// Bytes requested per read from ffmpeg's stdout
const CHUNK_SIZE: usize = 64 * 1024;

/// How long a freshly spawned ffmpeg gets to fail on bad devices
const STARTUP_GRACE: Duration = Duration::from_millis(500);

/// Lines of ffmpeg stderr kept for error messages
const STDERR_TAIL: usize = 20;

/// Overlay width in pixels; height follows the camera's aspect ratio
const CAMERA_OVERLAY_WIDTH: u32 = 320;
const CAMERA_OVERLAY_MARGIN: u32 = 20;

/// Which ffmpeg input devices to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }
}

fn strings<const N: usize>(args: [&str; N]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Input arguments for the screen
pub fn screen_input_args(platform: Platform, source: &CaptureSource, frame_rate: u32) -> Vec<String> {
    let fps = frame_rate.to_string();
    match platform {
        Platform::Linux => {
            let mut args = strings(["-f", "x11grab", "-draw_mouse", "1", "-framerate"]);
            args.push(fps);
            if let Some(geometry) = source.geometry {
                args.push("-video_size".to_string());
                args.push(format!("{}x{}", geometry.width, geometry.height));
            }
            args.push("-i".to_string());
            args.push(source.id.clone());
            args
        }
        Platform::MacOs => {
            let mut args = strings(["-f", "avfoundation", "-capture_cursor", "1", "-framerate"]);
            args.push(fps);
            args.push("-i".to_string());
            args.push(format!("{}:none", source.id));
            args
        }
        Platform::Windows => {
            let mut args = strings(["-f", "gdigrab", "-draw_mouse", "1", "-framerate"]);
            args.push(fps);
            if let Some(geometry) = source.geometry {
                args.extend([
                    "-offset_x".to_string(),
                    geometry.x.to_string(),
                    "-offset_y".to_string(),
                    geometry.y.to_string(),
                    "-video_size".to_string(),
                    format!("{}x{}", geometry.width, geometry.height),
                ]);
            }
            args.push("-i".to_string());
            args.push(source.id.clone());
            args
        }
    }
}

/// Input arguments for a microphone
pub fn audio_input_args(platform: Platform, device: &AudioDevice) -> Vec<String> {
    let (format, input) = match platform {
        Platform::Linux => ("pulse", device.id.clone()),
        Platform::MacOs => ("avfoundation", format!(":{}", device.id)),
        Platform::Windows => ("dshow", format!("audio={}", device.id)),
    };
    vec!["-f".to_string(), format.to_string(), "-i".to_string(), input]
}

/// Input arguments for a camera
pub fn camera_input_args(platform: Platform, camera: &CameraDevice) -> Vec<String> {
    let (format, input) = match platform {
        Platform::Linux => ("v4l2", camera.id.clone()),
        Platform::MacOs => ("avfoundation", format!("{}:none", camera.id)),
        Platform::Windows => ("dshow", format!("video={}", camera.id)),
    };
    let mut args = vec!["-f".to_string(), format.to_string()];
    if platform == Platform::MacOs {
        // AVFoundation cameras reject the default 29.97
        args.extend(["-framerate".to_string(), "30".to_string()]);
    }
    args.extend(["-i".to_string(), input]);
    args
}

/// Full argument list for one recording session.
///
/// Input order is screen, camera, microphone. Output goes to stdout.
pub fn build_encoder_args(platform: Platform, plan: &StreamPlan, frame_rate: u32) -> Vec<String> {
    let mut args = strings(["-hide_banner", "-loglevel", "error", "-nostats"]);

    args.extend(screen_input_args(platform, &plan.source, frame_rate));
    let mut next_input = 1;

    let camera_index = plan.camera.as_ref().map(|camera| {
        args.extend(camera_input_args(platform, camera));
        let index = next_input;
        next_input += 1;
        index
    });

    let audio_index = plan.audio.as_ref().map(|device| {
        args.extend(audio_input_args(platform, device));
        next_input
    });

    match camera_index {
        Some(index) => {
            args.push("-filter_complex".to_string());
            args.push(format!(
                "[{index}:v]scale={width}:-2[cam];[0:v][cam]overlay=main_w-overlay_w-{margin}:main_h-overlay_h-{margin}[out]",
                index = index,
                width = CAMERA_OVERLAY_WIDTH,
                margin = CAMERA_OVERLAY_MARGIN,
            ));
            args.extend(["-map".to_string(), "[out]".to_string()]);
        }
        None => args.extend(["-map".to_string(), "0:v".to_string()]),
    }

    if let Some(index) = audio_index {
        args.extend(["-map".to_string(), format!("{}:a", index)]);
    }

    args.extend(strings([
        "-c:v",
        "libvpx-vp9",
        "-deadline",
        "realtime",
        "-cpu-used",
        "8",
        "-row-mt",
        "1",
        "-b:v",
        "2500k",
        "-pix_fmt",
        "yuv420p",
    ]));

    if audio_index.is_some() {
        args.extend(strings(["-c:a", "libopus", "-b:a", "128k"]));
    }

    args.extend(strings(["-f", "webm", "pipe:1"]));
    args
}

/// Capture backend driving an external ffmpeg binary
pub struct FfmpegBackend {
    config: CaptureConfig,
    platform: Platform,
}

impl FfmpegBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            platform: Platform::current(),
        }
    }

    fn ffmpeg(&self) -> Command {
        let mut command = Command::new(&self.config.ffmpeg_path);
        command.kill_on_drop(true);
        command
    }

    /// Run an ffmpeg device listing. ffmpeg exits with an error after
    /// listing, so only spawn failures count.
    async fn ffmpeg_listing(&self, args: &[&str]) -> AppResult<String> {
        let output = self
            .ffmpeg()
            .args(["-hide_banner"])
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                AppError::Encoder(format!(
                    "Failed to run {}: {}",
                    self.config.ffmpeg_path, e
                ))
            })?;
        Ok(String::from_utf8_lossy(&output.stderr).into_owned())
    }

    async fn avfoundation_listing(&self) -> AppResult<String> {
        self.ffmpeg_listing(&["-f", "avfoundation", "-list_devices", "true", "-i", ""])
            .await
    }

    async fn dshow_listing(&self) -> AppResult<String> {
        self.ffmpeg_listing(&["-list_devices", "true", "-f", "dshow", "-i", "dummy"])
            .await
    }

    /// Capture 0.1s from the given input into the null muxer
    async fn probe(&self, input_args: Vec<String>) -> AppResult<()> {
        let output = self
            .ffmpeg()
            .args(["-hide_banner", "-loglevel", "error"])
            .args(&input_args)
            .args(["-t", "0.1", "-f", "null", "-"])
            .stdin(Stdio::null())
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(AppError::Encoder(
                stderr
                    .lines()
                    .last()
                    .unwrap_or("ffmpeg exited with an error")
                    .to_string(),
            ))
        }
    }
}

/// Run a helper tool and return stdout when it succeeds
async fn tool_output(program: &str, args: &[&str]) -> Option<String> {
    match Command::new(program).args(args).stdin(Stdio::null()).output().await {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => {
            tracing::warn!("{} exited with {}", program, output.status);
            None
        }
        Err(e) => {
            tracing::warn!("Failed to run {}: {}", program, e);
            None
        }
    }
}

fn linux_video_nodes() -> Vec<CameraDevice> {
    let Ok(entries) = std::fs::read_dir("/dev") else {
        return Vec::new();
    };
    let mut nodes: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with("video"))
        .collect();
    nodes.sort();
    nodes
        .into_iter()
        .map(|name| CameraDevice {
            id: format!("/dev/{}", name),
            label: format!("Camera ({})", name),
        })
        .collect()
}

#[async_trait]
impl CaptureBackend for FfmpegBackend {
    async fn sources(&self) -> AppResult<Vec<CaptureSource>> {
        let sources = match self.platform {
            Platform::Linux => {
                let Some(display) = std::env::var("DISPLAY").ok().filter(|d| !d.is_empty()) else {
                    tracing::warn!("DISPLAY is not set; no X11 screen to capture");
                    return Ok(Vec::new());
                };
                let monitors = tool_output("xrandr", &["--listmonitors"])
                    .await
                    .map(|listing| parse_xrandr_monitors(&listing, &display))
                    .unwrap_or_default();
                if monitors.is_empty() {
                    vec![CaptureSource {
                        id: display,
                        name: "Screen 1".to_string(),
                        geometry: None,
                        is_primary: true,
                    }]
                } else {
                    monitors
                }
            }
            Platform::MacOs => parse_avfoundation_devices(&self.avfoundation_listing().await?).screens,
            Platform::Windows => vec![CaptureSource {
                id: "desktop".to_string(),
                name: "Entire desktop".to_string(),
                geometry: None,
                is_primary: true,
            }],
        };
        tracing::debug!("Found {} capture sources", sources.len());
        Ok(sources)
    }

    async fn audio_devices(&self) -> AppResult<Vec<AudioDevice>> {
        let devices = match self.platform {
            Platform::Linux => tool_output("pactl", &["list", "short", "sources"])
                .await
                .map(|listing| parse_pactl_sources(&listing))
                .unwrap_or_default(),
            Platform::MacOs => {
                parse_avfoundation_devices(&self.avfoundation_listing().await?).microphones
            }
            Platform::Windows => parse_dshow_devices(&self.dshow_listing().await?).1,
        };
        tracing::debug!("Found {} audio input devices", devices.len());
        Ok(devices)
    }

    async fn cameras(&self) -> AppResult<Vec<CameraDevice>> {
        let cameras = match self.platform {
            Platform::Linux => linux_video_nodes(),
            Platform::MacOs => parse_avfoundation_devices(&self.avfoundation_listing().await?).cameras,
            Platform::Windows => parse_dshow_devices(&self.dshow_listing().await?).0,
        };
        Ok(cameras)
    }

    async fn check_permission(&self, kind: MediaKind) -> PermissionStatus {
        match kind {
            MediaKind::Screen => permissions::screen_permission_status(),
            MediaKind::Camera => match self.cameras().await {
                Ok(cameras) if !cameras.is_empty() => PermissionStatus::Unknown,
                _ => PermissionStatus::Unavailable,
            },
            MediaKind::Microphone => match self.audio_devices().await {
                Ok(devices) if !devices.is_empty() => PermissionStatus::Unknown,
                _ => PermissionStatus::Unavailable,
            },
        }
    }

    async fn request_permission(&self, kind: MediaKind) -> PermissionStatus {
        let probe_args = match kind {
            MediaKind::Screen => {
                return if permissions::request_screen_recording_permission() {
                    PermissionStatus::Granted
                } else {
                    permissions::screen_permission_status()
                };
            }
            MediaKind::Camera => match self.cameras().await.ok().and_then(|c| c.into_iter().next()) {
                Some(camera) => camera_input_args(self.platform, &camera),
                None => return PermissionStatus::Unavailable,
            },
            MediaKind::Microphone => {
                match self.audio_devices().await.ok().and_then(|d| d.into_iter().next()) {
                    Some(device) => audio_input_args(self.platform, &device),
                    None => return PermissionStatus::Unavailable,
                }
            }
        };

        match self.probe(probe_args).await {
            Ok(()) => PermissionStatus::Granted,
            Err(e) => {
                tracing::warn!("{} probe failed: {}", kind, e);
                PermissionStatus::Denied
            }
        }
    }

    async fn open_audio(&self, device: &AudioDevice) -> AppResult<()> {
        self.probe(audio_input_args(self.platform, device))
            .await
            .map_err(|e| {
                let detail = match e {
                    AppError::Encoder(detail) => detail,
                    other => other.to_string(),
                };
                AppError::AudioCapture(format!("{}: {}", device.label, detail))
            })
    }

    async fn open_encoder(&self, plan: &StreamPlan) -> AppResult<Box<dyn MediaEncoder>> {
        let args = build_encoder_args(self.platform, plan, self.config.frame_rate);
        tracing::info!("Starting ffmpeg encoder: {} {}", self.config.ffmpeg_path, args.join(" "));

        let mut child = self
            .ffmpeg()
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AppError::Encoder(format!("Failed to start FFmpeg encoder: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Encoder("Failed to capture FFmpeg stdout".to_string()))?;
        let stdin = child.stdin.take();
        let stderr_tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL)));

        if let Some(stderr) = child.stderr.take() {
            let tail = stderr_tail.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "clipshare_lib::ffmpeg", "{}", line);
                    let mut kept = tail.lock();
                    if kept.len() == STDERR_TAIL {
                        kept.pop_front();
                    }
                    kept.push_back(line);
                }
            });
        }

        // Bad device names make ffmpeg exit right away
        if let Ok(status) = tokio::time::timeout(STARTUP_GRACE, child.wait()).await {
            let status = status?;
            let detail = last_line(&stderr_tail)
                .unwrap_or_else(|| format!("ffmpeg exited with {}", status));
            return Err(AppError::Encoder(detail));
        }

        Ok(Box::new(FfmpegEncoder {
            child,
            stdin,
            stdout,
            tracks: plan.tracks(),
            stderr_tail,
            stopping: false,
        }))
    }
}

fn last_line(tail: &Mutex<VecDeque<String>>) -> Option<String> {
    tail.lock().back().cloned()
}

/// A running ffmpeg process
pub struct FfmpegEncoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: ChildStdout,
    tracks: Vec<TrackKind>,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    stopping: bool,
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    fn tracks(&self) -> Vec<TrackKind> {
        self.tracks.clone()
    }

    async fn next_chunk(&mut self) -> AppResult<Option<Vec<u8>>> {
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let read = self.stdout.read(&mut buffer).await?;
        if read > 0 {
            buffer.truncate(read);
            return Ok(Some(buffer));
        }

        let status = self.child.wait().await?;
        if !status.success() && !self.stopping {
            let detail = last_line(&self.stderr_tail)
                .unwrap_or_else(|| format!("ffmpeg exited with {}", status));
            return Err(AppError::Encoder(detail));
        }
        tracing::debug!("ffmpeg exited with {}", status);
        Ok(None)
    }

    async fn stop(&mut self) -> AppResult<()> {
        self.stopping = true;
        if let Some(mut stdin) = self.stdin.take() {
            // ffmpeg finalizes the container when it reads `q`
            if let Err(e) = stdin.write_all(b"q").await {
                tracing::warn!("Failed to send quit to ffmpeg: {}", e);
            }
            let _ = stdin.shutdown().await;
        }
        Ok(())
    }
}
