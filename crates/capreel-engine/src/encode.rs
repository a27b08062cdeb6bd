use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tempfile::TempDir;
use tracing::info;

use crate::error::{Error, Result};
use crate::render::Frame;

/// Finished export output.
#[derive(Debug, Clone)]
pub struct VideoArtifact {
    pub path: PathBuf,
    pub frame_count: usize,
    pub fps: u32,
}

/// Assembles captured frames, in index order, into a video container at a
/// fixed frame rate. Frame capture is decoupled from wall-clock playback —
/// the encoder only cares about ordering and per-frame duration.
pub trait VideoEncoder {
    fn add_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Consume the encoder and produce the artifact. Fails when no frames
    /// were added. Staged intermediates are cleaned up whether or not this
    /// succeeds.
    fn finish(self) -> Result<VideoArtifact>
    where
        Self: Sized;
}

/// Encoder backed by the external `ffmpeg` binary.
///
/// Frames are staged as PPM stills in a temporary directory and assembled
/// with the concat demuxer, each still carrying a fixed `1/fps` duration.
/// The staging directory is removed on drop, on the failure path included.
pub struct FfmpegEncoder {
    output: PathBuf,
    fps: u32,
    staging: TempDir,
    frame_paths: Vec<PathBuf>,
}

impl FfmpegEncoder {
    pub fn new(output: PathBuf, fps: u32) -> Result<Self> {
        if fps == 0 {
            return Err(Error::Encode("fps must be positive".to_string()));
        }
        if !command_exists("ffmpeg") {
            return Err(Error::Encode(
                "ffmpeg not found on PATH; install it to export video".to_string(),
            ));
        }
        Ok(Self {
            output,
            fps,
            staging: TempDir::new()?,
            frame_paths: Vec::new(),
        })
    }

    fn write_ppm(&self, path: &PathBuf, frame: &Frame) -> Result<()> {
        let mut file = File::create(path)?;
        write!(file, "P6\n{} {}\n255\n", frame.width, frame.height)?;
        file.write_all(&frame.pixels)?;
        Ok(())
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn add_frame(&mut self, frame: &Frame) -> Result<()> {
        let path = self
            .staging
            .path()
            .join(format!("frame_{:05}.ppm", self.frame_paths.len()));
        self.write_ppm(&path, frame)?;
        self.frame_paths.push(path);
        Ok(())
    }

    fn finish(self) -> Result<VideoArtifact> {
        if self.frame_paths.is_empty() {
            return Err(Error::Encode("no frames were captured".to_string()));
        }

        let list_path = self.staging.path().join("frames.txt");
        let mut list = String::new();
        let duration = 1.0 / self.fps as f64;
        for path in &self.frame_paths {
            list.push_str(&format!("file '{}'\n", path.display()));
            list.push_str(&format!("duration {:.6}\n", duration));
        }
        // concat demuxer ignores the duration of the final entry unless the
        // last file is listed again
        if let Some(last) = self.frame_paths.last() {
            list.push_str(&format!("file '{}'\n", last.display()));
        }
        std::fs::write(&list_path, list)?;

        let status = Command::new("ffmpeg")
            .arg("-y")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(&list_path)
            .arg("-vsync")
            .arg("vfr")
            .arg("-c:v")
            .arg("libx264")
            .arg("-pix_fmt")
            .arg("yuv420p")
            .arg("-preset")
            .arg("fast")
            .arg("-crf")
            .arg("23")
            .arg(&self.output)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if !status.success() {
            return Err(Error::Encode(format!(
                "ffmpeg exited with status {}",
                status.code().unwrap_or(1)
            )));
        }

        info!(
            frames = self.frame_paths.len(),
            fps = self.fps,
            output = %self.output.display(),
            "video assembled"
        );

        Ok(VideoArtifact {
            path: self.output,
            frame_count: self.frame_paths.len(),
            fps: self.fps,
        })
    }
}

fn command_exists(bin: &str) -> bool {
    Command::new(bin)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
