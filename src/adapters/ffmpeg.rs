//! Thumbnail derivation by shelling out to ffprobe/ffmpeg.

use crate::ports::thumbnailer::Thumbnailer;
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command as TokioCommand;

/// Real [`Thumbnailer`] backed by the ffmpeg CLI tools. Every invocation is
/// bounded by a timeout; an expired timer kills the child and is reported as
/// an ordinary derivation error.
#[derive(Clone)]
pub struct FfmpegThumbnailer {
    timeout: Duration,
    width: u32,
}

impl FfmpegThumbnailer {
    pub fn new(timeout: Duration, width: u32) -> Self {
        Self { timeout, width }
    }

    async fn run(&self, command: &mut TokioCommand) -> io::Result<Output> {
        command.stdin(Stdio::null()).kill_on_drop(true);
        match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(output) => output,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("external tool exceeded {:?}", self.timeout),
            )),
        }
    }
}

#[async_trait]
impl Thumbnailer for FfmpegThumbnailer {
    async fn media_duration(&self, media: &Path) -> io::Result<f64> {
        let mut command = TokioCommand::new("ffprobe");
        command
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(media);

        let output = self.run(&mut command).await?;
        if !output.status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "ffprobe exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim().parse::<f64>().unwrap_or(0.0))
    }

    async fn extract_frame(&self, media: &Path, at_seconds: f64, output: &Path) -> io::Result<()> {
        let mut command = TokioCommand::new("ffmpeg");
        command
            .arg("-y")
            .arg("-ss")
            .arg(format!("{:.3}", at_seconds))
            .arg("-i")
            .arg(media)
            .arg("-frames:v")
            .arg("1")
            .arg("-vf")
            .arg(format!("scale={}:-2", self.width))
            .arg(output);

        let result = self.run(&mut command).await?;
        if !result.status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "ffmpeg exited with {}: {}",
                    result.status,
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            ));
        }
        Ok(())
    }
}
