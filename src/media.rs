use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, info};

use crate::chapters::Timestamp;
use crate::error::{ClipperError, Result};

/// Copy the streams of `source` between `start` and `end` into `destination`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipRequest {
    pub source: PathBuf,
    pub start: Timestamp,
    pub end: Timestamp,
    pub destination: PathBuf,
}

/// External media-processing tool used to cut clips
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Extract `[start, end)` of the source into a new file without re-encoding.
    /// Must not overwrite an existing destination.
    async fn extract_clip(&self, request: &ClipRequest) -> Result<()>;
}

/// FFmpeg invoked as a subprocess, stream copy only
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
    extra_args: Vec<String>,
}

impl Ffmpeg {
    pub fn new() -> Self {
        Self::with_binary("ffmpeg")
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            extra_args: Vec::new(),
        }
    }

    /// Extra output options appended before the destination path
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Arguments for one clip extraction, destination last
    pub fn clip_args(&self, request: &ClipRequest) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-loglevel".into(), "error".into(),
            "-n".into(), // never overwrite
            "-i".into(), request.source.to_string_lossy().into_owned(),
            "-ss".into(), request.start.to_string(),
            "-to".into(), request.end.to_string(),
            "-c:v".into(), "copy".into(),
            "-c:a".into(), "copy".into(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(request.destination.to_string_lossy().into_owned());
        args
    }

    /// Check that the binary can be executed
    pub async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaTool for Ffmpeg {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn extract_clip(&self, request: &ClipRequest) -> Result<()> {
        debug!("✂️ {} [{} - {}) -> {}",
               request.source.display(), request.start, request.end, request.destination.display());

        let output = tokio::process::Command::new(&self.binary)
            .args(self.clip_args(request))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ClipperError::ExternalTool {
                tool: self.binary.display().to_string(),
                status: "failed to start".to_string(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ClipperError::ExternalTool {
                tool: self.binary.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!("✅ Clip written: {}", request.destination.display());
        Ok(())
    }
}
