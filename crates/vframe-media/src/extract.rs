//! Frame extraction via the ffmpeg CLI.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

use vframe_core::{ExtractError, FrameExtractor};

/// Extractor configuration.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// ffmpeg binary name or path
    pub ffmpeg_bin: String,
    /// Hard bound on one extraction run
    pub timeout: Duration,
    /// JPEG quality scale (2 is visually lossless, 31 is worst)
    pub jpeg_quality: u8,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: "ffmpeg".to_string(),
            timeout: Duration::from_secs(600),
            jpeg_quality: 2,
        }
    }
}

impl ExtractorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            ffmpeg_bin: std::env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()),
            timeout: Duration::from_secs(
                std::env::var("FFMPEG_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            jpeg_quality: std::env::var("FFMPEG_JPEG_QUALITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        }
    }
}

/// Frame extraction gateway wrapping the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    config: ExtractorConfig,
}

impl FfmpegExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Build the full argument list for one extraction run.
    fn build_args(&self, input: &Path, out_dir: &Path, fps: u32) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-vf".to_string(),
            format!("fps={fps}"),
            "-q:v".to_string(),
            self.config.jpeg_quality.to_string(),
            out_dir.join("%08d.jpg").to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl FrameExtractor for FfmpegExtractor {
    async fn extract_frames(
        &self,
        input: &Path,
        out_dir: &Path,
        fps: u32,
    ) -> Result<u64, ExtractError> {
        fs::create_dir_all(out_dir).await?;

        which::which(&self.config.ffmpeg_bin)
            .map_err(|_| ExtractError::ToolNotFound(self.config.ffmpeg_bin.clone()))?;

        let args = self.build_args(input, out_dir, fps);
        debug!("running {} {}", self.config.ffmpeg_bin, args.join(" "));

        let mut cmd = Command::new(&self.config.ffmpeg_bin);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // kill_on_drop reaps the child when the timeout drops the future
        let output = match tokio::time::timeout(self.config.timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => return Err(ExtractError::Timeout(self.config.timeout.as_secs())),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let message = if !stderr.is_empty() {
                stderr
            } else if !stdout.is_empty() {
                stdout
            } else {
                "ffmpeg failed".to_string()
            };
            return Err(ExtractError::failed(message));
        }

        count_frames(out_dir).await
    }
}

/// Count the frame files ffmpeg wrote into the output directory.
async fn count_frames(out_dir: &Path) -> Result<u64, ExtractError> {
    let mut entries = fs::read_dir(out_dir).await?;
    let mut count = 0u64;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_jpg = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("jpg"))
            .unwrap_or(false);
        if entry.file_type().await?.is_file() && is_jpg {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_build_args() {
        let extractor = FfmpegExtractor::new(ExtractorConfig::default());
        let args = extractor.build_args(Path::new("/in/video.mp4"), Path::new("/out"), 5);

        assert_eq!(args[0], "-y");
        assert!(args.contains(&"-i".to_string()));
        assert!(args.contains(&"/in/video.mp4".to_string()));
        assert!(args.contains(&"fps=5".to_string()));
        assert!(args.contains(&"-q:v".to_string()));
        assert_eq!(args.last().unwrap(), "/out/%08d.jpg");
    }

    #[tokio::test]
    async fn test_count_frames_ignores_non_jpg() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("00000001.jpg"), b"a").await.unwrap();
        fs::write(dir.path().join("00000002.JPG"), b"b").await.unwrap();
        fs::write(dir.path().join("notes.txt"), b"c").await.unwrap();

        assert_eq!(count_frames(dir.path()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let dir = TempDir::new().unwrap();
        let extractor = FfmpegExtractor::new(ExtractorConfig {
            ffmpeg_bin: "definitely-not-ffmpeg-xyz".to_string(),
            ..ExtractorConfig::default()
        });

        let err = extractor
            .extract_frames(Path::new("/in.mp4"), dir.path(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::ToolNotFound(_)));
        assert_eq!(err.to_string(), "definitely-not-ffmpeg-xyz not found in PATH");
    }
}
