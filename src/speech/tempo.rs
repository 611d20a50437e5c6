use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::AudioRetimer;
use crate::config::SpeechConfig;
use crate::Result;

/// Range a single ffmpeg `atempo` stage accepts on every ffmpeg version
const ATEMPO_MIN: f64 = 0.5;
const ATEMPO_MAX: f64 = 2.0;

/// Retimer that re-encodes through ffmpeg's `atempo` filter (pitch preserved)
pub struct FfmpegRetimer {
    ffmpeg_path: String,
    timeout: Duration,
}

impl FfmpegRetimer {
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl AudioRetimer for FfmpegRetimer {
    async fn retime(&self, input: &Path, output: &Path, speed: f64) -> Result<()> {
        let filter = atempo_filter(speed)?;
        tracing::debug!("Retiming {} with {}", input.display(), filter);

        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args([
                "-y", // Overwrite output file
                "-i", &input.to_string_lossy(),
                "-vn", // No video
                "-filter:a", &filter,
                "-acodec", "libmp3lame",
                &output.to_string_lossy(),
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| anyhow::anyhow!("ffmpeg timed out after {:?}", self.timeout))?
            .with_context(|| format!("Failed to run {}", self.ffmpeg_path))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg failed to change audio speed: {}", error.trim());
        }

        Ok(())
    }
}

/// Build an `atempo` chain whose stages multiply to `speed`
pub fn atempo_filter(speed: f64) -> Result<String> {
    if !speed.is_finite() || speed <= 0.0 {
        anyhow::bail!("Playback speed must be positive, got {}", speed);
    }

    let mut stages = Vec::new();
    let mut remaining = speed;
    while remaining > ATEMPO_MAX {
        stages.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        stages.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    stages.push(remaining);

    Ok(stages
        .iter()
        .map(|factor| format!("atempo={}", factor))
        .collect::<Vec<_>>()
        .join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factors(filter: &str) -> Vec<f64> {
        filter
            .split(',')
            .map(|stage| stage.trim_start_matches("atempo=").parse().unwrap())
            .collect()
    }

    #[test]
    fn test_default_speed_is_a_single_stage() {
        assert_eq!(atempo_filter(1.25).unwrap(), "atempo=1.25");
    }

    #[test]
    fn test_stages_stay_in_range_and_multiply_to_speed() {
        for speed in [0.1, 0.3, 0.5, 1.0, 1.25, 2.0, 3.0, 10.0] {
            let stages = factors(&atempo_filter(speed).unwrap());
            assert!(stages.iter().all(|f| (ATEMPO_MIN..=ATEMPO_MAX).contains(f)), "{speed}: {stages:?}");
            let product: f64 = stages.iter().product();
            assert!((product - speed).abs() < 1e-9, "{speed}: {product}");
        }
    }

    #[test]
    fn test_rejects_non_positive_speed() {
        assert!(atempo_filter(0.0).is_err());
        assert!(atempo_filter(-1.0).is_err());
        assert!(atempo_filter(f64::NAN).is_err());
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_binary_is_an_error() {
        let retimer = FfmpegRetimer {
            ffmpeg_path: "/nonexistent/ffmpeg".to_string(),
            timeout: Duration::from_secs(5),
        };
        let dir = tempfile::tempdir().unwrap();
        let err = retimer
            .retime(&dir.path().join("in.mp3"), &dir.path().join("out.mp3"), 1.25)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to run /nonexistent/ffmpeg"));
    }
}
