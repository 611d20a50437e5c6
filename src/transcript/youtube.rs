use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;

use super::{TranscriptProvider, TranscriptSegment};
use crate::config::TranscriptConfig;
use crate::extractors::VideoId;
use crate::retry::RetryPolicy;
use crate::Result;

/// Cues this short are snapshots of the line just finished
const SNAPSHOT_CUE_SECS: f64 = 0.05;

/// Why a subtitle download attempt failed
#[derive(Debug, thiserror::Error)]
enum DownloadError {
    #[error("yt-dlp timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Failed to run {path}: {source}")]
    Spawn {
        path: String,
        source: std::io::Error,
    },

    #[error("yt-dlp failed: {0}")]
    Failed(String),

    #[error("No captions available for video {0}")]
    NoCaptions(VideoId),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// A failed run or a missing track will fail the same way again
    fn is_retryable(&self) -> bool {
        matches!(self, DownloadError::TimedOut(_) | DownloadError::Spawn { .. })
    }
}

/// YouTube transcript provider using yt-dlp subtitle downloads
pub struct YtDlpTranscriptProvider {
    yt_dlp_path: String,
    languages: Vec<String>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl YtDlpTranscriptProvider {
    pub fn new(config: &TranscriptConfig) -> Self {
        Self {
            yt_dlp_path: config.yt_dlp_path.clone(),
            languages: config.languages.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            retry: RetryPolicy::new("yt-dlp subtitles").with_max_attempts(config.max_attempts),
        }
    }

    fn sub_langs(&self) -> String {
        if self.languages.is_empty() {
            "en,en-US,en-GB".to_string()
        } else {
            self.languages.join(",")
        }
    }

    /// Download subtitles into `workdir`, returning the chosen VTT file
    async fn download_subtitles(
        &self,
        video_id: &VideoId,
        workdir: &Path,
    ) -> std::result::Result<PathBuf, DownloadError> {
        let output_template = workdir.join("%(id)s.%(ext)s");
        let sub_langs = self.sub_langs();
        let url = video_id.watch_url();

        tracing::debug!("Downloading subtitles for {} ({})", url, sub_langs);

        let mut command = Command::new(&self.yt_dlp_path);
        command
            .args([
                "--skip-download",
                "--write-sub",
                "--write-auto-sub",
                "--sub-lang", &sub_langs,
                "--sub-format", "vtt",
                "--no-playlist",
                "--no-warnings",
                "--output", &output_template.to_string_lossy(),
                &url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| DownloadError::TimedOut(self.timeout))?
            .map_err(|source| DownloadError::Spawn {
                path: self.yt_dlp_path.clone(),
                source,
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::Failed(error.trim().to_string()));
        }

        find_subtitle_file(workdir)?.ok_or_else(|| DownloadError::NoCaptions(video_id.clone()))
    }
}

#[async_trait]
impl TranscriptProvider for YtDlpTranscriptProvider {
    async fn list_segments(&self, video_id: &VideoId) -> Result<Vec<TranscriptSegment>> {
        // Removed when dropped, whichever way this returns
        let workdir = tempfile::Builder::new()
            .prefix("tubedub_subs_")
            .tempdir()
            .context("Failed to create subtitle directory")?;

        let vtt_path = self
            .retry
            .run(DownloadError::is_retryable, || {
                self.download_subtitles(video_id, workdir.path())
            })
            .await?;

        let content = fs_err::read_to_string(&vtt_path)?;
        Ok(parse_vtt(&content))
    }

    fn provider_name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Pick the downloaded VTT file, preferring English tracks
fn find_subtitle_file(workdir: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut vtt_files: Vec<PathBuf> = fs_err::read_dir(workdir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("vtt"))
        .collect();

    vtt_files.sort_by_key(|path| {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        (!name.contains(".en"), name)
    });

    Ok(vtt_files.into_iter().next())
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds
fn parse_timestamp(raw: &str) -> Option<f64> {
    let mut seconds = 0.0;
    for part in raw.trim().split(':') {
        seconds = seconds * 60.0 + part.parse::<f64>().ok()?;
    }
    Some(seconds)
}

/// Parse a cue timing line such as `00:00:01.000 --> 00:00:04.000 align:start`
fn parse_timing(line: &str) -> Option<(f64, f64)> {
    let (start, rest) = line.split_once("-->")?;
    let end = rest.split_whitespace().next()?;
    Some((parse_timestamp(start)?, parse_timestamp(end)?))
}

/// Cues as `(start, end, lines)`, with tags stripped and whitespace collapsed
fn parse_cues(content: &str) -> Vec<(f64, f64, Vec<String>)> {
    let mut cues = Vec::new();
    let mut current: Option<(f64, f64, Vec<String>)> = None;

    for line in content.lines() {
        let line = line.trim();

        if line.contains("-->") {
            cues.extend(current.take());
            current = parse_timing(line).map(|(start, end)| (start, end, Vec::new()));
            continue;
        }

        if line.is_empty() {
            cues.extend(current.take());
            continue;
        }

        // Header, metadata and cue identifiers sit outside any cue
        let Some((_, _, lines)) = current.as_mut() else {
            continue;
        };

        let cleaned = tag_pattern().replace_all(line, "");
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        if !cleaned.is_empty() {
            lines.push(cleaned);
        }
    }
    cues.extend(current);

    cues
}

/// Turn WebVTT captions into transcript segments.
///
/// One segment per cue. Inline tags are stripped and whitespace is collapsed.
/// Rolling auto-captions repeat the previous cue's last line at the top of the
/// next cue, either above the new line or alone in a snapshot cue; that carried
/// line is dropped. A line that is simply spoken twice is kept.
pub fn parse_vtt(content: &str) -> Vec<TranscriptSegment> {
    let mut segments = Vec::new();
    let mut previous_last: Option<String> = None;

    for (start, end, mut lines) in parse_cues(content) {
        let last = lines.last().cloned();

        let carried_over = lines.len() > 1 || end - start < SNAPSHOT_CUE_SECS;
        if carried_over && lines.first() == previous_last.as_ref() {
            lines.remove(0);
        }
        previous_last = last.or(previous_last);

        if !lines.is_empty() {
            segments.push(TranscriptSegment {
                text: lines.join(" "),
                start: Some(start),
                duration: Some((end - start).max(0.0)),
            });
        }
    }

    segments
}
