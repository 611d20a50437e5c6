use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod youtube;

use crate::extractors::VideoId;
use crate::Result;

/// One timed snippet of spoken text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment text
    pub text: String,

    /// Start time in seconds
    pub start: Option<f64>,

    /// Duration in seconds
    pub duration: Option<f64>,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start: None,
            duration: None,
        }
    }
}

/// Source of transcript segments for a video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// List the video's segments in playback order
    async fn list_segments(&self, video_id: &VideoId) -> Result<Vec<TranscriptSegment>>;

    /// Get the name of this provider
    fn provider_name(&self) -> &'static str;
}

/// Outcome of a transcript fetch
#[derive(Debug, Clone, PartialEq)]
pub enum Transcript {
    /// Segment texts joined with single spaces
    Text(String),

    /// The provider failed; `reason` describes why
    Unavailable { reason: String },
}

impl Transcript {
    pub fn is_available(&self) -> bool {
        matches!(self, Transcript::Text(_))
    }

    /// Text to hand to the translation stage.
    ///
    /// An unavailable transcript becomes `Error: <reason>`, which is translated
    /// like any other text.
    pub fn into_translatable_text(self) -> String {
        match self {
            Transcript::Text(text) => text,
            Transcript::Unavailable { reason } => format!("Error: {}", reason),
        }
    }
}

/// Join segment texts, in order, with single spaces
pub fn join_segments(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fetches a video's transcript and flattens it into one text blob
pub struct TranscriptFetcher {
    provider: Box<dyn TranscriptProvider>,
}

impl TranscriptFetcher {
    pub fn new(provider: Box<dyn TranscriptProvider>) -> Self {
        Self { provider }
    }

    /// Fetch the transcript. Provider failures are returned as
    /// [`Transcript::Unavailable`], never as errors.
    pub async fn fetch(&self, video_id: &VideoId) -> Transcript {
        tracing::info!(
            "Fetching transcript for {} via {}",
            video_id,
            self.provider.provider_name()
        );

        match self.provider.list_segments(video_id).await {
            Ok(segments) => {
                tracing::debug!("Transcript has {} segments", segments.len());
                Transcript::Text(join_segments(&segments))
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                tracing::warn!(video_id = %video_id, "Transcript unavailable: {}", reason);
                Transcript::Unavailable { reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::extract_video_id;

    fn video() -> VideoId {
        extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap()
    }

    #[tokio::test]
    async fn test_segments_joined_in_order() {
        let mut provider = MockTranscriptProvider::new();
        provider.expect_provider_name().return_const("mock");
        provider
            .expect_list_segments()
            .withf(|id| id.as_str() == "dQw4w9WgXcQ")
            .times(1)
            .returning(|_| {
                Ok(vec![
                    TranscriptSegment::new("never gonna"),
                    TranscriptSegment::new("give you"),
                    TranscriptSegment::new("up"),
                ])
            });

        let fetcher = TranscriptFetcher::new(Box::new(provider));
        let transcript = fetcher.fetch(&video()).await;

        assert_eq!(transcript, Transcript::Text("never gonna give you up".to_string()));
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_unavailable() {
        let mut provider = MockTranscriptProvider::new();
        provider.expect_provider_name().return_const("mock");
        provider
            .expect_list_segments()
            .returning(|_| Err(anyhow::anyhow!("Subtitles are disabled for this video")));

        let fetcher = TranscriptFetcher::new(Box::new(provider));
        let transcript = fetcher.fetch(&video()).await;

        assert!(!transcript.is_available());
        assert_eq!(
            transcript.into_translatable_text(),
            "Error: Subtitles are disabled for this video"
        );
    }

    #[test]
    fn test_join_segments_keeps_text_as_is() {
        let segments = vec![TranscriptSegment::new("a\nb"), TranscriptSegment::new(" c")];
        assert_eq!(join_segments(&segments), "a\nb  c");
        assert_eq!(join_segments(&[]), "");
    }
}
