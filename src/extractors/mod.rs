use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// An 11-character YouTube video identifier.
///
/// Only produced by [`extract_video_id`], so every value is well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn video_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").expect("video id pattern is valid")
    })
}

/// Extract the video id from a URL.
///
/// The id is the first run of 11 id characters that follows either `v=` or a
/// `/`; anything after it is ignored. Matching is positional, so watch,
/// short-link and embed URLs all work without knowing the host.
pub fn extract_video_id(url: &str) -> Option<VideoId> {
    video_id_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId(m.as_str().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(url: &str) -> Option<String> {
        extract_video_id(url).map(|v| v.as_str().to_string())
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_trailing_query_parameters() {
        assert_eq!(id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s&list=PL123").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_path_forms() {
        assert_eq!(id("https://youtu.be/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id("https://www.youtube.com/embed/dQw4w9WgXcQ?rel=0").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id("https://www.youtube.com/shorts/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id("https://m.youtube.com/watch?v=a_b-C1d2E3f").as_deref(), Some("a_b-C1d2E3f"));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(id("not a url"), None);
        assert_eq!(id("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(id(""), None);
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let url = "https://youtu.be/dQw4w9WgXcQ?si=abc";
        assert_eq!(extract_video_id(url), extract_video_id(url));
    }

    #[test]
    fn test_watch_url_roundtrip() {
        let video = extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(video.watch_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(extract_video_id(&video.watch_url()), Some(video));
    }
}
