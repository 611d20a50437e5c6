//! tubedub - turn a YouTube video into a spoken translation
//!
//! This library fetches a video's transcript, translates it chunk by chunk with
//! Google's Gemini API and renders the result to a sped-up MP3 file.

pub mod cancel;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod handler;
pub mod output;
pub mod retry;
pub mod speech;
pub mod transcript;
pub mod translate;
pub mod utils;

pub use cancel::{CancelHandle, CancelSignal};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use extractors::{extract_video_id, VideoId};
pub use handler::{DubRequest, DubResponse, RequestHandler};
pub use speech::{AudioArtifact, SpeechSynthesizer};
pub use transcript::{Transcript, TranscriptFetcher, TranscriptProvider, TranscriptSegment};
pub use translate::{TranslatedChunk, Translation, TranslationOrchestrator};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the dubbing pipeline
#[derive(thiserror::Error, Debug)]
pub enum DubError {
    #[error("Missing youtube_url or target_language")]
    MissingFields,

    #[error("Invalid YouTube URL")]
    InvalidUrl,

    #[error("Transcript unavailable: {0}")]
    TranscriptUnavailable(String),

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}
