use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub mod google;
pub mod tempo;

pub use google::GoogleTranslateTts;
pub use tempo::FfmpegRetimer;

use crate::{DubError, Result};

/// Playback speed of the final artifact relative to the rendered speech
pub const PLAYBACK_SPEED: f64 = 1.25;

/// Text-to-speech renderer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Render `text` spoken in `language_code` as MP3 into `output`
    async fn render(&self, text: &str, language_code: &str, output: &Path) -> Result<()>;

    /// Get the name of this engine
    fn engine_name(&self) -> &'static str;
}

/// Re-encodes audio at a different playback speed
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioRetimer: Send + Sync {
    /// Decode `input` and write it to `output` played `speed` times faster
    async fn retime(&self, input: &Path, output: &Path, speed: f64) -> Result<()>;
}

/// The final, sped-up audio file.
///
/// It outlives the request that produced it; whoever holds it decides when to
/// delete it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    path: PathBuf,
}

impl AudioArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    /// Delete the file
    pub fn remove(self) -> Result<()> {
        fs_err::remove_file(&self.path)?;
        Ok(())
    }
}

/// Renders translated text to speech and speeds it up
pub struct SpeechSynthesizer {
    engine: Box<dyn SpeechEngine>,
    retimer: Box<dyn AudioRetimer>,
    temp_dir: PathBuf,
}

impl SpeechSynthesizer {
    /// `temp_dir` defaults to the system temporary directory
    pub fn new(
        engine: Box<dyn SpeechEngine>,
        retimer: Box<dyn AudioRetimer>,
        temp_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            engine,
            retimer,
            temp_dir: temp_dir.unwrap_or_else(std::env::temp_dir),
        }
    }

    /// Render `text`, speed it up by [`PLAYBACK_SPEED`] and return the result.
    ///
    /// The original-rate render is deleted before returning, on success or
    /// failure. The sped-up file is kept only on success.
    pub async fn synthesize(&self, text: &str, language_code: &str) -> Result<AudioArtifact> {
        if text.trim().is_empty() {
            return Err(DubError::SynthesisFailed("No text to speak".to_string()).into());
        }

        fs_err::create_dir_all(&self.temp_dir)?;

        let original = tempfile::Builder::new()
            .prefix("tubedub_")
            .suffix(".mp3")
            .tempfile_in(&self.temp_dir)
            .context("Failed to create temporary audio file")?
            .into_temp_path();

        tracing::info!(
            "Rendering {} characters of speech ({}) with {}",
            text.chars().count(),
            language_code,
            self.engine.engine_name()
        );
        self.engine
            .render(text, language_code, &original)
            .await
            .context("Speech rendering failed")?;

        let accelerated = tempfile::Builder::new()
            .prefix("tubedub_")
            .suffix("_faster.mp3")
            .tempfile_in(&self.temp_dir)
            .context("Failed to create temporary audio file")?
            .into_temp_path();

        tracing::debug!("Speeding up audio by {}x", PLAYBACK_SPEED);
        self.retimer
            .retime(&original, &accelerated, PLAYBACK_SPEED)
            .await
            .context("Audio speed-up failed")?;

        let path = accelerated
            .keep()
            .context("Failed to persist audio file")?;
        original.close().context("Failed to remove intermediate audio file")?;

        tracing::info!("Audio saved to: {}", path.display());
        Ok(AudioArtifact { path })
    }
}
