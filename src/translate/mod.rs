use async_trait::async_trait;
use std::fmt;

pub mod chunker;
pub mod gemini;

pub use chunker::{chunk_text, Chunk, DEFAULT_MAX_WORDS};
pub use gemini::GeminiClient;

use crate::cancel::CancelSignal;
use crate::{DubError, Result};

/// Why a single generation call produced no text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The service answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The service answered 200 but the body was not the expected shape
    #[error("{0}")]
    Parse(String),

    /// No response was received (connect error, timeout)
    #[error("{0}")]
    Transport(String),
}

impl GenerationError {
    /// Only calls that never got a response are worth repeating
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::Transport(_))
    }
}

/// Text-generation service used to translate chunks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError>;

    /// Get the name of the backing model or service
    fn model_name(&self) -> String;
}

/// Result of translating one chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslatedChunk {
    Translated { index: usize, text: String },
    Failed { index: usize, error: GenerationError },
}

impl TranslatedChunk {
    pub fn index(&self) -> usize {
        match self {
            TranslatedChunk::Translated { index, .. } | TranslatedChunk::Failed { index, .. } => *index,
        }
    }

    pub fn is_translated(&self) -> bool {
        matches!(self, TranslatedChunk::Translated { .. })
    }
}

impl fmt::Display for TranslatedChunk {
    /// Translated text, or a placeholder tagged with the chunk index
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslatedChunk::Translated { text, .. } => f.write_str(text),
            TranslatedChunk::Failed { index, error } => match error {
                GenerationError::Api { body, .. } => write!(f, "[API error in chunk {}: {}]", index, body),
                GenerationError::Parse(e) => write!(f, "[Error parsing chunk {}: {}]", index, e),
                GenerationError::Transport(e) => write!(f, "[Request error in chunk {}: {}]", index, e),
            },
        }
    }
}

/// All chunk results, in chunk order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Translation {
    pub chunks: Vec<TranslatedChunk>,
}

impl Translation {
    /// Chunk renderings joined with newlines, placeholders included
    pub fn joined(&self) -> String {
        self.chunks
            .iter()
            .map(|chunk| chunk.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn failed_count(&self) -> usize {
        self.chunks.iter().filter(|chunk| !chunk.is_translated()).count()
    }
}

/// Build the translation prompt for one chunk
pub fn build_prompt(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following text to {} like it's a modern YouTube video conversation:\n\n{}",
        target_language, text
    )
}

/// Translates transcript chunks one at a time
pub struct TranslationOrchestrator {
    generator: Box<dyn TextGenerator>,
    max_words: usize,
}

impl TranslationOrchestrator {
    pub fn new(generator: Box<dyn TextGenerator>, max_words: usize) -> Self {
        Self { generator, max_words }
    }

    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Chunk `text` and translate it
    pub async fn translate_text(
        &self,
        text: &str,
        target_language: &str,
        cancel: &CancelSignal,
    ) -> Result<Translation> {
        let chunks = chunk_text(text, self.max_words);
        self.translate(&chunks, target_language, cancel).await
    }

    /// Translate every chunk in order.
    ///
    /// A failed chunk is recorded and the loop moves on; only cancellation
    /// stops it early.
    pub async fn translate(
        &self,
        chunks: &[Chunk],
        target_language: &str,
        cancel: &CancelSignal,
    ) -> Result<Translation> {
        tracing::info!(
            "Translating {} chunk(s) to {} with {}",
            chunks.len(),
            target_language,
            self.generator.model_name()
        );

        let mut translation = Translation {
            chunks: Vec::with_capacity(chunks.len()),
        };

        for chunk in chunks {
            cancel.checkpoint()?;

            let prompt = build_prompt(&chunk.text, target_language);
            let outcome = tokio::select! {
                outcome = self.generator.generate(&prompt) => outcome,
                _ = cancel.cancelled() => return Err(DubError::Cancelled.into()),
            };

            let result = match outcome {
                Ok(text) => {
                    tracing::debug!("Chunk {} translated ({} words)", chunk.index, chunk.word_count());
                    TranslatedChunk::Translated {
                        index: chunk.index,
                        text,
                    }
                }
                Err(error) => {
                    tracing::warn!("Chunk {} failed: {}", chunk.index, error);
                    TranslatedChunk::Failed {
                        index: chunk.index,
                        error,
                    }
                }
            };
            translation.chunks.push(result);
        }

        if translation.failed_count() > 0 {
            tracing::warn!(
                "{} of {} chunk(s) failed to translate",
                translation.failed_count(),
                chunks.len()
            );
        }

        Ok(translation)
    }
}
