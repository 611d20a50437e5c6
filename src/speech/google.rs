use anyhow::Context;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use url::Url;

use super::SpeechEngine;
use crate::config::SpeechConfig;
use crate::retry::RetryPolicy;
use crate::{DubError, Result};

/// The endpoint rejects longer `q` values
pub const MAX_PIECE_CHARS: usize = 200;

/// Speech engine backed by the Google Translate TTS endpoint
pub struct GoogleTranslateTts {
    client: Client,
    endpoint: Url,
    retry: RetryPolicy,
}

impl GoogleTranslateTts {
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.tts_endpoint).map_err(|e| {
            DubError::Config(format!("Invalid TTS endpoint {}: {}", config.tts_endpoint, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0 (compatible; tubedub)")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            retry: RetryPolicy::new("tts request").with_max_attempts(config.max_attempts),
        })
    }

    fn piece_url(&self, piece: &str, language_code: &str, idx: usize, total: usize) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("ie", "UTF-8")
            .append_pair("client", "tw-ob")
            .append_pair("tl", language_code)
            .append_pair("q", piece)
            .append_pair("total", &total.to_string())
            .append_pair("idx", &idx.to_string())
            .append_pair("textlen", &piece.chars().count().to_string());
        url
    }
}

#[async_trait]
impl SpeechEngine for GoogleTranslateTts {
    async fn render(&self, text: &str, language_code: &str, output: &Path) -> Result<()> {
        let pieces = split_for_speech(text, MAX_PIECE_CHARS);
        tracing::debug!("Requesting {} speech piece(s)", pieces.len());

        let mut file = fs_err::File::create(output)?;

        for (idx, piece) in pieces.iter().enumerate() {
            let url = self.piece_url(piece, language_code, idx, pieces.len());

            let response = self
                .retry
                .run(
                    |e: &reqwest::Error| e.is_timeout() || e.is_connect() || e.is_request(),
                    || self.client.get(url.clone()).send(),
                )
                .await
                .map_err(|e| anyhow::anyhow!("TTS request failed: {}", e.without_url()))?;

            if !response.status().is_success() {
                anyhow::bail!(
                    "TTS request for piece {} of {} failed: HTTP {}",
                    idx + 1,
                    pieces.len(),
                    response.status()
                );
            }

            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| anyhow::anyhow!("TTS download failed: {}", e.without_url()))?;
                file.write_all(&chunk)?;
            }
        }

        file.flush()?;
        Ok(())
    }

    fn engine_name(&self) -> &'static str {
        "Google Translate TTS"
    }
}

/// Split text into pieces of at most `max_chars` characters on word
/// boundaries. Words longer than the limit are cut.
pub fn split_for_speech(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for part in chars.chunks(max_chars) {
                pieces.push(part.iter().collect());
            }
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            pieces.push(std::mem::replace(&mut current, word.to_string()));
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
