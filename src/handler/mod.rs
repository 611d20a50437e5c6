//! Request handling: validate the inbound request, run the pipeline and wrap
//! the outcome in a status-code envelope.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::Instrument;
use uuid::Uuid;

use crate::cancel::CancelSignal;
use crate::config::Config;
use crate::extractors::extract_video_id;
use crate::speech::{FfmpegRetimer, GoogleTranslateTts, SpeechSynthesizer};
use crate::transcript::youtube::YtDlpTranscriptProvider;
use crate::transcript::{Transcript, TranscriptFetcher};
use crate::translate::{GeminiClient, TranslationOrchestrator};
use crate::utils::resolve_language_code;
use crate::{DubError, Result};

/// Inbound request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DubRequest {
    #[serde(default)]
    pub youtube_url: Option<String>,

    #[serde(default)]
    pub target_language: Option<String>,
}

impl DubRequest {
    pub fn new(youtube_url: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            youtube_url: Some(youtube_url.into()),
            target_language: Some(target_language.into()),
        }
    }

    /// Both fields, or [`DubError::MissingFields`] if either is absent or empty.
    ///
    /// Values are taken as given. A whitespace-only URL fails id extraction instead.
    fn required_fields(self) -> std::result::Result<(String, String), DubError> {
        let present = |field: Option<String>| field.filter(|value| !value.is_empty());
        match (present(self.youtube_url), present(self.target_language)) {
            (Some(url), Some(language)) => Ok((url, language)),
            _ => Err(DubError::MissingFields),
        }
    }
}

/// Outbound envelope. `body` is itself a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DubResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    pub body: String,
}

#[derive(Debug)]
struct SuccessBody {
    video_id: String,
    translated: String,
    audio_path: String,
}

impl DubResponse {
    fn ok(body: &SuccessBody) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status_code: 200,
            headers,
            body: serde_json::json!({
                "video_id": body.video_id,
                "translated": body.translated,
                "audio_path": body.audio_path,
            })
            .to_string(),
        }
    }

    fn error(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            headers: BTreeMap::new(),
            body: serde_json::json!({ "error": message.into() }).to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// Decode `body`
    pub fn body_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Runs one request through transcript, translation and speech
pub struct RequestHandler {
    fetcher: TranscriptFetcher,
    orchestrator: TranslationOrchestrator,
    synthesizer: SpeechSynthesizer,
    fail_on_transcript_error: bool,
}

impl RequestHandler {
    pub fn new(
        fetcher: TranscriptFetcher,
        orchestrator: TranslationOrchestrator,
        synthesizer: SpeechSynthesizer,
        fail_on_transcript_error: bool,
    ) -> Self {
        Self {
            fetcher,
            orchestrator,
            synthesizer,
            fail_on_transcript_error,
        }
    }

    /// Build the default stack: yt-dlp, Gemini, Google Translate TTS and ffmpeg
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = TranscriptFetcher::new(Box::new(YtDlpTranscriptProvider::new(&config.transcript)));
        let orchestrator = TranslationOrchestrator::new(
            Box::new(GeminiClient::new(&config.gemini)?),
            config.translation.max_words,
        );
        let synthesizer = SpeechSynthesizer::new(
            Box::new(GoogleTranslateTts::new(&config.speech)?),
            Box::new(FfmpegRetimer::new(&config.speech)),
            config.speech.temp_dir.clone(),
        );

        Ok(Self::new(
            fetcher,
            orchestrator,
            synthesizer,
            config.transcript.fail_on_error,
        ))
    }

    /// Handle a raw JSON request body
    pub async fn handle_body(&self, body: &str, cancel: &CancelSignal) -> DubResponse {
        async {
            match serde_json::from_str::<DubRequest>(body) {
                Ok(request) => self.process(request, cancel).await,
                Err(e) => {
                    tracing::error!("Request body rejected: {}", e);
                    DubResponse::error(500, e.to_string())
                }
            }
        }
        .instrument(request_span())
        .await
    }

    /// Handle a decoded request
    pub async fn handle(&self, request: DubRequest, cancel: &CancelSignal) -> DubResponse {
        self.process(request, cancel).instrument(request_span()).await
    }

    async fn process(&self, request: DubRequest, cancel: &CancelSignal) -> DubResponse {
        tracing::debug!(stage = "received", "Request received");

        let response = match self.run(request, cancel).await {
            Ok(body) => DubResponse::ok(&body),
            Err(e) => match e.downcast_ref::<DubError>() {
                Some(DubError::MissingFields) | Some(DubError::InvalidUrl) => {
                    tracing::warn!(stage = "failed", "Request rejected: {}", e);
                    DubResponse::error(400, e.to_string())
                }
                _ => {
                    let description = format!("{:#}", e);
                    tracing::error!(stage = "failed", "Request failed: {}", description);
                    DubResponse::error(500, description)
                }
            },
        };

        tracing::info!(status = response.status_code, "Request finished");
        response
    }

    async fn run(&self, request: DubRequest, cancel: &CancelSignal) -> Result<SuccessBody> {
        let (url, target_language) = request.required_fields()?;
        tracing::debug!(stage = "validated", url = %url, language = %target_language);

        let video_id = extract_video_id(&url).ok_or(DubError::InvalidUrl)?;
        tracing::info!(stage = "id_extracted", video_id = %video_id, "Processing video");

        cancel.checkpoint()?;
        let transcript = tokio::select! {
            transcript = self.fetcher.fetch(&video_id) => transcript,
            _ = cancel.cancelled() => return Err(DubError::Cancelled.into()),
        };
        let text = match transcript {
            Transcript::Unavailable { reason } if self.fail_on_transcript_error => {
                return Err(DubError::TranscriptUnavailable(reason).into());
            }
            transcript => transcript.into_translatable_text(),
        };
        tracing::info!(stage = "transcript_fetched", words = text.split_whitespace().count());

        let translation = self
            .orchestrator
            .translate_text(&text, &target_language, cancel)
            .await?;
        let translated = translation.joined();
        tracing::info!(
            stage = "translated",
            chunks = translation.chunks.len(),
            failed = translation.failed_count()
        );

        cancel.checkpoint()?;
        let language_code = resolve_language_code(&target_language);
        let artifact = tokio::select! {
            artifact = self.synthesizer.synthesize(&translated, language_code) => artifact?,
            _ = cancel.cancelled() => return Err(DubError::Cancelled.into()),
        };
        tracing::info!(stage = "synthesized", audio = %artifact.path().display());

        Ok(SuccessBody {
            video_id: video_id.to_string(),
            translated,
            audio_path: artifact.into_path().to_string_lossy().into_owned(),
        })
    }
}

fn request_span() -> tracing::Span {
    tracing::info_span!("request", request_id = %Uuid::new_v4())
}
