use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tubedub::config::{Config, GeminiConfig, SpeechConfig};
use tubedub::extractors::VideoId;
use tubedub::speech::{AudioRetimer, GoogleTranslateTts, SpeechSynthesizer};
use tubedub::translate::{GeminiClient, TranslationOrchestrator};
use tubedub::{CancelSignal, DubRequest, RequestHandler, Result, TranscriptFetcher, TranscriptProvider, TranscriptSegment};

const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

struct FixedTranscript(Vec<&'static str>);

#[async_trait]
impl TranscriptProvider for FixedTranscript {
    async fn list_segments(&self, _video_id: &VideoId) -> Result<Vec<TranscriptSegment>> {
        Ok(self.0.iter().map(|text| TranscriptSegment::new(*text)).collect())
    }

    fn provider_name(&self) -> &'static str {
        "fixed"
    }
}

struct CopyRetimer;

#[async_trait]
impl AudioRetimer for CopyRetimer {
    async fn retime(&self, input: &Path, output: &Path, _speed: f64) -> Result<()> {
        fs_err::copy(input, output)?;
        Ok(())
    }
}

fn candidates(text: &str) -> serde_json::Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
}

fn gemini_config(server: &MockServer) -> GeminiConfig {
    GeminiConfig {
        api_key: "integration-key".to_string(),
        base_url: server.uri(),
        timeout_secs: 5,
        ..GeminiConfig::default()
    }
}

#[tokio::test]
async fn failed_second_chunk_becomes_a_placeholder_line() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("hello world"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidates("bonjour le monde")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("goodbye moon"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .and(query_param("tl", "fr"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3 speech".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let audio_dir = tempfile::tempdir().unwrap();
    let speech_config = SpeechConfig {
        tts_endpoint: format!("{}/translate_tts", server.uri()),
        max_attempts: 1,
        ..SpeechConfig::default()
    };

    let handler = RequestHandler::new(
        TranscriptFetcher::new(Box::new(FixedTranscript(vec!["hello world", "goodbye moon"]))),
        TranslationOrchestrator::new(Box::new(GeminiClient::new(&gemini_config(&server)).unwrap()), 2),
        SpeechSynthesizer::new(
            Box::new(GoogleTranslateTts::new(&speech_config).unwrap()),
            Box::new(CopyRetimer),
            Some(audio_dir.path().to_path_buf()),
        ),
        false,
    );

    let response = handler
        .handle(DubRequest::new(URL, "French"), &CancelSignal::never())
        .await;

    assert_eq!(response.status_code, 200, "{}", response.body);
    let body = response.body_json().unwrap();
    assert_eq!(body["video_id"], "dQw4w9WgXcQ");

    let translated = body["translated"].as_str().unwrap();
    let lines: Vec<&str> = translated.lines().collect();
    assert_eq!(lines, vec!["bonjour le monde", "[API error in chunk 1: quota exceeded]"]);

    let audio = Path::new(body["audio_path"].as_str().unwrap());
    assert_eq!(fs_err::read(audio).unwrap(), b"ID3 speech");

    // Only the sped-up file is left behind
    assert_eq!(fs_err::read_dir(audio_dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn invalid_requests_never_reach_external_services() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidates("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.gemini = gemini_config(&server);
    config.transcript.yt_dlp_path = "/nonexistent/yt-dlp".to_string();
    let handler = RequestHandler::from_config(&config).unwrap();
    let cancel = CancelSignal::never();

    let response = handler.handle(DubRequest::new("not a url", "French"), &cancel).await;
    assert_eq!(response.status_code, 400);
    assert_eq!(response.body_json().unwrap(), json!({ "error": "Invalid YouTube URL" }));

    let response = handler
        .handle_body(&json!({ "youtube_url": URL }).to_string(), &cancel)
        .await;
    assert_eq!(response.status_code, 400);
    assert_eq!(
        response.body_json().unwrap(),
        json!({ "error": "Missing youtube_url or target_language" })
    );
}

#[tokio::test]
async fn missing_api_key_is_rejected_at_construction() {
    let config = Config::default();
    assert!(RequestHandler::from_config(&config).is_err());
}
