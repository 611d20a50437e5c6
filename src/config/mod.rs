use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::translate::DEFAULT_MAX_WORDS;
use crate::{DubError, Result};

/// Environment variable that overrides `gemini.api_key`
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gemini translation service
    pub gemini: GeminiConfig,

    /// Transcript download settings
    pub transcript: TranscriptConfig,

    /// Chunking settings
    pub translation: TranslationConfig,

    /// Speech rendering and speed-up
    pub speech: SpeechConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Attempts per chunk, counting the first; only transport failures are retried
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    pub yt_dlp_path: String,

    /// Subtitle languages to ask for, in preference order
    pub languages: Vec<String>,

    pub timeout_secs: u64,
    pub max_attempts: u32,

    /// Fail the request instead of translating the error text
    pub fail_on_error: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Maximum words per chunk sent to the translator
    pub max_words: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub tts_endpoint: String,
    pub ffmpeg_path: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,

    /// Where audio files are written; system temp dir when unset
    pub temp_dir: Option<PathBuf>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            timeout_secs: 60,
            max_attempts: 2,
        }
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            languages: vec!["en".to_string(), "en-US".to_string(), "en-GB".to_string()],
            timeout_secs: 120,
            max_attempts: 2,
            fail_on_error: false,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            tts_endpoint: "https://translate.google.com/translate_tts".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            timeout_secs: 60,
            max_attempts: 2,
            temp_dir: None,
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise the first of `./config.yaml` and
    /// the user config file that exists is read, falling back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(DubError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    ))
                    .into());
                }
                Some(path.to_path_buf())
            }
            None => Self::config_path().ok().filter(|path| path.exists()),
        };

        let mut config = match path {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply environment overrides, looking variables up through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|key| !key.trim().is_empty()) {
            self.gemini.api_key = key;
        }
    }

    /// Save configuration to `path`, or to the default location
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs_err::write(&path, content).context("Failed to write config file")?;

        Ok(path)
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .ok_or_else(|| DubError::Config("Could not determine config directory".to_string()))?;

        Ok(config_dir.join("tubedub").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(invalid(format!(
                "Gemini API key must be configured (gemini.api_key or {})",
                API_KEY_ENV
            )));
        }
        if self.translation.max_words == 0 {
            return Err(invalid("translation.max_words must be at least 1"));
        }

        for (name, value) in [
            ("gemini.timeout_secs", self.gemini.timeout_secs),
            ("transcript.timeout_secs", self.transcript.timeout_secs),
            ("speech.timeout_secs", self.speech.timeout_secs),
        ] {
            if value == 0 {
                return Err(invalid(format!("{} must be greater than zero", name)));
            }
        }
        for (name, value) in [
            ("gemini.max_attempts", self.gemini.max_attempts),
            ("transcript.max_attempts", self.transcript.max_attempts),
            ("speech.max_attempts", self.speech.max_attempts),
        ] {
            if value == 0 {
                return Err(invalid(format!("{} must be at least 1", name)));
            }
        }

        Ok(())
    }

    /// Copy of this configuration that is safe to print
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.gemini.api_key = mask_secret(&config.gemini.api_key);
        config
    }

    /// Display current configuration
    pub fn display(&self) -> Result<()> {
        let content = serde_yaml::to_string(&self.redacted()).context("Failed to serialize config")?;
        println!("Current Configuration:");
        print!("{}", content);
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> anyhow::Error {
    DubError::Config(message.into()).into()
}

/// Keep the last four characters of a secret
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}
