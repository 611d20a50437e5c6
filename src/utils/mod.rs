use tokio::process::Command;

/// Language code used when a target language is not in the table
pub const DEFAULT_LANGUAGE_CODE: &str = "en";

/// Lowercase language name -> speech language code
const LANGUAGES: &[(&str, &str)] = &[
    ("english", "en"),
    ("hindi", "hi"),
    ("french", "fr"),
    ("spanish", "es"),
    ("german", "de"),
    ("chinese", "zh-CN"),
    ("arabic", "ar"),
    ("japanese", "ja"),
    ("korean", "ko"),
    ("russian", "ru"),
    ("italian", "it"),
    ("portuguese", "pt"),
    ("polish", "pl"),
];

/// Map a human language name to the code used for speech rendering.
///
/// Matching ignores case only; padded names fall back to English.
pub fn resolve_language_code(language: &str) -> &'static str {
    let name = language.to_lowercase();
    LANGUAGES
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, code)| *code)
        .unwrap_or(DEFAULT_LANGUAGE_CODE)
}

/// Known `(name, code)` pairs
pub fn supported_languages() -> &'static [(&'static str, &'static str)] {
    LANGUAGES
}

/// Check if the current environment has required tools
pub async fn check_dependencies(yt_dlp_path: &str, ffmpeg_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_path).await {
        missing.push(format!("{} - required for YouTube transcripts", yt_dlp_path));
    }

    if !check_command_available(ffmpeg_path).await {
        missing.push(format!("{} - required to speed up generated audio", ffmpeg_path));
    }

    missing
}

/// Check if a command is available in PATH
pub async fn check_command_available(command: &str) -> bool {
    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
