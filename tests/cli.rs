use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn write_config(dir: &Path, api_key: &str) -> std::path::PathBuf {
    let path = dir.join("config.yaml");
    let yaml = format!(
        "gemini:\n  api_key: \"{}\"\n  base_url: http://127.0.0.1:9\ntranscript:\n  yt_dlp_path: /nonexistent/yt-dlp\nspeech:\n  ffmpeg_path: /nonexistent/ffmpeg\n  temp_dir: {}\n",
        api_key,
        dir.join("audio").display()
    );
    fs_err::write(&path, yaml).unwrap();
    path
}

fn tubedub() -> Command {
    let mut cmd = Command::cargo_bin("tubedub").unwrap();
    cmd.env_remove("GEMINI_API_KEY").env_remove("RUST_LOG");
    cmd
}

#[test]
fn languages_lists_the_table() {
    tubedub()
        .arg("languages")
        .assert()
        .success()
        .stdout(predicate::str::contains("french").and(predicate::str::contains("zh-CN")));
}

#[test]
fn handle_reports_missing_fields_and_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "test-key");

    tubedub()
        .args(["--quiet", "--config"])
        .arg(&config)
        .arg("handle")
        .write_stdin(r#"{"youtube_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"}"#)
        .assert()
        .code(1)
        .stdout(
            predicate::str::contains("\"statusCode\": 400")
                .and(predicate::str::contains("Missing youtube_url or target_language")),
        );
}

#[test]
fn translate_rejects_invalid_url() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "test-key");
    let response = dir.path().join("response.json");

    tubedub()
        .args(["--quiet", "--config"])
        .arg(&config)
        .args(["translate", "not a url", "--language", "French", "--output"])
        .arg(&response)
        .assert()
        .code(1);

    let saved = fs_err::read_to_string(&response).unwrap();
    assert!(saved.contains("Invalid YouTube URL"));
}

#[test]
fn api_key_flag_overrides_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "");

    tubedub()
        .args(["--quiet", "--config"])
        .arg(&config)
        .args(["handle"])
        .write_stdin("{}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key"));

    tubedub()
        .args(["--quiet", "--api-key", "flag-key", "--config"])
        .arg(&config)
        .args(["handle"])
        .write_stdin("{}")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Missing youtube_url or target_language"));
}

#[test]
fn config_show_masks_the_key() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "abcdefgh1234");

    tubedub()
        .args(["--config"])
        .arg(&config)
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("********1234").and(predicate::str::contains("abcdefgh1234").not()));
}

#[test]
fn config_init_writes_defaults_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.yaml");

    tubedub()
        .args(["--config"])
        .arg(&path)
        .args(["config", "--init"])
        .assert()
        .success();
    assert!(fs_err::read_to_string(&path).unwrap().contains("max_words: 5000"));

    tubedub()
        .args(["--config"])
        .arg(&path)
        .args(["config", "--init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}
