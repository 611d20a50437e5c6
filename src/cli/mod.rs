use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tubedub",
    about = "tubedub - translate a YouTube video's transcript and read it aloud",
    version,
    long_about = "Fetches a YouTube video's transcript, translates it with Google's Gemini API and renders the translation as a sped-up MP3 file."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Path to a config file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Gemini API key (overrides the config file)
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a video and render the translation to speech
    Translate {
        /// YouTube video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Target language name, e.g. French
        #[arg(short, long, value_name = "NAME")]
        language: String,

        /// Write the response to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Handle a raw JSON request ({"youtube_url", "target_language"})
    Handle {
        /// Read the request from a file (stdin if not specified)
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Write the response to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List language names with a dedicated speech voice
    Languages,

    /// Show or initialise the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default config file
        #[arg(long)]
        init: bool,
    },
}
