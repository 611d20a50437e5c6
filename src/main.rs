use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tubedub::cancel::{self, CancelSignal};
use tubedub::{output, utils, Cli, Commands, Config, DubRequest, DubResponse, RequestHandler, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let succeeded = match cli.command {
        Commands::Translate {
            ref url,
            ref language,
            ref output,
        } => {
            let request = DubRequest::new(url.as_str(), language.as_str());
            let handler = build_handler(&cli).await?;
            let cancel = cancel_on_ctrl_c();

            let spinner = spinner(cli.quiet, format!("Dubbing {} into {}", url, language));
            let response = handler.handle(request, &cancel).await;
            spinner.finish_and_clear();

            emit(&response, output.as_deref())?
        }
        Commands::Handle {
            ref input,
            ref output,
        } => {
            let body = read_request(input.as_deref()).await?;
            let handler = build_handler(&cli).await?;
            let cancel = cancel_on_ctrl_c();

            let spinner = spinner(cli.quiet, "Handling request".to_string());
            let response = handler.handle_body(&body, &cancel).await;
            spinner.finish_and_clear();

            emit(&response, output.as_deref())?
        }
        Commands::Languages => {
            println!("Supported languages (anything else is spoken as English):");
            for (name, code) in utils::supported_languages() {
                println!("  • {:<12} {}", name, code);
            }
            true
        }
        Commands::Config { show, init } => {
            if init {
                let path = match &cli.config {
                    Some(path) => path.clone(),
                    None => Config::config_path()?,
                };
                if path.exists() {
                    anyhow::bail!("Config file already exists: {}", path.display());
                }
                let path = Config::default().save(Some(&path))?;
                println!("Configuration written to: {}", path.display());
            }
            if show || !init {
                load_config(&cli)?.display()?;
            }
            true
        }
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose { "tubedub=debug" } else { "tubedub=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // stdout carries the response only
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(key) = cli.api_key.as_ref().filter(|key| !key.trim().is_empty()) {
        config.gemini.api_key = key.clone();
    }
    Ok(config)
}

async fn build_handler(cli: &Cli) -> Result<RequestHandler> {
    let config = load_config(cli)?;
    config.validate()?;

    // Check for required external dependencies (non-fatal)
    let missing_deps =
        utils::check_dependencies(&config.transcript.yt_dlp_path, &config.speech.ffmpeg_path).await;
    if !missing_deps.is_empty() {
        tracing::warn!("Dependency check warnings:");
        for dep in missing_deps {
            tracing::warn!("  • {}", dep);
        }
    }

    RequestHandler::from_config(&config)
}

fn cancel_on_ctrl_c() -> CancelSignal {
    let (handle, signal) = cancel::new_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling request");
            handle.cancel();
        }
    });
    signal
}

async fn read_request(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => Ok(fs_err::read_to_string(path)?),
        None => {
            let mut body = String::new();
            tokio::io::stdin()
                .read_to_string(&mut body)
                .await
                .context("Failed to read request from stdin")?;
            Ok(body)
        }
    }
}

fn spinner(quiet: bool, message: String) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Write the response and report whether it was a success
fn emit(response: &DubResponse, destination: Option<&Path>) -> Result<bool> {
    match destination {
        Some(path) => {
            output::save_to_file(response, path)?;
            eprintln!("Response saved to: {}", path.display());
        }
        None => output::print_to_console(response)?,
    }
    Ok(response.is_success())
}
