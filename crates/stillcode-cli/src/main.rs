#![deny(unsafe_code)]

//! Stillcode CLI: inspect tokenization, alignment and windowed search.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use stillcode_config::AppConfig;
use stillcode_core::{align, build_info, lex_align, lexer, locate};

/// Stillcode: does accepted code stay in the document?
#[derive(Parser)]
#[command(name = "stillcode", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "stillcode.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split text into lexemes.
    Tokenize { text: String },

    /// Character-level alignment of a needle inside a haystack.
    Align {
        haystack: String,
        needle: String,
        /// Include the edit script.
        #[arg(long)]
        script: bool,
    },

    /// Lexeme-level alignment of a needle inside a haystack.
    LexAlign { haystack: String, needle: String },

    /// Search a file for text near an offset.
    Find {
        #[arg(long)]
        file: PathBuf,
        /// Character offset to search around.
        #[arg(long)]
        offset: usize,
        /// Search margin in characters (defaults to the configured near margin).
        #[arg(long)]
        margin: Option<usize>,
        #[arg(long)]
        needle: String,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },

    /// Print version and build metadata.
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_config(&cli.config).await?;
    let found = loaded.is_some();
    let config = loaded.unwrap_or_default();
    init_tracing(cli.verbose, &config.logging.level);
    if !found {
        debug!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    let output = match cli.command {
        Commands::Tokenize { text } => tokenize_json(&text),
        Commands::Align {
            haystack,
            needle,
            script,
        } => align_json(&haystack, &needle, script),
        Commands::LexAlign { haystack, needle } => lex_align_json(&haystack, &needle),
        Commands::Find {
            file,
            offset,
            margin,
            needle,
        } => cmd_find(&config, &file, offset, margin, &needle).await?,
        Commands::Config { show } => return cmd_config(&cli.config, &config, show),
        Commands::Version => {
            println!("stillcode {}", build_info::version_string());
            println!("built at {} (unix)", build_info::BUILD_TIMESTAMP);
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_tracing(verbose: u8, configured: &str) {
    let level = match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn tokenize_json(text: &str) -> Value {
    let (lexemes, dictionary) = lexer::tokenize(text);
    json!({
        "lexemes": lexemes,
        "distinct": dictionary.len(),
    })
}

fn align_json(haystack: &str, needle: &str, with_script: bool) -> Value {
    let (alignment, script) = align::align_with_script(haystack, needle);
    let mut output = json!({
        "distance": alignment.distance,
        "start": alignment.start,
        "end": alignment.end,
        "matched": alignment.matched(haystack),
    });
    if with_script {
        output["script"] = json!(script);
    }
    output
}

fn lex_align_json(haystack: &str, needle: &str) -> Value {
    let alignment = lex_align::lex_align(haystack, needle);
    json!({
        "lexDistance": alignment.lex_distance,
        "start": alignment.start,
        "end": alignment.end,
        "matched": alignment.matched(haystack),
        "needleLexLength": alignment.needle_lex_len,
        "haystackLexLength": alignment.haystack_lex_len,
    })
}

async fn cmd_find(
    config: &AppConfig,
    file: &Path,
    offset: usize,
    margin: Option<usize>,
    needle: &str,
) -> Result<Value> {
    let document = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let margin = margin.unwrap_or(config.tracker.near_margin);
    info!(file = %file.display(), offset, margin, "Searching");
    let result = locate::find_with_threshold(
        &document,
        offset,
        margin,
        needle,
        config.tracker.still_in_code_threshold,
    );
    Ok(serde_json::to_value(result)?)
}

fn cmd_config(path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if show {
        let toml_str = toml::to_string_pretty(config).context("failed to render configuration")?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", path.display());
    }
    Ok(())
}

/// Load and validate the config file, or `None` when it does not exist.
async fn load_config(path: &Path) -> Result<Option<AppConfig>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(None);
    }
    let config = AppConfig::load(path)
        .await
        .with_context(|| format!("invalid configuration at {}", path.display()))?;
    Ok(Some(config))
}
