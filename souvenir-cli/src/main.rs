//! souvenir-cli — run the fact pipeline over text, memory files and stdin
//!
//! # Subcommands
//! - `extract <text>`                              — pattern extraction only
//! - `turn <text> [--memory f] [--recent u]...`    — full turn pipeline
//! - `contradictions <text> --memory f`            — conflicts with stored facts
//! - `suggest --recent u... [--memory f] [-n max]` — follow-up questions
//! - `gaps [--memory f]`                           — missing categories
//! - `check-rules [--rules f]`                     — load and validate a rule table
//! - `request`                                     — one JSON request per stdin line
//!
//! Memory files are JSON arrays of stored facts
//! (`[{"content": "...", "category": "identité"}]`).

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use souvenir_core::ipc::{SouvenirRequest, SouvenirResponse};
use souvenir_core::models::{ConversationContext, StoredFact};
use souvenir_core::{RuleSet, SouvenirConfig};
use souvenir_engine::router::handle_request;
use souvenir_engine::Pipeline;
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "souvenir-cli",
    version,
    about = "Rule-based personal-fact extraction and memory consolidation"
)]
struct Cli {
    /// Config file (optional; defaults apply when missing)
    #[arg(short, long, env = "SOUVENIR_CONFIG", default_value = "souvenir.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract candidate facts with the pattern rules
    Extract {
        text: String,
    },

    /// Process one conversation turn end to end
    Turn {
        text: String,

        /// JSON file with the stored facts
        #[arg(short, long)]
        memory: Option<PathBuf>,

        /// Previous utterances, oldest first (repeatable)
        #[arg(short, long)]
        recent: Vec<String>,

        /// Current conversation topic
        #[arg(long)]
        topic: Option<String>,

        /// Maximum number of suggestions
        #[arg(short = 'n', long)]
        max: Option<usize>,
    },

    /// Check a new utterance against stored facts
    Contradictions {
        text: String,

        #[arg(short, long)]
        memory: PathBuf,
    },

    /// Suggest follow-up questions for the recent conversation
    Suggest {
        #[arg(short, long, required = true)]
        recent: Vec<String>,

        #[arg(short, long)]
        memory: Option<PathBuf>,

        #[arg(short = 'n', long)]
        max: Option<usize>,
    },

    /// List categories with no stored facts
    Gaps {
        #[arg(short, long)]
        memory: Option<PathBuf>,
    },

    /// Load and validate a rule table, then print its summary
    CheckRules {
        /// Rule file (defaults to `rules.path` or the built-in table)
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Serve JSON requests from stdin, one per line, sharing one session
    Request,
}

// ============================================================================
// Helpers
// ============================================================================

fn load_memory(path: Option<&Path>) -> anyhow::Result<Vec<StoredFact>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    StoredFact::load_all(path)
        .with_context(|| format!("failed to load memory file {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn context_from(recent: Vec<String>, topic: Option<String>) -> Option<ConversationContext> {
    if recent.is_empty() && topic.is_none() {
        return None;
    }
    let ctx = ConversationContext::new(recent);
    Some(match topic {
        Some(t) => ctx.with_topic(t),
        None => ctx,
    })
}

/// Answer one request line; malformed lines get an error envelope
fn serve_line(
    line: &str,
    pipeline: &Pipeline,
    session: &mut souvenir_engine::SuggestionSession,
) -> SouvenirResponse {
    match serde_json::from_str::<SouvenirRequest>(line) {
        Ok(request) => handle_request(request, pipeline, session),
        Err(e) => SouvenirResponse::err(format!("invalid request: {}", e)),
    }
}

fn serve_stdin(pipeline: &Pipeline) -> anyhow::Result<()> {
    let mut session = pipeline.new_session();
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = serve_line(&line, pipeline, &mut session);
        writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
        stdout.flush()?;
    }
    tracing::info!("stdin closed, {} suggestion(s) marked used", session.len());
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn run(cli: Cli, config: SouvenirConfig) -> anyhow::Result<()> {
    if let Commands::CheckRules { rules } = &cli.command {
        let rule_set = match rules {
            Some(path) => RuleSet::from_path(path)?,
            None => RuleSet::from_config(&config.rules)?,
        };
        return print_json(&rule_set.summary());
    }

    let pipeline = Pipeline::from_config(&config)?;

    match cli.command {
        Commands::Extract { text } => print_json(&pipeline.extractor.extract(&text)),
        Commands::Turn {
            text,
            memory,
            recent,
            topic,
            max,
        } => {
            let memory = load_memory(memory.as_deref())?;
            let ctx = context_from(recent, topic);
            let max = max.unwrap_or_else(|| pipeline.suggestions.default_max());
            let session = pipeline.new_session();
            print_json(&pipeline.process_turn(&text, ctx.as_ref(), &memory, &session, max))
        }
        Commands::Contradictions { text, memory } => {
            let memory = load_memory(Some(&memory))?;
            print_json(&pipeline.detector.detect_contradictions(&text, &memory))
        }
        Commands::Suggest {
            recent,
            memory,
            max,
        } => {
            let memory = load_memory(memory.as_deref())?;
            let max = max.unwrap_or_else(|| pipeline.suggestions.default_max());
            let session = pipeline.new_session();
            print_json(
                &pipeline
                    .suggestions
                    .generate_suggestions(&session, &recent, &memory, max),
            )
        }
        Commands::Gaps { memory } => {
            let memory = load_memory(memory.as_deref())?;
            print_json(&pipeline.suggestions.analyze_memory_gaps(&memory))
        }
        Commands::Request => serve_stdin(&pipeline),
        Commands::CheckRules { .. } => Ok(()),
    }
}

fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load config (a missing file means defaults)
    let config = match SouvenirConfig::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("souvenir-cli: failed to load config from {}: {}", cli.config, e);
            std::process::exit(1);
        }
    };

    // Logs go to stderr so stdout stays valid JSON. RUST_LOG wins over service.log_level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_writer(std::io::stderr).with_env_filter(filter).init();

    if let Err(e) = run(cli, config) {
        eprintln!("souvenir-cli: {:#}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
