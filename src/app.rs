//! Command-line front-end.
//!
//! A thin adapter over the library: it parses arguments, wires the stores
//! to the platform data directory and renders [`PipelineEvent`]s on the
//! terminal.  The alert text goes to stdout; progress, prompts and notices go
//! to stderr, so `press-alert generate clip.mp3 > alerta.txt` works.
//!
//! # Commands
//!
//! | Command | Effect |
//! |---------|--------|
//! | `generate <FILE>` | Stream a press alert for an audio file |
//! | `key set/clear/status` | Manage the stored API key |
//! | `style show/sync/set/import/export` | Manage the style examples |
//! | `history list/show/move/clear/copy` | Browse saved alerts (1-based) |
//! | `config show/init` | Print the effective settings or write the defaults |

use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

use crate::audio::AudioPayload;
use crate::clipboard::copy_to_clipboard;
use crate::config::{AppConfig, AppPaths};
use crate::generation::GenerationError;
use crate::pipeline::{
    GenerationPipeline, PipelineEvent, ProgressPhase, ProgressSnapshot, SubmitOutcome,
};
use crate::store::{
    AlertRecord, CredentialError, CredentialStore, FileStore, HistoryStore, SharedSource,
    SharedStore, StyleError, StyleStore,
};

/// Wrong keys typed in a row before `generate` gives up.
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

const PROGRESS_BAR_WIDTH: usize = 30;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// Generate institutional press alerts from audio recordings.
#[derive(Debug, Parser)]
#[command(name = "press-alert", version, long_about = None)]
pub struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, env = "PRESS_ALERT_CONFIG", global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the key, style examples and history
    #[arg(long, env = "PRESS_ALERT_DATA_DIR", global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a press alert from an audio file
    Generate {
        /// Audio file (mp3, wav, m4a, mp4, webm, mpeg)
        file: PathBuf,
        /// Name saved with the alert (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Content type of the audio, when the extension is misleading
        #[arg(long)]
        mime: Option<String>,
        /// Copy the finished alert to the clipboard
        #[arg(long, default_value_t = false)]
        copy: bool,
    },
    /// Manage the API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// Manage the style examples
    Style {
        #[command(subcommand)]
        action: StyleAction,
    },
    /// Browse and organise saved alerts
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Inspect or create the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective settings as TOML
    Show,
    /// Write the default settings file
    Init {
        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum KeyAction {
    /// Store a new API key
    Set { value: String },
    /// Remove the stored API key
    Clear,
    /// Show whether a key is stored
    Status,
}

#[derive(Debug, Subcommand)]
pub enum StyleAction {
    /// Print the cached style examples
    Show,
    /// Refresh from the shared source and print the result
    Sync,
    /// Replace the style examples with the contents of a file (`-` for stdin)
    Set { file: String },
    /// Load a style snapshot file
    Import { file: PathBuf },
    /// Write a style snapshot file
    Export {
        /// Output path (defaults to alerta_estilo_<date>.json)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    /// List saved alerts, newest first
    List,
    /// Print one alert
    Show { n: usize },
    /// Move an alert to another position
    Move { from: usize, to: usize },
    /// Delete every saved alert
    Clear {
        /// Do not ask for confirmation
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    /// Copy one alert to the clipboard
    Copy { n: usize },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Execute `cli`.  `Ok(ExitCode::FAILURE)` means the failure was already
/// reported on stderr.
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let paths = AppPaths::new();
    let config_path = cli.config.unwrap_or(paths.settings_file);
    let config = AppConfig::load_from(&config_path)
        .with_context(|| format!("cannot read settings from {}", config_path.display()))?;
    let data_dir = cli.data_dir.unwrap_or(paths.data_dir);
    log::debug!("app: settings {}, data {}", config_path.display(), data_dir.display());

    let kv: SharedStore = Arc::new(FileStore::new(data_dir));

    match cli.command {
        Command::Generate {
            file,
            name,
            mime,
            copy,
        } => generate(&config, kv, file, name, mime, copy).await,
        Command::Key { action } => key(&config, kv, action).map(|_| ExitCode::SUCCESS),
        Command::Style { action } => style(&config, kv, action).await.map(|_| ExitCode::SUCCESS),
        Command::History { action } => history(&config, kv, action).await,
        Command::Config { action } => {
            settings(&config, &config_path, action).map(|_| ExitCode::SUCCESS)
        }
    }
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

async fn generate(
    config: &AppConfig,
    kv: SharedStore,
    file: PathBuf,
    name: Option<String>,
    mime: Option<String>,
    copy: bool,
) -> Result<ExitCode> {
    let payload = match AudioPayload::from_file(&file, config.limits.max_payload_bytes).await {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("{}", GenerationError::from(e));
            return Ok(ExitCode::FAILURE);
        }
    };
    let payload = if name.is_some() || mime.is_some() {
        let display_name = name.unwrap_or_else(|| payload.display_name().to_string());
        AudioPayload::new(payload.data().clone(), mime, display_name)
    } else {
        payload
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(render_events(rx));
    let mut pipeline = GenerationPipeline::from_config(config, kv).with_events(tx);

    let mut outcome = pipeline.submit(payload).await;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut attempts = 0;

    while pipeline.pending().is_some() && attempts < MAX_CREDENTIAL_ATTEMPTS {
        attempts += 1;
        tokio::task::yield_now().await;

        let Some(value) = prompt_line(&mut stdin, "API key: ").await? else {
            break;
        };
        match pipeline.provide_credential(&value).await {
            Ok(Some(next)) => outcome = next,
            Ok(None) => break,
            Err(CredentialError::TooShort { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(pending) = pipeline.cancel_pending() {
        eprintln!("no API key provided; {} was not processed", pending.display_name());
        outcome = SubmitOutcome::Failed(GenerationError::MissingCredential);
    }

    log::info!("app: generation finished ({})", pipeline.state().label());
    drop(pipeline);
    let _ = renderer.await;

    match outcome {
        SubmitOutcome::Committed(record) => {
            if copy {
                copy_alert(&record);
            }
            Ok(ExitCode::SUCCESS)
        }
        SubmitOutcome::AwaitingCredential | SubmitOutcome::Failed(_) => Ok(ExitCode::FAILURE),
    }
}

/// Print pipeline events until the pipeline is dropped.
async fn render_events(mut rx: mpsc::UnboundedReceiver<PipelineEvent>) {
    let mut draft = DraftPrinter::default();
    let mut progress_shown = false;

    while let Some(event) = rx.recv().await {
        match event {
            PipelineEvent::CredentialRequired { source_name } => {
                eprintln!("An API key is required to process {source_name}.");
            }
            PipelineEvent::Loading { source_name } => {
                draft = DraftPrinter::default();
                eprintln!("Processing {source_name}...");
            }
            PipelineEvent::Progress(snapshot) => {
                if snapshot.phase == ProgressPhase::Complete || snapshot.phase == ProgressPhase::Failed
                {
                    if progress_shown {
                        eprintln!("\r{}", progress_line(snapshot));
                        progress_shown = false;
                    }
                } else if std::io::stderr().is_terminal() {
                    eprint!("\r{}", progress_line(snapshot));
                    progress_shown = true;
                }
            }
            PipelineEvent::DraftUpdated(text) => write_stdout(&draft.next(&text)),
            PipelineEvent::Committed(record) => {
                println!();
                eprintln!("Alert saved to history ({}).", record.title());
            }
            PipelineEvent::Failed(err) => {
                if draft.printed() > 0 {
                    println!();
                }
                eprintln!("Error: {err}");
            }
            PipelineEvent::Notice { message, .. } => eprintln!("{message}"),
        }
    }
}

fn write_stdout(text: &str) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(text.as_bytes());
    let _ = out.flush();
}

fn progress_line(snapshot: ProgressSnapshot) -> String {
    let filled = ((snapshot.percent / 100.0) * PROGRESS_BAR_WIDTH as f32).round() as usize;
    let filled = filled.min(PROGRESS_BAR_WIDTH);
    format!(
        "[{}{}] {:>3.0}% {:<40}",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_WIDTH - filled),
        snapshot.percent,
        snapshot.phase.label()
    )
}

/// Turns full-draft updates into the text not yet written to stdout.
#[derive(Debug, Default)]
struct DraftPrinter {
    printed: String,
}

impl DraftPrinter {
    fn next(&mut self, full: &str) -> String {
        let delta = match full.strip_prefix(self.printed.as_str()) {
            Some(rest) => rest.to_string(),
            // Not an extension of what is on screen; start a fresh block.
            None => format!("\n{full}"),
        };
        self.printed = full.to_string();
        delta
    }

    fn printed(&self) -> usize {
        self.printed.len()
    }
}

async fn prompt_line(lines: &mut Lines<BufReader<Stdin>>, prompt: &str) -> Result<Option<String>> {
    if std::io::stdin().is_terminal() {
        eprint!("{prompt}");
        let _ = std::io::stderr().flush();
    }
    let line = lines.next_line().await.context("cannot read from stdin")?;
    Ok(line.map(|l| l.trim().to_string()))
}

fn copy_alert(record: &AlertRecord) {
    match copy_to_clipboard(record.content()) {
        Ok(true) => eprintln!("Copied to clipboard."),
        Ok(false) => eprintln!("Nothing to copy."),
        Err(e) => eprintln!("Error: {e}"),
    }
}

// ---------------------------------------------------------------------------
// key
// ---------------------------------------------------------------------------

fn key(config: &AppConfig, kv: SharedStore, action: KeyAction) -> Result<()> {
    let store = CredentialStore::with_min_len(kv, config.limits.min_credential_len);
    match action {
        KeyAction::Set { value } => {
            let credential = store.set(&value)?;
            eprintln!("API key saved ({}).", credential.masked());
        }
        KeyAction::Clear => {
            store.clear()?;
            eprintln!("API key removed.");
        }
        KeyAction::Status => match store.get() {
            Some(credential) => println!("API key stored ({})", credential.masked()),
            None => println!("no API key stored"),
        },
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// style
// ---------------------------------------------------------------------------

async fn style(config: &AppConfig, kv: SharedStore, action: StyleAction) -> Result<()> {
    let store = StyleStore::new(kv)
        .with_shared_source(config.style.shared_source.as_deref().map(SharedSource::parse));

    match action {
        StyleAction::Show => println!("{}", store.cached()),
        StyleAction::Sync => {
            if store.shared_source().is_none() {
                eprintln!("No shared style source configured; showing the local copy.");
            }
            println!("{}", store.load().await);
        }
        StyleAction::Set { file } => {
            let text = if file == "-" {
                let mut text = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut text)
                    .await
                    .context("cannot read style examples from stdin")?;
                text
            } else {
                tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("cannot read {file}"))?
            };
            store.save(&text)?;
            eprintln!("Style saved.");
        }
        StyleAction::Import { file } => {
            let json = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?;
            let text = store.import_snapshot(&json).map_err(|e| match e {
                StyleError::Format(reason) => anyhow::Error::new(GenerationError::Format(reason)),
                other => other.into(),
            })?;
            eprintln!("Style imported ({} chars).", text.chars().count());
        }
        StyleAction::Export { out } => {
            let out = out.unwrap_or_else(|| {
                PathBuf::from(StyleStore::snapshot_file_name(Local::now().date_naive()))
            });
            let bytes = StyleStore::export_snapshot(&store.cached(), Utc::now());
            tokio::fs::write(&out, bytes)
                .await
                .with_context(|| format!("cannot write {}", out.display()))?;
            eprintln!("Style exported to {}.", out.display());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

async fn history(config: &AppConfig, kv: SharedStore, action: HistoryAction) -> Result<ExitCode> {
    let mut store = HistoryStore::load(kv, config.limits.history_capacity);

    match action {
        HistoryAction::List => {
            if store.is_empty() {
                eprintln!("History is empty.");
            }
            for (i, record) in store.all().iter().enumerate() {
                println!("{:>2}. {}  {}", i + 1, local_time(record), record.title());
            }
        }
        HistoryAction::Show { n } => {
            let record = record_at(&store, n)?;
            eprintln!("{} · {}", record.title(), local_time(record));
            println!("{}", record.content());
        }
        HistoryAction::Move { from, to } => {
            let from = index(from, store.len())?;
            let to = index(to, store.len())?;
            if store.reorder(from, to)? {
                eprintln!("Moved #{} to #{}.", from + 1, to + 1);
            }
        }
        HistoryAction::Clear { yes } => {
            if !yes && !confirm("Delete the whole history? [y/N] ").await? {
                eprintln!("Cancelled.");
                return Ok(ExitCode::FAILURE);
            }
            store.clear()?;
            eprintln!("History cleared.");
        }
        HistoryAction::Copy { n } => copy_alert(record_at(&store, n)?),
    }
    Ok(ExitCode::SUCCESS)
}

/// 1-based position `n` → 0-based index.
fn index(n: usize, len: usize) -> Result<usize> {
    if n == 0 || n > len {
        bail!("no alert #{n} (history has {len})");
    }
    Ok(n - 1)
}

fn record_at(store: &HistoryStore, n: usize) -> Result<&AlertRecord> {
    let i = index(n, store.len())?;
    store.get(i).with_context(|| format!("no alert #{n}"))
}

fn local_time(record: &AlertRecord) -> String {
    record
        .created_at()
        .with_timezone(&Local)
        .format("%d/%m/%Y %H:%M")
        .to_string()
}

async fn confirm(prompt: &str) -> Result<bool> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let answer = prompt_line(&mut lines, prompt).await?.unwrap_or_default();
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes" | "s" | "si" | "sí"))
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn settings(config: &AppConfig, path: &Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let text = toml::to_string_pretty(config).context("cannot serialise settings")?;
            eprintln!("# {}", path.display());
            println!("{text}");
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            AppConfig::default()
                .save_to(path)
                .with_context(|| format!("cannot write {}", path.display()))?;
            eprintln!("Settings written to {}.", path.display());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
