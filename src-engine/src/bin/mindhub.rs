// mindhub: terminal front end for the wellness session engine
//
// Commands:
//   mindhub session
//   mindhub breathe [--cycles <n>]
//   mindhub status [--json]
//   mindhub checkin <score> [--emoji <emoji>]
//   mindhub history [--json]
//   mindhub feed [--limit <n>] [--json]

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use crossterm::{
    cursor::MoveToColumn,
    execute,
    terminal::{Clear, ClearType},
};
use mindhub_engine_lib::{
    breathing::{phases::cycle_ms, PhaseDisplay, TimerDriver, PHASES},
    config::Config,
    identity::FileKv,
    mood::{Backend, MoodEntry, MoodHistoryStore, MoodScore},
    MindhubError, WellnessEngine,
};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "mindhub", version, about = "Breathing exercises and daily mood check-ins")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print this device's anonymous session id
    Session,
    /// Run the guided breathing timer (Ctrl-C to stop)
    Breathe {
        /// Stop after this many full cycles
        #[arg(long)]
        cycles: Option<u32>,
    },
    /// Show whether today's check-in is still open
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Record how you feel today, 1 (hard) to 5 (great)
    Checkin {
        score: i64,
        /// Emoji to store instead of the score's default
        #[arg(long)]
        emoji: Option<String>,
    },
    /// Show your mood history and average
    History {
        #[arg(long)]
        json: bool,
    },
    /// Show recent community posts
    Feed {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
}

type Engine = WellnessEngine<FileKv, Backend>;

/// Exit status when a check-in was not saved but may succeed later (EX_TEMPFAIL)
const EXIT_RETRY_LATER: u8 = 75;

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // stderr keeps the breathing line on stdout intact
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn build_engine(config: &Config) -> Result<Engine> {
    if let Err(e) = config.ensure_dirs() {
        // Identity falls back to an ephemeral id; the local store reports itself unavailable
        tracing::warn!(dir = %config.data_dir.display(), error = %e, "could not prepare data directory");
    }
    let backend = Backend::from_config(config).context("Failed to set up mood store")?;
    let storage = FileKv::new(config.storage_file());
    tracing::debug!(
        backend = backend.describe(),
        storage = %storage.path().display(),
        "engine configured"
    );
    let history = MoodHistoryStore::with_timeout(backend, config.remote_timeout);
    Ok(WellnessEngine::new(storage, history))
}

/// "Inhale 4s · Hold 2s · Exhale 6s · Hold 2s (14s per cycle)"
fn cadence_line() -> String {
    let steps: Vec<String> = PHASES
        .iter()
        .map(|p| format!("{} {}s", p.label, p.duration_secs()))
        .collect();
    format!("{} ({}s per cycle)", steps.join(" · "), cycle_ms() / 1000)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(ExitCode::SUCCESS)
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%b %-d, %H:%M").to_string()
}

fn score_dots(score: MoodScore) -> String {
    (MoodScore::MIN..=MoodScore::MAX)
        .map(|i| if i <= score.value() { '●' } else { '○' })
        .collect()
}

fn render_phase(out: &mut impl Write, display: &PhaseDisplay) -> io::Result<()> {
    execute!(out, Clear(ClearType::CurrentLine), MoveToColumn(0))?;
    if display.running {
        write!(
            out,
            "{:<7} {:>2}s   scale {:.2}",
            display.label, display.countdown_secs, display.scale
        )?;
    } else {
        write!(out, "Ready: {}", cadence_line())?;
    }
    out.flush()
}

async fn breathe(config: &Config, cycles: Option<u32>) -> Result<ExitCode> {
    let driver = TimerDriver::spawn(config.tick_interval);
    let mut updates = driver.subscribe();
    let mut stdout = io::stdout();

    println!("{}", cadence_line());
    println!("Follow the circle. Press Ctrl-C to stop.");
    driver.start();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut completed = 0u32;
    let mut last_phase = 0usize;
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let display = *updates.borrow_and_update();
                if display.running && last_phase == PHASES.len() - 1 && display.phase_index == 0 {
                    completed += 1;
                }
                last_phase = display.phase_index;
                render_phase(&mut stdout, &display)?;

                if cycles.is_some_and(|n| completed >= n) {
                    break;
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    driver.stop();
    driver.shutdown().await;
    println!();
    println!(
        "Session ended after {} full cycle{}.",
        completed,
        if completed == 1 { "" } else { "s" }
    );
    Ok(ExitCode::SUCCESS)
}

fn session(engine: &Engine) -> Result<ExitCode> {
    let id = engine.session_id();
    if engine.identity().is_ephemeral() {
        println!("{} (temporary: storage unavailable)", id);
    } else {
        println!("{}", id);
    }
    Ok(ExitCode::SUCCESS)
}

async fn status(engine: &Engine, json: bool) -> Result<ExitCode> {
    let now = Local::now();
    match engine.check_in_status(&now).await {
        Ok(status) if json => print_json(&status),
        Ok(status) => {
            match status.existing_score {
                Some(score) => println!(
                    "✓ Logged today: {} {} ({}/5). Come back tomorrow to check in again.",
                    score.emoji(),
                    score.label(),
                    score
                ),
                None => println!("How are you feeling right now? Run `mindhub checkin <1-5>`."),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("Could not reach the mood store right now ({}).", e);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// How a check-in attempt ended
#[derive(Debug, PartialEq)]
enum CheckInOutcome {
    Saved(MoodEntry),
    AlreadyCheckedIn(MoodScore),
    /// Nothing was written; the attempt can be repeated
    NotSaved(String),
}

impl CheckInOutcome {
    /// Failures other than a transient remote error are returned as-is
    fn classify(result: mindhub_engine_lib::Result<MoodEntry>) -> Result<Self, MindhubError> {
        match result {
            Ok(entry) => Ok(Self::Saved(entry)),
            Err(MindhubError::ThrottleRejected { existing_score }) => {
                Ok(Self::AlreadyCheckedIn(existing_score))
            }
            Err(e) if e.is_retryable() => Ok(Self::NotSaved(e.to_string())),
            Err(e) => Err(e),
        }
    }

    fn exit_code(&self) -> u8 {
        match self {
            Self::Saved(_) | Self::AlreadyCheckedIn(_) => 0,
            Self::NotSaved(_) => EXIT_RETRY_LATER,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Saved(entry) => format!(
                "Mood logged! Feeling {} today. {}",
                entry.score.label(),
                entry.emoji.as_deref().unwrap_or("")
            ),
            Self::AlreadyCheckedIn(score) => format!(
                "Already checked in today: {} {}. Come back tomorrow.",
                score.emoji(),
                score.label()
            ),
            Self::NotSaved(reason) => {
                format!("{}. Nothing was saved; try again in a moment.", reason)
            }
        }
    }
}

async fn checkin(engine: &Engine, raw_score: i64, emoji: Option<String>) -> Result<ExitCode> {
    let score = u8::try_from(raw_score)
        .ok()
        .and_then(MoodScore::new)
        .ok_or(MindhubError::InvalidScore(raw_score))?;

    let outcome = CheckInOutcome::classify(engine.check_in(score, emoji, &Local::now()).await)?;
    println!("{}", outcome.message());
    Ok(ExitCode::from(outcome.exit_code()))
}

async fn history(engine: &Engine, json: bool) -> Result<ExitCode> {
    let entries = match engine.history_entries().await {
        Ok(entries) => entries,
        Err(e) => {
            println!("Mood history is unavailable right now ({}).", e);
            return Ok(ExitCode::SUCCESS);
        }
    };
    let summary = mindhub_engine_lib::mood::summarize(&entries, &Local);

    if json {
        return print_json(&summary);
    }

    if entries.is_empty() {
        println!("No mood logs yet. Check in with `mindhub checkin <1-5>` to start your journal.");
        return Ok(ExitCode::SUCCESS);
    }

    let average = summary
        .average
        .map(|a| format!("{:.1}", a))
        .unwrap_or_else(|| "-".to_string());
    println!("{} check-ins recorded, avg score {}", summary.count, average);
    println!();
    for entry in entries.iter().rev() {
        println!(
            "{}  {}  Score: {}/5   {}",
            entry.emoji.as_deref().unwrap_or("😐"),
            score_dots(entry.score),
            entry.score,
            format_timestamp(&entry.created_at)
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn feed(engine: &Engine, limit: usize, json: bool) -> Result<ExitCode> {
    let posts = match engine.community_feed(limit).await {
        Ok(posts) => posts,
        Err(e) => {
            println!("The community feed is unavailable right now ({}).", e);
            return Ok(ExitCode::SUCCESS);
        }
    };

    if json {
        return print_json(&posts);
    }

    if posts.is_empty() {
        println!("No community posts yet.");
    }
    for post in &posts {
        println!("{} · {}", post.author_name, format_timestamp(&post.created_at));
        println!("  {}", post.message);
        println!();
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        // The timer needs neither identity nor storage
        Command::Breathe { cycles } => breathe(&config, cycles).await,
        Command::Session => session(&build_engine(&config)?),
        Command::Status { json } => status(&build_engine(&config)?, json).await,
        Command::Checkin { score, emoji } => checkin(&build_engine(&config)?, score, emoji).await,
        Command::History { json } => history(&build_engine(&config)?, json).await,
        Command::Feed { limit, json } => feed(&build_engine(&config)?, limit, json).await,
    }
}
