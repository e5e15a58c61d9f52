mod simulate;

use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use melody_core::chart::Chart;
use melody_core::gameplay::score::ScoreConfig;
use melody_core::EngineConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::simulate::{run_simulation, SimOptions};

#[derive(Debug, Parser)]
#[command(name = "melody")]
#[command(about = "Rhythm lesson checker and headless simulator", long_about = None)]
struct Cli {
    /// Log engine spawns and judgments.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a lesson and describe it.
    Check { lesson: PathBuf },
    /// Autoplay a lesson and print the final summary as JSON.
    Simulate {
        lesson: PathBuf,
        /// Engine config JSON; missing keys keep their defaults.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Tap offset from each note's target time.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        offset_ms: f64,
        /// Skip every Nth note.
        #[arg(long)]
        miss_every: Option<usize>,
        /// Print only the JSON summary.
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(format!("melody_core={level}").parse()?))
        .init();

    match cli.command {
        Command::Check { lesson } => {
            let data = lesson_loader::load_lesson_json_from_path(&lesson)?;
            let chart = Chart::from_lesson(&data).with_context(|| format!("invalid lesson: {}", lesson.display()))?;
            let max_score = ScoreConfig::default().max_possible_score(chart.note_count());

            println!("{} ({})", data.meta.title, chart.lesson_id);
            println!("bpm: {}", chart.bpm);
            println!("notes: {}", chart.note_count());
            println!("lanes: {}", data.lane_count());
            println!("duration_ms: {}", data.duration_ms());
            println!("words: {}", data.notes.iter().filter(|n| n.has_word()).count());
            println!("max_score: {}", max_score);
        }
        Command::Simulate {
            lesson,
            config,
            offset_ms,
            miss_every,
            quiet,
        } => {
            let data = lesson_loader::load_lesson_json_from_path(&lesson)?;
            let config = match config {
                Some(path) => {
                    let json = fs::read_to_string(&path)
                        .with_context(|| format!("failed to read config: {}", path.display()))?;
                    EngineConfig::from_json_str(&json)
                        .with_context(|| format!("invalid config: {}", path.display()))?
                }
                None => EngineConfig::default(),
            };
            info!(lesson = %lesson.display(), "simulating");

            let opts = SimOptions {
                offset_ms,
                miss_every,
                print_timeline: !quiet,
            };
            let report = run_simulation(&data, config, &opts)
                .with_context(|| format!("simulation failed: {}", lesson.display()))?;
            let json = serde_json::to_string_pretty(&report).context("failed to serialize summary")?;
            println!("{json}");
        }
    }

    Ok(())
}
