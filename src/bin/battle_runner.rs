//! Headless Battle Runner
//!
//! Validates scenario documents and replays intent scripts against them,
//! printing the final snapshot and combat log.

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dbd_tactics::battle::{BattleEvent, BoardDefinition, BoardGraph, GameEngine, GameSnapshot, Intent};
use dbd_tactics::core::{EngineConfig, Result, TacticsError};
use dbd_tactics::scenario::{validate_with, ScenarioDocument, ValidationRules};

/// Headless Battle Runner - validate scenarios and replay intents
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Validate DBD scenarios and replay intent scripts headlessly")]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a scenario document and list every problem
    Validate {
        scenario: PathBuf,

        /// Board definition file (defaults to the built-in board)
        #[arg(long)]
        board: Option<PathBuf>,

        /// Engine config (TOML); sets the activation limit checked against
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Load a scenario, apply an intent script, print the result
    Run {
        #[arg(long)]
        scenario: PathBuf,

        #[arg(long)]
        board: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Dice seed (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,

        /// JSON array of intents
        #[arg(long)]
        intents: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
}

/// JSON output of `run`
#[derive(Serialize)]
struct RunReport<'a> {
    seed: Option<u64>,
    applied: usize,
    rejected: Vec<Rejection>,
    snapshot: GameSnapshot,
    events: &'a [BattleEvent],
}

#[derive(Serialize)]
struct Rejection {
    index: usize,
    intent: Intent,
    error: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "dbd_tactics=debug,battle_runner=debug"
    } else {
        "dbd_tactics=info,battle_runner=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match args.command {
        Command::Validate {
            scenario,
            board,
            config,
        } => validate_command(&scenario, board.as_deref(), config.as_deref()),
        Command::Run {
            scenario,
            board,
            config,
            seed,
            intents,
            format,
        } => run_command(
            &scenario,
            board.as_deref(),
            config.as_deref(),
            seed,
            intents.as_deref(),
            format,
        ),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path),
        None => Ok(EngineConfig::default()),
    }
}

fn load_board(path: Option<&Path>, scenario_board: &str) -> Result<BoardGraph> {
    let board = match path {
        Some(path) => BoardGraph::from_definition(&BoardDefinition::load(path)?)?,
        None => BoardGraph::builtin(scenario_board)?,
    };
    info!(
        board = board.id(),
        cells = board.cell_count(),
        degree = ?board.degree_range(),
        "Board ready"
    );
    Ok(board)
}

fn validate_command(scenario: &Path, board: Option<&Path>, config: Option<&Path>) -> Result<ExitCode> {
    let config = load_config(config)?;
    let text = std::fs::read_to_string(scenario)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;

    let rules = match board {
        Some(path) => {
            let board = load_board(Some(path), "")?;
            ValidationRules::for_board(&board, config.activation_limit)
        }
        None => ValidationRules {
            activation_limit: config.activation_limit,
            ..ValidationRules::default()
        },
    };

    let errors = validate_with(&value, &rules);
    if errors.is_empty() {
        println!("{}: ok", scenario.display());
        return Ok(ExitCode::SUCCESS);
    }
    for error in &errors {
        println!("{}: {error}", scenario.display());
    }
    Ok(ExitCode::FAILURE)
}

fn run_command(
    scenario: &Path,
    board: Option<&Path>,
    config: Option<&Path>,
    seed: Option<u64>,
    intents: Option<&Path>,
    format: Format,
) -> Result<ExitCode> {
    let mut config = load_config(config)?;
    if let Some(seed) = seed {
        config.seed = Some(seed);
    }

    let text = std::fs::read_to_string(scenario)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let board_id = value.get("board").and_then(|b| b.as_str()).unwrap_or_default();
    let board = load_board(board, board_id)?;
    let rules = ValidationRules::for_board(&board, config.activation_limit);
    let doc = ScenarioDocument::from_value(&value, &rules)?;

    let script = match intents {
        Some(path) => Intent::parse_script(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };

    let mut engine = GameEngine::with_board(&doc, board, config.clone())?;
    let mut rejected = Vec::new();
    let mut attempted = 0;
    for (index, intent) in script.iter().enumerate() {
        attempted += 1;
        match engine.apply(intent) {
            Ok(_) => {}
            Err(err @ TacticsError::GameOver { .. }) => {
                warn!(index, %err, "Game already decided, stopping");
                rejected.push(Rejection {
                    index,
                    intent: intent.clone(),
                    error: err.to_string(),
                });
                break;
            }
            Err(err) => {
                warn!(index, ?intent, %err, "Intent rejected");
                rejected.push(Rejection {
                    index,
                    intent: intent.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    let snapshot = engine.snapshot();
    let applied = attempted - rejected.len();

    match format {
        Format::Json => {
            let report = RunReport {
                seed: config.seed,
                applied,
                rejected,
                snapshot,
                events: engine.events(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Format::Text => {
            for event in engine.events() {
                println!("[{:>4}] turn {:>3} {:<4} {}", event.seq, event.turn, event.side.code(), event.kind.describe());
            }
            for r in &rejected {
                println!("rejected #{}: {}", r.index, r.error);
            }
            println!();
            println!(
                "Turn {} ({} to act, {} activations left)",
                snapshot.turn.turn_number, snapshot.turn.side, snapshot.turn.activations_left
            );
            for (side, standards) in &snapshot.standards {
                println!("  {side}: {standards}/{} standards", snapshot.standards_to_win);
            }
            if let Some(winner) = snapshot.winner {
                println!("Winner: {winner}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
