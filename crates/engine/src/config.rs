//! Config/Bootstrap (§4.17): environment-driven settings plus the CLI
//! surface (§6), grounded on the teacher's `AppConfig::from_env` +
//! `dotenvy` pattern.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::autonomous_loop::DEFAULT_FRAMES_PER_SECOND;
use crate::llm::ollama::{DEFAULT_LLM_ENDPOINT, DEFAULT_LLM_MODEL};

/// Settings read from the environment (`.env` loaded via `dotenvy`, same as
/// the teacher's bootstrap), independent of anything passed on the CLI.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub llm_endpoint: String,
    pub llm_model: String,
    pub replay_dir: PathBuf,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self {
            llm_endpoint: env::var("LLM_ENDPOINT").unwrap_or_else(|_| DEFAULT_LLM_ENDPOINT.to_string()),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            replay_dir: env::var("REPLAY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./replays")),
        })
    }
}

/// Canonical CLI surface (§6): `run`, `replay view`, `replay play`,
/// `replay continue`.
#[derive(Debug, Parser)]
#[command(name = "wrldbldr-engine", version, about = "Headless autonomous role-playing simulation kernel")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start a new autonomous session.
    Run(RunArgs),
    /// Inspect or drive an existing replay file.
    Replay {
        #[command(subcommand)]
        action: ReplayAction,
    },
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Master seed for the deterministic RNG. A random seed is chosen if omitted.
    #[arg(long)]
    pub seed: Option<u64>,
    /// World theme handed to the content-collaborator/world generator.
    #[arg(long, default_value = "fantasy")]
    pub theme: String,
    /// Protagonist display name.
    #[arg(long, default_value = "Wanderer")]
    pub player: String,
    /// LLM model name override.
    #[arg(long)]
    pub model: Option<String>,
    /// Number of frames to run before stopping; unbounded if omitted.
    #[arg(long)]
    pub frames: Option<u64>,
    /// Frame rate in Hz (clamped to 0.5-60, §4.13).
    #[arg(long, default_value_t = DEFAULT_FRAMES_PER_SECOND)]
    pub fps: f64,
    /// Output replay file path.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Fail at startup instead of falling back if the LLM endpoint is unreachable.
    #[arg(long)]
    pub require_llm: bool,
}

#[derive(Debug, Subcommand)]
pub enum ReplayAction {
    /// Print a summary of a replay file.
    View { file: PathBuf },
    /// Re-run a replay file's logged events as a headless playback.
    Play {
        file: PathBuf,
        #[arg(default_value_t = 1.0)]
        speed: f64,
    },
    /// Resume a session from a replay file's last checkpoint under a new seed.
    Continue {
        file: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Process exit codes (§6 canonical CLI surface).
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERIC_FAILURE: i32 = 1;
    pub const BAD_ARGUMENTS: i32 = 2;
    pub const LLM_UNAVAILABLE: i32 = 3;
}

/// Pings the configured LLM endpoint's root URL to fail fast when
/// `--require-llm` is set (§6: "exit code 3, LLM unavailable at startup").
pub async fn check_llm_reachable(endpoint: &str) -> Result<()> {
    reqwest::Client::new()
        .get(endpoint)
        .send()
        .await
        .context("LLM endpoint unreachable")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_parses_with_defaults() {
        let cli = Cli::parse_from(["wrldbldr-engine", "run"]);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.theme, "fantasy");
                assert_eq!(args.fps, DEFAULT_FRAMES_PER_SECOND);
            }
            _ => panic!("expected Run"),
        }
    }

    #[test]
    fn replay_view_parses_the_file_argument() {
        let cli = Cli::parse_from(["wrldbldr-engine", "replay", "view", "session.replay.gz"]);
        match cli.command {
            Command::Replay { action: ReplayAction::View { file } } => {
                assert_eq!(file, PathBuf::from("session.replay.gz"));
            }
            _ => panic!("expected Replay::View"),
        }
    }
}
