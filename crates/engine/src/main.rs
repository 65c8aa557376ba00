//! CLI entry point (§4.17/§6): wires config/bootstrap into either a fresh
//! autonomous session or a replay-file command.

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use wrldbldr_domain::event_kind;

use wrldbldr_engine::autonomous_loop::{AutonomousLoop, AutonomousLoopConfig, StopReason};
use wrldbldr_engine::config::{check_llm_reachable, exit_code, Cli, Command, EnvConfig, ReplayAction};
use wrldbldr_engine::continuation;
use wrldbldr_engine::fallback::FallbackLogger;
use wrldbldr_engine::llm::{LlmPort, OllamaClient};
use wrldbldr_engine::publisher::StateObserver;
use wrldbldr_engine::quest_progression::QuestProgressionConfig;
use wrldbldr_engine::replay::ReplayLogger;
use wrldbldr_engine::service::GameService;
use wrldbldr_engine::worldgen::{TemplateWorldGenerator, WorldGeneratorPort};

/// Headless stand-in for a terminal front-end: renders every broadcast
/// event as a single plain line (§4.18 `TextObserver` scaffold, reused here
/// as the CLI's actual output instead of only a test double).
struct TextObserver;

impl StateObserver for TextObserver {
    fn on_game_event(&mut self, event: &wrldbldr_domain::DomainEvent) {
        println!("[frame {}] {} {}", event.frame, event.kind, event.payload);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let env = match EnvConfig::from_env() {
        Ok(env) => env,
        Err(err) => {
            eprintln!("config error: {err}");
            std::process::exit(exit_code::GENERIC_FAILURE);
        }
    };

    let code = match cli.command {
        Command::Run(args) => run(args, env).await,
        Command::Replay { action } => replay(action).await,
    };
    std::process::exit(code);
}

async fn run(args: wrldbldr_engine::config::RunArgs, env: EnvConfig) -> i32 {
    let model = args.model.unwrap_or(env.llm_model);
    let seed = args.seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(1)
    });

    if args.require_llm {
        if let Err(err) = check_llm_reachable(&env.llm_endpoint).await {
            eprintln!("LLM unavailable at startup: {err}");
            return exit_code::LLM_UNAVAILABLE;
        }
    }

    let generator = TemplateWorldGenerator;
    let mut world = generator.generate(&args.theme, seed);
    world.protagonist_mut().display_name = args.player.clone();

    let port: Arc<dyn LlmPort> = Arc::new(OllamaClient::new(&env.llm_endpoint));
    let mut service = GameService::initialize(world, seed, port, model, QuestProgressionConfig::default());
    service.publisher_mut().subscribe(Box::new(TextObserver));
    service.bus_mut().publish(wrldbldr_domain::DomainEvent::new(
        0,
        event_kind::FRAME_UPDATE,
        serde_json::json!({"message": "session initialized"}),
        None,
    ));

    let mut fallback_log = FallbackLogger::new();
    let loop_config = AutonomousLoopConfig {
        frames_per_second: args.fps,
        max_frames: args.frames,
    };
    let mut autonomous_loop = AutonomousLoop::new(loop_config);

    let stop_reason = autonomous_loop.run(&mut service, &mut fallback_log).await;
    info!(?stop_reason, "autonomous loop finished");

    service.checkpoint();
    let out = args.out.unwrap_or_else(|| env.replay_dir.join("session.replay.gz"));
    if let Some(parent) = out.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(err) = service.export_state(&out) {
        eprintln!("failed to write replay file: {err}");
        return exit_code::GENERIC_FAILURE;
    }

    match stop_reason {
        StopReason::MaxFramesReached | StopReason::StopRequested => exit_code::SUCCESS,
        StopReason::ProtagonistDied => exit_code::SUCCESS,
    }
}

async fn replay(action: ReplayAction) -> i32 {
    match action {
        ReplayAction::View { file } => match ReplayLogger::read_from_file(&file) {
            Ok(replay_file) => {
                println!("version: {}", replay_file.version);
                println!("seed: {}", replay_file.master_seed);
                println!("events: {}", replay_file.events.len());
                println!("llm calls: {}", replay_file.llm_calls.len());
                println!("checkpoints: {}", replay_file.checkpoints.len());
                exit_code::SUCCESS
            }
            Err(err) => {
                eprintln!("failed to read replay file: {err}");
                exit_code::GENERIC_FAILURE
            }
        },
        ReplayAction::Play { file, speed } => match ReplayLogger::read_from_file(&file) {
            Ok(replay_file) => {
                let delay = if speed > 0.0 { std::time::Duration::from_millis((50.0 / speed) as u64) } else { std::time::Duration::ZERO };
                for event in &replay_file.events {
                    println!("[frame {}] {} {}", event.frame, event.kind, event.payload);
                    tokio::time::sleep(delay).await;
                }
                exit_code::SUCCESS
            }
            Err(err) => {
                eprintln!("failed to read replay file: {err}");
                exit_code::GENERIC_FAILURE
            }
        },
        ReplayAction::Continue { file, out, seed } => match ReplayLogger::read_from_file(&file) {
            Ok(replay_file) => {
                let new_seed = seed.unwrap_or(replay_file.master_seed.wrapping_add(1));
                match continuation::continue_from(&replay_file, new_seed) {
                    Ok(continued) => {
                        let mut logger = ReplayLogger::new(continued.new_master_seed);
                        logger.set_initial_state(continued.world);
                        if let Err(err) = logger.write_to_file(&out) {
                            eprintln!("failed to write continued replay: {err}");
                            return exit_code::GENERIC_FAILURE;
                        }
                        exit_code::SUCCESS
                    }
                    Err(err) => {
                        eprintln!("failed to continue session: {err}");
                        exit_code::GENERIC_FAILURE
                    }
                }
            }
            Err(err) => {
                eprintln!("failed to read replay file: {err}");
                exit_code::GENERIC_FAILURE
            }
        },
    }
}
