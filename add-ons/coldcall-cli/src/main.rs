//! Cold-call practice shell.
//!
//! Usage:
//!   cargo run -p coldcall-cli -- call [MODULE] [--mode practice|marathon|legend] [--user NAME] [--unlock-all]
//!   cargo run -p coldcall-cli -- modules [--user NAME]
//!   cargo run -p coldcall-cli -- progress [--user NAME]
//!
//! During a call, type your lines at the prompt. `/answer` picks up while the
//! phone is ringing and `/hangup` ends the call.

use anyhow::{anyhow, Context};
use coldcall_core::{
    AccessControl, AllowAll, CallMode, CallSummary, EndReason, ProgressGatedAccess, ProgressStore,
    SledProgressStore, TrainerConfig, CATALOG,
};
use coldcall_voice::{
    AudioPlayer, CallController, CallEvent, CallPhase, CallServices, CallUpdate, ChannelRecognizer,
    DialogueService, OfflineDialogue, OpenAiTts, OpenRouterDialogue, PlaceholderTts, RecognizerHandle,
    SilentPlayer, SpeechSynthesizer,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_USER: &str = "local";

struct Args {
    command: String,
    module: String,
    mode: CallMode,
    user: String,
    unlock_all: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args {
        command: "call".to_string(),
        module: "opener".to_string(),
        mode: CallMode::Practice,
        user: std::env::var("COLDCALL_USER").unwrap_or_else(|_| DEFAULT_USER.to_string()),
        unlock_all: false,
    };
    let mut positional = Vec::new();

    while let Some(a) = args.next() {
        match a.as_str() {
            "--mode" => {
                let mode = args.next().ok_or_else(|| anyhow!("--mode needs a value"))?;
                parsed.mode = mode.parse().map_err(|e: String| anyhow!(e))?;
            }
            "--user" => {
                parsed.user = args.next().ok_or_else(|| anyhow!("--user needs a value"))?;
            }
            "--unlock-all" => parsed.unlock_all = true,
            other => positional.push(other.to_string()),
        }
    }

    let mut positional = positional.into_iter();
    if let Some(command) = positional.next() {
        parsed.command = command;
    }
    if let Some(module) = positional.next() {
        parsed.module = module;
    }
    Ok(parsed)
}

fn print_help() {
    println!("Cold-Call Trainer v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: coldcall [COMMAND] [MODULE] [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  call       Start a practice call (default)");
    println!("  modules    List training modules and whether they are unlocked");
    println!("  progress   Show saved progress");
    println!();
    println!("Options:");
    println!("  --mode practice|marathon|legend");
    println!("  --user NAME      Progress profile (default: COLDCALL_USER or 'local')");
    println!("  --unlock-all     Skip module gating");
    println!();
    println!("Configure via COLDCALL_CONFIG or config/coldcall.toml; keys via OPENROUTER_API_KEY / OPENAI_API_KEY.");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[coldcall] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn,coldcall_voice=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args()?;
    let config = TrainerConfig::load().context("load trainer config")?;
    config.validate().context("invalid trainer config")?;

    let store: Arc<dyn ProgressStore> = Arc::new(
        SledProgressStore::open_path(&config.storage_path)
            .with_context(|| format!("open progress store at {}", config.storage_path.display()))?,
    );
    let access: Arc<dyn AccessControl> = if args.unlock_all {
        Arc::new(AllowAll)
    } else {
        Arc::new(ProgressGatedAccess::new(Arc::clone(&store)))
    };

    match args.command.as_str() {
        "call" => run_call(config, &args, store, access).await,
        "modules" => {
            for module in CATALOG {
                let status = if access.has_access(&args.user, module.id) {
                    "unlocked"
                } else {
                    "locked"
                };
                println!("{:<10} {:<22} {}", module.id, module.title, status);
            }
            Ok(())
        }
        "progress" => {
            let state = store.load_progress(&args.user)?;
            println!("Progress for '{}' ({}s practiced)", args.user, state.total_practice_secs);
            for (id, module) in &state.modules {
                println!(
                    "  {:<10} attempts={} passes={} best={} last={}",
                    id,
                    module.attempts,
                    module.passes,
                    module.best_progress,
                    module.last_reason.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => Err(anyhow!("unknown command '{}'; try `coldcall help`", other)),
    }
}

fn build_player() -> Box<dyn AudioPlayer> {
    #[cfg(feature = "playback")]
    {
        match coldcall_voice::RodioPlayer::new() {
            Ok(player) => return Box::new(player),
            Err(e) => warn!(error = %e, "audio output unavailable, continuing without playback"),
        }
    }
    Box::new(SilentPlayer)
}

async fn run_call(
    config: TrainerConfig,
    args: &Args,
    progress: Arc<dyn ProgressStore>,
    access: Arc<dyn AccessControl>,
) -> anyhow::Result<()> {
    let dialogue: Arc<dyn DialogueService> = match OpenRouterDialogue::from_config(&config.llm)? {
        Some(remote) => Arc::new(remote),
        None => {
            info!("no dialogue API key, prospect uses canned lines");
            Arc::new(OfflineDialogue)
        }
    };
    let synthesizer: Arc<dyn SpeechSynthesizer> = match OpenAiTts::from_config(&config.tts) {
        Ok(tts) => Arc::new(tts),
        Err(e) => {
            info!(reason = %e, "speech synthesis disabled");
            Arc::new(PlaceholderTts)
        }
    };
    let (recognizer, handle) = ChannelRecognizer::new();

    let services = CallServices {
        synthesizer,
        on_device_synthesizer: Arc::new(PlaceholderTts),
        player: build_player(),
        recognizer: Box::new(recognizer),
        dialogue,
        progress,
        access,
    };
    let mut controller = CallController::new(config, services)?;
    let mut updates = controller
        .take_update_receiver()
        .ok_or_else(|| anyhow!("update receiver already taken"))?;
    let events = controller.event_sender();

    controller.start_call(&args.user, &args.module, args.mode)?;
    println!("Dialing... (type /answer to pick up early, /hangup to end)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        // Only cancel-safe futures race here; the event is handled after the race.
        let event = tokio::select! {
            event = controller.next_event() => event?,
            Some(update) = updates.recv() => {
                print_update(&update);
                continue;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => handle_input(line.trim(), &handle, &events),
                    Ok(None) => {
                        let _ = events.send(CallEvent::Hangup);
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin read failed, hanging up");
                        let _ = events.send(CallEvent::Hangup);
                    }
                }
                continue;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("CTRL-C received; hanging up");
                controller.end_call(EndReason::UserHangup)?;
                break;
            }
        };

        if let Err(e) = controller.handle_event(event).await {
            warn!(error = %e, "event handling failed");
        }
        drain_updates(&mut updates);
        if controller.phase() == CallPhase::Ended {
            break;
        }
    }

    drain_updates(&mut updates);
    Ok(())
}

fn handle_input(line: &str, handle: &RecognizerHandle, events: &mpsc::UnboundedSender<CallEvent>) {
    match line {
        "" => {}
        "/answer" => {
            let _ = events.send(CallEvent::Answer);
        }
        "/hangup" => {
            let _ = events.send(CallEvent::Hangup);
        }
        text => {
            if !handle.say(text, 1.0) {
                println!("  (the prospect is still talking, wait for your turn)");
            }
        }
    }
}

fn drain_updates(updates: &mut mpsc::UnboundedReceiver<CallUpdate>) {
    while let Ok(update) = updates.try_recv() {
        print_update(&update);
    }
}

fn print_update(update: &CallUpdate) {
    match update {
        CallUpdate::Phase(phase) => match phase {
            CallPhase::Ringing => println!("Ring... ring..."),
            CallPhase::Connected => println!("Connected."),
            _ => {}
        },
        CallUpdate::AiLine { text, stage } => println!("[{}] Prospect: {}", stage, text),
        CallUpdate::UserLine { text } => println!("You: {}", text),
        CallUpdate::Evaluation(result) => {
            if !result.pass {
                if let Some(reason) = result.fail_reason {
                    println!("  x {}", reason.tip());
                }
            }
        }
        CallUpdate::Feedback(feedback) if !feedback.tip.is_empty() => {
            println!("  * {}", feedback.tip);
        }
        CallUpdate::Feedback(_) => {}
        CallUpdate::Progress { count, max } => println!("  progress {}/{}", count, max),
        CallUpdate::Listening(true) => println!("  (your turn)"),
        CallUpdate::Listening(false) => {}
        CallUpdate::Status(status) => println!("  {}", status),
        CallUpdate::Ended(summary) => print_summary(summary),
    }
}

fn print_summary(summary: &CallSummary) {
    println!();
    println!(
        "Call ended: {} ({:?}) after {}s, reached {}, progress {}/{}",
        summary.reason.code(),
        summary.outcome,
        summary.elapsed_secs,
        summary.stage_reached,
        summary.progress_count,
        summary.max_progress
    );
    if let Some(tip) = summary.reason.coaching() {
        println!("Coach: {}", tip);
    }
}
