mod script;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wallspace_lifecycle::{ControllerConfig, LifecycleController};
use wallspace_render::RenderError;
use wallspace_tools::{CallJournal, RendererScript, SurfaceToken};

use crate::script::{ScriptEvent, parse_script};

const NATIVE_LIBRARY: &str = "wallspace-recording";

#[derive(Parser)]
#[command(name = "wallspace-cli", about = "CLI tool for wallspace render lifecycle operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, crate info and native library status
    Info,
    /// Drive a scripted surface lifecycle against a recording renderer
    Simulate {
        /// Events separated by ';', e.g. "available:1080x1920; changed:1920x1080; lost; shutdown"
        #[arg(short, long)]
        script: String,
        /// Controller config file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Time to let the renderer run after each event, in milliseconds
        #[arg(long, default_value = "50")]
        dwell_ms: u64,
        /// Override the settling delay, in milliseconds
        #[arg(long)]
        settle_ms: Option<u64>,
        /// Make every native init fail
        #[arg(long)]
        fail_init: bool,
        /// Make native render fail after this many frames
        #[arg(long)]
        fail_render_after: Option<u64>,
        /// Dump the full native call journal as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    // The recording renderer lives in-process; there is nothing to dlopen,
    // but the load still goes through the process-wide guard.
    wallspace_render::load_native_library(NATIVE_LIBRARY, |name| {
        tracing::debug!(library = name, "recording renderer linked statically");
        Ok::<(), RenderError>(())
    })?;

    match cli.command {
        Commands::Info => {
            println!("wallspace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("render: {}", wallspace_render::crate_info());
            println!("lifecycle: {}", wallspace_lifecycle::crate_info());
            println!("tools: {}", wallspace_tools::crate_info());
            match wallspace_render::native_library() {
                Some(lib) => println!("native library: {} (loaded)", lib.name),
                None => println!("native library: not loaded"),
            }
            let defaults = ControllerConfig::default();
            println!(
                "defaults: join_timeout={}ms settle_delay={}ms idle_quantum={}ms max_frame_rate={}",
                defaults.join_timeout_ms,
                defaults.settle_delay_ms,
                defaults.idle_quantum_ms,
                defaults.max_frame_rate
            );
        }
        Commands::Simulate {
            script,
            config,
            dwell_ms,
            settle_ms,
            fail_init,
            fail_render_after,
            json,
        } => {
            let events = parse_script(&script)?;
            let mut config = match config {
                Some(path) => ControllerConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => ControllerConfig::default(),
            };
            if let Some(ms) = settle_ms {
                config.settle_delay_ms = ms;
            }

            let renderer_script = RendererScript {
                fail_init,
                fail_render_after,
                ..RendererScript::default()
            };
            let journal = CallJournal::new();
            simulate(&journal, renderer_script, config, &events, Duration::from_millis(dwell_ms));

            println!("{}", journal.summary());
            let verdict = journal.check_exclusive();
            println!(
                "Exclusive: {}",
                match &verdict {
                    Ok(()) => "OK".to_string(),
                    Err(v) => format!("VIOLATION ({v})"),
                }
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&journal.snapshot())?);
            }
            verdict?;
        }
    }

    Ok(())
}

fn simulate(
    journal: &CallJournal,
    renderer_script: RendererScript,
    config: ControllerConfig,
    events: &[ScriptEvent],
    dwell: Duration,
) {
    let controller = LifecycleController::new(journal.factory(renderer_script), config);
    let mut next_surface = 0;

    println!("Simulating {} events (dwell={}ms)", events.len(), dwell.as_millis());
    for (i, event) in events.iter().enumerate() {
        match *event {
            ScriptEvent::Available(size) => {
                next_surface += 1;
                controller.on_surface_available(SurfaceToken(next_surface), size.width, size.height);
            }
            ScriptEvent::Changed(size) => {
                next_surface += 1;
                controller.on_surface_changed(SurfaceToken(next_surface), size.width, size.height);
            }
            ScriptEvent::Lost => controller.on_surface_lost(),
            ScriptEvent::Visible(visible) => controller.on_visibility_changed(visible),
            ScriptEvent::Pointer { x, y, phase } => {
                if !controller.on_pointer_event(x, y, phase) {
                    tracing::info!("pointer event dropped");
                }
            }
            ScriptEvent::Wait(d) => thread::sleep(d),
            ScriptEvent::Shutdown => controller.on_shutdown(),
        }
        if !matches!(event, ScriptEvent::Wait(_)) {
            thread::sleep(dwell);
        }
        println!("[{i}] {:<22} {}", event.to_string(), controller.status());
    }
    // Dropping the controller shuts it down if the script did not.
}
