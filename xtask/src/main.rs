use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

/// Lifecycle scripts exercised by `xtask simulate`.
const SMOKE_SCRIPTS: &[(&str, &str)] = &[
    ("rotate", "available:1080x1920; changed:1920x1080; changed:1080x1920; shutdown"),
    ("lose-and-return", "available:1080x1920; lost; available:1080x1920; visible:false; visible:true; shutdown"),
    ("pointer", "available:800x600; pointer:10,10,down; pointer:20,15,move; pointer:20,15,up; shutdown"),
];

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for wallspace")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
    /// Run the CLI simulator over the built-in lifecycle scripts
    Simulate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests()?;
            run_doc()?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => run_tests()?,
        Commands::Doc => run_doc()?,
        Commands::Build => cargo(&["build", "--workspace"], "cargo build")?,
        Commands::Simulate => run_simulate()?,
    }

    Ok(())
}

fn cargo(args: &[&str], label: &str) -> Result<()> {
    println!("==> Running {label}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{label} failed");
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    cargo(&["fmt", "--all", "--", "--check"], "cargo fmt --check")
}

fn run_clippy() -> Result<()> {
    cargo(
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        "cargo clippy",
    )
}

fn run_tests() -> Result<()> {
    cargo(&["test", "--workspace"], "cargo test")
}

fn run_doc() -> Result<()> {
    cargo(&["doc", "--workspace", "--no-deps"], "cargo doc")
}

fn run_simulate() -> Result<()> {
    for (name, script) in SMOKE_SCRIPTS {
        cargo(
            &[
                "run", "--quiet", "-p", "wallspace-cli", "--", "simulate", "--dwell-ms", "20",
                "--script", script,
            ],
            &format!("simulate {name}"),
        )?;
    }
    Ok(())
}
