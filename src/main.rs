use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rustbuffer_patcher::{read_source, resolve_profile, write_atomic, LineDelta, Patcher};
use std::path::PathBuf;

const DEFAULT_TARGET: &str = "pkg/rustpushgo/rustpushgo.go";

#[derive(Parser)]
#[command(name = "rustbuffer-patcher")]
#[command(about = "Patch UniFFI-generated Go bindings for Go 1.24+ cgo", long_about = None)]
#[command(version)]
struct Cli {
    /// Generated bindings file to patch in place
    #[arg(default_value = DEFAULT_TARGET)]
    path: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let profile = resolve_profile().context("failed to load patch profile")?;
    let patcher = Patcher::new(&profile)?;

    let original = read_source(&cli.path)?;
    let patched = patcher
        .patch(&original)
        .with_context(|| format!("failed to patch {}", cli.path.display()))?;

    for drift in patched.report.drift() {
        eprintln!("{} {}", "warning:".yellow(), drift);
    }

    let delta = LineDelta::between(&original, &patched.text);
    if patched.text != original {
        write_atomic(&cli.path, patched.text.as_bytes())?;
    }

    println!(
        "{} Successfully patched {} ({})",
        "✓".green(),
        cli.path.display(),
        delta
    );

    Ok(())
}
