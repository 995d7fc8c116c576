//! Bundle Toolkit - PKCS#12 / PKCS#7 / PEM conversion tool
//!
//! This tool provides functionality for:
//! - Extracting keys and certificate chains from PFX and P7B bundles
//! - Building PFX and P7B bundles from PEM files
//! - Checking that a certificate and private key belong together

use bundle_toolkit::cert_ops::runner;
use bundle_toolkit::cli::{Cli, Commands};
use bundle_toolkit::config;
use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Dispatch the subcommand. `Ok(false)` means the command ran but failed its check.
fn run(cli: Cli) -> Result<bool, anyhow::Error> {
    // Handle color preference
    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let settings = config::load_settings(cli.config.as_deref())?;
    tracing::debug!(?settings, "loaded settings");

    match cli.command {
        Commands::ExtractPfx(args) => runner::run_extract_pfx(&args, &settings).map(|_| true),
        Commands::ExtractP7b(args) => runner::run_extract_p7b(&args, &settings).map(|_| true),
        Commands::Verify(args) => runner::run_verify(&args, &settings),
        Commands::CreatePfx(args) => runner::run_create_pfx(&args, &settings).map(|_| true),
        Commands::CreateP7b(args) => runner::run_create_p7b(&args, &settings).map(|_| true),
        Commands::Detect(args) => runner::run_detect(&args).map(|_| true),
    }
}
