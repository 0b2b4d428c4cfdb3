use clap::Parser;
use wpm::cli::Cli;
use wpm::commands;

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "wpm=debug" } else { "wpm=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Execute command. Failures surface as a single-line summary; the full
    // chain stays internal because lower-level diagnostics can carry
    // credential material.
    if let Err(err) = commands::execute(cli) {
        commands::report_failure(&err);
        std::process::exit(1);
    }
}
