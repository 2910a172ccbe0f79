use clap::Parser;
use plank::cli::commands::Cli;
use plank::cli::handlers;
use tracing_subscriber::EnvFilter;

fn main() {
    // PLANK_LOG=debug shows requests and reorder phases
    let filter = EnvFilter::try_from_env("PLANK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
