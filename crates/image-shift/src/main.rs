mod commands;
mod utils;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "image-shift")]
#[command(version, about = "update container images in given service", long_about = None)]
#[command(
    after_help = "Example:\n  image-shift --cluster-name my-cluster --service api --container app=new-image-test:latest --container proxy=:bump-only-version"
)]
struct Cli {
    #[command(flatten)]
    shift: commands::shift::ShiftArgs,

    /// Show debug logs (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, results to stdout
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let defaults = image_shift_config::load_defaults()?;
    let settings = cli.shift.resolve(&defaults)?;

    commands::shift::handle(settings).await
}
