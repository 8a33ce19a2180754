mod cmd;

use clap::Parser;
use cmd::config::{Effective, RunArgs};

#[derive(Parser)]
#[command(name = "target-terminusdb", version, about = "Singer target that loads streams into TerminusDB")]
struct Cli {
    #[command(flatten)]
    args: RunArgs,
}

#[tokio::main]
async fn main() {
    // stdout carries the state line, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let eff = match Effective::new(&cli.args) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = cmd::persist::run(&eff).await {
        tracing::error!(error = %e, "target failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    tracing::debug!("exiting normally");
}
