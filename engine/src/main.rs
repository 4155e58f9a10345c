use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docforge_observability::{init_process_logging, ProcessKind};
use docforge_server::{serve, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "docforge-engine")]
#[command(about = "docforge document-generation pipeline service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bind the HTTP API and run until interrupted.
    Serve {
        #[arg(long, env = "DOCFORGE_LOG_DIR", default_value = "./logs")]
        log_dir: PathBuf,
        #[arg(long, env = "DOCFORGE_LOG_RETENTION_DAYS", default_value_t = 14)]
        log_retention_days: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { log_dir, log_retention_days } => {
            let _guard = init_process_logging(ProcessKind::Engine, &log_dir, log_retention_days)?;
            let config = ServerConfig::from_env()?;
            tracing::info!(addr = %config.bind_addr, data_dir = %config.data_dir.display(), "starting docforge-engine");
            serve(config).await?;
        }
    }

    Ok(())
}
