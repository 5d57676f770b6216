//! Quiz lobby server binary.
//!
//! # Usage
//!
//! ```bash
//! # Serve the bundled catalog on the default port
//! quiz-server --problems problems.json
//!
//! # Listen publicly and keep results elsewhere
//! QUIZ_RESULTS_DIR=/var/lib/quiz quiz-server --bind 0.0.0.0:8080 --problems problems.json
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use quizhall::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Real-time quiz lobby server
#[derive(Parser, Debug)]
#[command(name = "quiz-server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, env = "QUIZ_BIND", default_value = "127.0.0.1:8080")]
    bind: String,

    /// Problem catalog (JSON: {"problems": [...]})
    #[arg(short, long, env = "QUIZ_PROBLEMS", default_value = "problems.json")]
    problems: PathBuf,

    /// Directory finished-lobby results are written to
    #[arg(long, env = "QUIZ_RESULTS_DIR", default_value = "logs")]
    results_dir: PathBuf,

    /// Seconds a one-time login token stays redeemable
    #[arg(long, env = "QUIZ_TOKEN_RETENTION_SECS", default_value_t = 5)]
    token_retention_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let catalog = Catalog::load(&args.problems).await?;
    if catalog.is_empty() {
        tracing::warn!(path = %args.problems.display(), "catalog is empty; rounds need custom problems");
    }

    let mut config = ServerConfig {
        bind_addr: args.bind,
        results_dir: args.results_dir,
        ..ServerConfig::default()
    };
    config.lobby.token.retention = Duration::from_secs(args.token_retention_secs);

    let server = QuizServer::builder().config(config).catalog(catalog).build().await?;
    tracing::info!("listening on {}", server.local_addr()?);

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            shutdown.cancel();
        }
    });

    server.run().await?;
    Ok(())
}
