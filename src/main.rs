use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sprint_dashboard::{
    cli::{Cli, Command},
    commands,
    error::ServiceResult,
};

#[tokio::main]
async fn main() -> ServiceResult<()> {
    let cli = Cli::parse();

    // One-shot commands stay quiet unless RUST_LOG asks otherwise.
    let default_level = match cli.command {
        Command::Serve => "info",
        _ => "warn",
    };
    // stdout belongs to command output and the MCP stdio transport
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    commands::execute(cli).await
}
