use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod headless;

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Tether - assistant widget session sync from the command line", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep the session handle in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Owning site / tenant
    #[arg(long, global = true, env = "TETHER_OWNER_ID")]
    owner_id: Option<String>,

    /// Base URL of the session API
    #[arg(long, global = true, env = "TETHER_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire a session and print the record
    Init,
    /// Print the record, current thread and launcher state
    Show,
    /// Request a window-state patch
    Patch(commands::session::PatchArgs),
    /// Clear the thread history
    Clear,
    /// Poll the session until the ceiling or Ctrl-C
    Watch,
    /// Drop the stored session handle
    Forget,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let overrides = context::Overrides {
        config: cli.config,
        ephemeral: cli.ephemeral,
        owner_id: cli.owner_id,
        api_url: cli.api_url,
    };
    let ctx = context::Context::build(overrides)?;

    match cli.command {
        Commands::Init => commands::session::init(&ctx).await?,
        Commands::Show => commands::session::show(&ctx).await?,
        Commands::Patch(args) => commands::session::patch(&ctx, args).await?,
        Commands::Clear => commands::session::clear(&ctx).await?,
        Commands::Watch => commands::watch::run(&ctx).await?,
        Commands::Forget => commands::session::forget(&ctx).await?,
    }

    Ok(())
}
