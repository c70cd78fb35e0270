//! Palaver CLI: the main entry point.
//!
//! Commands:
//! - `chat`: Interactive chat or single-message mode
//! - `onboard`: Write the default config file
//! - `tools`: List the tools advertised to the model

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "palaver",
    about = "Palaver: a tool-calling chat loop with long-term memory",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the model
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Memory session to use (overrides config)
        #[arg(long, env = "PALAVER_SESSION_ID")]
        session: Option<String>,

        /// Model to use (overrides config)
        #[arg(long)]
        model: Option<String>,
    },

    /// Initialize configuration
    Onboard,

    /// List the tools advertised to the model
    Tools,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat {
            message,
            session,
            model,
        } => commands::chat::run(message, session, model).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Tools => commands::tools::run().await?,
    }

    Ok(())
}
