mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "letex")]
#[command(about = "A context-aware AI browser for the terminal", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Onboard {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Show configuration, identity and saved browser state
    Status,

    /// Open the interactive browser
    Browse {
        /// Page to open first
        url: Option<String>,
    },

    /// Ask the agent a single question
    Ask {
        /// Message to send
        #[arg(short, long)]
        message: String,

        /// Load this page first and use it as context
        #[arg(short, long)]
        url: Option<String>,
    },

    /// List saved conversation threads
    Threads {
        /// Print the messages of the thread at this position
        #[arg(long)]
        show: Option<usize>,
    },

    /// List saved notes
    Notes,

    /// Sign in
    Login {
        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Email address
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Sign out
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Onboard { force } => {
            commands::onboard::run(force).await?;
        }
        Commands::Status => {
            commands::status::run().await?;
        }
        Commands::Browse { url } => {
            commands::browse::run(url).await?;
        }
        Commands::Ask { message, url } => {
            commands::ask::run(message, url).await?;
        }
        Commands::Threads { show } => {
            commands::threads::run(show).await?;
        }
        Commands::Notes => {
            commands::notes::run().await?;
        }
        Commands::Login { name, email } => {
            commands::auth::login(name, email).await?;
        }
        Commands::Logout => {
            commands::auth::logout().await?;
        }
    }

    Ok(())
}
