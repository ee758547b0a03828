use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::io;

mod cli;
mod core;
mod daemon;
mod refresh;

use crate::core::logging::init_logging;
use crate::core::settings::Settings;

#[derive(Parser)]
#[command(name = "meow-refresh")]
#[command(author, version, about = "Background cat picture refresh with desktop notifications")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the refresh daemon
    Daemon,

    /// Save the interval, set up notifications and schedule the next refresh
    Initialize {
        /// Refresh interval in minutes (default: from config)
        #[arg(long)]
        interval: Option<i64>,

        /// Do not show notifications for new cats
        #[arg(long)]
        no_notifications: bool,
    },

    /// Save the interval and schedule the next refresh
    Schedule {
        /// Refresh interval in minutes (default: the saved interval)
        #[arg(long)]
        interval: Option<i64>,
    },

    /// Schedule the next refresh after a one-off delay
    ScheduleWithDelay {
        /// Delay in minutes
        #[arg(long)]
        delay: i64,
    },

    /// Cancel the scheduled refresh
    Cancel,

    /// Refresh now if a new cat is due
    Trigger {
        /// Run in this process instead of asking the daemon
        #[arg(long)]
        local: bool,
    },

    /// Toggle debug logging in the daemon
    Debug {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Show the current cat and history
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Include every history entry
        #[arg(long)]
        history: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon => {
            let settings = Settings::load()?;
            let logs = init_logging(settings.debug);
            daemon::run(settings, logs).await
        }
        Commands::Initialize {
            interval,
            no_notifications,
        } => {
            init_logging(false);
            cli::control::initialize(interval, !no_notifications).await
        }
        Commands::Schedule { interval } => {
            init_logging(false);
            cli::control::schedule(interval).await
        }
        Commands::ScheduleWithDelay { delay } => {
            init_logging(false);
            cli::control::schedule_with_delay(delay).await
        }
        Commands::Cancel => {
            init_logging(false);
            cli::control::cancel().await
        }
        Commands::Trigger { local } => {
            init_logging(false);
            cli::trigger::run(local).await
        }
        Commands::Debug { state } => {
            init_logging(false);
            cli::control::set_debug(matches!(state, Toggle::On)).await
        }
        Commands::Status { json, history } => {
            init_logging(false);
            cli::status::run(json, history).await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
