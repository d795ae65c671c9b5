use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "edunotify")]
#[command(about = "Telegram bot that registers students and broadcasts birthday notifications")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot, the daily broadcast scheduler and the liveness endpoint
    Run,

    /// Run the birthday broadcast once, immediately
    Broadcast {
        /// Send even if a run is already recorded for today
        #[arg(long)]
        force: bool,
    },

    /// Print the registered-user listing to stdout
    Users,

    /// Initialize the database and migrate legacy enrollment records
    Init,
}
