use std::sync::Arc;

use clap::Parser;
use colored::*;
use teloxide::Bot;
use tokio::sync::Mutex;
use tracing::{error, info};

use edunotify::broadcast::{self, BroadcastOutcome};
use edunotify::cli::{Cli, Commands};
use edunotify::config::Config;
use edunotify::storage::Database;
use edunotify::telegram::formatters;
use edunotify::{telegram, web};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("edunotify=debug,info")
        .init();

    let cli = Cli::parse();

    let config = match Config::load().and_then(|c| c.validate().map(|_| c)) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run(config).await,
        Commands::Broadcast { force } => run_broadcast(&config, force).await,
        Commands::Users => list_users(&config),
        Commands::Init => initialize(&config),
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

async fn run(config: Config) -> edunotify::Result<()> {
    let bot = Bot::new(config.telegram.bot_token.clone());
    let database = Arc::new(Mutex::new(Database::new(&config.database.path)?));

    let port = config.http.port;
    tokio::spawn(async move {
        if let Err(e) = web::start_web_server(port).await {
            error!("Liveness server stopped: {}", e);
        }
    });

    tokio::spawn(broadcast::run_daily(
        bot.clone(),
        database.clone(),
        config.broadcast.clone(),
    ));

    info!("EduNotify is up");
    telegram::run_bot(bot, config, database).await;
    Ok(())
}

async fn run_broadcast(config: &Config, force: bool) -> edunotify::Result<()> {
    let bot = Bot::new(config.telegram.bot_token.clone());
    let database = Arc::new(Mutex::new(Database::new(&config.database.path)?));

    match broadcast::run_once(&bot, &database, force).await? {
        BroadcastOutcome::AlreadyRan => {
            println!("{}", "Broadcast already ran today (use --force to resend)".yellow());
        }
        BroadcastOutcome::NoBirthdays => {
            println!("{}", "No users have a birthday today".cyan());
        }
        BroadcastOutcome::Sent {
            matched,
            delivered,
            failed,
        } => {
            println!(
                "Broadcast sent: {} birthday(s), {} delivered, {} failed",
                matched.to_string().cyan(),
                delivered.to_string().green(),
                failed.to_string().red()
            );
        }
    }
    Ok(())
}

fn list_users(config: &Config) -> edunotify::Result<()> {
    let db = Database::new(&config.database.path)?;
    let profiles = db.all_profiles()?;

    if profiles.is_empty() {
        println!("{}", "No registered users".yellow());
    } else {
        println!("{}", formatters::user_listing(&profiles));
    }
    Ok(())
}

fn initialize(config: &Config) -> edunotify::Result<()> {
    println!("{}", "Initializing EduNotify...".green());
    let db = Database::new(&config.database.path)?;
    println!("{}", "✓ Database initialized".green());

    let migrated = db.migrate_legacy_enrollments()?;
    if migrated > 0 {
        println!("✓ Migrated {} legacy enrollment record(s)", migrated);
    }

    println!("\n{}", "Configuration:".cyan());
    println!("  Database:        {}", config.database.path);
    println!("  HTTP port:       {}", config.http.port);
    println!("  Admin chat id:   {}", config.telegram.admin_chat_id);
    println!(
        "  Broadcast time:  {:02}:{:02} UTC",
        config.broadcast.hour_utc, config.broadcast.minute_utc
    );

    println!("\n{}", "Ready to use! Try running:".cyan());
    println!("  {} to start everything", "edunotify run".yellow());
    println!("  {} to trigger today's broadcast", "edunotify broadcast".yellow());
    Ok(())
}
