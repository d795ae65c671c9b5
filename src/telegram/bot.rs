use std::sync::Arc;

use chrono::NaiveDate;
use teloxide::{
    dispatching::{dialogue::InMemStorage, UpdateHandler},
    prelude::*,
    utils::command::BotCommands,
};
use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;
use crate::storage::Database;
use crate::telegram::{commands, flow};

/// State shared across all bot handlers
pub struct BotState {
    pub config: Config,
    pub database: Arc<Mutex<Database>>,
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "Show this help message")]
    Help,
    #[command(description = "Check that the bot is up")]
    Status,
    #[command(description = "Register for birthday notifications")]
    Register,
    #[command(description = "Update your degree code")]
    Update,
    #[command(description = "Turn notifications off")]
    Unregister,
    #[command(description = "List all registered users (admin only)")]
    Users,
    #[command(description = "Show your account data")]
    Account,
    #[command(description = "University timetables (coming soon)")]
    Timetable,
}

/// One conversational flow per chat. `InMemStorage` keys the state by chat
/// id, so a message from one chat can never resume another chat's flow.
/// Suspended flows have no timeout; a process restart drops them.
#[derive(Clone, Default)]
pub enum FlowState {
    #[default]
    Idle,
    AwaitBirthday,
    AwaitDegreeCode {
        birthday: NaiveDate,
    },
    AwaitUpdateCode,
}

pub type FlowDialogue = Dialogue<FlowState, InMemStorage<FlowState>>;
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    use dptree::case;

    Update::filter_message()
        .enter_dialogue::<Message, InMemStorage<FlowState>, FlowState>()
        .branch(
            case![FlowState::Idle]
                .filter_command::<Command>()
                .endpoint(commands::handle_command),
        )
        .branch(case![FlowState::AwaitBirthday].endpoint(flow::receive_birthday))
        .branch(case![FlowState::AwaitDegreeCode { birthday }].endpoint(flow::receive_degree_code))
        .branch(case![FlowState::AwaitUpdateCode].endpoint(flow::receive_update_code))
}

pub async fn run_bot(bot: Bot, config: Config, database: Arc<Mutex<Database>>) {
    info!("Starting Telegram dispatcher...");

    let state = Arc::new(BotState { config, database });

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state, InMemStorage::<FlowState>::new()])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
