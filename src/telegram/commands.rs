use std::sync::Arc;

use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::{debug, warn};

use crate::telegram::bot::{BotState, Command, FlowDialogue, FlowState, HandlerResult};
use crate::telegram::formatters;

pub(crate) const PROMPT_BIRTHDAY: &str = "What is your birthday (MM/DD/YYYY)?";
pub(crate) const PROMPT_DEGREE_CODE: &str = "What is your degree code? (e.g. SE-UGC-B1)";

pub async fn handle_command(
    bot: Bot,
    dialogue: FlowDialogue,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> HandlerResult {
    let chat_id = msg.chat.id;

    match cmd {
        Command::Help => {
            bot.send_message(chat_id, Command::descriptions().to_string())
                .await?;
        }
        Command::Status => {
            if authenticate(&bot, &msg, &state).await? {
                bot.send_message(chat_id, "✅ Up and running.").await?;
            }
        }
        Command::Register => {
            let existing = {
                let db = state.database.lock().await;
                db.find_by_chat(chat_id.0)?
            };

            match existing {
                Some(profile) if profile.notify_enabled => {
                    bot.send_message(chat_id, "😉 You are already registered.")
                        .await?;
                }
                Some(_) => {
                    // Soft-unregistered: flip notifications back on, nothing
                    // else to collect.
                    let db = state.database.lock().await;
                    db.set_notify(chat_id.0, true)?;
                    bot.send_message(chat_id, "✅ You have been registered successfully.")
                        .await?;
                }
                None => {
                    bot.send_message(chat_id, PROMPT_BIRTHDAY).await?;
                    dialogue.update(FlowState::AwaitBirthday).await?;
                }
            }
        }
        Command::Update => {
            if authenticate(&bot, &msg, &state).await? {
                bot.send_message(chat_id, PROMPT_DEGREE_CODE).await?;
                dialogue.update(FlowState::AwaitUpdateCode).await?;
            }
        }
        Command::Unregister => {
            let disabled = {
                let db = state.database.lock().await;
                db.set_notify(chat_id.0, false)?
            };
            if disabled {
                bot.send_message(chat_id, "😥 You have been unregistered.")
                    .await?;
            } else {
                bot.send_message(chat_id, "😕 You are not registered.").await?;
            }
        }
        Command::Users => {
            if authenticate(&bot, &msg, &state).await? {
                if chat_id.0 == state.config.telegram.admin_chat_id {
                    let profiles = {
                        let db = state.database.lock().await;
                        db.all_profiles()?
                    };
                    bot.send_message(chat_id, formatters::user_listing(&profiles))
                        .await?;
                } else {
                    warn!("Chat {} attempted the admin-only /users command", chat_id);
                    bot.send_message(chat_id, "🚫 You are not authorized to use this command.")
                        .await?;
                }
            }
        }
        Command::Account => {
            if authenticate(&bot, &msg, &state).await? {
                let profile = {
                    let db = state.database.lock().await;
                    db.find_by_chat(chat_id.0)?
                };
                match profile {
                    Some(profile) => {
                        bot.send_message(chat_id, formatters::account_view(&profile))
                            .await?;
                    }
                    None => {
                        bot.send_message(chat_id, "❌ An error occurred. Please try again later.")
                            .await?;
                    }
                }
            }
        }
        Command::Timetable => {
            // Unimplemented feature; the command is registered so /help
            // advertises it, but it does nothing yet.
            debug!("Ignoring /timetable from chat {}", chat_id);
        }
    }

    Ok(())
}

/// A caller counts as registered only while notifications are on. Failure
/// always produces a rejection message.
async fn authenticate(bot: &Bot, msg: &Message, state: &BotState) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let profile = {
        let db = state.database.lock().await;
        db.find_by_chat(msg.chat.id.0)?
    };

    if profile.map(|p| p.notify_enabled).unwrap_or(false) {
        Ok(true)
    } else {
        bot.send_message(msg.chat.id, "🚫 Permission denied.\n😕 You are not registered.")
            .await?;
        Ok(false)
    }
}
