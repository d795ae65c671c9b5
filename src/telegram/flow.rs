//! The multi-turn registration and update flows. Each handler runs when the
//! chat's dialogue sits in the matching state; a failed validation re-prompts
//! and leaves the state untouched, so the flow loops until the user gets it
//! right or the process restarts.

use std::sync::Arc;

use chrono::NaiveDate;
use teloxide::prelude::*;
use teloxide::types::Chat;
use tracing::info;

use crate::storage::{Enrollment, NewProfile};
use crate::telegram::bot::{BotState, FlowDialogue, FlowState, HandlerResult};
use crate::telegram::commands::{PROMPT_BIRTHDAY, PROMPT_DEGREE_CODE};
use crate::validation::{parse_birthday, parse_degree_code};

pub async fn receive_birthday(bot: Bot, dialogue: FlowDialogue, msg: Message) -> HandlerResult {
    let chat_id = msg.chat.id;

    let birthday = match msg.text().map(parse_birthday) {
        Some(Ok(date)) => date,
        Some(Err(err)) => {
            bot.send_message(chat_id, format!("{}\n\n{}", err, PROMPT_BIRTHDAY))
                .await?;
            return Ok(());
        }
        None => {
            bot.send_message(chat_id, format!("❌ Please answer with a text message.\n\n{}", PROMPT_BIRTHDAY))
                .await?;
            return Ok(());
        }
    };

    bot.send_message(chat_id, PROMPT_DEGREE_CODE).await?;
    dialogue.update(FlowState::AwaitDegreeCode { birthday }).await?;
    Ok(())
}

pub async fn receive_degree_code(
    bot: Bot,
    dialogue: FlowDialogue,
    birthday: NaiveDate,
    msg: Message,
    state: Arc<BotState>,
) -> HandlerResult {
    let chat_id = msg.chat.id;

    let code = match validate_code_reply(&bot, &msg).await? {
        Some(code) => code,
        None => return Ok(()),
    };

    let profile = NewProfile {
        chat_id: chat_id.0,
        display_name: display_name(&msg.chat),
        username: msg.chat.username().map(str::to_owned),
        birthday,
        enrollment: Enrollment::Degree {
            code: code.code,
            university: code.university.to_string(),
            degree: code.degree.to_string(),
            group: code.group,
        },
    };

    {
        let db = state.database.lock().await;
        db.upsert_profile(&profile)?;
    }
    info!("Registered chat {} ({})", chat_id, profile.display_name);

    bot.send_message(chat_id, "✅ You have been registered successfully.")
        .await?;
    dialogue.exit().await?;
    Ok(())
}

pub async fn receive_update_code(
    bot: Bot,
    dialogue: FlowDialogue,
    msg: Message,
    state: Arc<BotState>,
) -> HandlerResult {
    let chat_id = msg.chat.id;

    let code = match validate_code_reply(&bot, &msg).await? {
        Some(code) => code,
        None => return Ok(()),
    };

    let updated = {
        let db = state.database.lock().await;
        db.update_enrollment(chat_id.0, &code)?
    };

    if updated {
        info!("Updated enrollment for chat {}", chat_id);
        bot.send_message(chat_id, "✅ Your degree details have been updated.")
            .await?;
    } else {
        // The profile vanished between authentication and this write.
        bot.send_message(chat_id, "❌ User not found.").await?;
    }

    dialogue.exit().await?;
    Ok(())
}

/// Shared degree-code step: on success returns the parsed code, on failure
/// sends the composed error plus a fresh prompt and returns None so the
/// caller leaves the dialogue state alone.
async fn validate_code_reply(
    bot: &Bot,
    msg: &Message,
) -> Result<Option<crate::validation::DegreeCode>, Box<dyn std::error::Error + Send + Sync>> {
    let text = match msg.text() {
        Some(text) => text,
        None => {
            bot.send_message(msg.chat.id, "❌ Please answer with a text message.")
                .await?;
            return Ok(None);
        }
    };

    match parse_degree_code(text) {
        Ok(code) => Ok(Some(code)),
        Err(err) => {
            bot.send_message(msg.chat.id, format!("{}\n\n{}", err, PROMPT_DEGREE_CODE))
                .await?;
            Ok(None)
        }
    }
}

fn display_name(chat: &Chat) -> String {
    match (chat.first_name(), chat.last_name()) {
        (Some(first), Some(last)) => format!("{} {}", first, last),
        (Some(first), None) => first.to_string(),
        (None, Some(last)) => last.to_string(),
        (None, None) => "Unknown".to_string(),
    }
}
