use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use futures::future::join_all;
use teloxide::prelude::*;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::error::Result;
use crate::storage::{models::format_long_date, Database, UserProfile};

const RULE: &str = "------------------------------------------";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// The guard saw a run recorded for today already.
    AlreadyRan,
    /// Nobody's birthday matched today's month/day; nothing was sent.
    NoBirthdays,
    Sent { matched: usize, delivered: usize, failed: usize },
}

/// One composite body shared by every recipient. `None` when the match set
/// is empty, in which case nothing is broadcast at all.
pub fn compose_message(matches: &[UserProfile], now: DateTime<Utc>) -> Option<String> {
    if matches.is_empty() {
        return None;
    }

    let mut message = String::from("Today birthdays:\n\n");
    for profile in matches {
        message.push_str(&format!(
            "{}\nName: {}\nBirthday: {}\n{}\n\n",
            RULE,
            profile.display_name,
            format_long_date(profile.birthday),
            RULE,
        ));
    }

    message.push_str(&format!(
        "Wishing all our users born today a very happy birthday! 🎉🎂🎁🎈\n\nExecution Time: {}",
        now.format("%d/%m/%Y @ %H:%M:%S"),
    ));

    Some(message)
}

/// Run the daily birthday broadcast once. With `force = false` the persisted
/// last-run date makes the job idempotent per UTC day, so a restarted
/// process re-firing the timer does not broadcast twice.
pub async fn run_once(
    bot: &Bot,
    database: &Arc<Mutex<Database>>,
    force: bool,
) -> Result<BroadcastOutcome> {
    let now = Utc::now();
    let today = now.date_naive();

    let (matches, recipients) = {
        let db = database.lock().await;

        if !force && db.last_broadcast_date()? == Some(today) {
            info!("Broadcast already ran on {}, skipping", today);
            return Ok(BroadcastOutcome::AlreadyRan);
        }
        db.mark_broadcast_ran(today)?;

        let matches = db.birthdays_on(today.month(), today.day())?;
        // The recipient set is every notify-enabled profile, independent of
        // who actually has a birthday today.
        let recipients = db.notify_enabled_profiles()?;
        (matches, recipients)
    };

    let message = match compose_message(&matches, now) {
        Some(message) => message,
        None => {
            info!("No users have a birthday today");
            return Ok(BroadcastOutcome::NoBirthdays);
        }
    };

    info!(
        "Broadcasting {} birthday(s) to {} recipient(s)",
        matches.len(),
        recipients.len()
    );

    let (delivered, failed) = deliver(&recipients, &message, |chat_id, text| {
        let bot = bot.clone();
        async move {
            bot.send_message(ChatId(chat_id), text)
                .await
                .map(|_| ())
                .map_err(|e| e.to_string())
        }
    })
    .await;

    Ok(BroadcastOutcome::Sent {
        matched: matches.len(),
        delivered,
        failed,
    })
}

/// Issue every recipient's send concurrently and await the whole group.
/// A failed delivery is logged for that recipient and never aborts the rest
/// of the batch. Returns (delivered, failed) counts.
async fn deliver<S, Fut>(recipients: &[UserProfile], message: &str, send: S) -> (usize, usize)
where
    S: Fn(i64, String) -> Fut,
    Fut: Future<Output = std::result::Result<(), String>>,
{
    let sends = recipients.iter().map(|recipient| {
        let fut = send(recipient.chat_id, message.to_string());
        async move {
            fut.await
                .map_err(|e| (recipient.chat_id, recipient.display_name.as_str(), e))
        }
    });

    let mut delivered = 0;
    let mut failed = 0;
    for result in join_all(sends).await {
        match result {
            Ok(()) => delivered += 1,
            Err((chat_id, name, e)) => {
                failed += 1;
                error!("Error sending message to user {} ({}): {}", name, chat_id, e);
            }
        }
    }
    (delivered, failed)
}
