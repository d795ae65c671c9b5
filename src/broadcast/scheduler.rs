use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use teloxide::Bot;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::broadcast::job;
use crate::config::BroadcastConfig;
use crate::storage::Database;

/// Daily timer: sleep until the configured UTC wall-clock time, run the
/// broadcast, repeat. The job's own last-run guard keeps a same-day re-fire
/// after a restart from broadcasting twice.
pub async fn run_daily(bot: Bot, database: Arc<Mutex<Database>>, config: BroadcastConfig) {
    loop {
        let target = match next_fire(Utc::now(), config.hour_utc, config.minute_utc) {
            Some(target) => target,
            None => {
                error!(
                    "Broadcast time {:02}:{:02} is invalid, scheduler stopped",
                    config.hour_utc, config.minute_utc
                );
                return;
            }
        };

        let wait = (target - Utc::now()).to_std().unwrap_or_default();
        info!("Next birthday broadcast at {} (in {:?})", target, wait);
        tokio::time::sleep(wait).await;

        match job::run_once(&bot, &database, false).await {
            Ok(outcome) => info!("Broadcast run finished: {:?}", outcome),
            Err(e) => error!("Broadcast run failed: {}", e),
        }
    }
}

/// First occurrence of `hour:minute` UTC strictly after `now`.
fn next_fire(now: DateTime<Utc>, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    let today = now.date_naive().and_hms_opt(hour, minute, 0)?.and_utc();
    if today > now {
        Some(today)
    } else {
        Some(today + Duration::days(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn fires_later_today_when_time_not_passed() {
        let now = at("2024-05-20T10:00:00Z");
        assert_eq!(next_fire(now, 23, 30), Some(at("2024-05-20T23:30:00Z")));
    }

    #[test]
    fn rolls_to_tomorrow_when_time_passed() {
        let now = at("2024-05-20T10:00:00Z");
        assert_eq!(next_fire(now, 0, 0), Some(at("2024-05-21T00:00:00Z")));
    }

    #[test]
    fn exact_boundary_rolls_to_tomorrow() {
        let now = at("2024-05-20T00:00:00Z");
        assert_eq!(next_fire(now, 0, 0), Some(at("2024-05-21T00:00:00Z")));
    }

    #[test]
    fn invalid_time_yields_none() {
        assert_eq!(next_fire(Utc::now(), 24, 0), None);
    }
}
