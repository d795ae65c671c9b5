use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub broadcast: BroadcastConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub admin_chat_id: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BroadcastConfig {
    /// UTC wall-clock time the daily job fires at.
    pub hour_utc: u32,
    pub minute_utc: u32,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::Environment::with_prefix("EDUNOTIFY").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.telegram.bot_token.is_empty() {
            anyhow::bail!("telegram.bot_token is empty");
        }
        if self.broadcast.hour_utc > 23 || self.broadcast.minute_utc > 59 {
            anyhow::bail!(
                "broadcast time {:02}:{:02} is not a valid UTC wall-clock time",
                self.broadcast.hour_utc,
                self.broadcast.minute_utc
            );
        }
        Ok(())
    }
}
