mod config;
mod dialogue;
mod filters;
mod kinopoisk;
mod render;
mod storage;
mod tg;

use dotenvy::dotenv;
use teloxide::{prelude::*, types::ChatId};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // без любой из обязательных переменных дальше не идём
    let config = config::Config::from_env()?;

    let bot = Bot::new(&config.telegram_token);
    let api = kinopoisk::KinopoiskClient::new(
        config.kinopoisk_token.clone(),
        config.api_url.clone(),
        config.http_timeout,
    )?;
    let sessions = storage::SessionStore::new(config.session_ttl);

    tracing::info!(api_url = %config.api_url, "starting bot");
    let services = tg::Services { api, sessions, operator_chat: ChatId(config.operator_chat_id) };
    tg::run(bot, services).await;
    Ok(())
}
