pub mod admin;
pub mod app;
pub mod archive;
pub mod callback;
pub mod config;
pub mod error;
pub mod format;
pub mod http;
pub mod state;
pub mod tg;
pub mod tmdb;
pub mod web;

pub use app::App;

use std::sync::Arc;
use teloxide::Bot;

/// Логи как везде: RUST_LOG через EnvFilter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Конфиг из окружения (.env тоже читается) и готовое состояние бота.
pub async fn bootstrap() -> anyhow::Result<(Bot, Arc<App>)> {
    dotenvy::dotenv().ok();
    init_tracing();
    let config = config::Config::from_env()?;
    let bot = Bot::new(config.bot_token.clone());
    let app = App::new(config).await?;
    Ok((bot, Arc::new(app)))
}
