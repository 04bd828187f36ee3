//! Бот + health-check для хостингов, которым нужен открытый порт.

use tg_movie_finder::{bootstrap, tg, web};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (bot, app) = bootstrap().await?;
    let port = app.config.port;

    let result = tokio::select! {
        res = web::serve(port) => res,
        _ = tg::run(bot, app.clone()) => Ok(()),
    };

    app.shutdown().await;
    result
}
