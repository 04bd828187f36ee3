use tg_movie_finder::{bootstrap, tg};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (bot, app) = bootstrap().await?;

    tg::run(bot, app.clone()).await;

    // после Ctrl+C: закрываем пул HTTP-соединений
    app.shutdown().await;
    Ok(())
}
