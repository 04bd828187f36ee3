use crate::app::{App, CallbackRoute, Command, Reply};
use crate::callback::CallbackAction;
use crate::format;
use std::sync::Arc;
use teloxide::{
    dispatching::{Dispatcher, UpdateFilterExt},
    prelude::*,
    types::{
        CallbackQuery, ChatAction, ChatId, InputFile, LinkPreviewOptions, MessageId, ParseMode,
    },
    utils::command::BotCommands,
};

pub async fn run(bot: Bot, app: Arc<App>) {
    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint({
                            let app = app.clone();
                            move |bot: Bot, msg: Message, cmd: Command| {
                                let app = app.clone();
                                async move { on_command(bot, msg, cmd, &app).await }
                            }
                        })
                )
                .branch({
                    let app = app.clone();
                    dptree::endpoint(move |bot: Bot, msg: Message| {
                        let app = app.clone();
                        async move { on_text(bot, msg, &app).await }
                    })
                })
        )
        .branch(
            Update::filter_callback_query().endpoint({
                let app = app.clone();
                move |bot: Bot, q: CallbackQuery| {
                    let app = app.clone();
                    async move { on_callback(bot, q, &app).await }
                }
            })
        );

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!(error = %e, "failed to register command list");
    }

    tracing::info!("bot is running, press Ctrl+C to stop");
    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn on_command(bot: Bot, msg: Message, cmd: Command, app: &App) -> ResponseResult<()> {
    let user_id = msg.from.as_ref().map(|u| u.id.0);
    if matches!(cmd, Command::Start | Command::Search(_) | Command::Trending) {
        typing(&bot, msg.chat.id).await;
    }
    let reply = app
        .on_command(msg.chat.id.0, user_id, cmd, |chat, body| {
            let bot = bot.clone();
            async move { bot.send_message(ChatId(chat), body).await.map(|_| ()) }
        })
        .await;
    send_reply(&bot, msg.chat.id, reply).await
}

/* ====== Текст без команды = поиск ====== */
async fn on_text(bot: Bot, msg: Message, app: &App) -> ResponseResult<()> {
    let text = msg.text().unwrap_or("");
    if !text.trim_start().starts_with('/') && !text.trim().is_empty() {
        typing(&bot, msg.chat.id).await;
    }
    let user_id = msg.from.as_ref().map(|u| u.id.0);
    match app.on_text(msg.chat.id.0, user_id, text).await {
        Some(reply) => send_reply(&bot, msg.chat.id, reply).await,
        None => Ok(()),
    }
}

/* ====== Callback-кнопки ======
   pick|kind|id       — карточка тайтла
   prov|kind|id       — где смотреть
   trailer|kind|id    — трейлер
   pd|kind|id|title   — public-domain в Internet Archive
   rec|kind|id        — похожие
*/
async fn on_callback(bot: Bot, q: CallbackQuery, app: &App) -> ResponseResult<()> {
    let Some(data) = q.data.as_deref() else { return Ok(()) };
    let Some(message) = q.message.as_ref() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let chat = message.chat().id;
    let route = app.on_callback(chat.0, data).await;
    bot.answer_callback_query(q.id.clone()).await?;

    let mut target = Target {
        chat,
        message_id: message.id(),
        is_photo: message.regular_message().is_some_and(|m| m.photo().is_some()),
    };

    let action = match route {
        CallbackRoute::Ignore => return Ok(()),
        CallbackRoute::Invalid(reply) => {
            respond(&bot, &target, reply).await?;
            return Ok(());
        }
        CallbackRoute::Action(a) => a,
    };
    tracing::debug!(tag = action.tag(), "callback");

    if matches!(action, CallbackAction::PublicDomain { .. }) {
        target = respond(&bot, &target, Reply::plain(format::ARCHIVE_SEARCHING)).await?;
    }

    let reply = app.on_action(&action).await;
    if let Some(photo) = reply.photo.clone() {
        match send_card(&bot, app, chat, &photo, &reply).await {
            Ok(()) => return Ok(()),
            Err(e) => tracing::warn!(error = %e, "poster card failed, falling back to text"),
        }
    }
    respond(&bot, &target, reply).await?;
    Ok(())
}

/* ====== Отправка ====== */

/// Сообщение с кнопкой, на которое отвечаем.
struct Target {
    chat: ChatId,
    message_id: MessageId,
    is_photo: bool,
}

/// Правим сообщение на месте. У фото текста нет, поэтому шлём новое.
/// Возвращает сообщение, в котором теперь лежит ответ.
async fn respond(bot: &Bot, target: &Target, reply: Reply) -> ResponseResult<Target> {
    if target.is_photo {
        let sent = send_message(bot, target.chat, reply).await?;
        return Ok(Target { chat: target.chat, message_id: sent.id, is_photo: false });
    }
    let mut req = bot
        .edit_message_text(target.chat, target.message_id, reply.text)
        .link_preview_options(no_preview());
    if reply.html {
        req = req.parse_mode(ParseMode::Html);
    }
    if let Some(kb) = reply.markup {
        req = req.reply_markup(kb);
    }
    req.await?;
    Ok(Target { chat: target.chat, message_id: target.message_id, is_photo: false })
}

async fn send_reply(bot: &Bot, chat: ChatId, reply: Reply) -> ResponseResult<()> {
    send_message(bot, chat, reply).await?;
    Ok(())
}

async fn send_message(bot: &Bot, chat: ChatId, reply: Reply) -> ResponseResult<Message> {
    let mut req = bot.send_message(chat, reply.text).link_preview_options(no_preview());
    if reply.html {
        req = req.parse_mode(ParseMode::Html);
    }
    if let Some(kb) = reply.markup {
        req = req.reply_markup(kb);
    }
    req.await
}

/// Карточка тайтла: постер байтами + подпись + кнопки.
async fn send_card(bot: &Bot, app: &App, chat: ChatId, photo_url: &str, reply: &Reply) -> anyhow::Result<()> {
    let bytes = app.http().get_image(photo_url).await?;
    let mut req = bot
        .send_photo(chat, InputFile::memory(bytes).file_name("poster.jpg"))
        .caption(reply.text.clone())
        .parse_mode(ParseMode::Html);
    if let Some(kb) = reply.markup.clone() {
        req = req.reply_markup(kb);
    }
    req.await?;
    Ok(())
}

async fn typing(bot: &Bot, chat: ChatId) {
    if let Err(e) = bot.send_chat_action(chat, ChatAction::Typing).await {
        tracing::debug!(error = %e, "typing indicator failed");
    }
}

fn no_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}
