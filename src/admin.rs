use crate::error::BotError;
use crate::format;
use crate::state::KnownChats;
use std::{collections::HashSet, fmt::Display, future::Future};

pub const BROADCAST_USAGE: &str = "Usage: /broadcast <message>";

pub fn is_admin(admins: &HashSet<u64>, user_id: Option<u64>) -> bool {
    user_id.is_some_and(|id| admins.contains(&id))
}

pub fn ensure_admin(admins: &HashSet<u64>, user_id: Option<u64>) -> Result<(), BotError> {
    if is_admin(admins, user_id) { Ok(()) } else { Err(BotError::Unauthorized) }
}

/// Шлёт текст во все известные чаты по очереди. Ошибка одного чата: пропуск,
/// без повторов. Возвращает число успешных отправок.
pub async fn broadcast<F, Fut, E>(chats: &KnownChats, text: &str, send: F) -> usize
where
    F: Fn(i64, String) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut sent = 0;
    for chat_id in chats.snapshot().await {
        match send(chat_id, text.to_string()).await {
            Ok(()) => sent += 1,
            Err(e) => tracing::debug!(chat_id, error = %e, "broadcast skipped"),
        }
    }
    sent
}

/// /broadcast целиком: проверка прав, пустой текст, рассылка. Возвращает ответ админу.
pub async fn handle_broadcast<F, Fut, E>(
    admins: &HashSet<u64>,
    user_id: Option<u64>,
    text: &str,
    chats: &KnownChats,
    send: F,
) -> String
where
    F: Fn(i64, String) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    if let Err(e) = ensure_admin(admins, user_id) {
        tracing::warn!(?user_id, "broadcast attempt from non-admin");
        return e.to_string();
    }
    let text = text.trim();
    if text.is_empty() {
        return BROADCAST_USAGE.to_string();
    }
    let sent = broadcast(chats, text, send).await;
    tracing::info!(sent, "broadcast done");
    format!("Broadcast sent to {} chats.", sent)
}

/// /stats открыт всем.
pub async fn handle_stats(admins: &HashSet<u64>, chats: &KnownChats) -> String {
    format::stats_text(chats.len().await, admins.len())
}
