use crate::archive::{self, ArchiveClient};
use crate::callback::{CallbackAction, CallbackError};
use crate::config::Config;
use crate::error::BotError;
use crate::format;
use crate::http::HttpClient;
use crate::state::KnownChats;
use crate::tmdb::{MediaKind, TmdbClient};
use std::{fmt::Display, future::Future};
use teloxide::{types::InlineKeyboardMarkup, utils::command::BotCommands};

/* ====== Команды ====== */
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Commands:")]
pub enum Command {
    #[command(description = "welcome screen")]
    Start,
    #[command(description = "how to use the bot")]
    Help,
    #[command(description = "search movies and series")]
    Search(String),
    #[command(description = "today's trending titles")]
    Trending,
    #[command(description = "admin: send a message to every known chat")]
    Broadcast(String),
    #[command(description = "bot statistics")]
    Stats,
}

/// Что делать с нажатием кнопки.
#[derive(Debug, Clone)]
pub enum CallbackRoute {
    /// неизвестный тег: только ответить на нажатие
    Ignore,
    /// данные битые: показать ошибку на том же сообщении
    Invalid(Reply),
    Action(CallbackAction),
}

pub fn route_callback(data: &str) -> CallbackRoute {
    match data.parse::<CallbackAction>() {
        Ok(a) => CallbackRoute::Action(a),
        Err(CallbackError::UnknownTag(tag)) => {
            tracing::debug!(%tag, "unknown callback, ignored");
            CallbackRoute::Ignore
        }
        Err(e) => {
            tracing::debug!(data, error = %e, "bad callback data");
            Reply::plain(BotError::from(e).render("Callback")).into_invalid()
        }
    }
}

/// Текст, не разобранный как команда.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRoute {
    Ignore,
    Search(String),
    /// /broadcast без текста: парсер команд его не принял
    BroadcastUsage,
}

pub fn route_text(text: &str) -> TextRoute {
    let text = text.trim();
    if text.is_empty() {
        return TextRoute::Ignore;
    }
    if !text.starts_with('/') {
        return TextRoute::Search(text.to_string());
    }
    // "/search@MyBot rest" -> "search"
    let word = text.split_whitespace().next().unwrap_or("");
    let name = word.trim_start_matches('/').split('@').next().unwrap_or("");
    match name {
        "search" => TextRoute::Search(text[word.len()..].trim().to_string()),
        "broadcast" => TextRoute::BroadcastUsage,
        _ => TextRoute::Ignore,
    }
}

/// То, что нужно отправить или подставить в редактируемое сообщение.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub html: bool,
    pub markup: Option<InlineKeyboardMarkup>,
    /// URL постера: карточку сначала пробуем отправить фото с подписью.
    pub photo: Option<String>,
}

impl Reply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), html: false, markup: None, photo: None }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self { html: true, ..Self::plain(text) }
    }

    pub fn with_markup(mut self, kb: InlineKeyboardMarkup) -> Self {
        self.markup = Some(kb);
        self
    }

    pub fn with_photo(mut self, url: String) -> Self {
        self.photo = Some(url);
        self
    }

    fn into_invalid(self) -> CallbackRoute {
        CallbackRoute::Invalid(self)
    }
}

/// Всё состояние бота: конфиг, клиенты внешних API и известные чаты.
/// Создаётся один раз и передаётся в диспетчер.
pub struct App {
    pub config: Config,
    http: HttpClient,
    tmdb: TmdbClient,
    archive: ArchiveClient,
    pub chats: KnownChats,
}

impl App {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http = HttpClient::new();
        let tmdb = TmdbClient::new(http.clone(), config.tmdb_api_key.clone());
        let archive = ArchiveClient::new(http.clone());
        let chats = match &config.known_chats_path {
            Some(path) => KnownChats::open(path).await?,
            None => KnownChats::in_memory(),
        };
        Ok(Self::from_parts(config, http, tmdb, archive, chats))
    }

    pub fn from_parts(
        config: Config,
        http: HttpClient,
        tmdb: TmdbClient,
        archive: ArchiveClient,
        chats: KnownChats,
    ) -> Self {
        Self { config, http, tmdb, archive, chats }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub async fn remember_chat(&self, chat_id: i64) {
        if self.chats.insert(chat_id).await {
            tracing::info!(chat_id, "new chat");
        }
    }

    pub async fn shutdown(&self) {
        self.http.close().await;
    }

    /* ====== События ====== */

    /// Команда от пользователя. `send` нужен только для /broadcast.
    pub async fn on_command<F, Fut, E>(
        &self,
        chat_id: i64,
        user_id: Option<u64>,
        cmd: Command,
        send: F,
    ) -> Reply
    where
        F: Fn(i64, String) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        self.remember_chat(chat_id).await;
        match cmd {
            Command::Start => self.start(),
            Command::Help => Reply::plain(format!("{}\n\n{}", self.help().text, Command::descriptions())),
            Command::Search(query) => self.search(&query).await,
            Command::Trending => self.trending().await,
            Command::Broadcast(text) => self.broadcast(user_id, &text, send).await,
            Command::Stats => self.stats().await,
        }
    }

    /// Обычный текст = поиск. None: отвечать нечего.
    pub async fn on_text(&self, chat_id: i64, user_id: Option<u64>, text: &str) -> Option<Reply> {
        self.remember_chat(chat_id).await;
        match route_text(text) {
            TextRoute::Ignore => None,
            TextRoute::Search(query) => Some(self.search(&query).await),
            TextRoute::BroadcastUsage => Some(
                self.broadcast(user_id, "", |_, _| async { Ok::<(), std::convert::Infallible>(()) }).await,
            ),
        }
    }

    pub async fn on_callback(&self, chat_id: i64, data: &str) -> CallbackRoute {
        self.remember_chat(chat_id).await;
        route_callback(data)
    }

    pub fn start(&self) -> Reply {
        Reply::html(format::splash(&self.config.brand, &self.config.tagline, &self.config.watch_region))
    }

    pub fn help(&self) -> Reply {
        Reply::plain(format::help())
    }

    /// И /search, и обычный текст без команды.
    pub async fn search(&self, query: &str) -> Reply {
        let query = query.trim();
        if query.is_empty() {
            return Reply::plain(format::SEARCH_USAGE);
        }
        match self.tmdb.search(query).await {
            Ok(results) if results.is_empty() => Reply::plain(format::NO_RESULTS),
            Ok(results) => Reply::plain(format::PICK_PROMPT).with_markup(format::picker_keyboard(&results)),
            Err(e) => failed("TMDB", e.into()),
        }
    }

    pub async fn trending(&self) -> Reply {
        match self.tmdb.trending().await {
            Ok(t) => Reply::html(format::trending_text(&t)),
            Err(e) => failed("TMDB", e.into()),
        }
    }

    /* ====== Кнопки ====== */

    pub async fn on_action(&self, action: &CallbackAction) -> Reply {
        match action {
            CallbackAction::Pick { kind, id } => self.pick(*kind, *id).await,
            CallbackAction::Providers { kind, id } => {
                match self.tmdb.providers(*kind, *id, &self.config.watch_region).await {
                    Ok(p) => Reply::html(format::providers_text(&p)),
                    Err(e) => failed("Providers", e.into()),
                }
            }
            CallbackAction::Trailer { kind, id } => match self.tmdb.trailer(*kind, *id).await {
                Ok(url) => Reply::plain(format::trailer_text(url.as_deref())),
                Err(e) => failed("Trailer", e.into()),
            },
            CallbackAction::PublicDomain { title, .. } => {
                match self.archive.search_public_domain(title, archive::DEFAULT_LIMIT).await {
                    Ok(items) if items.is_empty() => Reply::plain(format::ARCHIVE_EMPTY),
                    Ok(items) => Reply::html(format::archive_text(&items)),
                    Err(e) => failed("IA", e.into()),
                }
            }
            CallbackAction::Recommend { kind, id } => match self.tmdb.similar(*kind, *id).await {
                Ok(items) => Reply::html(format::similar_text(&items)),
                Err(e) => failed("Recommendation", e.into()),
            },
        }
    }

    async fn pick(&self, kind: MediaKind, id: u64) -> Reply {
        let d = match self.tmdb.details(kind, id).await {
            Ok(d) => d,
            Err(e) => return failed("TMDB", e.into()),
        };
        let kb = format::detail_keyboard(kind, id, &d.title, &self.config.watch_region);
        let reply = Reply::html(format::detail_text(&d, format::CAPTION_OVERVIEW_MAX)).with_markup(kb);
        match &d.poster_path {
            Some(p) => reply.with_photo(self.tmdb.poster_url(p)),
            None => reply,
        }
    }

    pub async fn broadcast<F, Fut, E>(&self, user_id: Option<u64>, text: &str, send: F) -> Reply
    where
        F: Fn(i64, String) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        Reply::plain(crate::admin::handle_broadcast(&self.config.admin_ids, user_id, text, &self.chats, send).await)
    }

    pub async fn stats(&self) -> Reply {
        Reply::plain(crate::admin::handle_stats(&self.config.admin_ids, &self.chats).await)
    }
}

fn failed(area: &str, e: BotError) -> Reply {
    tracing::warn!(area, error = %e, "request failed");
    Reply::plain(e.render(area))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use teloxide::types::InlineKeyboardButtonKind;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app(server: &MockServer) -> App {
        let env: HashMap<&str, &str> =
            HashMap::from([("BOT_TOKEN", "t"), ("TMDB_API_KEY", "k"), ("ADMIN_USER_IDS", "1")]);
        let config = Config::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        let http = HttpClient::new();
        let tmdb = TmdbClient::with_base_url(http.clone(), "k".into(), server.uri());
        let archive = ArchiveClient::with_base_url(http.clone(), server.uri());
        App::from_parts(config, http, tmdb, archive, KnownChats::in_memory())
    }

    #[tokio::test]
    async fn search_chaplin_renders_two_button_picker() {
        let server = MockServer::start().await;
        let long = "Chaplin: The Complete Mutual Comedies and Other Shorts, Restored";
        Mock::given(method("GET"))
            .and(path("/search/multi"))
            .and(query_param("query", "Chaplin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": 10, "media_type": "movie", "title": "The Kid", "release_date": "1921-01-21"},
                    {"id": 20, "media_type": "tv", "name": long, "first_air_date": "2019-04-01"},
                    {"id": 30, "media_type": "person", "name": "Charlie Chaplin"}
                ]
            })))
            .mount(&server)
            .await;

        let reply = app(&server).search("Chaplin").await;
        assert_eq!(reply.text, format::PICK_PROMPT);
        let rows = reply.markup.expect("picker").inline_keyboard;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0].text, "The Kid (1921)");
        let expected: String = format!("{long} (2019)").chars().take(60).collect();
        assert_eq!(rows[1][0].text, expected);
        assert!(matches!(&rows[1][0].kind, InlineKeyboardButtonKind::CallbackData(d) if d == "pick|tv|20"));
    }

    #[tokio::test]
    async fn zero_matches_means_no_keyboard() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/multi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&server)
            .await;

        let reply = app(&server).search("zzzz").await;
        assert_eq!(reply.text, format::NO_RESULTS);
        assert!(reply.markup.is_none());
    }

    #[tokio::test]
    async fn empty_query_asks_for_text() {
        let server = MockServer::start().await;
        let reply = app(&server).search("   ").await;
        assert_eq!(reply.text, format::SEARCH_USAGE);
    }

    #[tokio::test]
    async fn tmdb_failure_becomes_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let a = app(&server);
        let reply = a.search("Matrix").await;
        assert!(reply.text.starts_with("TMDB error: 503"), "{}", reply.text);
        assert!(reply.markup.is_none());

        let reply = a.on_action(&CallbackAction::Providers { kind: MediaKind::Movie, id: 1 }).await;
        assert!(reply.text.starts_with("Providers error:"));
        let reply = a.on_action(&CallbackAction::Recommend { kind: MediaKind::Movie, id: 1 }).await;
        assert!(reply.text.starts_with("Recommendation error:"));
    }

    #[tokio::test]
    async fn public_domain_without_matches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/advancedsearch.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": {"docs": []}})))
            .mount(&server)
            .await;

        let action = CallbackAction::public_domain(MediaKind::Movie, 603, "The Matrix");
        let reply = app(&server).on_action(&action).await;
        assert_eq!(reply.text, "No public-domain/CC results found for this title.");
        assert!(reply.markup.is_none());
    }

    #[tokio::test]
    async fn pick_builds_card_with_poster() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/603"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "The Matrix", "release_date": "1999-03-30",
                "overview": "Neo wakes up.", "poster_path": "/p.jpg"
            })))
            .mount(&server)
            .await;

        let reply = app(&server).on_action(&CallbackAction::Pick { kind: MediaKind::Movie, id: 603 }).await;
        assert!(reply.html);
        assert_eq!(reply.text, "<b>The Matrix</b> (1999)\n\nNeo wakes up.");
        assert_eq!(reply.photo.as_deref(), Some("https://image.tmdb.org/t/p/w500/p.jpg"));
        assert_eq!(reply.markup.unwrap().inline_keyboard.len(), 4);
    }

    fn no_send(_: i64, _: String) -> std::future::Ready<Result<(), &'static str>> {
        std::future::ready(Ok(()))
    }

    #[tokio::test]
    async fn stats_is_open_to_everyone() {
        let server = MockServer::start().await;
        let a = app(&server);
        a.remember_chat(5).await;
        a.remember_chat(5).await;
        let reply = a.on_command(9, Some(2), Command::Stats, no_send).await;
        assert_eq!(reply.text, "Known chats: 2 | Admins: 1");
        assert_eq!(a.stats().await.text, "Known chats: 2 | Admins: 1");
    }

    #[tokio::test]
    async fn transport_failure_does_not_leak_api_key() {
        let env: HashMap<&str, &str> = HashMap::from([("BOT_TOKEN", "t"), ("TMDB_API_KEY", "SECRETKEY")]);
        let config = Config::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        let http = HttpClient::new();
        // на этом порту никто не слушает
        let tmdb = TmdbClient::with_base_url(http.clone(), "SECRETKEY".into(), "http://127.0.0.1:1");
        let archive = ArchiveClient::with_base_url(http.clone(), "http://127.0.0.1:1");
        let a = App::from_parts(config, http, tmdb, archive, KnownChats::in_memory());

        let reply = a.search("Matrix").await;
        assert!(reply.text.starts_with("TMDB error:"), "{}", reply.text);
        assert!(!reply.text.contains("SECRETKEY"), "{}", reply.text);

        let reply = a.on_action(&CallbackAction::Trailer { kind: MediaKind::Movie, id: 603 }).await;
        assert!(!reply.text.contains("SECRETKEY"), "{}", reply.text);
    }

    #[test]
    fn unknown_callback_tag_is_ignored() {
        assert!(matches!(route_callback("vote|movie|1"), CallbackRoute::Ignore));
        assert!(matches!(route_callback(""), CallbackRoute::Ignore));
    }

    #[test]
    fn malformed_callback_renders_error() {
        for data in ["pick|movie|abc", "prov|movie", "rec|person|1", "pd|tv|1"] {
            match route_callback(data) {
                CallbackRoute::Invalid(reply) => {
                    assert!(reply.text.starts_with("Error: "), "{}", reply.text);
                    assert!(reply.markup.is_none());
                }
                other => panic!("{data}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn valid_callback_becomes_action() {
        match route_callback("pd|movie|603|The Kid|1921") {
            CallbackRoute::Action(CallbackAction::PublicDomain { id, title, .. }) => {
                assert_eq!(id, 603);
                assert_eq!(title, "The Kid|1921");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn text_routes() {
        assert_eq!(route_text("  The Matrix "), TextRoute::Search("The Matrix".into()));
        assert_eq!(route_text("/search"), TextRoute::Search(String::new()));
        assert_eq!(route_text("/search@MovieBot Chaplin"), TextRoute::Search("Chaplin".into()));
        assert_eq!(route_text("/broadcast"), TextRoute::BroadcastUsage);
        assert_eq!(route_text("/foo bar"), TextRoute::Ignore);
        assert_eq!(route_text("   "), TextRoute::Ignore);
    }

    #[tokio::test]
    async fn every_event_source_records_its_chat() {
        let server = MockServer::start().await;
        let a = app(&server);

        a.on_command(1, None, Command::Start, no_send).await;
        assert!(a.on_text(2, None, "/unknown").await.is_none());
        assert!(matches!(a.on_callback(3, "nope|movie|1").await, CallbackRoute::Ignore));
        a.on_command(1, None, Command::Help, no_send).await;

        assert_eq!(a.chats.snapshot().await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn free_text_and_bare_search_reenter_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/multi"))
            .and(query_param("query", "Chaplin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"id": 10, "media_type": "movie", "title": "The Kid", "release_date": "1921-01-21"}]
            })))
            .mount(&server)
            .await;
        let a = app(&server);

        let reply = a.on_text(7, None, "Chaplin").await.expect("search reply");
        assert_eq!(reply.text, format::PICK_PROMPT);
        assert_eq!(reply.markup.unwrap().inline_keyboard.len(), 1);

        let reply = a.on_text(7, None, "/search").await.expect("usage reply");
        assert_eq!(reply.text, format::SEARCH_USAGE);

        let reply = a.on_command(7, None, Command::Search("Chaplin".into()), no_send).await;
        assert_eq!(reply.text, format::PICK_PROMPT);

        let reply = a.on_text(7, Some(2), "/broadcast").await.expect("broadcast reply");
        assert_eq!(reply.text, "Not authorized.");
        let reply = a.on_text(7, Some(1), "/broadcast").await.expect("broadcast reply");
        assert_eq!(reply.text, crate::admin::BROADCAST_USAGE);
    }
}
