use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::RwLock;

/// Общий таймаут на один запрос (соединение + тело).
pub const TOTAL_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{status} from {url}")]
    Status { status: StatusCode, url: String },
    #[error("request failed: {0}")]
    Request(reqwest::Error),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected content-type: {0}")]
    ContentType(String),
}

// reqwest печатает URL вместе с query, а там api_key: URL выкидываем
impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Request(e.without_url())
    }
}

/// Один пул соединений на весь процесс. Клиент создаётся лениво при первом
/// запросе и сбрасывается в `close()`.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<RwLock<Option<Client>>>,
    timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        Self::with_timeout(TOTAL_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { inner: Arc::new(RwLock::new(None)), timeout }
    }

    async fn session(&self) -> Result<Client, TransportError> {
        if let Some(c) = self.inner.read().await.as_ref() {
            return Ok(c.clone());
        }
        let mut guard = self.inner.write().await;
        // пока ждали write-лок, клиент мог создать кто-то другой
        if let Some(c) = guard.as_ref() {
            return Ok(c.clone());
        }
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent("Mozilla/5.0 (compatible; tg-bot/1.0)")
            .build()?;
        *guard = Some(client.clone());
        Ok(client)
    }

    pub async fn is_open(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// GET + разбор JSON. Любой не-2xx статус: ошибка, без повторов.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, &str)],
    ) -> Result<T, TransportError> {
        let client = self.session().await?;
        let mut req = client.get(url).query(query).header(header::ACCEPT, "application/json");
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            // url без query: в query лежит api_key
            return Err(TransportError::Status { status, url: url.to_string() });
        }
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Загрузка картинки байтами (постеры, устойчиво к редиректам/CDN).
    pub async fn get_image(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let client = self.session().await?;
        let resp = client.get(url).header(header::ACCEPT, "image/*").send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status { status, url: url.to_string() });
        }
        if let Some(ct) = resp.headers().get(header::CONTENT_TYPE) {
            let ct = ct.to_str().unwrap_or("");
            if !ct.starts_with("image/") {
                return Err(TransportError::ContentType(ct.to_string()));
            }
        }
        Ok(resp.bytes().await?.to_vec())
    }

    /// Освободить пул соединений. Следующий запрос создаст клиент заново.
    pub async fn close(&self) {
        if self.inner.write().await.take().is_some() {
            tracing::debug!("http pool released");
        }
    }
}
