use crate::http::{HttpClient, TransportError};
use serde::Deserialize;
use serde_json::Value;

pub const IA_BASE: &str = "https://archive.org";

/// Расширения, которые считаем видеофайлами.
pub const VIDEO_EXTS: [&str; 4] = ["mp4", "m4v", "webm", "ogv"];

pub const DEFAULT_LIMIT: usize = 5;
const LINKS_PER_ITEM: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveItem {
    pub identifier: String,
    pub title: String,
    pub year: String,
    pub license_url: String,
    /// Прямые ссылки на видеофайлы, не больше пяти, в порядке из метаданных.
    pub links: Vec<String>,
}

/// Internet Archive: advancedsearch + metadata/<identifier>.
#[derive(Clone)]
pub struct ArchiveClient {
    base: String,
    http: HttpClient,
}

impl ArchiveClient {
    pub fn new(http: HttpClient) -> Self {
        Self::with_base_url(http, IA_BASE)
    }

    pub fn with_base_url(http: HttpClient, base: impl Into<String>) -> Self {
        Self { base: base.into(), http }
    }

    /// Ищет видео с заполненным licenseurl, по убыванию скачиваний.
    /// Для каждого найденного: второй запрос за списком файлов; элементы без
    /// видеофайлов выкидываются. Порядок: как в выдаче поиска.
    pub async fn search_public_domain(
        &self,
        title: &str,
        limit: usize,
    ) -> Result<Vec<ArchiveItem>, TransportError> {
        let q = format!(r#"title:("{}") AND mediatype:(movies OR video) AND licenseurl:*"#, title.replace('"', " "));
        let mut params = vec![("q", q)];
        for f in ["identifier", "title", "year", "licenseurl"] {
            params.push(("fl[]", f.to_string()));
        }
        params.push(("sort[]", "downloads desc".to_string()));
        params.push(("rows", limit.to_string()));
        params.push(("page", "1".to_string()));
        params.push(("output", "json".to_string()));

        let url = format!("{}/advancedsearch.php", self.base);
        let data: SearchResp = self.http.get_json(&url, &params, &[]).await?;

        let mut out = Vec::new();
        for doc in data.response.docs {
            let Some(ident) = doc.identifier.filter(|i| !i.is_empty()) else { continue };
            let meta_url = format!("{}/metadata/{}", self.base, urlencoding::encode(&ident));
            let meta: MetaResp = self.http.get_json(&meta_url, &[], &[]).await?;
            let links: Vec<String> = meta
                .files
                .iter()
                .filter_map(|f| f.name.as_deref())
                .filter(|name| is_video_file(name))
                .take(LINKS_PER_ITEM)
                .map(|name| self.download_url(&ident, name))
                .collect();
            if links.is_empty() {
                tracing::debug!(identifier = %ident, "no playable files, skipped");
                continue;
            }
            out.push(ArchiveItem {
                title: doc.title.as_ref().map(value_text).unwrap_or_default(),
                year: doc.year.as_ref().map(value_text).unwrap_or_default(),
                license_url: doc.licenseurl.as_ref().map(value_text).unwrap_or_default(),
                identifier: ident,
                links,
            });
        }
        Ok(out)
    }

    fn download_url(&self, ident: &str, name: &str) -> String {
        // имя может содержать вложенные каталоги: кодируем посегментно
        let path = name.split('/').map(|seg| urlencoding::encode(seg).into_owned()).collect::<Vec<_>>().join("/");
        format!("{}/download/{}/{}", self.base, urlencoding::encode(ident), path)
    }
}

/// Видео по расширению, но не превью из каталога `*.thumbs`.
pub fn is_video_file(name: &str) -> bool {
    if name.split('/').any(|seg| seg.ends_with(".thumbs")) {
        return false;
    }
    match name.rsplit_once('.') {
        Some((_, ext)) => VIDEO_EXTS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// IA отдаёт поля то строкой, то числом, то массивом строк.
fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.first().map(value_text).unwrap_or_default(),
        _ => String::new(),
    }
}

/* ======= DTOs ======= */

#[derive(Deserialize, Debug, Default)]
struct SearchResp {
    #[serde(default)]
    response: Docs,
}

#[derive(Deserialize, Debug, Default)]
struct Docs {
    #[serde(default)]
    docs: Vec<Doc>,
}

#[derive(Deserialize, Debug)]
struct Doc {
    identifier: Option<String>,
    title: Option<Value>,
    year: Option<Value>,
    licenseurl: Option<Value>,
}

#[derive(Deserialize, Debug, Default)]
struct MetaResp {
    #[serde(default)]
    files: Vec<FileDto>,
}

#[derive(Deserialize, Debug)]
struct FileDto {
    name: Option<String>,
}
