use crate::http::{HttpClient, TransportError};
use serde::Deserialize;
use std::{collections::{BTreeSet, HashMap}, fmt, str::FromStr};

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const TMDB_IMG: &str = "https://image.tmdb.org/t/p/w500";

const TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    /// Сегмент пути TMDB и он же: значение в callback-данных.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "tv",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown media kind {:?}", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for MediaKind {
    type Err = UnknownKind;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaKind::Movie),
            "tv" => Ok(MediaKind::Series),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub id: u64,
    pub kind: MediaKind,
    pub title: String,
    /// 4 цифры года или пустая строка
    pub year: String,
    pub poster_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    pub title: String,
    pub year: String,
    pub overview: String,
    pub poster_path: Option<String>,
}

/// Где смотреть в одном регионе. BTreeSet сразу даёт дедуп и сортировку.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSet {
    pub region: String,
    pub stream: BTreeSet<String>,
    pub rent: BTreeSet<String>,
    pub buy: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trending {
    pub movies: Vec<SearchResult>,
    pub series: Vec<SearchResult>,
}

#[derive(Clone)]
pub struct TmdbClient {
    api_key: String,
    base: String,
    http: HttpClient,
}

impl TmdbClient {
    pub fn new(http: HttpClient, api_key: String) -> Self {
        Self::with_base_url(http, api_key, TMDB_BASE)
    }

    pub fn with_base_url(http: HttpClient, api_key: String, base: impl Into<String>) -> Self {
        Self { api_key, base: base.into(), http }
    }

    pub fn poster_url(&self, poster_path: &str) -> String {
        format!("{}{}", TMDB_IMG, poster_path)
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        extra: &[(&str, String)],
    ) -> Result<T, TransportError> {
        let url = format!("{}{}", self.base, endpoint);
        let mut query = vec![("api_key", self.api_key.clone())];
        query.extend(extra.iter().cloned());
        self.http.get_json(&url, &query, &[]).await
    }

    /// Поиск фильмов и сериалов (EN), первые 10 совпадений; люди и прочее отбрасываются.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, TransportError> {
        let data: Page = self
            .get(
                "/search/multi",
                &[
                    ("query", query.to_string()),
                    ("include_adult", "false".into()),
                    ("language", "en-US".into()),
                    ("page", "1".into()),
                ],
            )
            .await?;
        Ok(data
            .results
            .into_iter()
            .take(TOP_N)
            .filter_map(|it| {
                let kind = it.media_type.as_deref()?.parse().ok()?;
                Some(it.into_result(kind))
            })
            .collect())
    }

    pub async fn details(&self, kind: MediaKind, id: u64) -> Result<DetailRecord, TransportError> {
        let it: TitleDto = self
            .get(&format!("/{}/{}", kind, id), &[("language", "en-US".into())])
            .await?;
        Ok(DetailRecord {
            year: it.year(),
            title: it.display_title(),
            overview: it.overview.filter(|o| !o.trim().is_empty()).unwrap_or_default(),
            poster_path: it.poster_path,
        })
    }

    /// Только подобъект нужного региона; нет региона: все множества пустые.
    pub async fn providers(
        &self,
        kind: MediaKind,
        id: u64,
        region: &str,
    ) -> Result<ProviderSet, TransportError> {
        let mut data: ProvidersResp = self.get(&format!("/{}/{}/watch/providers", kind, id), &[]).await?;
        let offers = data.results.remove(region).unwrap_or_default();
        let names = |list: Vec<ProviderDto>| -> BTreeSet<String> {
            list.into_iter()
                .filter_map(|p| p.provider_name)
                .filter(|n| !n.is_empty())
                .collect()
        };
        Ok(ProviderSet {
            region: region.to_string(),
            stream: names(offers.flatrate),
            rent: names(offers.rent),
            buy: names(offers.buy),
        })
    }

    /// Первый YouTube-ролик с типом Trailer или Teaser, без ранжирования.
    pub async fn trailer(&self, kind: MediaKind, id: u64) -> Result<Option<String>, TransportError> {
        let data: VideosResp = self.get(&format!("/{}/{}/videos", kind, id), &[]).await?;
        Ok(data
            .results
            .into_iter()
            .find(|v| v.site == "YouTube" && matches!(v.r#type.as_str(), "Trailer" | "Teaser"))
            .map(|v| format!("https://www.youtube.com/watch?v={}", v.key)))
    }

    pub async fn similar(&self, kind: MediaKind, id: u64) -> Result<Vec<SearchResult>, TransportError> {
        let data: Page = self
            .get(
                &format!("/{}/{}/similar", kind, id),
                &[("language", "en-US".into()), ("page", "1".into())],
            )
            .await?;
        Ok(data.results.into_iter().take(TOP_N).map(|it| it.into_result(kind)).collect())
    }

    /// Два запроса: дневной тренд фильмов и сериалов.
    pub async fn trending(&self) -> Result<Trending, TransportError> {
        let movies: Page = self.get("/trending/movie/day", &[]).await?;
        let series: Page = self.get("/trending/tv/day", &[]).await?;
        let pack = |p: Page| -> Vec<SearchResult> {
            p.results
                .into_iter()
                .take(TOP_N)
                .map(|it| {
                    // тип угадываем по тому, какое поле названия заполнено
                    let kind = if it.title.is_some() { MediaKind::Movie } else { MediaKind::Series };
                    it.into_result(kind)
                })
                .collect()
        };
        Ok(Trending { movies: pack(movies), series: pack(series) })
    }
}

/* ======= DTOs ======= */

#[derive(Deserialize, Debug, Default)]
struct Page {
    #[serde(default)]
    results: Vec<TitleDto>,
}

/// Фильм и сериал в одном виде: у фильма title/release_date, у сериала name/first_air_date.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct TitleDto {
    id: u64,
    media_type: Option<String>,
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
}

impl TitleDto {
    fn display_title(&self) -> String {
        self.title.clone().or_else(|| self.name.clone()).unwrap_or_default()
    }

    fn year(&self) -> String {
        let date = self
            .release_date
            .as_deref()
            .filter(|d| !d.is_empty())
            .or(self.first_air_date.as_deref())
            .unwrap_or("");
        date.chars().take(4).collect()
    }

    fn into_result(self, kind: MediaKind) -> SearchResult {
        SearchResult {
            id: self.id,
            kind,
            title: self.display_title(),
            year: self.year(),
            poster_path: self.poster_path,
        }
    }
}

#[derive(Deserialize, Debug)]
struct ProvidersResp {
    #[serde(default)]
    results: HashMap<String, RegionOffers>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RegionOffers {
    flatrate: Vec<ProviderDto>,
    rent: Vec<ProviderDto>,
    buy: Vec<ProviderDto>,
}

#[derive(Deserialize, Debug)]
struct ProviderDto {
    provider_name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct VideosResp {
    #[serde(default)]
    results: Vec<Video>,
}

#[derive(Deserialize, Debug)]
struct Video {
    #[serde(default)]
    key: String,
    #[serde(default)]
    site: String,
    #[serde(default)]
    r#type: String,
}
