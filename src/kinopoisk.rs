use crate::filters::FilterContext;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("запрос к {url} не удался: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("эндпоинт {url} недоступен, код ответа API: {status}")]
    Status { url: String, status: StatusCode },
    #[error("не удалось разобрать ответ API: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct KinopoiskClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl KinopoiskClient {
    pub fn new(api_key: String, base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; tg-bot/1.0)")
            .build()
            .map_err(|source| ApiError::Transport { url: base_url.clone(), source })?;
        Ok(Self { api_key, base_url, http })
    }

    /// Случайный фильм по фильтрам. `Ok(None)` — ничего не нашлось.
    pub async fn random_movie(&self, filters: &FilterContext) -> Result<Option<Movie>, ApiError> {
        let url = format!("{}/movie/random", self.base_url);
        let query = filters.to_query();
        tracing::debug!(%url, ?query, "kinopoisk request");

        let resp = self
            .http
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .query(&query)
            .send()
            .await
            .map_err(|source| ApiError::Transport { url: url.clone(), source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status { url, status });
        }
        let body = resp
            .text()
            .await
            .map_err(|source| ApiError::Transport { url: url.clone(), source })?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let movie: Option<Movie> = serde_json::from_str(&body)?;
        Ok(movie.filter(|m| !m.is_blank()))
    }
}

/* ======= DTOs =======
   Все поля опциональны: API регулярно отдаёт null или опускает их. */

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub alternative_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub genres: Option<Vec<Named>>,
    pub countries: Option<Vec<Named>>,
    pub rating: Option<Rating>,
    pub movie_length: Option<u32>,
    pub series_length: Option<u32>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub poster: Option<Poster>,
    pub external_id: Option<ExternalId>,
}

impl Movie {
    /// `{}` вместо фильма — то же, что «ничего не найдено».
    fn is_blank(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.alternative_name.is_none()
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Named {
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Rating {
    pub kp: Option<f64>,
    pub imdb: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Poster {
    pub url: Option<String>,
    pub preview_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ExternalId {
    pub imdb: Option<String>,
}
