use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

use crate::{
    error::{AppError, AppResult},
    models::{MovieRecord, MovieSearchHit, TmdbMovieDetails, TmdbSearchResponse},
    services::providers::MetadataProvider,
};

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_DELAY: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// TMDB metadata catalog client
///
/// Every request carries the deployment locale, so titles and overviews
/// come back localized when TMDB has a translation. Transient failures
/// (transport errors, 429, 5xx) are retried with exponential backoff;
/// exhaustion surfaces as an `ExternalApi` error, never a panic.
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String, language: String) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
            language,
        })
    }

    /// GET a TMDB endpoint with retry and exponential backoff.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}/{}", self.api_url, path);
        let mut delay = INITIAL_DELAY;

        for attempt in 1..=MAX_ATTEMPTS {
            let request = self
                .http_client
                .get(&url)
                .query(&[
                    ("api_key", self.api_key.as_str()),
                    ("language", self.language.as_str()),
                ])
                .query(params);

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<T>().await.map_err(|e| {
                            AppError::ExternalApi(format!(
                                "Failed to parse TMDB response for {}: {}",
                                path, e
                            ))
                        });
                    }

                    let body = response.text().await.unwrap_or_default();
                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(
                            path = %path,
                            status = %status,
                            attempt,
                            "Transient TMDB error"
                        );
                    } else {
                        return Err(AppError::ExternalApi(format!(
                            "TMDB returned status {}: {}",
                            status, body
                        )));
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, attempt, "TMDB request failed");
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        Err(AppError::ExternalApi(format!(
            "TMDB request for {} failed after {} attempts",
            path, MAX_ATTEMPTS
        )))
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn search_movies(&self, query: &str) -> AppResult<Vec<MovieSearchHit>> {
        let response: TmdbSearchResponse =
            self.get_json("search/movie", &[("query", query)]).await?;

        let hits: Vec<MovieSearchHit> = response
            .results
            .into_iter()
            .map(MovieSearchHit::from)
            .collect();

        tracing::info!(query = %query, results = hits.len(), "TMDB title search completed");

        Ok(hits)
    }

    async fn movie_details(&self, tmdb_id: i64) -> AppResult<MovieRecord> {
        let details: TmdbMovieDetails = self
            .get_json(
                &format!("movie/{}", tmdb_id),
                &[("append_to_response", "credits")],
            )
            .await?;

        let record = MovieRecord::from(details);

        tracing::debug!(
            tmdb_id,
            title = %record.title,
            genres = record.genres.len(),
            "Fetched movie details"
        );

        Ok(record)
    }

    async fn similar_movies(&self, tmdb_id: i64, limit: usize) -> AppResult<Vec<MovieSearchHit>> {
        let response: TmdbSearchResponse = self
            .get_json(&format!("movie/{}/similar", tmdb_id), &[])
            .await?;

        Ok(response
            .results
            .into_iter()
            .take(limit)
            .map(MovieSearchHit::from)
            .collect())
    }
}
