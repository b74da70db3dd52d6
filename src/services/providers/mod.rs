/// External capability abstractions
///
/// The pipeline consumes two outside services: a movie metadata catalog
/// and a text generation model. Both are behind traits so the
/// orchestrator and validator can be exercised against scripted
/// implementations.
use crate::{
    error::AppResult,
    models::{MovieRecord, MovieSearchHit},
};

pub mod openrouter;
pub mod tmdb;

pub use openrouter::OpenRouterGenerator;
pub use tmdb::TmdbProvider;

/// Movie metadata catalog (TMDB or compatible).
///
/// Implementations return normalized records at this boundary: absent
/// fields become empty strings/lists, never missing keys, so downstream
/// code never branches on partially-populated shapes.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Search the catalog by title
    async fn search_movies(&self, query: &str) -> AppResult<Vec<MovieSearchHit>>;

    /// Fetch the full record (genres, credits, runtime) for one movie
    async fn movie_details(&self, tmdb_id: i64) -> AppResult<MovieRecord>;

    /// Titles the catalog considers similar to the given movie
    async fn similar_movies(&self, tmdb_id: i64, limit: usize) -> AppResult<Vec<MovieSearchHit>>;

    /// Search-then-detail-fetch for a single candidate title: the top
    /// search result is taken and fully enriched. `None` means the
    /// catalog has no match at all.
    async fn enrich(&self, query: &str) -> AppResult<Option<MovieRecord>> {
        let hits = self.search_movies(query).await?;
        match hits.first() {
            Some(hit) => Ok(Some(self.movie_details(hit.tmdb_id).await?)),
            None => Ok(None),
        }
    }
}

/// Text generation model behind a chat-completions endpoint.
///
/// Yes/no and translation modes are prompt framing only; there is no
/// separate endpoint for them.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt, with an optional system instruction,
    /// sampling temperature and output-length cap
    async fn generate<'a>(
        &'a self,
        prompt: &'a str,
        system_prompt: Option<&'a str>,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> AppResult<String>;
}
