use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{FeedbackEntry, HistoryAction, HistoryEntry, MovieRecord, Preference};
use crate::services::query_guard;

use super::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 20;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub user_id: i64,
    pub username: Option<String>,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct MovieResponse {
    pub tmdb_id: i64,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub release_year: Option<i32>,
    pub rating: f64,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub actors: Vec<String>,
    pub poster_path: Option<String>,
    pub runtime: Option<i64>,
}

impl From<&MovieRecord> for MovieResponse {
    fn from(record: &MovieRecord) -> Self {
        Self {
            tmdb_id: record.tmdb_id,
            title: record.title.clone(),
            original_title: record.original_title.clone(),
            overview: record.overview.clone(),
            release_year: record.release_year(),
            rating: record.vote_average,
            genres: record.genres.clone(),
            directors: record.directors.clone(),
            actors: record.actors.clone(),
            poster_path: record.poster_path.clone(),
            runtime: record.runtime,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub response_text: String,
    pub movies: Vec<MovieResponse>,
}

#[derive(Debug, Deserialize)]
pub struct SimilarRequest {
    pub user_id: i64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub user_id: i64,
    pub movie_id: i64,
    pub rating: i64,
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub movie_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub user_id: i64,
    pub query: String,
    pub feedback: String,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Run the recommendation pipeline for a free-text query
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> AppResult<Json<RecommendResponse>> {
    query_guard::check_query(&request.query).map_err(AppError::InvalidInput)?;

    let username = request.username.as_deref().unwrap_or("");
    if let Err(e) = state.store.ensure_user(request.user_id, username).await {
        tracing::warn!(user_id = request.user_id, error = %e, "Failed to upsert user");
    }

    let recommendations = state
        .engine
        .generate_recommendations(&request.query, request.user_id)
        .await?;

    Ok(Json(RecommendResponse {
        response_text: recommendations.response_text,
        movies: recommendations.movies.iter().map(MovieResponse::from).collect(),
    }))
}

/// Movies similar to a given title, excluding ones the user has rated
pub async fn similar(
    State(state): State<AppState>,
    Json(request): Json<SimilarRequest>,
) -> AppResult<Json<Vec<MovieResponse>>> {
    let movies = state
        .engine
        .similar_movies(&request.title, request.user_id)
        .await?;

    Ok(Json(movies.iter().map(MovieResponse::from).collect()))
}

/// Rate a movie; exceptional ratings feed preference learning
pub async fn rate(
    State(state): State<AppState>,
    Json(request): Json<RateRequest>,
) -> AppResult<StatusCode> {
    state
        .engine
        .rate_movie(request.user_id, request.movie_id, request.rating)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Mark a movie as saved for later
pub async fn save_movie(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(request): Json<SaveRequest>,
) -> AppResult<StatusCode> {
    state
        .store
        .movie(request.movie_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", request.movie_id)))?;

    state
        .store
        .add_history(user_id, request.movie_id, HistoryAction::Saved)
        .await?;

    Ok(StatusCode::CREATED)
}

/// Recent interaction history for a user
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<HistoryEntry>>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let entries = state.store.history(user_id, limit).await?;
    Ok(Json(entries))
}

/// Clear a user's interaction history
pub async fn clear_history(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<StatusCode> {
    state.store.clear_history(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stored taste preferences for a user
pub async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<Preference>>> {
    let preferences = state.store.preferences(user_id).await?;
    Ok(Json(preferences))
}

/// Store free-text feedback about a past query
pub async fn add_feedback(
    State(state): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> AppResult<(StatusCode, Json<Vec<FeedbackEntry>>)> {
    state
        .store
        .add_feedback(request.user_id, &request.query, &request.feedback)
        .await?;

    let entries = state.store.feedback_for_user(request.user_id).await?;

    Ok((StatusCode::CREATED, Json(entries)))
}
