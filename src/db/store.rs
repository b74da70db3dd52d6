use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::AppResult;
use crate::models::{
    FeedbackEntry, HistoryAction, HistoryEntry, MovieRecord, Preference, PreferenceKind,
    RatedMovie, StoredMovie,
};

/// Durable store for users, movies, ratings, preferences, history and
/// feedback. Pure data access; every write is a single-row idempotent
/// upsert or an append.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Creates the user on first contact; refreshes the display name on
    /// every later call. The external id never changes.
    pub async fn ensure_user(&self, user_id: i64, username: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, joined_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id) DO UPDATE SET username = excluded.username
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Movies
    // ------------------------------------------------------------------

    /// Upserts a movie keyed on its TMDB id and returns the store id.
    ///
    /// Repeated calls with the same TMDB id update the existing row in
    /// place (last write wins); a duplicate row is never created.
    pub async fn upsert_movie(&self, record: &MovieRecord) -> AppResult<i64> {
        let genres = serde_json::to_string(&record.genres).unwrap_or_else(|_| "[]".to_string());
        let directors =
            serde_json::to_string(&record.directors).unwrap_or_else(|_| "[]".to_string());
        let actors = serde_json::to_string(&record.actors).unwrap_or_else(|_| "[]".to_string());

        let row = sqlx::query(
            r#"
            INSERT INTO movies (tmdb_id, title, original_title, overview, release_date,
                                vote_average, poster_path, genres, directors, actors,
                                runtime, popularity, added_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(tmdb_id) DO UPDATE SET
                title = excluded.title,
                original_title = excluded.original_title,
                overview = excluded.overview,
                release_date = excluded.release_date,
                vote_average = excluded.vote_average,
                poster_path = excluded.poster_path,
                genres = excluded.genres,
                directors = excluded.directors,
                actors = excluded.actors,
                runtime = excluded.runtime,
                popularity = excluded.popularity
            RETURNING id
            "#,
        )
        .bind(record.tmdb_id)
        .bind(&record.title)
        .bind(&record.original_title)
        .bind(&record.overview)
        .bind(&record.release_date)
        .bind(record.vote_average)
        .bind(&record.poster_path)
        .bind(genres)
        .bind(directors)
        .bind(actors)
        .bind(record.runtime)
        .bind(record.popularity)
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("id")?)
    }

    pub async fn movie(&self, id: i64) -> AppResult<Option<StoredMovie>> {
        let row = sqlx::query("SELECT * FROM movies WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| movie_from_row(&r)).transpose()
    }

    pub async fn movie_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<StoredMovie>> {
        let row = sqlx::query("SELECT * FROM movies WHERE tmdb_id = ?1")
            .bind(tmdb_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| movie_from_row(&r)).transpose()
    }

    /// Case-insensitive lookup by localized or original title.
    pub async fn movie_by_title(&self, title: &str) -> AppResult<Option<StoredMovie>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM movies
            WHERE title = ?1 COLLATE NOCASE OR original_title = ?1 COLLATE NOCASE
            LIMIT 1
            "#,
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| movie_from_row(&r)).transpose()
    }

    // ------------------------------------------------------------------
    // Ratings
    // ------------------------------------------------------------------

    /// Records a rating; a second rating for the same (user, movie) pair
    /// overwrites the previous value and timestamp.
    pub async fn add_rating(&self, user_id: i64, movie_id: i64, rating: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ratings (user_id, movie_id, rating, rated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, movie_id) DO UPDATE SET
                rating = excluded.rating,
                rated_at = excluded.rated_at
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(rating)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn user_ratings(&self, user_id: i64) -> AppResult<Vec<RatedMovie>> {
        let rows = sqlx::query(
            r#"
            SELECT r.movie_id, m.title, m.original_title, r.rating, r.rated_at
            FROM ratings r
            JOIN movies m ON m.id = r.movie_id
            WHERE r.user_id = ?1
            ORDER BY r.rated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(RatedMovie {
                    movie_id: row.try_get("movie_id")?,
                    title: row.try_get("title")?,
                    original_title: row.try_get("original_title")?,
                    rating: row.try_get("rating")?,
                    rated_at: row.try_get("rated_at")?,
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Preferences
    // ------------------------------------------------------------------

    /// Stores a case-normalized preference triple. Returns false when the
    /// triple was already present.
    pub async fn add_preference(
        &self,
        user_id: i64,
        kind: PreferenceKind,
        value: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO user_preferences (user_id, preference_type, preference_value)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(value.trim().to_lowercase())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Preferences in insertion order, oldest first.
    pub async fn preferences(&self, user_id: i64) -> AppResult<Vec<Preference>> {
        let rows = sqlx::query(
            r#"
            SELECT preference_type, preference_value
            FROM user_preferences
            WHERE user_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Preference {
                    preference_type: row.try_get("preference_type")?,
                    preference_value: row.try_get("preference_value")?,
                })
            })
            .collect()
    }

    pub async fn clear_preferences(&self, user_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM user_preferences WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub async fn add_history(
        &self,
        user_id: i64,
        movie_id: i64,
        action: HistoryAction,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO history (user_id, movie_id, action_type, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(action.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn history(&self, user_id: i64, limit: i64) -> AppResult<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT h.movie_id, m.title, h.action_type, h.created_at
            FROM history h
            LEFT JOIN movies m ON m.id = h.movie_id
            WHERE h.user_id = ?1
            ORDER BY h.id DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(HistoryEntry {
                    movie_id: row.try_get("movie_id")?,
                    title: row
                        .try_get::<Option<String>, _>("title")?
                        .unwrap_or_default(),
                    action_type: row.try_get("action_type")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    pub async fn clear_history(&self, user_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM history WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Feedback
    // ------------------------------------------------------------------

    pub async fn add_feedback(&self, user_id: i64, query: &str, feedback: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO feedback (user_id, query, feedback, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(user_id)
        .bind(query)
        .bind(feedback)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Feedback for one user, newest first.
    pub async fn feedback_for_user(&self, user_id: i64) -> AppResult<Vec<FeedbackEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT query, feedback, created_at
            FROM feedback
            WHERE user_id = ?1
            ORDER BY id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(FeedbackEntry {
                    query: row.try_get("query")?,
                    feedback: row.try_get("feedback")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}

fn movie_from_row(row: &SqliteRow) -> AppResult<StoredMovie> {
    let genres: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("genres")?).unwrap_or_default();
    let directors: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("directors")?).unwrap_or_default();
    let actors: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("actors")?).unwrap_or_default();

    Ok(StoredMovie {
        id: row.try_get("id")?,
        record: MovieRecord {
            tmdb_id: row.try_get("tmdb_id")?,
            title: row.try_get("title")?,
            original_title: row.try_get("original_title")?,
            overview: row.try_get("overview")?,
            release_date: row.try_get("release_date")?,
            vote_average: row.try_get("vote_average")?,
            poster_path: row.try_get("poster_path")?,
            genres,
            directors,
            actors,
            runtime: row.try_get("runtime")?,
            popularity: row.try_get("popularity")?,
        },
    })
}
