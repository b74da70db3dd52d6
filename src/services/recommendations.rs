use std::sync::Arc;

use crate::db::Store;
use crate::error::{AppError, AppResult};
use crate::models::{
    Candidate, HistoryAction, MovieRecord, Preference, PreferenceKind, RatedMovie,
    Recommendations,
};
use crate::services::extraction::extract_titles;
use crate::services::providers::{MetadataProvider, TextGenerator};
use crate::services::translator::Translator;
use crate::services::validation::RelevanceValidator;

/// Candidates taken from a single generation round
const MAX_CANDIDATES_PER_ROUND: usize = 5;
/// Extra generation rounds when validation keeps rejecting
const MAX_RETRY_ROUNDS: u32 = 2;
/// Below this many accepted movies (with at least one validation
/// rejection) a retry round is worth its cost
const MIN_ACCEPTED: usize = 2;
/// Retry rounds stop early once this many movies are accepted in total
const TARGET_ACCEPTED: usize = 3;
/// Rejection notes carried into a retry prompt
const MAX_REJECTED_IN_RETRY: usize = 5;

const HIGH_RATING: i64 = 8;
const PREFERENCE_RATING: i64 = 9;
const DIRECTOR_PREFERENCE_RATING: i64 = 10;
const GENRE_PREFERENCE_CAP: usize = 5;
const DIRECTOR_PREFERENCE_CAP: usize = 3;

const MAX_FAVORITES_IN_CONTEXT: usize = 5;
const MAX_EXCLUDED_IN_CONTEXT: usize = 10;

const SIMILAR_RESULT_LIMIT: usize = 5;
const SIMILAR_CANDIDATE_POOL: usize = 10;

const INITIAL_SYSTEM_PROMPT: &str =
    "Ты - умный и креативный помощник по рекомендации фильмов. \
     На основе запроса пользователя предложи 3-5 РЕАЛЬНЫХ, ПОПУЛЯРНЫХ фильмов, \
     которые могли бы ему понравиться. \
     Список фильмов должен быть простым перечислением, БЕЗ пояснений: \
     каждый фильм в кавычках «Название фильма» и год выпуска в скобках (Год). \
     Если сомневаешься, не выдумывай названия и не предлагай несуществующие фильмы. \
     Отвечай только на русском языке. \
     Пример ответа: «Матрица» (1999), «Начало» (2010), «Дюна» (2021).";

const FINAL_SYSTEM_PROMPT: &str =
    "Ты - дружелюбный ассистент по фильмам. \
     Тебе будут предоставлены названия фильмов. \
     Напиши короткую, привлекательную рекомендацию, используя эти фильмы. \
     Упомяни каждый фильм, включая его название и год. \
     Форматируй названия как **Название фильма** (Год). \
     Отвечай только на русском языке, без лишних вступлений, сразу к делу.";

const APOLOGY_TEXT: &str =
    "К сожалению, я не смог найти подходящих фильмов по вашему запросу. \
     Пожалуйста, попробуйте перефразировать или быть более конкретным.";

const EXTRACTION_FAILED_TEXT: &str =
    "Не удалось разобрать названия фильмов в ответе модели. \
     Пожалуйста, попробуйте перефразировать ваш запрос.";

/// Running state of one recommendation request across the initial pass
/// and any retry rounds
#[derive(Default)]
struct BatchState {
    accepted: Vec<MovieRecord>,
    accepted_lines: Vec<String>,
    processed_titles: Vec<String>,
    rejected_notes: Vec<String>,
    validation_rejections: usize,
    lookup_misses: usize,
}

/// Drives the full request → candidates → validated results → response
/// pipeline.
///
/// Candidates are processed strictly one at a time, in extraction
/// order; multiple user requests may run concurrently, but a single
/// request never fans out across candidates.
pub struct RecommendationEngine {
    generator: Arc<dyn TextGenerator>,
    catalog: Arc<dyn MetadataProvider>,
    translator: Arc<Translator>,
    validator: RelevanceValidator,
    store: Store,
    catalog_language: String,
}

impl RecommendationEngine {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        catalog: Arc<dyn MetadataProvider>,
        translator: Arc<Translator>,
        validator: RelevanceValidator,
        store: Store,
        catalog_language: String,
    ) -> Self {
        Self {
            generator,
            catalog,
            translator,
            validator,
            store,
            catalog_language,
        }
    }

    /// Generates recommendations for a free-text query.
    ///
    /// Terminal generation failure and unparseable generation output are
    /// the only error outcomes; an empty accepted set returns success
    /// with an apology text.
    pub async fn generate_recommendations(
        &self,
        user_query: &str,
        user_id: i64,
    ) -> AppResult<Recommendations> {
        tracing::info!(user_id, query = %user_query, "Starting recommendation pipeline");

        let ratings = self.user_ratings_degraded(user_id).await;
        let preferences = match self.store.preferences(user_id).await {
            Ok(preferences) => preferences,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to load preferences, continuing without");
                Vec::new()
            }
        };

        let context = build_context(&preferences, &ratings);
        let excluded_titles = excluded_titles(&ratings);
        let enhanced_query = format!("{}{}", user_query, context);

        let detected_language = self.translator.detect_language(user_query).await;
        tracing::debug!(language = ?detected_language, "Detected query language");

        let initial_response = self
            .generator
            .generate(&enhanced_query, Some(INITIAL_SYSTEM_PROMPT), 0.7, Some(800))
            .await?;

        let candidates = extract_titles(&initial_response);
        if candidates.is_empty() {
            tracing::warn!("No candidate titles extracted from generation output");
            return Err(AppError::Generation(EXTRACTION_FAILED_TEXT.to_string()));
        }

        let mut state = BatchState::default();
        self.process_round(
            &candidates[..candidates.len().min(MAX_CANDIDATES_PER_ROUND)],
            user_query,
            user_id,
            detected_language.as_deref(),
            &excluded_titles,
            &mut state,
            None,
        )
        .await;

        let retry_rounds = self
            .run_retry_rounds(
                user_query,
                user_id,
                &enhanced_query,
                detected_language.as_deref(),
                &excluded_titles,
                &mut state,
            )
            .await;

        tracing::info!(
            accepted = state.accepted.len(),
            rejected = state.validation_rejections,
            misses = state.lookup_misses,
            retry_rounds,
            "Candidate processing finished"
        );

        let response_text = self.compose_response(&state, retry_rounds).await;

        Ok(Recommendations {
            response_text,
            movies: state.accepted,
        })
    }

    /// Retry generation while too few candidates survived validation.
    /// Returns the number of rounds actually run.
    async fn run_retry_rounds(
        &self,
        user_query: &str,
        user_id: i64,
        enhanced_query: &str,
        detected_language: Option<&str>,
        excluded_titles: &[String],
        state: &mut BatchState,
    ) -> u32 {
        let mut rounds = 0;

        while state.accepted.len() < MIN_ACCEPTED
            && state.validation_rejections > 0
            && rounds < MAX_RETRY_ROUNDS
        {
            rounds += 1;
            tracing::info!(round = rounds, "Retrying generation after validation rejections");

            let recent_rejections: Vec<&str> = state
                .rejected_notes
                .iter()
                .rev()
                .take(MAX_REJECTED_IN_RETRY)
                .map(String::as_str)
                .collect();

            let retry_prompt = format!(
                "Первая генерация дала неточные рекомендации. Некоторые фильмы были исключены: {}.\n\n\
                 ВАЖНО: Проверь точность информации!\n\
                 - НЕ выдумывай участие актеров в фильмах, где они не снимались\n\
                 - Указывай ТОЛЬКО реальные факты об актерах и режиссерах\n\
                 - Если не уверен в участии актера в фильме - НЕ рекомендуй его\n\n\
                 ПОВТОРНЫЙ ЗАПРОС: {}\n\n\
                 Порекомендуй 3-4 ДРУГИХ фильма (не из исключенных), \
                 проверив точность информации об актерах и режиссерах.",
                recent_rejections.join(", "),
                enhanced_query
            );

            let response = match self
                .generator
                .generate(&retry_prompt, Some(INITIAL_SYSTEM_PROMPT), 0.7, Some(800))
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(round = rounds, error = %e, "Retry generation failed, stopping");
                    break;
                }
            };

            let candidates = extract_titles(&response);
            tracing::info!(round = rounds, extracted = candidates.len(), "Retry round candidates");

            self.process_round(
                &candidates[..candidates.len().min(MAX_CANDIDATES_PER_ROUND)],
                user_query,
                user_id,
                detected_language,
                excluded_titles,
                state,
                Some(TARGET_ACCEPTED),
            )
            .await;
        }

        rounds
    }

    /// Runs one batch of candidates through language bridging,
    /// enrichment, validation and persistence. Failures inside a single
    /// candidate never abort the batch.
    #[allow(clippy::too_many_arguments)]
    async fn process_round(
        &self,
        candidates: &[Candidate],
        user_query: &str,
        user_id: i64,
        detected_language: Option<&str>,
        excluded_titles: &[String],
        state: &mut BatchState,
        stop_at: Option<usize>,
    ) {
        for candidate in candidates {
            let key = candidate.title.to_lowercase();
            if state.processed_titles.contains(&key) {
                continue;
            }
            state.processed_titles.push(key);

            if is_excluded_title(&candidate.title, excluded_titles) {
                tracing::info!(title = %candidate.title, "Skipping already rated candidate");
                continue;
            }

            let search_title = self
                .search_title_for(&candidate.title, detected_language)
                .await;

            let record = match self.catalog.enrich(&search_title).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    tracing::info!(title = %search_title, "Candidate not found in catalog");
                    state.lookup_misses += 1;
                    state
                        .rejected_notes
                        .push(format!("«{}» - не найден в каталоге", candidate.title));
                    continue;
                }
                Err(e) => {
                    tracing::warn!(title = %search_title, error = %e, "Catalog lookup failed");
                    state.lookup_misses += 1;
                    continue;
                }
            };

            if state.accepted.iter().any(|m| m.tmdb_id == record.tmdb_id) {
                tracing::debug!(title = %record.title, "Duplicate of an accepted movie");
                continue;
            }

            if is_excluded_record(&record, excluded_titles) {
                tracing::info!(title = %record.title, "Skipping rated movie found under another title");
                continue;
            }

            if !self
                .validator
                .validate(&record, user_query, &candidate.title)
                .await
            {
                state.validation_rejections += 1;
                state
                    .rejected_notes
                    .push(format!("«{}» - не соответствует запросу", record.title));
                continue;
            }

            self.persist_accepted(user_id, &record).await;

            let year = record
                .release_year()
                .map(|y| y.to_string())
                .unwrap_or_else(|| "N/A".to_string());
            state
                .accepted_lines
                .push(format!("**{}** ({})", record.title, year));
            state.accepted.push(record);

            if let Some(stop) = stop_at {
                if state.accepted.len() >= stop {
                    break;
                }
            }
        }
    }

    /// Resolves the title to search the catalog with. A query in the
    /// catalog's indexing language searches directly; otherwise the
    /// candidate title is translated, but the translation is only
    /// adopted when it genuinely differs from the original (an
    /// unchanged "translation" signals failure, not a same-language
    /// title).
    async fn search_title_for(&self, title: &str, detected_language: Option<&str>) -> String {
        match detected_language {
            Some(language) if language != self.catalog_language => {
                let translated = self.translator.translate_to_english(title).await;
                if self.translator.is_translation_different(title, &translated) {
                    tracing::info!(
                        original = %title,
                        translated = %translated,
                        "Using translated title for catalog search"
                    );
                    translated
                } else {
                    tracing::warn!(
                        title = %title,
                        "Translation returned unchanged text, searching with original"
                    );
                    title.to_string()
                }
            }
            _ => title.to_string(),
        }
    }

    /// Persists an accepted movie and its history event. A persistence
    /// fault degrades: the movie is still returned to the user.
    async fn persist_accepted(&self, user_id: i64, record: &MovieRecord) {
        match self.store.upsert_movie(record).await {
            Ok(movie_id) => {
                if let Err(e) = self
                    .store
                    .add_history(user_id, movie_id, HistoryAction::Recommended)
                    .await
                {
                    tracing::warn!(movie_id, error = %e, "Failed to append history event");
                }
            }
            Err(e) => {
                tracing::warn!(title = %record.title, error = %e, "Failed to persist movie");
            }
        }
    }

    /// Composes the final response text. Phrasing is decoupled from
    /// correctness: the prompt lists only already-validated titles, so
    /// the summary can never introduce a movie the pipeline did not
    /// accept.
    async fn compose_response(&self, state: &BatchState, retry_rounds: u32) -> String {
        let mut response_text = if state.accepted.is_empty() {
            APOLOGY_TEXT.to_string()
        } else {
            let prompt = format!(
                "Вот список фильмов, которые я для вас подобрал: {}. \
                 Напиши короткий, дружелюбный текст, рекомендуя эти фильмы, \
                 как будто ты только что нашел их специально для пользователя. \
                 Не используй общие фразы вроде 'Вот что я могу порекомендовать'. \
                 Упоминай только те фильмы, которые были предоставлены.",
                state.accepted_lines.join(", ")
            );

            match self
                .generator
                .generate(&prompt, Some(FINAL_SYSTEM_PROMPT), 0.7, None)
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "Summary generation failed, using templated text");
                    format!(
                        "Вот фильмы, которые я подобрал для вас: {}.",
                        state.accepted_lines.join(", ")
                    )
                }
            }
        };

        if state.accepted.len() < MIN_ACCEPTED && state.validation_rejections > 0 {
            response_text.push_str(&format!(
                "\n\nЧасть предложенных фильмов была исключена после проверки фактов \
                 (несоответствий: {}). Попробуйте уточнить запрос.",
                state.validation_rejections
            ));
        } else if retry_rounds > 0 {
            response_text.push_str("\n\nРекомендации уточнены после дополнительной проверки.");
        }

        response_text
    }

    // ------------------------------------------------------------------
    // Ratings and preference learning
    // ------------------------------------------------------------------

    /// Records a rating and, for exceptional scores, learns a durable
    /// preference.
    ///
    /// Preference accumulation is deliberately slow and high-confidence:
    /// only the first genre of a 9+/10 movie (capped at 5) and the
    /// first director of a 10/10 movie (capped at 3) are ever stored.
    /// Mid-range ratings, actors and negative signals teach nothing.
    pub async fn rate_movie(&self, user_id: i64, movie_id: i64, rating: i64) -> AppResult<()> {
        if !(0..=10).contains(&rating) {
            return Err(AppError::InvalidInput(
                "Оценка должна быть в диапазоне от 0 до 10".to_string(),
            ));
        }

        let movie = self
            .store
            .movie(movie_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", movie_id)))?;

        self.store.add_rating(user_id, movie_id, rating).await?;

        if let Err(e) = self
            .store
            .add_history(user_id, movie_id, HistoryAction::Rated)
            .await
        {
            tracing::warn!(user_id, movie_id, error = %e, "Failed to append rating history");
        }

        if rating >= PREFERENCE_RATING {
            self.learn_preferences(user_id, &movie.record, rating).await;
        }

        Ok(())
    }

    async fn learn_preferences(&self, user_id: i64, record: &MovieRecord, rating: i64) {
        let preferences = match self.store.preferences(user_id).await {
            Ok(preferences) => preferences,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to load preferences, skipping learning");
                return;
            }
        };

        let count_of = |kind: PreferenceKind| {
            preferences
                .iter()
                .filter(|p| p.preference_type == kind.as_str())
                .count()
        };

        if count_of(PreferenceKind::Genre) < GENRE_PREFERENCE_CAP {
            if let Some(genre) = record.genres.first() {
                match self
                    .store
                    .add_preference(user_id, PreferenceKind::Genre, genre)
                    .await
                {
                    Ok(true) => {
                        tracing::info!(user_id, genre = %genre, "Learned genre preference")
                    }
                    Ok(false) => {}
                    Err(e) => tracing::warn!(user_id, error = %e, "Failed to store preference"),
                }
            }
        }

        if rating >= DIRECTOR_PREFERENCE_RATING
            && count_of(PreferenceKind::Director) < DIRECTOR_PREFERENCE_CAP
        {
            if let Some(director) = record.directors.first() {
                match self
                    .store
                    .add_preference(user_id, PreferenceKind::Director, director)
                    .await
                {
                    Ok(true) => {
                        tracing::info!(user_id, director = %director, "Learned director preference")
                    }
                    Ok(false) => {}
                    Err(e) => tracing::warn!(user_id, error = %e, "Failed to store preference"),
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Similar movies
    // ------------------------------------------------------------------

    /// Movies the catalog considers similar to a seed title, skipping
    /// everything the user has already rated. Returns an empty list
    /// when the seed cannot be resolved.
    pub async fn similar_movies(&self, title: &str, user_id: i64) -> AppResult<Vec<MovieRecord>> {
        let ratings = self.user_ratings_degraded(user_id).await;
        let excluded = excluded_titles(&ratings);

        let seed = match self.store.movie_by_title(title).await? {
            Some(stored) => stored.record,
            None => match self.catalog.enrich(title).await? {
                Some(record) => {
                    if let Err(e) = self.store.upsert_movie(&record).await {
                        tracing::warn!(title = %record.title, error = %e, "Failed to persist seed movie");
                    }
                    record
                }
                None => {
                    tracing::warn!(title = %title, "Seed movie for similarity lookup not found");
                    return Ok(Vec::new());
                }
            },
        };

        let hits = self
            .catalog
            .similar_movies(seed.tmdb_id, SIMILAR_CANDIDATE_POOL)
            .await?;

        let mut result = Vec::new();
        for hit in hits {
            if is_excluded_title(&hit.title, &excluded) {
                tracing::info!(title = %hit.title, "Skipping already rated similar movie");
                continue;
            }

            let record = match self.catalog.movie_details(hit.tmdb_id).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(tmdb_id = hit.tmdb_id, error = %e, "Failed to enrich similar movie");
                    continue;
                }
            };

            if is_excluded_record(&record, &excluded) {
                continue;
            }

            match self.store.upsert_movie(&record).await {
                Ok(movie_id) => {
                    if let Err(e) = self
                        .store
                        .add_history(user_id, movie_id, HistoryAction::ViewedSimilar)
                        .await
                    {
                        tracing::warn!(movie_id, error = %e, "Failed to append history event");
                    }
                }
                Err(e) => tracing::warn!(title = %record.title, error = %e, "Failed to persist movie"),
            }

            result.push(record);
            if result.len() >= SIMILAR_RESULT_LIMIT {
                break;
            }
        }

        Ok(result)
    }

    async fn user_ratings_degraded(&self, user_id: i64) -> Vec<RatedMovie> {
        match self.store.user_ratings(user_id).await {
            Ok(ratings) => ratings,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to load ratings, continuing without");
                Vec::new()
            }
        }
    }
}

/// Builds the personalization context appended to the user's query:
/// stored preferences, favorite titles and an explicit do-not-repeat
/// list.
fn build_context(preferences: &[Preference], ratings: &[RatedMovie]) -> String {
    let mut context = String::new();

    if !preferences.is_empty() {
        let rendered: Vec<String> = preferences
            .iter()
            .map(|p| format!("{}: {}", p.preference_type, p.preference_value))
            .collect();
        context.push_str("\n\nПользовательские предпочтения: ");
        context.push_str(&rendered.join(", "));
    }

    let favorites: Vec<String> = ratings
        .iter()
        .filter(|r| r.rating >= HIGH_RATING)
        .take(MAX_FAVORITES_IN_CONTEXT)
        .map(|r| format!("«{}» ({}/10)", r.title, r.rating))
        .collect();
    if !favorites.is_empty() {
        context.push_str("\n\nФильмы, высоко оцененные пользователем: ");
        context.push_str(&favorites.join(", "));
    }

    let known: Vec<&str> = ratings
        .iter()
        .take(MAX_EXCLUDED_IN_CONTEXT)
        .map(|r| r.title.as_str())
        .collect();
    if !known.is_empty() {
        context.push_str("\n\nНЕ рекомендуй эти фильмы (уже известны пользователю): ");
        context.push_str(&known.join(", "));
    }

    context
}

/// Titles the user has already rated, lowercased, with both localized
/// and original variants.
fn excluded_titles(ratings: &[RatedMovie]) -> Vec<String> {
    let mut titles = Vec::new();
    for rating in ratings {
        for title in [&rating.title, &rating.original_title] {
            let lowered = title.trim().to_lowercase();
            if !lowered.is_empty() && !titles.contains(&lowered) {
                titles.push(lowered);
            }
        }
    }
    titles
}

fn is_excluded_title(title: &str, excluded: &[String]) -> bool {
    let title = title.trim().to_lowercase();
    if title.is_empty() {
        return false;
    }
    excluded
        .iter()
        .any(|e| e.contains(&title) || title.contains(e.as_str()))
}

fn is_excluded_record(record: &MovieRecord, excluded: &[String]) -> bool {
    is_excluded_title(&record.title, excluded)
        || is_excluded_title(&record.original_title, excluded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;
    use crate::services::providers::{MockMetadataProvider, MockTextGenerator};

    async fn engine_with_store() -> RecommendationEngine {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let store = Store::new(pool);

        // These tests exercise rating/preference flows only; any model
        // or catalog call is a bug
        let llm: Arc<dyn TextGenerator> = Arc::new(MockTextGenerator::new());
        let catalog: Arc<dyn MetadataProvider> = Arc::new(MockMetadataProvider::new());
        let translator = Arc::new(Translator::new(llm.clone()));
        let validator = RelevanceValidator::new(llm.clone(), translator.clone(), "ru".to_string());

        RecommendationEngine::new(llm, catalog, translator, validator, store, "en".to_string())
    }

    fn record_with_genre(tmdb_id: i64, title: &str, genre: &str) -> MovieRecord {
        MovieRecord {
            tmdb_id,
            title: title.to_string(),
            original_title: title.to_string(),
            overview: String::new(),
            release_date: "2010-01-01".to_string(),
            vote_average: 8.0,
            poster_path: None,
            genres: vec![genre.to_string(), "драма".to_string()],
            directors: vec![format!("Режиссер {}", tmdb_id)],
            actors: vec![],
            runtime: None,
            popularity: 1.0,
        }
    }

    #[tokio::test]
    async fn test_genre_preferences_cap_at_five() {
        let engine = engine_with_store().await;
        let genres = ["фантастика", "боевик", "драма", "комедия", "триллер", "ужасы"];

        for (i, genre) in genres.iter().enumerate() {
            let tmdb_id = 100 + i as i64;
            let movie_id = engine
                .store
                .upsert_movie(&record_with_genre(tmdb_id, &format!("Фильм {}", i), genre))
                .await
                .unwrap();
            engine.rate_movie(7, movie_id, 9).await.unwrap();
        }

        let preferences = engine.store.preferences(7).await.unwrap();
        let genre_preferences: Vec<_> = preferences
            .iter()
            .filter(|p| p.preference_type == "genre")
            .collect();

        // Six distinct first genres, only the first five stick
        assert_eq!(genre_preferences.len(), 5);
        assert!(!genre_preferences
            .iter()
            .any(|p| p.preference_value == "ужасы"));
    }

    #[tokio::test]
    async fn test_director_preference_needs_perfect_rating() {
        let engine = engine_with_store().await;

        let first = engine
            .store
            .upsert_movie(&record_with_genre(200, "Девятка", "фантастика"))
            .await
            .unwrap();
        engine.rate_movie(8, first, 9).await.unwrap();

        let preferences = engine.store.preferences(8).await.unwrap();
        assert!(!preferences.iter().any(|p| p.preference_type == "director"));

        let second = engine
            .store
            .upsert_movie(&record_with_genre(201, "Десятка", "боевик"))
            .await
            .unwrap();
        engine.rate_movie(8, second, 10).await.unwrap();

        let preferences = engine.store.preferences(8).await.unwrap();
        assert!(preferences.iter().any(|p| p.preference_type == "director"));
    }

    #[tokio::test]
    async fn test_rating_out_of_range_is_rejected() {
        let engine = engine_with_store().await;
        let result = engine.rate_movie(1, 1, 11).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_rating_unknown_movie_is_not_found() {
        let engine = engine_with_store().await;
        let result = engine.rate_movie(1, 999, 8).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rating_appends_history() {
        let engine = engine_with_store().await;
        let movie_id = engine
            .store
            .upsert_movie(&record_with_genre(300, "Начало", "фантастика"))
            .await
            .unwrap();

        engine.rate_movie(9, movie_id, 7).await.unwrap();

        let history = engine.store.history(9, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action_type, "rated");
    }

    #[test]
    fn test_build_context_lists_preferences_and_favorites() {
        let preferences = vec![Preference {
            preference_type: "genre".to_string(),
            preference_value: "фантастика".to_string(),
        }];
        let ratings = vec![
            RatedMovie {
                movie_id: 1,
                title: "Начало".to_string(),
                original_title: "Inception".to_string(),
                rating: 9,
                rated_at: String::new(),
            },
            RatedMovie {
                movie_id: 2,
                title: "Проходной фильм".to_string(),
                original_title: String::new(),
                rating: 5,
                rated_at: String::new(),
            },
        ];

        let context = build_context(&preferences, &ratings);

        assert!(context.contains("genre: фантастика"));
        assert!(context.contains("«Начало» (9/10)"));
        // Low-rated movies are excluded from repeats, not favorites
        assert!(!context.contains("«Проходной фильм»"));
        assert!(context.contains("НЕ рекомендуй"));
        assert!(context.contains("Проходной фильм"));
    }

    #[test]
    fn test_excluded_title_matching_is_bidirectional_substring() {
        let excluded = vec!["начало".to_string()];
        assert!(is_excluded_title("Начало", &excluded));
        assert!(is_excluded_title("начало (2010)", &excluded));
        assert!(!is_excluded_title("Интерстеллар", &excluded));
        assert!(!is_excluded_title("", &excluded));
    }
}
