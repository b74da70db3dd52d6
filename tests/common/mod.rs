#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cinematch_api::api::AppState;
use cinematch_api::db::{create_pool, Store};
use cinematch_api::error::{AppError, AppResult};
use cinematch_api::models::{MovieRecord, MovieSearchHit};
use cinematch_api::services::providers::{MetadataProvider, TextGenerator};
use cinematch_api::services::{RecommendationEngine, RelevanceValidator, Translator};

/// Scripted generation model. Routes each prompt to a canned answer by
/// the same markers the real prompts carry: language detection,
/// translation, the yes/no relevance check, candidate generation and
/// the final summary.
pub struct ScriptedLlm {
    pub detected_language: Option<String>,
    pub verdict: String,
    pub summary: String,
    pub translations: HashMap<String, String>,
    pub candidate_rounds: Mutex<VecDeque<String>>,
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            detected_language: Some("ru".to_string()),
            verdict: "ДА".to_string(),
            summary: "Приятного просмотра!".to_string(),
            translations: HashMap::new(),
            candidate_rounds: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_rounds(self, rounds: &[&str]) -> Self {
        {
            let mut queue = self.candidate_rounds.lock().unwrap();
            for round in rounds {
                queue.push_back(round.to_string());
            }
        }
        self
    }

    pub fn with_translation(mut self, from: &str, to: &str) -> Self {
        self.translations.insert(from.to_string(), to.to_string());
        self
    }

    pub fn with_verdict(mut self, verdict: &str) -> Self {
        self.verdict = verdict.to_string();
        self
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = summary.to_string();
        self
    }

    pub fn remaining_rounds(&self) -> usize {
        self.candidate_rounds.lock().unwrap().len()
    }

    fn lookup_translation(&self, prompt: &str, label: &str) -> String {
        let source = prompt
            .split(label)
            .nth(1)
            .and_then(|rest| rest.lines().next())
            .unwrap_or("")
            .trim();
        self.translations
            .get(source)
            .cloned()
            .unwrap_or_else(|| source.to_string())
    }
}

#[async_trait]
impl TextGenerator for ScriptedLlm {
    async fn generate<'a>(
        &'a self,
        prompt: &'a str,
        system_prompt: Option<&'a str>,
        _temperature: f32,
        _max_tokens: Option<u32>,
    ) -> AppResult<String> {
        if prompt.contains("ISO 639-1") {
            return match &self.detected_language {
                Some(code) => Ok(code.clone()),
                None => Ok("не могу определить".to_string()),
            };
        }
        if prompt.contains("into fluent English") {
            return Ok(self.lookup_translation(prompt, "Russian: "));
        }
        if prompt.contains("into fluent Russian") {
            return Ok(self.lookup_translation(prompt, "English: "));
        }
        if prompt.contains("одним словом") {
            return Ok(self.verdict.clone());
        }
        if system_prompt.is_some_and(|s| s.contains("рекомендации фильмов")) {
            let mut rounds = self.candidate_rounds.lock().unwrap();
            return Ok(rounds.pop_front().unwrap_or_default());
        }
        if system_prompt.is_some_and(|s| s.contains("дружелюбный ассистент")) {
            return Ok(self.summary.clone());
        }
        Ok(String::new())
    }
}

/// In-memory movie catalog with a scripted search index.
pub struct FakeCatalog {
    movies: HashMap<i64, MovieRecord>,
    search_index: HashMap<String, i64>,
    similar: HashMap<i64, Vec<i64>>,
    searches: Mutex<Vec<String>>,
}

impl Default for FakeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self {
            movies: HashMap::new(),
            search_index: HashMap::new(),
            similar: HashMap::new(),
            searches: Mutex::new(Vec::new()),
        }
    }

    /// Registers a movie under one or more search queries
    /// (case-insensitive).
    pub fn with_movie(mut self, record: MovieRecord, search_keys: &[&str]) -> Self {
        for key in search_keys {
            self.search_index.insert(key.to_lowercase(), record.tmdb_id);
        }
        self.movies.insert(record.tmdb_id, record);
        self
    }

    pub fn with_similar(mut self, tmdb_id: i64, similar_ids: &[i64]) -> Self {
        self.similar.insert(tmdb_id, similar_ids.to_vec());
        self
    }

    pub fn recorded_searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }
}

fn hit_for(record: &MovieRecord) -> MovieSearchHit {
    MovieSearchHit {
        tmdb_id: record.tmdb_id,
        title: record.title.clone(),
        original_title: record.original_title.clone(),
        release_date: record.release_date.clone(),
        vote_average: record.vote_average,
        popularity: record.popularity,
    }
}

#[async_trait]
impl MetadataProvider for FakeCatalog {
    async fn search_movies(&self, query: &str) -> AppResult<Vec<MovieSearchHit>> {
        self.searches.lock().unwrap().push(query.to_string());
        Ok(self
            .search_index
            .get(&query.to_lowercase())
            .and_then(|id| self.movies.get(id))
            .map(|record| vec![hit_for(record)])
            .unwrap_or_default())
    }

    async fn movie_details(&self, tmdb_id: i64) -> AppResult<MovieRecord> {
        self.movies
            .get(&tmdb_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("movie {}", tmdb_id)))
    }

    async fn similar_movies(&self, tmdb_id: i64, limit: usize) -> AppResult<Vec<MovieSearchHit>> {
        Ok(self
            .similar
            .get(&tmdb_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.movies.get(id))
                    .take(limit)
                    .map(hit_for)
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Builds a movie record with populated genre/credit fields.
pub fn movie(tmdb_id: i64, title: &str, original: &str, year: i32, genres: &[&str]) -> MovieRecord {
    MovieRecord {
        tmdb_id,
        title: title.to_string(),
        original_title: original.to_string(),
        overview: format!("Описание фильма {}", title),
        release_date: format!("{}-01-01", year),
        vote_average: 7.5,
        poster_path: Some(format!("/{}.jpg", tmdb_id)),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        directors: vec!["Кристофер Нолан".to_string()],
        actors: vec!["Мэттью МакКонахи".to_string()],
        runtime: Some(120),
        popularity: 10.0,
    }
}

/// Wires a full engine over an in-memory store and the given fakes.
pub async fn build_engine(
    llm: Arc<ScriptedLlm>,
    catalog: Arc<FakeCatalog>,
) -> (RecommendationEngine, Store) {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    let store = Store::new(pool);

    let generator: Arc<dyn TextGenerator> = llm;
    let provider: Arc<dyn MetadataProvider> = catalog;
    let translator = Arc::new(Translator::new(generator.clone()));
    let validator = RelevanceValidator::new(generator.clone(), translator.clone(), "ru".to_string());

    let engine = RecommendationEngine::new(
        generator,
        provider,
        translator,
        validator,
        store.clone(),
        "en".to_string(),
    );

    (engine, store)
}

/// Same wiring, packaged as HTTP application state.
pub async fn build_state(llm: Arc<ScriptedLlm>, catalog: Arc<FakeCatalog>) -> (AppState, Store) {
    let (engine, store) = build_engine(llm, catalog).await;
    (AppState::new(Arc::new(engine), store.clone()), store)
}
