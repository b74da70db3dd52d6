use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::error::AppResult;
use crate::models::MovieRecord;
use crate::services::genres::genre_heuristic;
use crate::services::person::{find_person_constraints, person_in_list};
use crate::services::providers::TextGenerator;
use crate::services::translator::Translator;

/// Minimum normalized Levenshtein ratio for a title pair to count as a
/// match. Deliberately low: this filters wildly wrong catalog hits, it
/// does not match precisely. The generation step already constrains
/// plausibility.
const FUZZY_THRESHOLD: f64 = 0.4;

static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Decides whether an enriched catalog record plausibly corresponds to
/// a candidate title in the context of the original user request.
///
/// Person constraints are hard: a query naming a specific actor or
/// director tolerates no wrong-cast result. Everything after that is
/// permissive, and an internal fault accepts the candidate: a wrongly
/// shown movie is recoverable, a wrongly suppressed one is invisible.
pub struct RelevanceValidator {
    llm: Arc<dyn TextGenerator>,
    translator: Arc<Translator>,
    locale: String,
}

impl RelevanceValidator {
    pub fn new(llm: Arc<dyn TextGenerator>, translator: Arc<Translator>, locale: String) -> Self {
        Self {
            llm,
            translator,
            locale,
        }
    }

    /// Accept/reject decision for one candidate record.
    pub async fn validate(
        &self,
        record: &MovieRecord,
        user_query: &str,
        suggested_title: &str,
    ) -> bool {
        match self.decide(record, user_query, suggested_title).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(
                    title = %record.title,
                    error = %e,
                    "Validation errored, accepting candidate"
                );
                true
            }
        }
    }

    async fn decide(
        &self,
        record: &MovieRecord,
        user_query: &str,
        suggested_title: &str,
    ) -> AppResult<bool> {
        // Step 1: person-constrained requests are pass/fail on verified
        // cast and crew membership alone.
        let constraints = find_person_constraints(user_query);
        if !constraints.is_empty() {
            for actor in &constraints.actors {
                if !person_in_list(actor, &record.actors) {
                    tracing::info!(
                        person = %actor,
                        title = %record.title,
                        cast = ?record.actors,
                        "Requested actor not in cast, rejecting"
                    );
                    return Ok(false);
                }
            }
            for director in &constraints.directors {
                if !person_in_list(director, &record.directors) {
                    tracing::info!(
                        person = %director,
                        title = %record.title,
                        crew = ?record.directors,
                        "Requested director not in crew, rejecting"
                    );
                    return Ok(false);
                }
            }
            return Ok(true);
        }

        // Step 2: fuzzy title similarity.
        if self.fuzzy_title_match(record, user_query, suggested_title).await {
            return Ok(true);
        }

        // Step 3: model yes/no check, genre heuristic on generation
        // failure.
        match self.model_verdict(record, user_query, suggested_title).await {
            Ok(verdict) => Ok(verdict),
            Err(e) => {
                tracing::warn!(
                    title = %record.title,
                    error = %e,
                    "Model relevance check failed, using genre heuristic"
                );
                Ok(genre_heuristic(user_query, &record.genres))
            }
        }
    }

    async fn fuzzy_title_match(
        &self,
        record: &MovieRecord,
        user_query: &str,
        suggested_title: &str,
    ) -> bool {
        let suggested = clean_for_comparison(suggested_title);
        let localized = clean_for_comparison(&record.title);
        let original = clean_for_comparison(&record.original_title);
        let query = clean_for_comparison(user_query);

        // Only a query long enough to carry discriminative signal takes
        // part in the comparisons
        let query_usable = query.split_whitespace().count() > 1 && query.chars().count() > 5;

        if ratio_accepts(&suggested, &localized)
            || (query_usable && (ratio_accepts(&query, &localized) || ratio_accepts(&query, &original)))
        {
            return true;
        }

        // The original title only helps once it is in the user's
        // language; translation is attempted last because it costs a
        // generation call
        if !original.is_empty() {
            let original_lang = self.translator.detect_language(&record.original_title).await;
            if original_lang.as_deref() != Some(self.locale.as_str()) {
                let translated = self
                    .translator
                    .translate_to_russian(&record.original_title)
                    .await;
                let translated = clean_for_comparison(&translated);

                if ratio_accepts(&suggested, &translated)
                    || (query_usable && ratio_accepts(&query, &translated))
                {
                    return true;
                }
            }
        }

        tracing::info!(
            title = %record.title,
            suggested = %suggested_title,
            "No sufficient fuzzy title match"
        );
        false
    }

    async fn model_verdict(
        &self,
        record: &MovieRecord,
        user_query: &str,
        suggested_title: &str,
    ) -> AppResult<bool> {
        let year = record
            .release_year()
            .map(|y| y.to_string())
            .unwrap_or_default();

        let prompt = format!(
            "Проанализируй, соответствует ли найденный фильм пользовательскому запросу.\n\n\
             ПОЛЬЗОВАТЕЛЬСКИЙ ЗАПРОС: {query}\n\n\
             РЕКОМЕНДОВАННЫЙ ФИЛЬМ: {suggested}\n\n\
             НАЙДЕННЫЙ ФИЛЬМ:\n\
             Название: {title}\n\
             Оригинальное название: {original}\n\
             Год: {year}\n\
             Жанры: {genres}\n\
             Актеры: {actors}\n\
             Режиссеры: {directors}\n\
             Описание: {overview}\n\n\
             Ответь ТОЛЬКО одним словом:\n\
             - \"ДА\" - если фильм соответствует запросу\n\
             - \"НЕТ\" - если фильм НЕ соответствует запросу\n\n\
             Ответ:",
            query = user_query,
            suggested = suggested_title,
            title = record.title,
            original = record.original_title,
            year = year,
            genres = record.genres.join(", "),
            actors = record.actors.join(", "),
            directors = record.directors.join(", "),
            overview = record.overview,
        );

        let response = self.llm.generate(&prompt, None, 0.1, Some(8)).await?;
        let response = response.to_uppercase();
        let verdict = response.contains("ДА") || response.contains("YES");

        tracing::info!(
            title = %record.title,
            response = %response,
            verdict,
            "Model relevance verdict"
        );

        Ok(verdict)
    }
}

/// Lowercases and strips everything but word characters and spaces, so
/// quoting and punctuation never skew the similarity ratio.
fn clean_for_comparison(text: &str) -> String {
    let stripped = NON_WORD_RE.replace_all(text, "");
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn ratio_accepts(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    strsim::normalized_levenshtein(a, b) >= FUZZY_THRESHOLD
}
