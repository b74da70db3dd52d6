/// Query keyword → genre-name aliases, as they appear in the localized
/// catalog. A query mentioning any alias expects a movie carrying one
/// of them.
const GENRE_KEYWORDS: &[&[&str]] = &[
    &["боевик", "боевики", "экшн", "action"],
    &["комедия", "комедии", "comedy"],
    &["драма", "драмы", "drama"],
    &["ужасы", "ужас", "хоррор", "horror"],
    &["фантастика", "фантастику", "sci-fi", "научная фантастика"],
    &["триллер", "триллеры", "thriller"],
    &["мелодрама", "мелодрамы", "романтика", "романтику", "romance"],
    &["детектив", "детективы", "mystery"],
    &["анимация", "анимационный", "мультфильм", "мультфильмы", "animation"],
    &["документальный", "документальные", "documentary"],
];

const ACTION_KEYWORDS: &[&str] = &["боевик", "экшн", "action"];
const ACTION_FAMILY: &[&str] = &["боевик", "экшн", "триллер", "криминал", "приключения"];
const NON_ACTION: &[&str] = &["мелодрама", "комедия", "документальный"];

/// Request keyword → genres it excludes outright. Only consulted when
/// the query carries no recognized genre keyword of its own.
const INCOMPATIBLE_PAIRS: &[(&str, &[&str])] = &[
    ("боевик", &["мелодрама", "комедия", "документальный"]),
    ("ужасы", &["комедия", "мелодрама", "детский"]),
    ("комедия", &["ужасы", "триллер", "драма"]),
    ("детск", &["ужасы", "триллер"]),
];

/// Genre aliases the query implies, in table order.
pub fn expected_genres(query_lower: &str) -> Vec<&'static str> {
    let mut expected = Vec::new();
    for aliases in GENRE_KEYWORDS {
        if aliases.iter().any(|alias| query_lower.contains(alias)) {
            for alias in *aliases {
                if !expected.contains(alias) {
                    expected.push(*alias);
                }
            }
        }
    }
    expected
}

/// Keyword/genre compatibility check, used when neither the person
/// constraint nor fuzzy title matching nor the model yes/no check could
/// decide.
///
/// Rejects only clear mismatches (an action request against a record
/// whose genres are exclusively melodrama/comedy/documentary); with no
/// genre signal in the query at all, accepts.
pub fn genre_heuristic(query: &str, movie_genres: &[String]) -> bool {
    let query = query.to_lowercase();
    let genres: Vec<String> = movie_genres.iter().map(|g| g.to_lowercase()).collect();
    let has = |genre: &str| genres.iter().any(|g| g == genre);

    if ACTION_KEYWORDS.iter().any(|kw| query.contains(kw)) {
        let has_action = ACTION_FAMILY.iter().any(|g| has(g));
        let has_non_action = NON_ACTION.iter().any(|g| has(g));
        if has_non_action && !has_action {
            tracing::debug!(genres = ?movie_genres, "Action requested, only non-action genres found");
            return false;
        }
    }

    let expected = expected_genres(&query);
    if !expected.is_empty() {
        let matched = expected.iter().any(|g| has(g));
        tracing::debug!(
            expected = ?expected,
            genres = ?movie_genres,
            matched,
            "Genre keyword comparison"
        );
        return matched;
    }

    for (keyword, incompatible) in INCOMPATIBLE_PAIRS {
        if query.contains(keyword) && incompatible.iter().any(|g| has(g)) {
            return false;
        }
    }

    true
}
