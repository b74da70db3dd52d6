use serde::{Deserialize, Serialize};

/// Number of principal cast members kept on a movie record
pub const MAX_BILLED_ACTORS: usize = 5;

/// A candidate title extracted from generated text, not yet confirmed
/// against the metadata catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub title: String,
    pub year: Option<i32>,
}

impl Candidate {
    pub fn new(title: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            title: title.into(),
            year,
        }
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} ({})", self.title, year),
            None => write!(f, "{}", self.title),
        }
    }
}

/// Fully normalized movie record as produced at the metadata-provider
/// boundary. Absent fields use empty strings/lists, never missing keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieRecord {
    pub tmdb_id: i64,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    /// Release date as reported by the provider; partial dates
    /// (year-only) are common and kept verbatim
    pub release_date: String,
    pub vote_average: f64,
    pub poster_path: Option<String>,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub actors: Vec<String>,
    pub runtime: Option<i64>,
    pub popularity: f64,
}

impl MovieRecord {
    /// Four-digit release year, when the (possibly partial) release date
    /// carries one
    pub fn release_year(&self) -> Option<i32> {
        self.release_date.get(..4)?.parse().ok()
    }
}

/// A single search result from the metadata catalog, before the
/// detail fetch
#[derive(Debug, Clone, PartialEq)]
pub struct MovieSearchHit {
    pub tmdb_id: i64,
    pub title: String,
    pub original_title: String,
    pub release_date: String,
    pub vote_average: f64,
    pub popularity: f64,
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Raw TMDB search response
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResponse {
    #[serde(default)]
    pub results: Vec<TmdbMovieSummary>,
}

/// Movie summary as returned by TMDB search and similar endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieSummary {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub popularity: f64,
}

impl From<TmdbMovieSummary> for MovieSearchHit {
    fn from(movie: TmdbMovieSummary) -> Self {
        Self {
            tmdb_id: movie.id,
            title: movie.title,
            original_title: movie.original_title,
            release_date: movie.release_date,
            vote_average: movie.vote_average,
            popularity: movie.popularity,
        }
    }
}

/// Full TMDB movie details with appended credits
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetails {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub runtime: Option<i64>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenre {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbCastMember>,
    #[serde(default)]
    pub crew: Vec<TmdbCrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCastMember {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_cast_order")]
    pub order: i64,
}

fn default_cast_order() -> i64 {
    i64::MAX
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCrewMember {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub job: String,
}

impl From<TmdbMovieDetails> for MovieRecord {
    fn from(details: TmdbMovieDetails) -> Self {
        let genres = details
            .genres
            .into_iter()
            .map(|g| g.name)
            .filter(|name| !name.is_empty())
            .collect();

        let mut actors = Vec::new();
        let mut directors = Vec::new();
        if let Some(credits) = details.credits {
            let mut cast = credits.cast;
            cast.sort_by_key(|member| member.order);
            actors = cast
                .into_iter()
                .take(MAX_BILLED_ACTORS)
                .map(|member| member.name)
                .filter(|name| !name.is_empty())
                .collect();
            directors = credits
                .crew
                .into_iter()
                .filter(|member| member.job == "Director")
                .map(|member| member.name)
                .filter(|name| !name.is_empty())
                .collect();
        }

        Self {
            tmdb_id: details.id,
            title: details.title,
            original_title: details.original_title,
            overview: details.overview,
            release_date: details.release_date,
            vote_average: details.vote_average,
            poster_path: details.poster_path,
            genres,
            directors,
            actors,
            runtime: details.runtime,
            popularity: details.popularity,
        }
    }
}

// ============================================================================
// Store Types
// ============================================================================

/// A movie as persisted, with its store-assigned identifier
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMovie {
    pub id: i64,
    pub record: MovieRecord,
}

/// A user's rating of a movie, joined with the movie title
#[derive(Debug, Clone, Serialize)]
pub struct RatedMovie {
    pub movie_id: i64,
    pub title: String,
    pub original_title: String,
    pub rating: i64,
    pub rated_at: String,
}

/// Kinds of durable taste signals accumulated for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceKind {
    Genre,
    Director,
}

impl PreferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceKind::Genre => "genre",
            PreferenceKind::Director => "director",
        }
    }
}

/// A stored (kind, value) preference entry
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Preference {
    pub preference_type: String,
    pub preference_value: String,
}

/// Kinds of user/movie interactions recorded in history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Recommended,
    Saved,
    Rated,
    ViewedSimilar,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Recommended => "recommended",
            HistoryAction::Saved => "saved",
            HistoryAction::Rated => "rated",
            HistoryAction::ViewedSimilar => "viewed_similar",
        }
    }
}

/// A single append-only history entry, joined with the movie title
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub movie_id: i64,
    pub title: String,
    pub action_type: String,
    pub created_at: String,
}

/// A stored piece of free-text user feedback
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackEntry {
    pub query: String,
    pub feedback: String,
    pub created_at: String,
}

// ============================================================================
// Pipeline Result Types
// ============================================================================

/// Final output of the recommendation pipeline: a composed response text
/// and the accepted, enriched movie records.
///
/// An empty `movies` list is a valid success outcome (the text then
/// carries an apology), never an error.
#[derive(Debug, Clone)]
pub struct Recommendations {
    pub response_text: String,
    pub movies: Vec<MovieRecord>,
}
