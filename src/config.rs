use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// SQLite database URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// OpenRouter API key for text generation
    pub openrouter_api_key: String,

    /// OpenRouter API base URL
    #[serde(default = "default_openrouter_api_url")]
    pub openrouter_api_url: String,

    /// Chat model used for all generation calls.
    ///
    /// Resolved once at startup; never changed at runtime.
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    /// TMDB API key
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Locale sent with every TMDB request
    #[serde(default = "default_tmdb_language")]
    pub tmdb_language: String,

    /// Language the metadata catalog is indexed in; candidate titles in
    /// any other language are translated before search
    #[serde(default = "default_catalog_language")]
    pub catalog_language: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_database_url() -> String {
    "sqlite:cinematch.db".to_string()
}

fn default_openrouter_api_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_llm_model() -> String {
    "mistralai/mistral-7b-instruct".to_string()
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_language() -> String {
    "ru-RU".to_string()
}

fn default_catalog_language() -> String {
    "en".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
