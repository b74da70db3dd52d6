use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use cinematch_api::api::{create_router, AppState};
use cinematch_api::config::Config;
use cinematch_api::db::{create_pool, Store};
use cinematch_api::services::providers::{
    MetadataProvider, OpenRouterGenerator, TextGenerator, TmdbProvider,
};
use cinematch_api::services::{RecommendationEngine, RelevanceValidator, Translator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    let store = Store::new(pool);

    let generator: Arc<dyn TextGenerator> = Arc::new(OpenRouterGenerator::new(
        config.openrouter_api_key.clone(),
        config.openrouter_api_url.clone(),
        config.llm_model.clone(),
    )?);
    let catalog: Arc<dyn MetadataProvider> = Arc::new(TmdbProvider::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.tmdb_language.clone(),
    )?);

    let translator = Arc::new(Translator::new(generator.clone()));
    let locale: String = config.tmdb_language.chars().take(2).collect();
    let validator = RelevanceValidator::new(generator.clone(), translator.clone(), locale);

    let engine = Arc::new(RecommendationEngine::new(
        generator,
        catalog,
        translator,
        validator,
        store.clone(),
        config.catalog_language.clone(),
    ));

    let state = AppState::new(engine, store);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, model = %config.llm_model, "cinematch-api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
