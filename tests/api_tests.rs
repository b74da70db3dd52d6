mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use cinematch_api::api::create_router;
use cinematch_api::db::Store;

use common::{build_state, movie, FakeCatalog, ScriptedLlm};

async fn test_server(llm: ScriptedLlm, catalog: FakeCatalog) -> (TestServer, Store) {
    let (state, store) = build_state(Arc::new(llm), Arc::new(catalog)).await;
    let server = TestServer::new(create_router(state)).unwrap();
    (server, store)
}

#[tokio::test]
async fn test_health_check() {
    let (server, _store) = test_server(ScriptedLlm::new(), FakeCatalog::new()).await;
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_bot_command_query_is_rejected() {
    let (server, _store) = test_server(ScriptedLlm::new(), FakeCatalog::new()).await;

    let response = server
        .post("/recommendations")
        .json(&json!({"user_id": 1, "query": "/start"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("команда"));
}

#[tokio::test]
async fn test_recommendations_round_trip() {
    let llm = ScriptedLlm::new()
        .with_rounds(&["«Дюна» (2021)"])
        .with_translation("Дюна", "Dune")
        .with_summary("Обязательно посмотрите **Дюна** (2021)!");
    let catalog = FakeCatalog::new().with_movie(
        movie(438631, "Дюна", "Dune", 2021, &["фантастика", "приключения"]),
        &["Dune"],
    );

    let (server, store) = test_server(llm, catalog).await;

    let response = server
        .post("/recommendations")
        .json(&json!({"user_id": 9, "username": "dune_fan", "query": "про пустынную планету"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();

    assert!(body["response_text"].as_str().unwrap().contains("Дюна"));
    assert_eq!(body["movies"].as_array().unwrap().len(), 1);
    assert_eq!(body["movies"][0]["title"], "Дюна");
    assert_eq!(body["movies"][0]["release_year"], 2021);
    assert_eq!(body["movies"][0]["genres"][0], "фантастика");

    // The accepted movie is durably stored
    let stored = store.movie_by_tmdb_id(438631).await.unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn test_rating_flow_with_overwrite_and_history() {
    let (server, store) = test_server(ScriptedLlm::new(), FakeCatalog::new()).await;

    let movie_id = store
        .upsert_movie(&movie(27205, "Начало", "Inception", 2010, &["фантастика"]))
        .await
        .unwrap();

    let response = server
        .post("/ratings")
        .json(&json!({"user_id": 5, "movie_id": movie_id, "rating": 6}))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    // Rating again overwrites, it does not add a second row
    let response = server
        .post("/ratings")
        .json(&json!({"user_id": 5, "movie_id": movie_id, "rating": 10}))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let ratings = store.user_ratings(5).await.unwrap();
    assert_eq!(ratings.len(), 1);
    assert_eq!(ratings[0].rating, 10);

    let response = server.get("/users/5/history").await;
    response.assert_status_ok();
    let history: Value = response.json();
    let actions: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["action_type"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["rated", "rated"]);

    // The 10/10 rating taught a genre and a director preference
    let response = server.get("/users/5/preferences").await;
    response.assert_status_ok();
    let preferences: Value = response.json();
    let kinds: Vec<&str> = preferences
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["preference_type"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"genre"));
    assert!(kinds.contains(&"director"));
}

#[tokio::test]
async fn test_rating_out_of_range_is_bad_request() {
    let (server, store) = test_server(ScriptedLlm::new(), FakeCatalog::new()).await;
    let movie_id = store
        .upsert_movie(&movie(1, "Фильм", "Movie", 2000, &["драма"]))
        .await
        .unwrap();

    let response = server
        .post("/ratings")
        .json(&json!({"user_id": 5, "movie_id": movie_id, "rating": 11}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_save_movie_and_unknown_movie() {
    let (server, store) = test_server(ScriptedLlm::new(), FakeCatalog::new()).await;
    let movie_id = store
        .upsert_movie(&movie(1, "Фильм", "Movie", 2000, &["драма"]))
        .await
        .unwrap();

    let response = server
        .post("/users/5/saved")
        .json(&json!({"movie_id": movie_id}))
        .await;
    response.assert_status(StatusCode::CREATED);

    let history = store.history(5, 10).await.unwrap();
    assert_eq!(history[0].action_type, "saved");

    let response = server
        .post("/users/5/saved")
        .json(&json!({"movie_id": 999}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_history() {
    let (server, store) = test_server(ScriptedLlm::new(), FakeCatalog::new()).await;
    let movie_id = store
        .upsert_movie(&movie(1, "Фильм", "Movie", 2000, &["драма"]))
        .await
        .unwrap();

    server
        .post("/ratings")
        .json(&json!({"user_id": 5, "movie_id": movie_id, "rating": 7}))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = server.delete("/users/5/history").await;
    response.assert_status(StatusCode::NO_CONTENT);

    assert!(store.history(5, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_feedback_round_trip() {
    let (server, _store) = test_server(ScriptedLlm::new(), FakeCatalog::new()).await;

    let response = server
        .post("/feedback")
        .json(&json!({
            "user_id": 5,
            "query": "фантастика про космос",
            "feedback": "слишком известные фильмы"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["feedback"], "слишком известные фильмы");
}
