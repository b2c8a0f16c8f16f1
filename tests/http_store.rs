use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sweetest_monitor::error::StoreError;
use sweetest_monitor::runconfig::{
    ConfigOutcome, ExecutionType, HttpRunConfigStore, RunConfigResolver, RunConfigStore,
    RunConfiguration,
};

type Configs = Arc<Mutex<HashMap<String, RunConfiguration>>>;

async fn load_config(
    State(configs): State<Configs>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let path = query.get("path").cloned().unwrap_or_default();
    match configs.lock().unwrap().get(&path) {
        Some(config) => Json(config.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn save_config(
    State(configs): State<Configs>,
    Query(query): Query<HashMap<String, String>>,
    Json(config): Json<RunConfiguration>,
) -> StatusCode {
    let path = query.get("path").cloned().unwrap_or_default();
    configs.lock().unwrap().insert(path, config);
    StatusCode::OK
}

async fn list_containers() -> Json<Vec<&'static str>> {
    Json(vec!["taconsol/sakuli", "custom/ui-tests"])
}

async fn list_tags(Path(container): Path<String>) -> impl IntoResponse {
    match container.as_str() {
        "taconsol/sakuli" => Json(vec!["v1.1.0", "v1.2.0"]).into_response(),
        _ => Json(Vec::<String>::new()).into_response(),
    }
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Serve a fake run-configuration API on an ephemeral port.
async fn spawn_store() -> (String, Configs) {
    let configs: Configs = Arc::new(Mutex::new(HashMap::new()));
    let app = Router::new()
        .route(
            "/api/run-configuration",
            get(load_config).post(save_config),
        )
        .route("/api/run-configuration/sakuli-container", get(list_containers))
        .route(
            "/api/run-configuration/sakuli-container/:container/tags",
            get(list_tags),
        )
        .route("/broken/api/run-configuration/sakuli-container", get(broken))
        .with_state(configs.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), configs)
}

/// An address nothing listens on.
async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let (base, configs) = spawn_store().await;
    let resolver = RunConfigResolver::new(HttpRunConfigStore::new(&base));

    let config = RunConfiguration::new("other", "taconsol/sakuli", &["v1.2.0"]);
    assert!(resolver.save("suites/login", config).await.is_ok());

    let stored = configs.lock().unwrap().get("suites/login").cloned().unwrap();
    assert_eq!(stored.path, "suites/login");

    match resolver.load("suites/login").await {
        ConfigOutcome::Ok(loaded) => {
            assert_eq!(loaded.container, "taconsol/sakuli");
            assert_eq!(loaded.tags, vec!["v1.2.0"]);
            assert_eq!(loaded.execution_type, ExecutionType::SakuliContainer);
        }
        other => panic!("expected a configuration, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_configuration_is_empty() {
    let (base, _) = spawn_store().await;
    let store = HttpRunConfigStore::new(&base);
    assert!(store.fetch("suites/unknown").await.unwrap().is_none());

    let resolver = RunConfigResolver::new(store).surface_errors(true);
    assert!(resolver.load("suites/unknown").await.is_empty());
}

#[tokio::test]
async fn test_containers_and_tags() {
    let (base, _) = spawn_store().await;
    let resolver = RunConfigResolver::new(HttpRunConfigStore::new(&base));

    assert_eq!(
        resolver.list_containers().await,
        vec!["taconsol/sakuli", "custom/ui-tests"]
    );
    assert_eq!(
        resolver.list_tags("taconsol/sakuli").await,
        vec!["v1.1.0", "v1.2.0"]
    );
    assert!(resolver.list_tags("custom/ui-tests").await.is_empty());
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let (base, _) = spawn_store().await;
    let store = HttpRunConfigStore::new(&format!("{}/broken", base));

    match store.containers().await {
        Err(StoreError::Status { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected status error, got {:?}", other),
    }

    let resolver = RunConfigResolver::new(store);
    let mut diagnostics = resolver.diagnostics();
    assert!(resolver.list_containers().await.is_empty());
    assert_eq!(diagnostics.recv().await.unwrap().operation, "listContainers");
}

#[tokio::test]
async fn test_unreachable_store_degrades() {
    let base = unreachable_url().await;
    let resolver = RunConfigResolver::new(HttpRunConfigStore::new(&base));

    let saved = resolver
        .save("suites/login", RunConfiguration::new("suites/login", "img", &[]))
        .await;
    assert!(saved.is_empty());
    assert!(resolver.load("suites/login").await.is_empty());
    assert!(resolver.list_containers().await.is_empty());
    assert!(resolver.list_tags("img").await.is_empty());

    let surfaced = RunConfigResolver::new(HttpRunConfigStore::new(&base)).surface_errors(true);
    assert!(surfaced.load("suites/login").await.is_failed());
}
