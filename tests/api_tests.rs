//! HTTP tests driving the full router over the in-memory store

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header::CONTENT_TYPE};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use astro_catalog::db::{DocumentStore, MemoryStore};
use astro_catalog::orm::Repository;
use astro_catalog::{AppState, Config, build_app};

// ============================================================================
// Helpers
// ============================================================================

fn app() -> Router {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let repository = Repository::new(store, Duration::from_secs(5));
    build_app(AppState::new(Config::default(), repository))
}

async fn send_raw(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(raw) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(raw.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let raw = body.map(|v| v.to_string());
    send_raw(app, method, uri, raw.as_deref()).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn create(app: &Router, collection: &str, payload: Value) -> String {
    let (status, body) = send(app, Method::POST, &format!("/{collection}"), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["_id"].as_str().unwrap().to_string()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_endpoints() {
    let app = app();

    let (status, body) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let (status, body) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ready": true, "storage": "memory"}));

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"message": "Conexão com o armazenamento estabelecida com sucesso"})
    );
}

// ============================================================================
// CRUD
// ============================================================================

#[tokio::test]
async fn create_and_get_sirius() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/estrelas",
        Some(json!({"nome": "Sirius", "magnitude": -1.46})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["_id"].as_str().unwrap().to_string();
    assert_eq!(
        body,
        json!({
            "message": "Estrela criada com sucesso",
            "data": {"_id": &id, "nome": "Sirius", "magnitude": -1.46},
        })
    );

    let (status, fetched) = get(&app, &format!("/estrelas/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, json!({"data": body["data"].clone()}));
}

#[tokio::test]
async fn empty_list_shape() {
    let app = app();

    let (status, body) = get(&app, "/estrelas?skip=0&limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"total": 0, "count": 0, "estrelas": []}));

    let (_, body) = get(&app, "/fenomenos").await;
    assert_eq!(body, json!({"total": 0, "count": 0, "fenomenos_celestiais": []}));
}

#[tokio::test]
async fn list_filters_by_mass_range() {
    let app = app();
    for (nome, massa) in [("Marte", 0.9), ("Terra", 1.0), ("Netuno", 5.0), ("Saturno", 95.2)] {
        create(&app, "planetas", json!({"nome": nome, "massa": massa})).await;
    }

    let (status, body) = get(&app, "/planetas?massa_min=1.0&massa_max=5.0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["count"], 2);
    let names: Vec<&str> = body["planetas"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["nome"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Terra", "Netuno"]);

    let (_, body) = get(&app, "/planetas?ordenacao=massa&ordem_ascendente=false&limit=1").await;
    assert_eq!(body["total"], 4);
    assert_eq!(body["planetas"][0]["nome"], "Saturno");
}

#[tokio::test]
async fn list_rejects_bad_parameters() {
    let app = app();

    let (status, body) = get(&app, "/estrelas?cor=azul").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "UnknownFilterField");

    let (status, body) = get(&app, "/estrelas?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidPageSize");

    let (status, body) = get(&app, "/estrelas?skip=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidSkip");

    let (status, body) = get(&app, "/estrelas?ordenacao=planetas").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidSortField");

    let (status, body) = get(&app, "/observacoes?datahora_inicio=ontem").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidDateFormat");
}

#[tokio::test]
async fn invalid_reference_update_leaves_record_unchanged() {
    let app = app();
    let id = create(
        &app,
        "observacoes",
        json!({"datahora": "2024-05-01T10:00:00", "observador": "Ana"}),
    )
    .await;
    let (_, before) = get(&app, &format!("/observacoes/{id}")).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/observacoes/{id}"),
        Some(json!({"telescopio": "not-an-id"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidReference");

    let (_, after) = get(&app, &format!("/observacoes/{id}")).await;
    assert_eq!(after, before);
}

#[tokio::test]
async fn update_returns_merged_record() {
    let app = app();
    let id = create(&app, "telescopios", json!({"nome": "Hubble", "diametro": 2.4})).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/telescopios/{id}"),
        Some(json!({"localizacao": "Órbita terrestre baixa"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "message": "Telescópio atualizado com sucesso",
            "data": {
                "_id": &id,
                "nome": "Hubble",
                "diametro": 2.4,
                "localizacao": "Órbita terrestre baixa",
            },
        })
    );
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let app = app();
    let id = create(&app, "planetas", json!({"nome": "Plutão"})).await;

    let (status, body) = send(&app, Method::DELETE, &format!("/planetas/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Planeta excluído com sucesso"}));

    let (status, body) = get(&app, &format!("/planetas/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "NotFound", "detail": "Planeta não encontrado"}));

    let (status, _) = send(&app, Method::DELETE, &format!("/planetas/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_errors() {
    let app = app();

    let (status, body) = get(&app, "/galaxias").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "UnknownEntity");

    let (status, body) = get(&app, "/estrelas/123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidIdentifier");

    let (status, body) = send_raw(&app, Method::POST, "/estrelas", Some("{\"nome\": ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidPayload");

    let (status, body) = send(&app, Method::POST, "/estrelas", Some(json!(["Sirius"]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidPayload");

    let (status, body) = send(&app, Method::POST, "/estrelas", Some(json!({"magnitude": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MissingRequiredField");

    let (status, body) = send(
        &app,
        Method::POST,
        "/telescopios",
        Some(json!({"nome": "VLT", "data_lancamento": "31/12/1998"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidDateFormat");
}

// ============================================================================
// Relationships
// ============================================================================

#[tokio::test]
async fn relation_routes() {
    let app = app();
    let hubble = create(&app, "telescopios", json!({"nome": "Hubble"})).await;
    create(
        &app,
        "observacoes",
        json!({"datahora": "2024-05-01T10:00:00", "telescopio": &hubble}),
    )
    .await;
    create(
        &app,
        "observacoes",
        json!({"datahora": "2024-05-02T10:00:00", "telescopio": &hubble}),
    )
    .await;

    let (status, body) = get(&app, &format!("/telescopios/{hubble}/observacoes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["observacoes"][0]["telescopio"], json!(&hubble));

    let (status, body) = get(&app, &format!("/telescopios/{hubble}/lentes")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "UnknownRelation");

    let missing = "0123456789abcdef01234567";
    let (status, body) = get(&app, &format!("/telescopios/{missing}/observacoes")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn reverse_nested_lookup() {
    let app = app();
    let ana = create(&app, "astronomos", json!({"nome": "Ana"})).await;
    let bia = create(&app, "astronomos", json!({"nome": "Bia"})).await;
    create(
        &app,
        "observacoes",
        json!({
            "datahora": "2024-05-01T10:00:00",
            "astronomo": &ana,
            "propriedades_observadas": "Linhas de Hidrogenio intensas",
        }),
    )
    .await;
    create(
        &app,
        "observacoes",
        json!({
            "datahora": "2024-05-02T10:00:00",
            "astronomo": &bia,
            "propriedades_observadas": "poeira",
        }),
    )
    .await;

    let (status, body) = get(
        &app,
        "/astronomos/consulta/observacoes?campo=propriedades_observadas&valor=HIDROGENIO",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["astronomos"][0]["nome"], "Ana");

    let (status, body) = get(&app, "/astronomos/consulta/observacoes?valor=x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MissingParameter");

    let (status, body) = get(&app, "/astronomos/consulta/observacoes?campo=datahora&valor=x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "UnknownFilterField");
}
