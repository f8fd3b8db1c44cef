//! Repository scenarios run against every storage engine
//!
//! Each test builds a fresh store per engine (in-memory and SQLite
//! `sqlite::memory:`) and expects identical results from both.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use astro_catalog::db::{self, DocumentStore, StoreConfig};
use astro_catalog::orm::{
    Document, EntityType, FilterSpec, ObjectId, PageSpec, Repository, RepositoryError, SortSpec,
    build_list_query,
};
use astro_catalog::storage_mode::StorageMode;

// ============================================================================
// Helpers
// ============================================================================

fn store_config(mode: StorageMode, database_url: &str) -> StoreConfig {
    StoreConfig {
        mode,
        database_url: database_url.to_string(),
        max_connections: 1,
        timeout: Duration::from_secs(5),
    }
}

async fn engines() -> Vec<(StorageMode, Repository)> {
    let mut modes = vec![StorageMode::Memory];
    #[cfg(feature = "sqlite")]
    modes.push(StorageMode::Sqlite);

    let mut repos = Vec::new();
    for mode in modes {
        let store = db::connect(&store_config(mode, "sqlite::memory:"))
            .await
            .unwrap();
        repos.push((mode, Repository::new(store, Duration::from_secs(5))));
    }
    repos
}

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

async fn create(repo: &Repository, entity: EntityType, payload: Value) -> String {
    let created = repo.create(entity, &doc(payload)).await.unwrap();
    created["_id"].as_str().unwrap().to_string()
}

async fn list_names(
    repo: &Repository,
    entity: EntityType,
    query: &[(&str, &str)],
) -> (u64, Vec<String>) {
    let query = build_list_query(entity, &params(query)).unwrap();
    let (total, records) = repo
        .list(entity, &query.filter, &query.sort, query.page)
        .await
        .unwrap();
    let names = records
        .iter()
        .map(|r| r["nome"].as_str().unwrap_or_default().to_string())
        .collect();
    (total, names)
}

/// True when no value anywhere in `value` is an object carrying `$oid`.
fn has_no_native_ids(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            !map.contains_key("$oid") && map.values().all(has_no_native_ids)
        }
        Value::Array(items) => items.iter().all(has_no_native_ids),
        _ => true,
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn sirius_round_trip() {
    for (mode, repo) in engines().await {
        let created = repo
            .create(
                EntityType::Star,
                &doc(json!({"nome": "Sirius", "magnitude": -1.46})),
            )
            .await
            .unwrap();
        let id = created["_id"].as_str().unwrap().to_string();

        assert_eq!(
            Value::Object(created.clone()),
            json!({"_id": &id, "nome": "Sirius", "magnitude": -1.46}),
            "{mode}"
        );
        assert_eq!(repo.get(EntityType::Star, &id).await.unwrap(), created, "{mode}");
    }
}

#[tokio::test]
async fn empty_collection_lists_nothing() {
    for (mode, repo) in engines().await {
        let (total, names) = list_names(&repo, EntityType::Star, &[("skip", "0"), ("limit", "10")]).await;
        assert_eq!(total, 0, "{mode}");
        assert!(names.is_empty(), "{mode}");
    }
}

#[tokio::test]
async fn mass_range_excludes_out_of_bounds() {
    for (mode, repo) in engines().await {
        create(&repo, EntityType::Planet, json!({"nome": "Marte", "massa": 0.9})).await;
        create(&repo, EntityType::Planet, json!({"nome": "Terra", "massa": 1.0})).await;
        create(&repo, EntityType::Planet, json!({"nome": "Netuno", "massa": 5})).await;
        create(&repo, EntityType::Planet, json!({"nome": "Júpiter", "massa": 317.8})).await;
        create(&repo, EntityType::Planet, json!({"nome": "Sem massa"})).await;

        let (total, names) = list_names(
            &repo,
            EntityType::Planet,
            &[("massa_min", "1.0"), ("massa_max", "5.0")],
        )
        .await;
        assert_eq!(total, 2, "{mode}");
        assert_eq!(names, vec!["Terra", "Netuno"], "{mode}");
    }
}

#[tokio::test]
async fn total_ignores_paging() {
    for (mode, repo) in engines().await {
        for i in 0..12 {
            create(&repo, EntityType::Star, json!({"nome": format!("Estrela {i:02}")})).await;
        }
        create(&repo, EntityType::Star, json!({"nome": "Vega"})).await;

        let (total, names) = list_names(&repo, EntityType::Star, &[("skip", "10"), ("limit", "5")]).await;
        assert_eq!(total, 13, "{mode}");
        assert_eq!(names, vec!["Estrela 10", "Estrela 11", "Vega"], "{mode}");

        let (total, names) =
            list_names(&repo, EntityType::Star, &[("nome", "ESTRELA 0"), ("limit", "3")]).await;
        assert_eq!(total, 10, "{mode}");
        assert_eq!(names.len(), 3, "{mode}");
    }
}

#[tokio::test]
async fn sort_by_number_both_directions() {
    for (mode, repo) in engines().await {
        create(&repo, EntityType::Star, json!({"nome": "B", "magnitude": 2.0})).await;
        create(&repo, EntityType::Star, json!({"nome": "A", "magnitude": -1.46})).await;
        create(&repo, EntityType::Star, json!({"nome": "C", "magnitude": 0.03})).await;

        let (_, names) =
            list_names(&repo, EntityType::Star, &[("ordenacao", "magnitude")]).await;
        assert_eq!(names, vec!["A", "C", "B"], "{mode}");

        let (_, names) = list_names(
            &repo,
            EntityType::Star,
            &[("ordenacao", "magnitude"), ("ordem_ascendente", "false")],
        )
        .await;
        assert_eq!(names, vec!["B", "C", "A"], "{mode}");
    }
}

#[tokio::test]
async fn date_filters_cover_whole_day() {
    for (mode, repo) in engines().await {
        for (i, when) in ["2024-04-30T23:59:59", "2024-05-01T00:00:00", "2024-05-01T18:30:00", "2024-05-02T00:00:00"]
            .iter()
            .enumerate()
        {
            create(
                &repo,
                EntityType::Observation,
                json!({"datahora": when, "observador": format!("obs{i}")}),
            )
            .await;
        }

        let query = build_list_query(
            EntityType::Observation,
            &params(&[("datahora_inicio", "2024-05-01"), ("datahora_fim", "2024-05-01")]),
        )
        .unwrap();
        let (total, records) = repo
            .list(EntityType::Observation, &query.filter, &query.sort, query.page)
            .await
            .unwrap();
        assert_eq!(total, 2, "{mode}");
        let observers: Vec<&str> = records
            .iter()
            .map(|r| r["observador"].as_str().unwrap())
            .collect();
        assert_eq!(observers, vec!["obs1", "obs2"], "{mode}");
    }
}

#[tokio::test]
async fn reference_and_list_filters() {
    for (mode, repo) in engines().await {
        let sol = create(&repo, EntityType::Star, json!({"nome": "Sol"})).await;
        let vega = create(&repo, EntityType::Star, json!({"nome": "Vega"})).await;
        let terra = create(&repo, EntityType::Planet, json!({"nome": "Terra", "estrela": &sol})).await;
        create(&repo, EntityType::Planet, json!({"nome": "Vega b", "estrela": &vega})).await;
        create(
            &repo,
            EntityType::Exoplanet,
            json!({"nome": "Gêmeo", "planetas": [&terra, &terra]}),
        )
        .await;
        create(&repo, EntityType::Exoplanet, json!({"nome": "Solitário", "planetas": []})).await;

        let (_, names) = list_names(&repo, EntityType::Planet, &[("estrela", sol.as_str())]).await;
        assert_eq!(names, vec!["Terra"], "{mode}");

        let (_, names) =
            list_names(&repo, EntityType::Exoplanet, &[("planetas", terra.as_str())]).await;
        assert_eq!(names, vec!["Gêmeo"], "{mode}");
    }
}

#[tokio::test]
async fn transport_form_has_no_native_ids() {
    for (mode, repo) in engines().await {
        let hubble = create(&repo, EntityType::Telescope, json!({"nome": "Hubble"})).await;
        let ana = create(&repo, EntityType::Astronomer, json!({"nome": "Ana"})).await;
        let eclipse = create(&repo, EntityType::CelestialPhenomenon, json!({"nome": "Eclipse"})).await;

        let created = repo
            .create(
                EntityType::Observation,
                &doc(json!({
                    "datahora": "2024-05-01T10:00:00",
                    "telescopio": &hubble,
                    "astronomo": {"$oid": &ana},
                    "fenomenos": [&eclipse, &eclipse],
                })),
            )
            .await
            .unwrap();
        let value = Value::Object(created.clone());
        assert!(has_no_native_ids(&value), "{mode}");
        assert_eq!(value["astronomo"], json!(&ana), "{mode}");
        assert_eq!(value["fenomenos"], json!([&eclipse, &eclipse]), "{mode}");

        let id = created["_id"].as_str().unwrap();
        let fetched = repo.get(EntityType::Observation, id).await.unwrap();
        assert!(has_no_native_ids(&Value::Object(fetched)), "{mode}");
    }
}

#[tokio::test]
async fn update_merges_and_unsets() {
    for (mode, repo) in engines().await {
        let id = create(
            &repo,
            EntityType::Telescope,
            json!({"nome": "Hubble", "tipo": "refletor", "diametro": 2.4}),
        )
        .await;

        let updated = repo
            .update(
                EntityType::Telescope,
                &id,
                &doc(json!({"diametro": 2.5, "tipo": null, "data_lancamento": "1990-04-24"})),
            )
            .await
            .unwrap();
        assert_eq!(
            Value::Object(updated),
            json!({
                "_id": &id,
                "nome": "Hubble",
                "diametro": 2.5,
                "data_lancamento": "1990-04-24T00:00:00",
            }),
            "{mode}"
        );
    }
}

#[tokio::test]
async fn empty_update_is_identity() {
    for (mode, repo) in engines().await {
        let id = create(&repo, EntityType::Planet, json!({"nome": "Terra", "massa": 1.0})).await;
        let before = repo.get(EntityType::Planet, &id).await.unwrap();
        let after = repo
            .update(EntityType::Planet, &id, &Document::new())
            .await
            .unwrap();
        assert_eq!(after, before, "{mode}");
    }
}

#[tokio::test]
async fn invalid_reference_update_changes_nothing() {
    for (mode, repo) in engines().await {
        let id = create(
            &repo,
            EntityType::Observation,
            json!({"datahora": "2024-05-01T10:00:00", "localizacao": "Atacama"}),
        )
        .await;
        let before = repo.get(EntityType::Observation, &id).await.unwrap();

        let err = repo
            .update(
                EntityType::Observation,
                &id,
                &doc(json!({"telescopio": "not-an-id", "localizacao": "La Palma"})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidReference", "{mode}");
        assert_eq!(repo.get(EntityType::Observation, &id).await.unwrap(), before, "{mode}");
    }
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    for (mode, repo) in engines().await {
        let id = create(&repo, EntityType::Exoplanet, json!({"nome": "Kepler-452b"})).await;
        repo.delete(EntityType::Exoplanet, &id).await.unwrap();

        assert_matches!(
            repo.get(EntityType::Exoplanet, &id).await,
            Err(RepositoryError::NotFound { .. }),
            "{mode}"
        );
        assert_matches!(
            repo.delete(EntityType::Exoplanet, &id).await,
            Err(RepositoryError::NotFound { .. }),
            "{mode}"
        );
    }
}

#[tokio::test]
async fn dangling_references_resolve_to_nothing() {
    for (mode, repo) in engines().await {
        let sol = create(&repo, EntityType::Star, json!({"nome": "Sol"})).await;
        create(&repo, EntityType::Planet, json!({"nome": "Terra", "estrela": &sol})).await;
        repo.delete(EntityType::Star, &sol).await.unwrap();

        // no cascade: the planet still points at the deleted star
        let (_, names) = list_names(&repo, EntityType::Planet, &[("estrela", sol.as_str())]).await;
        assert_eq!(names, vec!["Terra"], "{mode}");

        let id = ObjectId::parse_str(&sol).unwrap();
        let (target, records) = repo
            .resolver()
            .resolve(EntityType::Star, "planetas", id)
            .await
            .unwrap();
        assert_eq!(target, EntityType::Planet, "{mode}");
        assert_eq!(records.len(), 1, "{mode}");

        let orphan = repo
            .resolver()
            .resolve(EntityType::Star, "exoplanetas", id)
            .await
            .unwrap();
        assert!(orphan.1.is_empty(), "{mode}");
    }
}

#[tokio::test]
async fn reverse_lookup_matches_both_directions() {
    for (mode, repo) in engines().await {
        let terra = create(&repo, EntityType::Planet, json!({"nome": "Terra"})).await;
        let marte = create(&repo, EntityType::Planet, json!({"nome": "Marte"})).await;
        let sol = create(&repo, EntityType::Star, json!({"nome": "Sol", "planetas": [&terra]})).await;
        create(&repo, EntityType::Star, json!({"nome": "Vega", "planetas": [&marte]})).await;
        let kepler = create(&repo, EntityType::Star, json!({"nome": "Kepler"})).await;
        create(&repo, EntityType::Planet, json!({"nome": "Terra 2.0", "estrela": &kepler})).await;

        let found = repo
            .resolver()
            .reverse_by_nested_text(EntityType::Star, "planetas", "nome", "terra")
            .await
            .unwrap();
        let ids: Vec<String> = found.iter().map(|r| r.id.to_hex()).collect();
        assert_eq!(ids, vec![sol.clone(), kepler.clone()], "{mode}");
    }
}

#[tokio::test]
async fn accented_text_filters_fold_case() {
    for (mode, repo) in engines().await {
        create(&repo, EntityType::Star, json!({"nome": "ÉPSILON ERIDANI"})).await;
        create(&repo, EntityType::Star, json!({"nome": "Vega"})).await;
        create(&repo, EntityType::Star, json!({"nome": "Épsilon Indi"})).await;

        let (total, names) = list_names(&repo, EntityType::Star, &[("nome", "épsilon")]).await;
        assert_eq!(total, 2, "{mode}");
        assert_eq!(names, vec!["ÉPSILON ERIDANI", "Épsilon Indi"], "{mode}");

        let (total, names) = list_names(
            &repo,
            EntityType::Star,
            &[("nome", "ÉPSILON"), ("skip", "1"), ("limit", "1")],
        )
        .await;
        assert_eq!(total, 2, "{mode}");
        assert_eq!(names, vec!["Épsilon Indi"], "{mode}");
    }
}

#[tokio::test]
async fn reverse_lookup_folds_accented_case() {
    for (mode, repo) in engines().await {
        let ana = create(&repo, EntityType::Astronomer, json!({"nome": "Ana"})).await;
        let bia = create(&repo, EntityType::Astronomer, json!({"nome": "Bia"})).await;
        create(
            &repo,
            EntityType::Observation,
            json!({
                "datahora": "2024-05-01T10:00:00",
                "astronomo": &ana,
                "propriedades_observadas": "Linhas de HIDROGÊNIO intensas"
            }),
        )
        .await;
        create(
            &repo,
            EntityType::Observation,
            json!({
                "datahora": "2024-05-02T10:00:00",
                "astronomo": &bia,
                "propriedades_observadas": "poeira"
            }),
        )
        .await;

        let found = repo
            .resolver()
            .reverse_by_nested_text(
                EntityType::Astronomer,
                "observacoes",
                "propriedades_observadas",
                "hidrogênio",
            )
            .await
            .unwrap();
        let ids: Vec<String> = found.iter().map(|r| r.id.to_hex()).collect();
        assert_eq!(ids, vec![ana.clone()], "{mode}");
    }
}

#[tokio::test]
async fn filters_reject_unknown_fields() {
    let err = build_list_query(EntityType::Star, &params(&[("cor", "azul")])).unwrap_err();
    assert_eq!(err.kind(), "UnknownFilterField");

    let err = build_list_query(EntityType::Star, &params(&[("limit", "101")])).unwrap_err();
    assert_eq!(err.kind(), "InvalidPageSize");
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn sqlite_file_persists_across_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("catalog.db").display());

    let store = db::connect(&store_config(StorageMode::Sqlite, &url))
        .await
        .unwrap();
    let repo = Repository::new(store.clone(), Duration::from_secs(5));
    let id = create(&repo, EntityType::Astronomer, json!({"nome": "Hipátia"})).await;
    store.close().await;

    let store: Arc<dyn DocumentStore> = db::connect(&store_config(StorageMode::Sqlite, &url))
        .await
        .unwrap();
    let repo = Repository::new(store, Duration::from_secs(5));
    let fetched = repo.get(EntityType::Astronomer, &id).await.unwrap();
    assert_eq!(fetched["nome"], json!("Hipátia"));

    let (total, _) = repo
        .list(
            EntityType::Astronomer,
            &FilterSpec::all(),
            &SortSpec::natural(),
            PageSpec::default(),
        )
        .await
        .unwrap();
    assert_eq!(total, 1);
}
