//! End-to-end migrations from a snapshot directory into the memory target

mod common;

use common::Workspace;
use ferry::adapters::database::ConfiguredStoreProvider;
use ferry::api::{MigrateRequest, MigrationApi};
use ferry::config::parse_config;
use ferry::domain::Record;
use serde_json::{json, Value};
use std::sync::Arc;

fn setup(workspace: &Workspace, tables: &[&str], extra: &str) -> (MigrationApi, Arc<ConfiguredStoreProvider>) {
    let config = parse_config(&workspace.config(tables, extra)).unwrap();
    let provider = Arc::new(ConfiguredStoreProvider::new(config.clone()));
    let api = MigrationApi::from_config(provider.clone(), &config).unwrap();
    (api, provider)
}

fn record(value: Value) -> Record {
    Record::try_from(value).unwrap()
}

#[tokio::test]
async fn test_end_to_end_insert_if_absent() {
    let workspace = Workspace::new();
    workspace.snapshot("tb_clients", r#"[{"cliente_id": "5", "nome": "Ana"}]"#);
    let (api, provider) = setup(&workspace, &["tb_clients"], "");

    let response = api.migrate(&MigrateRequest::for_table("tb_clients")).await;

    assert_eq!(response.status, 200);
    assert_eq!(
        response.json(),
        Some(&json!({
            "message": "Migration of table tb_clients completed.",
            "exported_records": 1,
            "inserted_records": 1,
        }))
    );

    let document = provider
        .memory_target()
        .get("oracle_energy", "tb_clients_5")
        .await
        .unwrap();
    assert_eq!(document.get("nome"), Some(&json!("Ana")));
    assert_eq!(document.get("_id"), Some(&json!("tb_clients_5")));
    assert_eq!(document.get("table_name"), Some(&json!("tb_clients")));
}

#[tokio::test]
async fn test_end_to_end_upsert_uses_table_collection() {
    let workspace = Workspace::new();
    workspace.snapshot("tb_clients", r#"[{"cliente_id": "5", "nome": "Ana"}]"#);
    let (api, provider) = setup(&workspace, &["tb_clients"], "policy = \"upsert\"");

    let response = api.migrate(&MigrateRequest::for_table("tb_clients")).await;
    assert_eq!(response.status, 200);

    let document = provider.memory_target().get("tb_clients", "5").await.unwrap();
    assert_eq!(document.get("nome"), Some(&json!("Ana")));
    assert_eq!(document.get("_id"), Some(&json!("5")));
    assert_eq!(provider.memory_target().count("oracle_energy").await, 0);
}

#[tokio::test]
async fn test_partial_failure_is_isolated() {
    let workspace = Workspace::new();
    workspace.snapshot("tb_app_fornecedores", r#"[{"fornecedor_id": 1}, {"fornecedor_id": 2}]"#);
    workspace.snapshot("tb_app_clientes", "{not valid json");
    workspace.snapshot("tb_app_energia", r#"[{"energia_id": "E1"}]"#);
    let (api, provider) = setup(
        &workspace,
        &["tb_app_fornecedores", "tb_app_clientes", "tb_app_energia"],
        "",
    );

    let response = api.migrate_all().await;
    assert_eq!(response.status, 200);

    let body = response.json().unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["table_name"], "tb_app_fornecedores");
    assert_eq!(results[0]["status"], "Success");
    assert_eq!(results[1]["status"], "DecodeError");
    assert!(results[1]["error"].as_str().unwrap().contains("tb_app_clientes"));
    assert_eq!(results[2]["status"], "Success");
    assert_eq!(body["failed_tables"], 1);
    assert_eq!(body["total_inserted"], 3);

    let ids = provider.memory_target().ids("oracle_energy").await;
    assert_eq!(
        ids,
        vec![
            "tb_app_energia_E1".to_string(),
            "tb_app_fornecedores_1".to_string(),
            "tb_app_fornecedores_2".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_missing_snapshot_reports_no_data() {
    let workspace = Workspace::new();
    workspace.snapshot("tb_app_energia", r#"[{"energia_id": "E1"}]"#);
    let (api, _) = setup(&workspace, &["tb_app_estoqueEnergia", "tb_app_energia"], "");

    let single = api
        .migrate(&MigrateRequest::for_table("tb_app_estoqueEnergia"))
        .await;
    assert_eq!(single.status, 404);
    assert_eq!(
        single.json(),
        Some(&json!({ "error": "No data found for table tb_app_estoqueEnergia" }))
    );

    let batch = api.migrate_all().await;
    let body = batch.json().unwrap();
    assert_eq!(body["results"][0]["status"], "NoData");
    assert_eq!(body["results"][1]["status"], "Success");
    assert_eq!(body["failed_tables"], 0);
}

#[tokio::test]
async fn test_insert_if_absent_is_idempotent() {
    let workspace = Workspace::new();
    workspace.snapshot(
        "tb_app_transacao",
        r#"[{"transacao_id": 1, "valor": 10}, {"transacao_id": 2, "valor": 20}, {"valor": 30}]"#,
    );
    let (api, provider) = setup(&workspace, &["tb_app_transacao"], "");

    let first = api.migrate_all().await;
    assert_eq!(first.json().unwrap()["total_inserted"], 3);

    let second = api.migrate_all().await;
    let body = second.json().unwrap();
    assert_eq!(body["results"][0]["exported_records"], 3);
    assert_eq!(body["results"][0]["inserted_records"], 0);
    assert_eq!(provider.memory_target().count("oracle_energy").await, 3);
}

#[tokio::test]
async fn test_upsert_is_idempotent() {
    let workspace = Workspace::new();
    workspace.snapshot("tb_audit_log", r#"[{"audit_id": 7, "acao": "login"}, {"acao": "logout"}]"#);
    let (api, provider) = setup(&workspace, &["tb_audit_log"], "policy = \"upsert\"");

    api.migrate_all().await;
    let before = provider.memory_target().ids("tb_audit_log").await;
    let document = provider.memory_target().get("tb_audit_log", "7").await;

    api.migrate_all().await;
    assert_eq!(provider.memory_target().ids("tb_audit_log").await, before);
    assert_eq!(provider.memory_target().get("tb_audit_log", "7").await, document);
    assert_eq!(before.len(), 2);
}

#[tokio::test]
async fn test_insert_if_absent_never_touches_existing_documents() {
    let workspace = Workspace::new();
    workspace.snapshot("T", r#"[{"transacao_id": 1, "x": 1}, {"transacao_id": 2, "x": 2}]"#);
    let (api, provider) = setup(&workspace, &["T"], "");
    provider
        .memory_target()
        .seed("oracle_energy", "T_1", record(json!({ "x": 0 })))
        .await;

    let response = api.migrate(&MigrateRequest::for_table("T")).await;
    assert_eq!(response.json().unwrap()["inserted_records"], 1);

    let existing = provider.memory_target().get("oracle_energy", "T_1").await.unwrap();
    assert_eq!(existing, record(json!({ "x": 0 })));
    assert!(provider.memory_target().get("oracle_energy", "T_2").await.is_some());
}

#[tokio::test]
async fn test_upsert_merges_fields() {
    let workspace = Workspace::new();
    workspace.snapshot("T", r#"[{"transacao_id": 1, "x": 2}]"#);
    let (api, provider) = setup(&workspace, &["T"], "policy = \"upsert\"");
    provider
        .memory_target()
        .seed("T", "1", record(json!({ "x": 1, "kept": true })))
        .await;

    let response = api.migrate(&MigrateRequest::for_table("T")).await;
    assert_eq!(response.status, 200);

    let merged = provider.memory_target().get("T", "1").await.unwrap();
    assert_eq!(merged.get("x"), Some(&json!(2)));
    assert_eq!(merged.get("kept"), Some(&json!(true)));
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let workspace = Workspace::new();
    workspace.snapshot("tb_app_clientes", r#"[{"cliente_id": 1}, {"cliente_id": 2}]"#);
    let (api, provider) = setup(
        &workspace,
        &["tb_app_clientes"],
        "\n[application]\ndry_run = true",
    );

    let response = api.migrate(&MigrateRequest::for_table("tb_app_clientes")).await;

    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap()["inserted_records"], 2);
    assert_eq!(provider.memory_target().count("oracle_energy").await, 0);
}

#[tokio::test]
async fn test_export_mode_writes_snapshot_files() {
    let workspace = Workspace::new();
    workspace.snapshot("tb_app_clientes", r#"[{"cliente_id": 1, "nome": "Ana"}]"#);
    workspace.snapshot("tb_app_energia", r#"[{"energia_id": "E1"}]"#);
    let (api, provider) = setup(
        &workspace,
        &["tb_app_clientes", "tb_app_energia"],
        "mode = \"export\"",
    );

    let single = api.migrate(&MigrateRequest::for_table("tb_app_clientes")).await;
    let path = single.file_path().unwrap();
    assert!(path.starts_with(workspace.exports()));
    let records: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(records[0]["_id"], "tb_app_clientes_1");
    assert_eq!(records[0]["nome"], "Ana");

    let all = api.migrate_all().await;
    let combined: Value =
        serde_json::from_str(&std::fs::read_to_string(all.file_path().unwrap()).unwrap()).unwrap();
    let tables: Vec<&String> = combined.as_object().unwrap().keys().collect();
    assert_eq!(tables, vec!["tb_app_clientes", "tb_app_energia"]);

    assert_eq!(provider.memory_target().count("oracle_energy").await, 0);
}
