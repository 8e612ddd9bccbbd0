use std::net::SocketAddr;

use configs::AppConfig;
use reqwest::StatusCode as HttpStatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

struct TestApp {
    base_url: String,
    data_file: String,
}

async fn start_server() -> anyhow::Result<TestApp> {
    // Use isolated temp files per test run
    let temp_id = Uuid::new_v4();
    let mut cfg = AppConfig::default();
    cfg.storage.data_file = format!("target/test-data/{}/users.jsonl", temp_id);
    cfg.storage.static_dir = format!("target/test-data/{}/public", temp_id);

    let app = server::startup::build_app(&cfg).await?;
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("server error: {}", e); }
    });

    Ok(TestApp { base_url, data_file: cfg.storage.data_file })
}

#[tokio::test]
async fn e2e_public_health() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = reqwest::get(format!("{}/health", app.base_url)).await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn e2e_user_lifecycle_persists_to_disk() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = reqwest::Client::new();

    let res = c.post(format!("{}/users", app.base_url))
        .json(&json!({"username": "alice", "password": "pw1", "email": "a@x.com", "name": "Alice"}))
        .send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let created = res.json::<Value>().await?;
    assert_eq!(created["username"], "alice");

    let res = c.patch(format!("{}/users/alice", app.base_url))
        .json(&json!({"name": "Alice A."}))
        .send().await?;
    assert_eq!(res.json::<Value>().await?, json!({"ok": true}));

    // the data file holds the insert and the update as separate lines
    let content = tokio::fs::read_to_string(&app.data_file).await?;
    let lines: Vec<Value> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1]["name"], "Alice A.");
    assert_eq!(lines[0]["_id"], created["_id"]);

    let res = c.delete(format!("{}/users/alice", app.base_url)).send().await?;
    assert_eq!(res.json::<Value>().await?, json!({"ok": true}));
    let res = c.get(format!("{}/users/alice", app.base_url)).send().await?;
    assert_eq!(res.json::<Value>().await?, json!({"error": "Username not found."}));
    Ok(())
}

#[tokio::test]
async fn e2e_malformed_json_is_rejected_by_extractor() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = reqwest::Client::new()
        .post(format!("{}/users", app.base_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send().await?;
    assert!(res.status().is_client_error());
    Ok(())
}
