use std::env;
use std::sync::{Arc, Once};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use cv_management_backend::{
    build_router, config,
    database::pool::{create_pool, run_migrations},
    dto::user_dto::CreateUserPayload,
    error::Result as AppResult,
    middleware::auth::issue_token,
    models::user::Role,
    services::{
        activity_service::ActivityService,
        sheet_sync_service::{SheetSource, SheetSyncService},
    },
    AppState,
};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use tower::ServiceExt;

static INIT: Once = Once::new();
const BOUNDARY: &str = "cvtestboundary";

/// Router plus an admin token, or `None` when no database is configured.
async fn setup() -> Option<(Router, PgPool, String)> {
    dotenvy::dotenv().ok();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set; skipping database-backed test");
        return None;
    }
    INIT.call_once(|| {
        env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
        env::set_var("JWT_SECRET", "test_secret_key");
        env::set_var("API_RPS", "1000");
        env::set_var("PUBLIC_RPS", "1000");
        config::init_config().expect("init config");
    });

    let pool = create_pool().await.expect("connect");
    run_migrations(&pool).await.expect("migrate");
    let state = AppState::new(pool.clone()).expect("state");
    let token = token_for(&state, Role::Admin).await;
    Some((build_router(state), pool, token))
}

async fn token_for(state: &AppState, role: Role) -> String {
    let user = state
        .user_service
        .create(CreateUserPayload {
            name: "Test User".into(),
            email: format!("{}@cv-test.io", uuid::Uuid::new_v4()),
            password: "secret123".into(),
            role,
            is_active: true,
        })
        .await
        .expect("create user");
    issue_token(&user).expect("token")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, JsonValue) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 16 * 1024 * 1024).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, body)
}

fn json_request(method: &str, uri: &str, token: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn upload(token: &str, action: &str, csv: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"action\"\r\n\r\n{action}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cvs.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
        b = BOUNDARY,
        action = action,
        csv = csv,
    );
    Request::builder()
        .method("POST")
        .uri("/api/cvs/import")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

async fn create_cv(app: &Router, token: &str, body: JsonValue) -> JsonValue {
    let (status, body) = send(app, json_request("POST", "/api/cvs", token, body)).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["cv"].clone()
}

#[tokio::test]
async fn create_requires_a_name_and_defaults_status() {
    let Some((app, _pool, token)) = setup().await else { return };

    let (status, body) = send(&app, json_request("POST", "/api/cvs", &token, json!({ "full_name": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Full name is required");

    let cv = create_cv(&app, &token, json!({ "full_name": "  Maria Santos  ", "nationality": "Philippines" })).await;
    assert_eq!(cv["full_name"], "Maria Santos");
    assert_eq!(cv["status"], "NEW");
    assert_eq!(cv["source"], "Manual");

    let (status, body) = send(&app, get("/api/cvs/not-a-number", &token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid CV ID format");

    let (status, _) = send(&app, get("/api/cvs/999999999", &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn content_changes_are_versioned() {
    let Some((app, _pool, token)) = setup().await else { return };
    let cv = create_cv(&app, &token, json!({ "full_name": "Versioned", "content": "draft one" })).await;
    let uri = format!("/api/cvs/{}", cv["id"]);

    for content in ["draft two", "draft three", "draft three"] {
        let (status, _) = send(&app, json_request("PATCH", &uri, &token, json!({ "content": content }))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, get(&format!("{}/versions", uri), &token)).await;
    assert_eq!(status, StatusCode::OK);
    let versions = body["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["version"], 2);
    assert_eq!(versions[0]["content"], "draft two");
    assert_eq!(versions[1]["version"], 1);
    assert_eq!(versions[1]["content"], "draft one");
}

#[tokio::test]
async fn status_table_binds_users_but_not_managers() {
    let Some((app, pool, admin)) = setup().await else { return };
    let state = AppState::new(pool).unwrap();
    let user = token_for(&state, Role::User).await;

    let cv = create_cv(&app, &admin, json!({ "full_name": "Transition" })).await;
    let uri = format!("/api/cvs/{}", cv["id"]);

    let (status, _) = send(&app, json_request("PATCH", &uri, &user, json!({ "status": "RETURNED" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, json_request("PATCH", &uri, &admin, json!({ "status": "RETURNED" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cv"]["status"], "RETURNED");

    let (status, _) = send(&app, json_request("DELETE", &uri, &user, json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn delete_removes_contracts_and_logs() {
    let Some((app, pool, token)) = setup().await else { return };
    let cv = create_cv(&app, &token, json!({ "full_name": "To Delete" })).await;
    let id = cv["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        json_request("POST", "/api/contracts", &token, json!({ "cv_id": id, "identity_number": "ID-778" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, body) = send(&app, json_request("DELETE", &format!("/api/cvs/{}", id), &token, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "CV deleted successfully");

    let contracts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contracts WHERE cv_id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    let logs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs WHERE cv_id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!((contracts, logs), (0, 0));

    let (status, _) = send(&app, get(&format!("/api/cvs/{}", id), &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn import_previews_then_inserts_valid_rows() {
    let Some((app, _pool, token)) = setup().await else { return };
    let marker = uuid::Uuid::new_v4().simple().to_string();
    let csv = format!(
        "Full Name,Email,Nationality\nImported {m},imported@cv-test.io,Kenya\n,missing@cv-test.io,Kenya\n",
        m = marker
    );

    let (status, body) = send(&app, upload(&token, "preview", &csv)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["total"], 2);
    assert_eq!(body["valid"], 1);
    assert_eq!(body["invalid"], 1);
    assert_eq!(body["invalid_cvs"][0]["errors"][0], "Row 2: Full name is required");

    let (status, body) = send(&app, upload(&token, "import", &csv)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["imported"], 1);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["cvs"][0]["source"], "Excel Import");

    let (status, body) = send(&app, upload(&token, "explode", &csv)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
}

async fn count(pool: &PgPool, sql: &str, cv_id: i64) -> i64 {
    sqlx::query_scalar(sql).bind(cv_id).fetch_one(pool).await.unwrap()
}

#[tokio::test]
async fn patch_clears_fields_sent_as_null_or_blank() {
    let Some((app, pool, token)) = setup().await else { return };
    let cv = create_cv(
        &app,
        &token,
        json!({
            "full_name": "Clearable",
            "email": "clear@cv-test.io",
            "age": 31,
            "marital_status": "SINGLE",
            "nationality": "Kenya"
        }),
    )
    .await;
    let id = cv["id"].as_i64().unwrap();
    let uri = format!("/api/cvs/{}", id);

    let (status, body) = send(
        &app,
        json_request("PATCH", &uri, &token, json!({ "email": "", "age": null, "marital_status": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["cv"]["email"].is_null());
    assert!(body["cv"]["age"].is_null());
    assert!(body["cv"]["marital_status"].is_null());
    assert_eq!(body["cv"]["nationality"], "Kenya");
    assert_eq!(body["cv"]["full_name"], "Clearable");

    let metadata: JsonValue = sqlx::query_scalar(
        "SELECT metadata FROM activity_logs WHERE cv_id = $1 AND action = 'CV_UPDATED' ORDER BY id DESC LIMIT 1",
    )
    .bind(id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(metadata["fields"], json!(["age", "email", "marital_status"]));

    // A blank name is ignored, never cleared.
    let (status, body) = send(&app, json_request("PATCH", &uri, &token, json!({ "full_name": "" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cv"]["full_name"], "Clearable");
}

#[tokio::test]
async fn hire_return_and_rehire_share_one_contract() {
    let Some((app, pool, token)) = setup().await else { return };
    let name = format!("Hire {}", uuid::Uuid::new_v4().simple());
    let cv = create_cv(&app, &token, json!({ "full_name": name })).await;
    let id = cv["id"].as_i64().unwrap();
    let hire_uri = format!("/api/cvs/{}/hire", id);

    let (status, body) = send(&app, json_request("POST", &hire_uri, &token, json!({ "identity_number": "ID-1" }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["cv"]["status"], "HIRED");
    assert_eq!(body["contract"]["identity_number"], "ID-1");
    let first_contract = body["contract"]["id"].as_i64().unwrap();

    let (status, _) = send(&app, json_request("POST", &hire_uri, &token, json!({ "identity_number": "ID-9" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let return_uri = format!("/api/contracts/{}/return", id);
    for _ in 0..2 {
        let (status, body) = send(&app, json_request("POST", &return_uri, &token, json!({}))).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["cv"]["status"], "RETURNED");
    }
    let changes = count(
        &pool,
        "SELECT COUNT(*) FROM activity_logs WHERE cv_id = $1 AND action = 'STATUS_CHANGED'",
        id,
    )
    .await;
    assert_eq!(changes, 1);

    let (status, body) = send(&app, json_request("POST", &hire_uri, &token, json!({ "identity_number": "ID-2" }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["contract"].is_null());
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM contracts WHERE cv_id = $1", id).await, 1);

    let search = format!("/api/contracts?search={}", name.replace(' ', "%20"));
    let (status, body) = send(&app, get(&search, &token)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["contracts"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["contract_id"], first_contract);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/contracts",
            &token,
            json!({ "cv_id": id, "identity_number": "ID-3", "contract_date": "2099-01-01T00:00:00Z" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let (_, body) = send(&app, get(&search, &token)).await;
    assert_eq!(body["contracts"][0]["identity_number"], "ID-3");
}

#[tokio::test]
async fn bulk_actions_are_all_or_nothing() {
    let Some((app, _pool, token)) = setup().await else { return };
    let a = create_cv(&app, &token, json!({ "full_name": "Bulk A" })).await["id"].as_i64().unwrap();
    let b = create_cv(&app, &token, json!({ "full_name": "Bulk B" })).await["id"].as_i64().unwrap();
    let missing = i64::MAX;

    let (status, _) = send(
        &app,
        json_request("POST", "/api/cvs/bulk", &token, json!({ "cv_ids": [a, b, missing], "action": "status", "status": "ARCHIVED" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(&app, get(&format!("/api/cvs/{}", a), &token)).await;
    assert_eq!(body["cv"]["status"], "NEW");

    let (status, _) = send(
        &app,
        json_request("POST", "/api/cvs/bulk", &token, json!({ "cv_ids": [a, missing], "action": "delete" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get(&format!("/api/cvs/{}", a), &token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        json_request("POST", "/api/cvs/bulk", &token, json!({ "cv_ids": [a, b], "action": "status", "status": "ARCHIVED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 2);

    let (status, body) = send(
        &app,
        json_request("POST", "/api/cvs/bulk", &token, json!({ "cv_ids": [a, b], "action": "delete" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 2);
    let (status, _) = send(&app, get(&format!("/api/cvs/{}", b), &token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

struct StaticSheet(String);

#[async_trait::async_trait]
impl SheetSource for StaticSheet {
    async fn fetch_csv(&self) -> AppResult<Vec<u8>> {
        Ok(self.0.clone().into_bytes())
    }
}

#[tokio::test]
async fn sheet_sync_updates_by_reference_and_inserts_the_rest() {
    let Some((app, pool, token)) = setup().await else { return };
    let marker = uuid::Uuid::new_v4().simple().to_string();
    let existing = create_cv(
        &app,
        &token,
        json!({ "full_name": "Before Sync", "reference_code": format!("REF-{}", marker), "priority": "URGENT" }),
    )
    .await;
    let existing_id = existing["id"].as_i64().unwrap();
    let (status, _) = send(
        &app,
        json_request("PATCH", &format!("/api/cvs/{}", existing_id), &token, json!({ "status": "BOOKED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let csv = format!(
        "Full Name,Reference Code,Nationality\nAfter Sync,REF-{m},Kenya\nFresh {m},NEW-{m},Uganda\n,BAD-{m},Kenya\n",
        m = marker
    );
    let source: Arc<dyn SheetSource + Send + Sync> = Arc::new(StaticSheet(csv));
    let sync = SheetSyncService::new(pool.clone(), Some(source), ActivityService::new(pool.clone()));
    let report = sync.sync(None).await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.synced, 1);
    assert_eq!(report.errors, vec!["Row 3: Full name is required".to_string()]);

    let (_, body) = send(&app, get(&format!("/api/cvs/{}", existing_id), &token)).await;
    assert_eq!(body["cv"]["full_name"], "After Sync");
    assert_eq!(body["cv"]["nationality"], "Kenya");
    assert_eq!(body["cv"]["priority"], "URGENT");
    assert_eq!(body["cv"]["status"], "BOOKED");

    let (source, priority): (Option<String>, String) = sqlx::query_as(
        "SELECT source, priority::text FROM cvs WHERE reference_code = $1",
    )
    .bind(format!("NEW-{}", marker))
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(source.as_deref(), Some("Google Sheets"));
    assert_eq!(priority, "MEDIUM");

    let state = sync.state().await.unwrap();
    assert!(state.last_synced_at.is_some());
}
