use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use http_body_util::BodyExt;
use tower::ServiceExt;

use facegate::clients::dynamodb::RecordStore;
use facegate::clients::memory::{MemoryMatcher, MemoryObjectStore, MemoryRecordStore};
use facegate::clients::rekognition::{FaceMatch, FaceMatcher, IndexedFace, MatcherError};
use facegate::config::{BackendKind, Config};
use facegate::models::LoginAction;
use facegate::state::{AppState, Backends};

const ADMIN_FACE: &[u8] = b"admin face pixel data";
const ALICE_FACE: &[u8] = b"alice face pixel data";
const UNKNOWN_FACE: &[u8] = b"never enrolled pixels";

struct TestApp {
    app: Router,
    records: Arc<MemoryRecordStore>,
    objects: Arc<MemoryObjectStore>,
    _upload_dir: tempfile::TempDir,
    upload_path: std::path::PathBuf,
}

fn test_config(upload_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.backend = BackendKind::Memory;
    config.server.secure_cookies = false;
    config.observability.metrics_enabled = false;
    config.general.upload_temp_dir = upload_dir.to_string_lossy().into_owned();
    config
}

fn spawn_app() -> TestApp {
    spawn_app_with_matcher(Arc::new(MemoryMatcher::new()))
}

fn spawn_app_with_matcher(matcher: Arc<dyn FaceMatcher>) -> TestApp {
    let upload_dir = tempfile::tempdir().expect("temp dir");
    let upload_path = upload_dir.path().to_path_buf();

    let records = Arc::new(MemoryRecordStore::new());
    let objects = Arc::new(MemoryObjectStore::new());
    let backends = Backends {
        matcher,
        objects: objects.clone(),
        records: records.clone(),
    };

    let state = AppState::with_backends(test_config(&upload_path), backends, None);

    TestApp {
        app: facegate::api::router(state),
        records,
        objects,
        _upload_dir: upload_dir,
        upload_path,
    }
}

fn image_payload(bytes: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64.encode(bytes))
}

async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    cookie: Option<&str>,
) -> (StatusCode, serde_json::Value, Option<String>) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

    (status, json, set_cookie)
}

async fn get_json(
    app: &Router,
    uri: &str,
    cookie: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

    (status, json)
}

/// Bootstraps an admin and returns an admin session cookie.
async fn admin_session(test: &TestApp) -> String {
    let (_, body, _) = post_json(
        &test.app,
        "/api/create-first-admin",
        serde_json::json!({ "image": image_payload(ADMIN_FACE), "name": "Root" }),
        None,
    )
    .await;
    assert_eq!(body["success"], true, "bootstrap failed: {body}");

    let (_, body, cookie) = post_json(
        &test.app,
        "/api/admin-login",
        serde_json::json!({ "image": image_payload(ADMIN_FACE) }),
        None,
    )
    .await;
    assert_eq!(body["success"], true, "admin login failed: {body}");
    assert_eq!(body["message"], "Admin authenticated");

    cookie.expect("admin session cookie")
}

#[tokio::test]
async fn create_first_admin_succeeds_exactly_once() {
    let test = spawn_app();

    let (status, body, _) = post_json(
        &test.app,
        "/api/create-first-admin",
        serde_json::json!({ "image": image_payload(ADMIN_FACE), "name": "Root" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "First admin Root created successfully");

    // A second bootstrap fails no matter what image is submitted.
    let (_, body, _) = post_json(
        &test.app,
        "/api/create-first-admin",
        serde_json::json!({ "image": image_payload(UNKNOWN_FACE), "name": "Other" }),
        None,
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Admin already exists");

    // Exactly one record and one stored enrollment photo.
    assert_eq!(test.records.scan_users().await.unwrap().len(), 1);
    assert_eq!(test.objects.len().await, 1);
}

#[tokio::test]
async fn add_user_without_admin_session_is_rejected() {
    let test = spawn_app();

    let (status, body, _) = post_json(
        &test.app,
        "/api/add-user",
        serde_json::json!({ "image": image_payload(ALICE_FACE), "name": "Alice" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Admin access required");

    // Image validity is irrelevant to the gate.
    let (_, body, _) = post_json(
        &test.app,
        "/api/add-user",
        serde_json::json!({ "image": "!!!not base64!!!", "name": "Alice" }),
        None,
    )
    .await;
    assert_eq!(body["message"], "Admin access required");
}

#[tokio::test]
async fn admin_enrolls_user_and_lists_everyone() {
    let test = spawn_app();
    let cookie = admin_session(&test).await;

    let (_, body, _) = post_json(
        &test.app,
        "/api/add-user",
        serde_json::json!({ "image": image_payload(ALICE_FACE), "name": "Alice" }),
        Some(&cookie),
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User Alice added successfully");

    let (_, body) = get_json(&test.app, "/api/users", Some(&cookie)).await;
    assert_eq!(body["success"], true);
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);

    let alice = users.iter().find(|u| u["name"] == "Alice").unwrap();
    assert_eq!(alice["is_admin"], false);
    assert_eq!(alice["account_number"].as_str().unwrap().len(), 8);

    let root = users.iter().find(|u| u["name"] == "Root").unwrap();
    assert_eq!(root["is_admin"], true);
    assert_eq!(root["account_number"], "N/A");
}

#[tokio::test]
async fn users_listing_requires_admin() {
    let test = spawn_app();
    let (_, body) = get_json(&test.app, "/api/users", None).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Admin access required");
}

#[tokio::test]
async fn enrolling_the_same_face_twice_is_a_duplicate() {
    let test = spawn_app();
    let cookie = admin_session(&test).await;

    let (_, body, _) = post_json(
        &test.app,
        "/api/add-user",
        serde_json::json!({ "image": image_payload(ALICE_FACE), "name": "Alice" }),
        Some(&cookie),
    )
    .await;
    assert_eq!(body["success"], true);

    let (_, body, _) = post_json(
        &test.app,
        "/api/add-user",
        serde_json::json!({ "image": image_payload(ALICE_FACE), "name": "Alice Again" }),
        Some(&cookie),
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn successful_login_sets_session_and_writes_one_audit_record() {
    let test = spawn_app();
    let cookie = admin_session(&test).await;

    post_json(
        &test.app,
        "/api/add-user",
        serde_json::json!({ "image": image_payload(ALICE_FACE), "name": "Alice" }),
        Some(&cookie),
    )
    .await;

    let (status, body, session) = post_json(
        &test.app,
        "/api/login",
        serde_json::json!({ "image": image_payload(ALICE_FACE) }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Welcome Alice!");
    assert_eq!(body["redirect"], "/dashboard");
    assert!(body["confidence"].as_f64().unwrap() >= 85.0);

    let logs = test.records.login_logs().await;
    let successes: Vec<_> = logs
        .iter()
        .filter(|log| log.action == LoginAction::LoginSuccess)
        .collect();
    assert_eq!(successes.len(), 1);
    assert!(successes[0].user_id.is_some());
    assert_eq!(successes[0].user_name.as_deref(), Some("Alice"));
    assert!(successes[0].confidence.is_some());

    // The session reflects the stored record.
    let session = session.expect("user session cookie");
    let (_, body) = get_json(&test.app, "/api/account-info", Some(&session)).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["balance"], "10000.00");
    assert_eq!(body["account_number"].as_str().unwrap().len(), 8);
}

#[tokio::test]
async fn failed_login_writes_one_anonymous_audit_record() {
    let test = spawn_app();
    let cookie = admin_session(&test).await;
    post_json(
        &test.app,
        "/api/add-user",
        serde_json::json!({ "image": image_payload(ALICE_FACE), "name": "Alice" }),
        Some(&cookie),
    )
    .await;

    let (_, body, _) = post_json(
        &test.app,
        "/api/login",
        serde_json::json!({ "image": image_payload(UNKNOWN_FACE) }),
        None,
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Face not recognized");
    assert!(body.get("redirect").is_none());

    let logs = test.records.login_logs().await;
    let failures: Vec<_> = logs
        .iter()
        .filter(|log| log.action == LoginAction::LoginFailed)
        .collect();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].user_id.is_none());
    assert_eq!(failures[0].reason.as_deref(), Some("Face not recognized"));
}

#[tokio::test]
async fn account_info_without_session_is_not_logged_in() {
    let test = spawn_app();
    let (status, body) = get_json(&test.app, "/api/account-info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not logged in");
}

#[tokio::test]
async fn logout_clears_the_session() {
    let test = spawn_app();
    let cookie = admin_session(&test).await;
    post_json(
        &test.app,
        "/api/add-user",
        serde_json::json!({ "image": image_payload(ALICE_FACE), "name": "Alice" }),
        Some(&cookie),
    )
    .await;

    let (_, _, session) = post_json(
        &test.app,
        "/api/login",
        serde_json::json!({ "image": image_payload(ALICE_FACE) }),
        None,
    )
    .await;
    let session = session.unwrap();

    let (_, body, _) = post_json(&test.app, "/api/logout", serde_json::json!({}), Some(&session)).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Logged out successfully");

    let (_, body) = get_json(&test.app, "/api/account-info", Some(&session)).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not logged in");
}

#[tokio::test]
async fn malformed_image_payload_is_an_invalid_image() {
    let test = spawn_app();

    let (status, body, _) = post_json(
        &test.app,
        "/api/login",
        serde_json::json!({ "image": "!!!not base64!!!" }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid image")
    );

    let (_, body, _) = post_json(&test.app, "/api/login", serde_json::json!({}), None).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn multipart_upload_logs_in_and_spools_the_file() {
    let test = spawn_app();
    let cookie = admin_session(&test).await;
    post_json(
        &test.app,
        "/api/add-user",
        serde_json::json!({ "image": image_payload(ALICE_FACE), "name": "Alice" }),
        Some(&cookie),
    )
    .await;

    let boundary = "facegate-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"image\"; filename=\"alice.jpg\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    body.extend_from_slice(ALICE_FACE);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let response = test
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/login")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["success"], true, "multipart login failed: {json}");
    assert_eq!(json["redirect"], "/dashboard");

    // The upload was spooled to the temp directory.
    let spooled: Vec<_> = std::fs::read_dir(&test.upload_path).unwrap().collect();
    assert_eq!(spooled.len(), 1);
}

#[tokio::test]
async fn multipart_upload_with_bad_extension_is_rejected() {
    let test = spawn_app();

    let boundary = "facegate-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"image\"; filename=\"alice.gif\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: image/gif\r\n\r\n");
    body.extend_from_slice(ALICE_FACE);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let response = test
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/login")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().contains("extension"));
}

#[tokio::test]
async fn cleanup_endpoint_reports_stats() {
    let test = spawn_app();

    let (status, body, _) =
        post_json(&test.app, "/api/cleanup-temp", serde_json::json!({}), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["message"].as_str().unwrap().starts_with("Removed"));
}

/// Matcher whose search always fails; enrollment indexing still works.
struct BrokenSearchMatcher {
    inner: MemoryMatcher,
}

#[async_trait::async_trait]
impl FaceMatcher for BrokenSearchMatcher {
    async fn search_by_image(
        &self,
        _image: &[u8],
        _max_candidates: i32,
        _min_similarity: f32,
    ) -> Result<Vec<FaceMatch>, MatcherError> {
        Err(MatcherError::Request("matcher unavailable".to_string()))
    }

    async fn index_face(
        &self,
        image: &[u8],
        external_id: &str,
    ) -> Result<Option<IndexedFace>, MatcherError> {
        self.inner.index_face(image, external_id).await
    }
}

#[tokio::test]
async fn matcher_outage_is_surfaced_on_admin_login_but_not_user_login() {
    let test = spawn_app_with_matcher(Arc::new(BrokenSearchMatcher {
        inner: MemoryMatcher::new(),
    }));

    // Admin login reports the backend error text.
    let (status, body, _) = post_json(
        &test.app,
        "/api/admin-login",
        serde_json::json!({ "image": image_payload(ADMIN_FACE) }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("matcher unavailable"));

    // Ordinary login fails closed with the generic message and an audit entry.
    let (_, body, _) = post_json(
        &test.app,
        "/api/login",
        serde_json::json!({ "image": image_payload(ALICE_FACE) }),
        None,
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Face not recognized");
    assert!(body.get("error").is_none());

    let logs = test.records.login_logs().await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, LoginAction::LoginFailed);
}

/// Matcher whose search fails for every face except the admin's, so the
/// admin can still log in while the duplicate check errors out.
struct FlakyDuplicateCheckMatcher {
    inner: MemoryMatcher,
}

#[async_trait::async_trait]
impl FaceMatcher for FlakyDuplicateCheckMatcher {
    async fn search_by_image(
        &self,
        image: &[u8],
        max_candidates: i32,
        min_similarity: f32,
    ) -> Result<Vec<FaceMatch>, MatcherError> {
        if image == ADMIN_FACE {
            self.inner
                .search_by_image(image, max_candidates, min_similarity)
                .await
        } else {
            Err(MatcherError::Request("matcher unavailable".to_string()))
        }
    }

    async fn index_face(
        &self,
        image: &[u8],
        external_id: &str,
    ) -> Result<Option<IndexedFace>, MatcherError> {
        self.inner.index_face(image, external_id).await
    }
}

#[tokio::test]
async fn matcher_outage_during_duplicate_check_still_enrolls() {
    let test = spawn_app_with_matcher(Arc::new(FlakyDuplicateCheckMatcher {
        inner: MemoryMatcher::new(),
    }));
    let cookie = admin_session(&test).await;

    // The duplicate check against ALICE_FACE errors; enrollment proceeds.
    let (_, body, _) = post_json(
        &test.app,
        "/api/add-user",
        serde_json::json!({ "image": image_payload(ALICE_FACE), "name": "Alice" }),
        Some(&cookie),
    )
    .await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User Alice added successfully");
    assert_eq!(test.records.scan_users().await.unwrap().len(), 2);
}

#[tokio::test]
async fn html_pages_branch_on_session() {
    let test = spawn_app();

    let (status, _) = get_json(&test.app, "/", None).await;
    assert_eq!(status, StatusCode::OK);

    // Dashboard without a session falls back to the login page.
    let response = test
        .app
        .clone()
        .oneshot(Request::builder().uri("/dashboard").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8_lossy(&html);
    assert!(html.contains("Login"));
    assert!(!html.contains("{{user_name}}"));
}
