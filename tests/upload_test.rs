use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use file_relay::config::AppConfig;
use file_relay::infrastructure::database;
use file_relay::services::storage::StorageService;
use file_relay::{AppState, create_app};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "---------------------------123456789012345678901234567";

// Smallest content infer recognizes as image/png: the 8-byte signature
const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00];

async fn setup_app() -> (axum::Router, AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db = database::setup_database(&format!("sqlite://{}", db_path.display()))
        .await
        .unwrap();

    let storage = Arc::new(StorageService::new(dir.path().join("uploads")));
    storage.ensure_layout().await.unwrap();

    let config = AppConfig {
        jwt_secret: "test_secret".to_string(),
        ..AppConfig::default()
    };

    let state = AppState {
        db,
        storage,
        config,
    };
    (create_app(state.clone()), state, dir)
}

async fn register_and_login(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/signup")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"client_name": "alice", "client_secret": "secretpw1"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/login")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"client_name": "alice", "client_secret": "secretpw1"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    json["token"].as_str().unwrap().to_string()
}

fn multipart_body(filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(token: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/upload_file")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn test_upload_requires_auth() {
    let (app, _state, _dir) = setup_app().await;

    let body = multipart_body("pixel.png", "image/png", PNG_BYTES);
    let response = app.clone().oneshot(upload_request(None, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = multipart_body("pixel.png", "image/png", PNG_BYTES);
    let response = app
        .clone()
        .oneshot(upload_request(Some("not-a-real-token"), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_png() {
    let (app, state, _dir) = setup_app().await;
    let token = register_and_login(&app).await;

    let body = multipart_body("pixel.png", "image/png", PNG_BYTES);
    let response = app
        .clone()
        .oneshot(upload_request(Some(&token), body))
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    if status != StatusCode::CREATED {
        panic!(
            "Upload failed with status {}: {:?}",
            status,
            String::from_utf8_lossy(&body)
        );
    }

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["message"], "File uploaded");
    let file_id = json["file_id"].as_str().unwrap();

    // Metadata row carries the sniffed type and real size
    let (file_name, file_path, mime_type, size): (String, String, String, i64) =
        sqlx::query_as("SELECT file_name, file_path, mime_type, size FROM files WHERE id = ?")
            .bind(file_id)
            .fetch_one(&state.db)
            .await
            .unwrap();

    assert_eq!(file_name, "pixel.png");
    assert_eq!(mime_type, "image/png");
    assert_eq!(size, PNG_BYTES.len() as i64);
    assert!(file_path.starts_with("files/"));
    assert!(file_path.ends_with(".png"));

    // Blob landed under the storage root
    assert!(state.storage.exists(&file_path).await);
}

#[tokio::test]
async fn test_upload_rejects_disallowed_types() {
    let (app, _state, _dir) = setup_app().await;
    let token = register_and_login(&app).await;

    // Plain text has no recognizable signature
    let body = multipart_body("notes.txt", "text/plain", b"just some text");
    let response = app
        .clone()
        .oneshot(upload_request(Some(&token), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // ZIP is recognized but not on the allowlist, even when the client
    // claims an allowed content type
    let zip_bytes = [0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x00, 0x00];
    let body = multipart_body("archive.png", "image/png", &zip_bytes);
    let response = app
        .clone()
        .oneshot(upload_request(Some(&token), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let (app, _state, _dir) = setup_app().await;
    let token = register_and_login(&app).await;

    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"comment\"\r\n\r\n\
             no file here\r\n\
             --{BOUNDARY}--\r\n"
        )
        .as_bytes(),
    );

    let response = app
        .clone()
        .oneshot(upload_request(Some(&token), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_size_cap() {
    let (app, state, _dir) = {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = database::setup_database(&format!("sqlite://{}", db_path.display()))
            .await
            .unwrap();

        let storage = Arc::new(StorageService::new(dir.path().join("uploads")));
        storage.ensure_layout().await.unwrap();

        // Tiny cap so the test does not need a 100 MB body
        let config = AppConfig {
            jwt_secret: "test_secret".to_string(),
            max_file_size: 16,
            ..AppConfig::default()
        };

        let state = AppState {
            db,
            storage,
            config,
        };
        (create_app(state.clone()), state, dir)
    };
    let token = register_and_login(&app).await;

    let mut oversized = PNG_BYTES.to_vec();
    oversized.extend_from_slice(&[0u8; 32]);

    let body = multipart_body("big.png", "image/png", &oversized);
    let response = app
        .clone()
        .oneshot(upload_request(Some(&token), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The partial blob was cleaned up
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(count, 0);
}
