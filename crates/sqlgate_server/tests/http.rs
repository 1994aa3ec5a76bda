use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request as HttpRequest, StatusCode};
use base64::Engine;
use http_body_util::BodyExt;
use sqlgate_auth::Authr;
use sqlgate_core::{AuthSection, EngineKind};
use sqlgate_engine::{engine_for, Database, DbRegistry, GatewayConnection};
use sqlgate_server::http::{build_router, AppState};
use tokio::sync::Mutex;
use tower::ServiceExt;

fn memory_database(id: &str, auth: Option<Authr>) -> Database {
    let conn = GatewayConnection::open_sqlite(":memory:").unwrap();
    conn.execute_raw("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")
        .unwrap();
    conn.execute_raw("INSERT INTO t (id, name) VALUES (1, 'alice')")
        .unwrap();

    Database {
        id: id.to_string(),
        engine: engine_for(EngineKind::Sqlite),
        conn: Mutex::new(conn),
        read_only: false,
        use_only_stored_statements: false,
        cors_origin: Some("https://example.test".to_string()),
        stored_statements: HashMap::new(),
        auth,
    }
}

fn router_with(id: &str, auth: Option<Authr>) -> axum::Router {
    let mut databases = HashMap::new();
    databases.insert(id.to_string(), Arc::new(memory_database(id, auth)));
    let registry = Arc::new(DbRegistry {
        databases,
        pending_tasks: Vec::new(),
    });
    build_router(Arc::new(AppState { registry }), None)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn unknown_database_returns_404() {
    let router = router_with("main", None);

    let response = router
        .oneshot(
            HttpRequest::builder()
                .method("POST")
                .uri("/missing")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"transaction":[{"query":"SELECT 1"}]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn successful_query_returns_rows_and_cors_header() {
    let router = router_with("main", None);

    let response = router
        .oneshot(
            HttpRequest::builder()
                .method("POST")
                .uri("/main")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"transaction":[{"query":"SELECT * FROM t"}]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "https://example.test"
    );
    let body = body_json(response).await;
    assert_eq!(body["results"][0]["resultSet"][0]["name"], "alice");
}

#[tokio::test]
async fn malformed_body_is_a_validation_error() {
    let router = router_with("main", None);

    let response = router
        .oneshot(
            HttpRequest::builder()
                .method("POST")
                .uri("/main")
                .header("content-type", "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn options_preflight_reports_cors_headers_without_touching_db() {
    let router = router_with("main", None);

    let response = router
        .oneshot(
            HttpRequest::builder()
                .method("OPTIONS")
                .uri("/main")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "https://example.test"
    );
}

#[tokio::test]
async fn http_mode_auth_rejects_missing_basic_header() {
    let auth = Authr::from_config(&AuthSection {
        mode: Some("HTTP".to_string()),
        custom_error_code: None,
        by_query: None,
        by_credentials: Some(vec![sqlgate_core::ByCredentialsEntry {
            user: "bob".to_string(),
            password: Some("secret".to_string()),
            hashed_password: None,
        }]),
    })
    .unwrap();

    let router = router_with("main", Some(auth));

    let response = router
        .oneshot(
            HttpRequest::builder()
                .method("POST")
                .uri("/main")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"transaction":[{"query":"SELECT * FROM t"}]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get("www-authenticate").is_some());
}

#[tokio::test]
async fn http_mode_auth_accepts_valid_basic_header() {
    let auth = Authr::from_config(&AuthSection {
        mode: Some("HTTP".to_string()),
        custom_error_code: None,
        by_query: None,
        by_credentials: Some(vec![sqlgate_core::ByCredentialsEntry {
            user: "bob".to_string(),
            password: Some("secret".to_string()),
            hashed_password: None,
        }]),
    })
    .unwrap();

    let router = router_with("main", Some(auth));
    let credentials = base64::engine::general_purpose::STANDARD.encode("bob:secret");

    let response = router
        .oneshot(
            HttpRequest::builder()
                .method("POST")
                .uri("/main")
                .header("content-type", "application/json")
                .header("authorization", format!("Basic {credentials}"))
                .body(Body::from(r#"{"transaction":[{"query":"SELECT * FROM t"}]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn inline_auth_failure_is_reported_without_basic_header() {
    let auth = Authr::from_config(&AuthSection {
        mode: Some("INLINE".to_string()),
        custom_error_code: None,
        by_query: None,
        by_credentials: Some(vec![sqlgate_core::ByCredentialsEntry {
            user: "bob".to_string(),
            password: Some("secret".to_string()),
            hashed_password: None,
        }]),
    })
    .unwrap();

    let router = router_with("main", Some(auth));

    let response = router
        .oneshot(
            HttpRequest::builder()
                .method("POST")
                .uri("/main")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"credentials":{"user":"bob","password":"wrong"},"transaction":[{"query":"SELECT * FROM t"}]}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
