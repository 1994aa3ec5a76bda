use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use sqlgate_auth::{Mode, FAILURE_PENALTY};
use sqlgate_core::{GatewayError, Request, TopLevelError};
use sqlgate_engine::DbRegistry;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::pipeline::{self, FatalError};

pub struct AppState {
    pub registry: Arc<DbRegistry>,
}

pub fn build_router(state: Arc<AppState>, serve_dir: Option<String>) -> Router {
    let api = Router::new()
        .route("/:db_id", post(handle_request).options(handle_options))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    match serve_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    }
}

async fn handle_options(
    Path(db_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(database) = state.registry.get(&db_id) else {
        return error_response(GatewayError::NotFound(db_id));
    };

    let mut headers = HeaderMap::new();
    if let Some(origin) = &database.cors_origin {
        if let Ok(value) = HeaderValue::from_str(origin) {
            headers.insert("access-control-allow-origin", value);
        }
        headers.insert(
            "access-control-allow-methods",
            HeaderValue::from_static("POST, OPTIONS"),
        );
        headers.insert(
            "access-control-allow-headers",
            HeaderValue::from_static("content-type, authorization"),
        );
    }

    (StatusCode::NO_CONTENT, headers).into_response()
}

async fn handle_request(
    Path(db_id): Path<String>,
    State(state): State<Arc<AppState>>,
    basic_auth: Option<TypedHeader<Authorization<Basic>>>,
    body: axum::body::Bytes,
) -> Response {
    let Some(database) = state.registry.get(&db_id) else {
        return error_response(GatewayError::NotFound(db_id));
    };

    let request: Request = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return error_response(GatewayError::validation(format!(
                "malformed request body: {e}"
            )))
        }
    };

    let conn = database.conn.lock().await;

    if let Some(authr) = &database.auth {
        let (user, password) = match authr.mode {
            Mode::Inline => match &request.credentials {
                Some(c) => (c.user.clone(), c.password.clone()),
                None => {
                    drop(conn);
                    return error_response(GatewayError::Authentication {
                        custom_code: Some(authr.error_code()),
                    });
                }
            },
            Mode::Http => match basic_auth {
                Some(TypedHeader(Authorization(basic))) => {
                    (basic.username().to_string(), basic.password().to_string())
                }
                None => {
                    drop(conn);
                    let mut headers = HeaderMap::new();
                    headers.insert(
                        "www-authenticate",
                        HeaderValue::from_static("Basic realm=\"sqlgate\""),
                    );
                    return (
                        StatusCode::from_u16(authr.error_code()).unwrap_or(StatusCode::UNAUTHORIZED),
                        headers,
                        Json(TopLevelError {
                            req_idx: None,
                            error: "authentication failed".into(),
                        }),
                    )
                        .into_response();
                }
            },
        };

        match pipeline::verify_credentials(database, &conn, &user, &password) {
            Ok(true) => {}
            Ok(false) => {
                tokio::time::sleep(FAILURE_PENALTY).await;
                drop(conn);
                return error_response(GatewayError::Authentication {
                    custom_code: Some(authr.error_code()),
                });
            }
            Err(e) => {
                drop(conn);
                return error_response(e);
            }
        }
    }

    let result = pipeline::run_transaction(database, &conn, request);
    drop(conn);

    let mut response = match result {
        Ok(resp) => Json(resp).into_response(),
        Err(fatal) => fatal_response(fatal),
    };

    apply_cors(&mut response, database.cors_origin.as_deref());
    response
}

fn fatal_response(fatal: FatalError) -> Response {
    let status = fatal.inner.http_status();
    let body = TopLevelError {
        req_idx: fatal.item_idx,
        error: fatal.inner.to_string(),
    };
    (status_from_u16(status), Json(body)).into_response()
}

fn error_response(err: GatewayError) -> Response {
    let status = err.http_status();
    let body = TopLevelError {
        req_idx: None,
        error: err.to_string(),
    };
    (status_from_u16(status), Json(body)).into_response()
}

fn status_from_u16(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn apply_cors(response: &mut Response, origin: Option<&str>) {
    if let Some(origin) = origin {
        if let Ok(value) = HeaderValue::from_str(origin) {
            response
                .headers_mut()
                .insert("access-control-allow-origin", value);
        }
    }
}
