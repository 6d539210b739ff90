// SPDX-FileCopyrightText: 2025 Caution SEZC
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Commercial

use axum::{
    http::{header, HeaderValue, Method},
    routing::{any, get},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{auth, handlers, logs};
use crate::types::AppState;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", any(auth::login_handler))
        .route("/auth/logout", any(auth::logout_handler))
        .route("/auth/me", any(handlers::me_handler))
        .route("/auth/register", any(handlers::register_handler))
        .route("/auth/users", any(handlers::users_handler))
        .route("/auth/users/{id}/approve", any(handlers::approve_user_handler))
        .route("/auth/users/{id}/block", any(handlers::block_user_handler))
        .route("/frases", any(handlers::frases_handler))
        .route("/frases/{index}", any(handlers::frase_handler))
        .route("/media", any(handlers::media_handler))
        .route("/media/{type}/{filename}", any(handlers::media_item_handler))
        .route("/events", any(handlers::events_handler))
        .route("/events/{id}", any(handlers::event_handler))
        .route("/triggers", any(handlers::triggers_handler))
        .route("/triggers/{id}", any(handlers::trigger_handler))
        .route("/logs", any(handlers::logs_handler))
        .route("/logs/ingest", any(logs::ingest_handler))
        .route("/persona", any(handlers::persona_handler))
        .route("/schedules", any(handlers::schedules_handler))
        .route("/schedules/resync", any(handlers::resync_schedules_handler))
        .route("/schedules/{id}", any(handlers::schedule_handler))
        .route("/context/refresh", any(handlers::refresh_context_handler))
        .route("/context/{group_id}", any(handlers::group_context_handler))
        .route("/confessions", any(handlers::confessions_handler))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(
            origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health_handler))
        .nest("/api", api_routes())
        .with_state(state.clone());

    if let Some(dir) = state.config.frontend_dir.as_deref() {
        tracing::info!("Serving frontend from {}", dir);
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    if !state.config.cors_origins.is_empty() {
        app = app.layer(cors_layer(&state.config.cors_origins));
    }

    app.layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_support::{echo_upstream, read_json, read_text, spawn_upstream, state_for, unreachable_url};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::IntoResponse,
        routing::{get, post},
        Json,
    };
    use serde_json::json;
    use tower::ServiceExt;

    async fn call(app: &Router, req: Request<Body>) -> axum::response::Response {
        app.clone().oneshot(req).await.unwrap()
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_post_only_route_rejects_get() {
        let app = router(state_for(&unreachable_url().await));

        let response = call(&app, request(Method::GET, "/api/auth/login")).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "POST");
        assert_eq!(read_text(response).await, "Method Not Allowed");
    }

    #[tokio::test]
    async fn test_multi_method_route_lists_allowed() {
        let app = router(state_for(&unreachable_url().await));

        let response = call(&app, request(Method::PATCH, "/api/triggers/7")).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "PUT, DELETE");
    }

    #[tokio::test]
    async fn test_resource_routes_reach_upstream_paths() {
        let app = router(state_for(&spawn_upstream(echo_upstream()).await));

        let cases = [
            (Method::GET, "/api/frases", "/frases"),
            (Method::DELETE, "/api/frases/3", "/frases/3"),
            (Method::DELETE, "/api/media/video/clip%20one.mp4", "/media/video/clip%20one.mp4"),
            (Method::POST, "/api/events", "/events"),
            (Method::DELETE, "/api/events/ev1", "/events/ev1"),
            (Method::PUT, "/api/triggers/9", "/triggers/9"),
            (Method::PUT, "/api/persona", "/persona"),
            (Method::GET, "/api/schedules", "/schedules"),
            (Method::DELETE, "/api/schedules/s1", "/schedules/s1"),
            (Method::POST, "/api/schedules/resync", "/schedules/resync"),
            (Method::GET, "/api/context/12036@g.us", "/context/12036%40g.us"),
            (Method::POST, "/api/context/refresh", "/context/refresh"),
            (Method::POST, "/api/auth/users/5/approve", "/auth/users/5/approve"),
            (Method::POST, "/api/auth/users/5/block", "/auth/users/5/block"),
            (Method::POST, "/api/confessions", "/confessions"),
        ];

        for (method, inbound, upstream_path) in cases {
            let response = call(&app, request(method.clone(), inbound)).await;
            assert_eq!(response.status(), StatusCode::OK, "{} {}", method, inbound);
            let echoed = read_json(response).await;
            assert_eq!(echoed["method"], method.as_str());
            assert_eq!(echoed["path"], upstream_path, "{} {}", method, inbound);
        }
    }

    #[tokio::test]
    async fn test_query_forwarded_for_logs_and_users() {
        let app = router(state_for(&spawn_upstream(echo_upstream()).await));

        let echoed = read_json(call(&app, request(Method::GET, "/api/logs?limit=10&source=bot")).await).await;
        assert_eq!(echoed["path"], "/logs");
        assert_eq!(echoed["query"], "limit=10&source=bot");

        let echoed = read_json(call(&app, request(Method::GET, "/api/auth/users?status=pending")).await).await;
        assert_eq!(echoed["path"], "/auth/users");
        assert_eq!(echoed["query"], "status=pending");
    }

    #[tokio::test]
    async fn test_json_body_forwarded_with_cookie_credential() {
        let app = router(state_for(&spawn_upstream(echo_upstream()).await));

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/triggers")
            .header(header::COOKIE, "auth_token=T")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"keyword":"oi"}"#))
            .unwrap();
        let echoed = read_json(call(&app, req).await).await;

        assert_eq!(echoed["authorization"], "Bearer T");
        assert_eq!(echoed["body"], r#"{"keyword":"oi"}"#);
    }

    #[tokio::test]
    async fn test_upstream_errors_are_relayed_verbatim() {
        let upstream = Router::new().route(
            "/triggers",
            get(|| async {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Token inválido" })))
            }),
        );
        let app = router(state_for(&spawn_upstream(upstream).await));

        let response = call(&app, request(Method::GET, "/api/triggers")).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(read_text(response).await, r#"{"error":"Token inválido"}"#);
    }

    #[tokio::test]
    async fn test_transport_failure_is_bad_gateway() {
        let app = router(state_for(&unreachable_url().await));

        let response = call(&app, request(Method::GET, "/api/frases")).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(read_json(response).await["error"], "Upstream service unavailable");
    }

    #[tokio::test]
    async fn test_media_upload_is_streamed_through() {
        let app = router(state_for(&spawn_upstream(echo_upstream()).await));

        let boundary = "XyZ";
        let multipart = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"type\"\r\n\r\nimage\r\n--{b}--\r\n",
            b = boundary
        );
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/media")
            .header(header::COOKIE, "auth_token=T")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
            .header(header::CONTENT_LENGTH, multipart.len())
            .body(Body::from(multipart.clone()))
            .unwrap();
        let response = call(&app, req).await;

        assert_eq!(response.status(), StatusCode::OK);
        let echoed = read_json(response).await;
        assert_eq!(echoed["method"], "POST");
        assert_eq!(echoed["path"], "/media");
        assert_eq!(echoed["authorization"], "Bearer T");
        assert_eq!(echoed["content_type"], "multipart/form-data; boundary=XyZ");
        assert_eq!(echoed["body"], multipart);
    }

    #[tokio::test]
    async fn test_login_sets_cookie_and_me_uses_it() {
        let upstream = Router::new()
            .route(
                "/auth/login",
                post(|Json(body): Json<serde_json::Value>| async move {
                    if body["email"] == "a@b.com" && body["password"] == "x" {
                        Json(json!({ "token": "T", "user": { "id": 1, "email": "a@b.com" } })).into_response()
                    } else {
                        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Credenciais inválidas" }))).into_response()
                    }
                }),
            )
            .route(
                "/auth/me",
                get(|req: Request<Body>| async move {
                    let authorized = req
                        .headers()
                        .get(header::AUTHORIZATION)
                        .map(|v| v == "Bearer T")
                        .unwrap_or(false);
                    if authorized {
                        Json(json!({ "user": { "id": 1, "email": "a@b.com" } })).into_response()
                    } else {
                        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response()
                    }
                }),
            );
        let app = router(state_for(&spawn_upstream(upstream).await));

        let login = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"a@b.com","password":"x"}"#))
            .unwrap();
        let response = call(&app, login).await;
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        let cookie_pair = set_cookie.split(';').next().unwrap().to_string();
        assert_eq!(cookie_pair, "auth_token=T");

        let body = read_json(response).await;
        assert_eq!(body["token"], "T");

        let me = Request::builder()
            .method(Method::GET)
            .uri("/api/auth/me")
            .header(header::COOKIE, cookie_pair)
            .body(Body::empty())
            .unwrap();
        let response = call(&app, me).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["user"], body["user"]);

        let anonymous = call(&app, request(Method::GET, "/api/auth/me")).await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_failed_login_relays_upstream_status_without_cookie() {
        let upstream = Router::new().route(
            "/auth/login",
            post(|| async { (StatusCode::FORBIDDEN, Json(json!({ "error": "Usuário bloqueado" }))) }),
        );
        let app = router(state_for(&spawn_upstream(upstream).await));

        let response = call(&app, request(Method::POST, "/api/auth/login")).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(read_json(response).await["error"], "Usuário bloqueado");
    }

    #[tokio::test]
    async fn test_logout_clears_cookie_when_upstream_is_down() {
        let app = router(state_for(&unreachable_url().await));

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/logout")
            .header(header::COOKIE, "auth_token=T")
            .body(Body::empty())
            .unwrap();
        let response = call(&app, req).await;

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.starts_with("auth_token=;"));
        assert!(set_cookie.contains("Max-Age=0"));
        assert_eq!(read_json(response).await["success"], true);
    }

    #[tokio::test]
    async fn test_ingest_fails_closed_without_token() {
        let app = router(state_for(&spawn_upstream(echo_upstream()).await));

        let response = call(&app, request(Method::POST, "/api/logs/ingest")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(response).await["error"], "LOG_INGEST_TOKEN is not configured");
    }

    #[tokio::test]
    async fn test_ingest_attaches_secret_header() {
        let config = Config {
            upstream_url: spawn_upstream(echo_upstream()).await,
            log_ingest_token: Some("s3cret".to_string()),
            ..Config::default()
        };
        let app = router(AppState::new(config).unwrap());

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/logs/ingest")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"source":"frontend","level":"info","message":"hi"}"#))
            .unwrap();
        let echoed = read_json(call(&app, req).await).await;

        assert_eq!(echoed["path"], "/logs/ingest");
        assert_eq!(echoed["log_token"], "s3cret");
        assert_eq!(echoed["authorization"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_ingest_wraps_text_reply_as_json_string() {
        let upstream = Router::new().route(
            "/logs/ingest",
            post(|| async { (StatusCode::ACCEPTED, "queued") }),
        );
        let config = Config {
            upstream_url: spawn_upstream(upstream).await,
            log_ingest_token: Some("s3cret".to_string()),
            ..Config::default()
        };
        let app = router(AppState::new(config).unwrap());

        let response = call(&app, request(Method::POST, "/api/logs/ingest")).await;

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(read_text(response).await, r#""queued""#);
    }

    #[tokio::test]
    async fn test_oversized_body_is_payload_too_large() {
        let app = router(state_for(&unreachable_url().await));
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/frases")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(vec![b'a'; Config::default().max_json_body_bytes + 10]))
            .unwrap();

        let response = call(&app, req).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(read_json(response).await["error"], "Request body too large");
    }

    #[tokio::test]
    async fn test_broken_body_stream_is_bad_request() {
        let app = router(state_for(&unreachable_url().await));
        let chunks: Vec<Result<&'static str, std::io::Error>> =
            vec![Ok("{\"frase\":"), Err(std::io::Error::other("connection reset"))];
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/frases")
            .body(Body::from_stream(futures::stream::iter(chunks)))
            .unwrap();

        let response = call(&app, req).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["error"], "Failed to read request body");
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(state_for(&unreachable_url().await));
        let response = call(&app, request(Method::GET, "/health")).await;
        assert_eq!(read_json(response).await["status"], "ok");
    }
}
