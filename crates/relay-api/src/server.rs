//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. CORS handling
//! 3. Request/response logging
//! 4. Timeout enforcement
//! 5. Panic recovery
//! 6. Authentication (everything except `/health`)
//! 7. Handler execution
//!
//! # Graceful Shutdown
//!
//! On SIGTERM or CTRL+C the server stops accepting connections and finishes
//! in-flight requests. Background deliveries are then given the configured
//! grace period to complete; they are never cancelled.

use std::{any::Any, net::SocketAddr, time::Duration};

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use relay_delivery::{AlertClient, ErrorContext};
use tokio_util::task::TaskTracker;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::ApiError, handlers, middleware::auth::auth_middleware, AppState, OPERATION_ID_HEADER,
};

tokio::task_local! {
    static REQUEST_CONTEXT: RequestContext;
}

/// Request details visible to the panic handler.
#[derive(Debug, Clone)]
struct RequestContext {
    endpoint: String,
    operation_id: String,
}

/// Creates the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use relay_api::{create_router, AppState, Config};
///
/// # fn build(config: Config) -> anyhow::Result<()> {
/// let app = create_router(AppState::new(config)?);
/// // Serve the app...
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    with_middleware(routes(), state)
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::service_info))
        .route("/health", get(handlers::health_check))
        .route("/operations/process", post(handlers::process_operation))
        .route("/example/process-text", post(handlers::process_text))
}

fn with_middleware(routes: Router<AppState>, state: AppState) -> Router {
    let panic_handler = {
        let alerts = state.alerts.clone();
        let tasks = state.tasks.clone();
        let debug = state.config.debug;
        move |err: Box<dyn Any + Send + 'static>| handle_panic(&alerts, &tasks, debug, err)
    };

    routes
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(CatchPanicLayer::custom(panic_handler))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Middleware to inject request ID into all responses.
///
/// Adds X-Request-Id header for tracing requests across services, and scopes
/// the request path and operation id for the panic handler.
async fn inject_request_id(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(request_id.clone());

    let context = RequestContext {
        endpoint: req.uri().path().to_string(),
        operation_id: req
            .headers()
            .get(OPERATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string(),
    };

    let mut response = REQUEST_CONTEXT.scope(context, next.run(req)).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Turns a handler panic into a 500 response and raises an alert.
fn handle_panic(
    alerts: &AlertClient,
    tasks: &TaskTracker,
    debug: bool,
    err: Box<dyn Any + Send + 'static>,
) -> Response {
    let message = panic_message(err.as_ref());
    let context = REQUEST_CONTEXT.try_with(RequestContext::clone).ok();
    error!(
        error = %message,
        endpoint = context.as_ref().map(|c| c.endpoint.as_str()),
        "Unhandled panic while serving request"
    );

    let alerts = alerts.clone();
    let alert_message = message.clone();
    tasks.spawn(async move {
        let error_context = context
            .as_ref()
            .map(|c| ErrorContext {
                operation_id: Some(&c.operation_id),
                endpoint: Some(&c.endpoint),
            })
            .unwrap_or_default();
        alerts.send_error_alert(&alert_message, "panic", error_context).await;
    });

    ApiError::internal(message, debug).into_response()
}

fn panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    }
}

/// Starts the HTTP server with graceful shutdown support.
///
/// Binds to `addr` and serves requests until a shutdown signal is received.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound or the server
/// fails while running.
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<(), std::io::Error> {
    let app = create_router(state);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("HTTP server listening on {}", actual_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits up to `grace` for spawned background tasks to finish.
///
/// Returns `true` when every task completed in time.
pub async fn drain_background_tasks(tasks: &TaskTracker, grace: Duration) -> bool {
    tasks.close();
    if tasks.is_empty() {
        return true;
    }

    warn!(
        pending = tasks.len(),
        grace_seconds = grace.as_secs(),
        "Waiting for background deliveries to complete"
    );

    if tokio::time::timeout(grace, tasks.wait()).await.is_ok() {
        info!("All background deliveries completed");
        true
    } else {
        warn!(pending = tasks.len(), "Grace period elapsed with deliveries still pending");
        false
    }
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::Config;

    fn panicking_app(alert_server: &MockServer, debug: bool) -> (Router, AppState) {
        let config = Config {
            service_name: "relay-test".to_string(),
            auth_token: "test-token".to_string(),
            webhook_auth_token: "webhook-token".to_string(),
            alert_webhook_url: Some(format!("{}/alerts", alert_server.uri())),
            alert_api_key: Some("alert-key".to_string()),
            debug,
            ..Config::default()
        };
        let state = AppState::new(config).unwrap();
        let routes = routes().route(
            "/operations/explode",
            post(|| async {
                panic!("boom");
                #[allow(unreachable_code)]
                ()
            }),
        );
        (with_middleware(routes, state.clone()), state)
    }

    async fn post_explode(app: Router) -> (StatusCode, Value) {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/operations/explode")
            .header("authorization", "Bearer test-token")
            .header(OPERATION_ID_HEADER, "op-123")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn panicking_handler_returns_500_and_alerts_with_request_context() {
        let alert_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/alerts"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&alert_server)
            .await;

        let (app, state) = panicking_app(&alert_server, false);
        let (status, body) = post_explode(app).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"detail": "Internal server error", "error": "An error occurred"}));

        assert!(drain_background_tasks(&state.tasks, Duration::from_secs(5)).await);

        let requests = alert_server.received_requests().await.unwrap();
        let alert: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(alert["text"], "Error in relay-test at /operations/explode: boom");
        assert_eq!(
            alert["debug_logs"],
            "Error type: panic\nEndpoint: /operations/explode\nOperation ID: op-123"
        );
        assert!(alert["tags"]
            .as_array()
            .unwrap()
            .contains(&json!("operation:op-123")));
    }

    #[tokio::test]
    async fn panicking_handler_exposes_message_in_debug_mode() {
        let alert_server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&alert_server)
            .await;

        let (app, state) = panicking_app(&alert_server, true);
        let (status, body) = post_explode(app).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"detail": "Internal server error", "error": "boom"}));
        assert!(drain_background_tasks(&state.tasks, Duration::from_secs(5)).await);
    }

    #[test]
    fn panic_message_from_payload() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(42_u32);

        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    #[tokio::test]
    async fn drain_waits_for_spawned_tasks() {
        let tasks = TaskTracker::new();
        tasks.spawn(tokio::time::sleep(Duration::from_millis(20)));

        assert!(drain_background_tasks(&tasks, Duration::from_secs(5)).await);
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn drain_gives_up_after_grace_period() {
        let tasks = TaskTracker::new();
        tasks.spawn(tokio::time::sleep(Duration::from_secs(60)));

        assert!(!drain_background_tasks(&tasks, Duration::from_millis(20)).await);
    }
}
