mod normalize;
mod store;
mod types;

use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use normalize::Classified;
use store::{DynamoConnector, EventStore, StoreConnector, StoreKey, SLACK_KIND};
use tracing::{error, info, warn};

/// Shared handler state. The connector is the only long-lived dependency;
/// everything else a request needs is built inside the handler.
#[derive(Clone)]
struct AppState<C> {
    connector: C,
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slacksink=info".into()),
        )
        .init();

    // Read configuration
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .expect("PORT must be a valid u16");

    // Build router
    let app = create_router(DynamoConnector);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/// Routes are registered with `any` so the handler owns the method check and
/// can answer non-POST traffic with 400 instead of the router's default 405.
fn create_router<C>(connector: C) -> Router
where
    C: StoreConnector + Clone + 'static,
{
    Router::new()
        .route("/health", any(health))
        .route("/slack/events", any(slack_events::<C>))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(AppState { connector })
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn slack_events<C>(State(state): State<AppState<C>>, request: Request) -> Response
where
    C: StoreConnector + Clone + 'static,
{
    let (parts, body) = request.into_parts();

    if parts.method != Method::POST {
        warn!("Rejecting {} request to /slack/events", parts.method);
        return StatusCode::BAD_REQUEST.into_response();
    }

    // Slack sends exactly application/json; anything else is not Slack.
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    if content_type != Some("application/json") {
        warn!("Rejecting request with content type {:?}", content_type);
        return StatusCode::BAD_REQUEST.into_response();
    }

    let declared_len = match parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
    {
        Some(len) => len,
        None => {
            error!("Missing or invalid Content-Length header");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to read request body: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    info!(
        "Received request to /slack/events, body length: {} bytes",
        body.len()
    );

    // Only the declared number of bytes counts as the payload; a longer
    // body keeps its tail ignored.
    let payload = if body.len() > declared_len {
        &body[..declared_len]
    } else {
        &body[..]
    };

    let classified = match normalize::classify(payload) {
        Ok(classified) => classified,
        Err(e) => {
            error!("Failed to decode event payload: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match classified {
        Classified::Handshake { challenge } => {
            info!("Answering URL verification challenge");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain")],
                challenge,
            )
                .into_response()
        }
        Classified::Notification => {
            let record = normalize::extract_record(payload);
            let key = StoreKey::generate(SLACK_KIND);

            // One connection per request, dropped as soon as the put lands.
            let event_store = match state.connector.connect().await {
                Ok(event_store) => event_store,
                Err(e) => {
                    error!("Failed to open event store: {}", e);
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            };
            if let Err(e) = event_store.put(&key, &record).await {
                error!("Failed to store event: {}", e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }

            info!("Stored event {}/{}", key.kind, key.name);
            StatusCode::OK.into_response()
        }
    }
}
