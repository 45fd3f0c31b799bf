use crate::agent::ChatAgent;
use crate::cli::Args;
use crate::models::chat::ChatMessage;
use crate::server::auth::{ bearer_token, TokenVerifier, VerificationError };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    Json,
    extract::{ State, Path },
    response::{ IntoResponse, Response },
    http::{ header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode },
};
use serde::{ Deserialize, Serialize };
use serde_json::json;
use tower_http::cors::{ AllowHeaders, AllowMethods, Any, CorsLayer };
use log::{ info, warn, debug };

pub const MAX_MESSAGE_CHARS: usize = 1000;
const ANONYMOUS_USER: &str = "anonymous";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, alias = "user_id")]
    pub user_id: Option<String>,
    #[serde(default, alias = "conversation_id")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub conversation_id: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { detail: detail.into() })).into_response()
}

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ChatAgent>,
    pub verifier: TokenVerifier,
}

/// Credentials are only allowed for an explicit origin list.
pub fn build_cors(origins: &str) -> CorsLayer {
    if origins.split(',').any(|o| o.trim() == "*") {
        return CorsLayer::new().allow_methods(Any).allow_headers(Any).allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .allow_origin(allowed)
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        .route(
            "/conversations/{conversation_id}",
            get(history_handler).delete(clear_history_handler)
        )
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    agent: Arc<ChatAgent>,
    args: Args,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = args.server_addr.parse::<SocketAddr>()?;
    let verifier = TokenVerifier::new(args.jwt_secret.clone());
    if verifier.is_configured() {
        info!("Bearer tokens will be verified with HS256.");
    } else {
        warn!("JWT_SECRET not set. Bearer tokens cannot be verified and chats run anonymously.");
    }

    let app = router(AppState { agent, verifier }, build_cors(&args.cors_origins));

    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert), Some(key)) => (cert, key),
            _ => {
                return Err("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.".into());
            }
        };
        info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        info!("HTTPS server listening on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await
            .map_err(|e| format!("Failed to bind HTTP server to {}: {}", addr, e))?;
        info!("HTTP server listening on: http://{}", addr);
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "service": "CareConnect Chatbot",
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

fn authorization(headers: &HeaderMap) -> Option<Result<&str, VerificationError>> {
    headers
        .get(AUTHORIZATION)
        .map(|v| v.to_str().map(bearer_token).map_err(|_| VerificationError::Malformed))
}

/// Identity for the chat path. A bad token never blocks the chat, it only
/// loses its claims.
fn chat_identity(verifier: &TokenVerifier, headers: &HeaderMap, body_user: Option<&str>) -> String {
    let token_user = match authorization(headers) {
        Some(token) => match token.and_then(|t| verifier.verify(t)) {
            Ok(claims) => claims.user_id(),
            Err(e) => {
                debug!("Ignoring unverified bearer token on chat: {}", e);
                None
            }
        },
        None => None,
    };

    token_user
        .or_else(|| body_user.filter(|u| !u.is_empty()).map(str::to_string))
        .unwrap_or_else(|| ANONYMOUS_USER.to_string())
}

/// The history path requires any presented token to be valid.
fn check_presented_token(verifier: &TokenVerifier, headers: &HeaderMap) -> Result<(), VerificationError> {
    match authorization(headers) {
        Some(token) => verifier.verify(token?).map(|_| ()),
        None => Ok(()),
    }
}

async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Response {
    let len = req.message.chars().count();
    if len == 0 || len > MAX_MESSAGE_CHARS {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("message must be between 1 and {} characters", MAX_MESSAGE_CHARS)
        );
    }

    let user_id = chat_identity(&state.verifier, &headers, req.user_id.as_deref());
    let reply = state.agent.respond(&req.message, &user_id, req.conversation_id.as_deref()).await;
    if let Some(detail) = &reply.error {
        warn!("Served fallback reply for conversation {}: {}", reply.conversation_id, detail);
    }

    Json(ChatResponse {
        response: reply.response,
        conversation_id: reply.conversation_id,
    }).into_response()
}

async fn history_handler(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(e) = check_presented_token(&state.verifier, &headers) {
        return error_response(StatusCode::UNAUTHORIZED, format!("Error fetching history: {}", e));
    }

    let messages = state.agent.get_history(&conversation_id).await;
    Json(HistoryResponse { conversation_id, messages }).into_response()
}

async fn clear_history_handler(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(e) = check_presented_token(&state.verifier, &headers) {
        return error_response(StatusCode::UNAUTHORIZED, format!("Error clearing history: {}", e));
    }

    state.agent.clear_history(&conversation_id).await;
    info!("Conversation {} cleared", conversation_id);
    Json(json!({ "conversationId": conversation_id, "cleared": true })).into_response()
}
