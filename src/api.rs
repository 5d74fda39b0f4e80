//! REST API server for Emberchain
//!
//! Exposes the node's five logical operations over HTTP: chain state,
//! transaction submission, mining, peer registration and consensus
//! resolution.

use axum::{
    extract::{Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use crate::blockchain::Block;
use crate::error::ChainError;
use crate::node::Node;
use crate::transaction::Transaction;

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Engine(ChainError),
    InvalidInput(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Engine(ChainError::StaleHead) => {
                (StatusCode::CONFLICT, ChainError::StaleHead.to_string())
            }
            ApiError::Engine(e @ ChainError::SearchExhausted { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            ApiError::Engine(e @ ChainError::MempoolFull) => {
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            ApiError::Engine(e @ ChainError::Internal(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Engine(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::Engine(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct NewTransactionRequest {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
}

#[derive(Serialize)]
pub struct NewTransactionResponse {
    pub message: String,
    pub index: u64,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub message: String,
    pub block: Block,
}

#[derive(Deserialize)]
pub struct RegisterPeersRequest {
    pub nodes: Vec<String>,
}

#[derive(Serialize)]
pub struct RegisterPeersResponse {
    pub message: String,
    pub total_peers: usize,
    pub peers: Vec<String>,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub updated: bool,
    pub chain: Vec<Block>,
    pub length: usize,
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware. Logs method, path, status and duration.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints (also used by tests).
pub fn build_api_router(node: Node) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![http::Method::GET, http::Method::POST, http::Method::OPTIONS])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        .route("/blockchain", get(get_blockchain))
        .route("/transactions/new", post(new_transaction))
        .route("/mine", get(mine_block))
        .route("/nodes/register", post(register_peers))
        .route("/nodes/resolve", get(resolve_conflicts))
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

/// Run the API server until the process exits.
pub async fn run_api_server(node: Node, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(node);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn get_blockchain(State(node): State<Node>) -> impl IntoResponse {
    Json(node.chain_snapshot().await)
}

async fn new_transaction(
    State(node): State<Node>,
    Json(req): Json<NewTransactionRequest>,
) -> Result<(StatusCode, Json<NewTransactionResponse>), ApiError> {
    let tx = Transaction::new(req.sender, req.recipient, req.amount);
    let index = node.submit_transaction(tx).await?;

    Ok((
        StatusCode::CREATED,
        Json(NewTransactionResponse {
            message: format!("Transaction will be added to block {index}"),
            index,
        }),
    ))
}

async fn mine_block(State(node): State<Node>) -> Result<Json<MineResponse>, ApiError> {
    let block = node.mine().await?;

    Ok(Json(MineResponse {
        message: "New block forged".to_string(),
        block,
    }))
}

async fn register_peers(
    State(node): State<Node>,
    Json(req): Json<RegisterPeersRequest>,
) -> Result<Json<RegisterPeersResponse>, ApiError> {
    if req.nodes.is_empty() {
        return Err(ApiError::InvalidInput(
            "please supply a non-empty list of peer addresses".to_string(),
        ));
    }

    let total_peers = node.register_peers(req.nodes).await?;
    let peers = node.peers().await.into_iter().collect();

    Ok(Json(RegisterPeersResponse {
        message: "Peers registered".to_string(),
        total_peers,
        peers,
    }))
}

async fn resolve_conflicts(State(node): State<Node>) -> impl IntoResponse {
    let outcome = node.resolve_conflicts().await;

    Json(ResolveResponse {
        updated: outcome.updated,
        chain: outcome.snapshot.chain,
        length: outcome.snapshot.length,
    })
}
