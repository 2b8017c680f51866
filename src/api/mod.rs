//! HTTP API for submitting bridge operations and querying ledger state
//!
//! Mutating routes carry a signature from the acting identity (`sender` for
//! swaps, `caller` for chain administration); see [`auth`]. Redeems are
//! authorized by the validator attestation itself.

pub mod auth;

use self::auth::AdminAction;
use crate::attestation::Attestation;
use crate::config::ApiConfig;
use crate::error::BridgeError;
use crate::ledger::{Bridge, SwapRecord};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<Bridge>,
}

/// Build the API router
pub fn router(bridge: Arc<Bridge>) -> Router {
    let state = AppState { bridge };

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(get_info))
        .route("/chains", get(get_chains))
        .route("/chains/:chain_id", get(get_chain))
        .route("/chains/:chain_id/enable", post(enable_chain))
        .route("/chains/:chain_id/disable", post(disable_chain))
        .route("/swap", post(swap))
        .route("/redeem", post(redeem))
        .route("/swaps/:swap_id", get(get_swap))
        .route("/redeemed/:swap_id", get(get_redeemed))
        .route("/nonces/:sender/:nonce", get(get_nonce))
        .route("/balances/:account", get(get_balance))
        .route("/events", get(get_events))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_server(config: ApiConfig, bridge: Arc<Bridge>) -> anyhow::Result<()> {
    let app = router(bridge);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// API-level failure
pub enum ApiError {
    Bridge(BridgeError),
    BadRequest(String),
    Forbidden(String),
    NotFound(String),
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        ApiError::Bridge(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Bridge(e) => {
                let status = match &e {
                    BridgeError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                    BridgeError::DuplicateNonce { .. } | BridgeError::DuplicateRedeem { .. } => {
                        StatusCode::CONFLICT
                    }
                    BridgeError::Custody(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, e.kind(), e.to_string())
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, "forbidden", message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
        };

        (
            status,
            Json(ErrorResponse {
                error: kind.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

/// Parse an unsigned integer given either as decimal or `0x` hex
fn parse_u256(raw: &str) -> Result<U256, ApiError> {
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| e.to_string()),
        None => U256::from_dec_str(raw).map_err(|e| e.to_string()),
    };
    parsed.map_err(|e| ApiError::BadRequest(format!("invalid integer {:?}: {}", raw, e)))
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn get_info(State(state): State<AppState>) -> impl IntoResponse {
    let bridge = &state.bridge;
    Json(InfoResponse {
        chain_id: bridge.chain_id(),
        token: bridge.token(),
        validator: bridge.validator(),
        admin: bridge.admin(),
    })
}

async fn get_chains(State(state): State<AppState>) -> impl IntoResponse {
    Json(ChainsResponse {
        chain_id: state.bridge.chain_id(),
        enabled_chains: state.bridge.enabled_chains().await,
    })
}

async fn get_chain(State(state): State<AppState>, Path(chain_id): Path<u64>) -> impl IntoResponse {
    Json(ChainStatusResponse {
        chain_id,
        enabled: state.bridge.is_chain_enabled(chain_id).await,
    })
}

async fn enable_chain(
    State(state): State<AppState>,
    Path(chain_id): Path<u64>,
    Json(req): Json<AdminRequest>,
) -> Result<Json<ChainStatusResponse>, ApiError> {
    let caller = req.authenticate(&state.bridge, AdminAction::EnableChain, chain_id)?;
    state.bridge.enable_chain(caller, chain_id).await?;
    Ok(Json(ChainStatusResponse {
        chain_id,
        enabled: true,
    }))
}

async fn disable_chain(
    State(state): State<AppState>,
    Path(chain_id): Path<u64>,
    Json(req): Json<AdminRequest>,
) -> Result<Json<ChainStatusResponse>, ApiError> {
    let caller = req.authenticate(&state.bridge, AdminAction::DisableChain, chain_id)?;
    state.bridge.disable_chain(caller, chain_id).await?;
    Ok(Json(ChainStatusResponse {
        chain_id,
        enabled: false,
    }))
}

async fn swap(
    State(state): State<AppState>,
    Json(req): Json<SwapRequest>,
) -> Result<Json<SwapResponse>, ApiError> {
    let nonce = parse_u256(&req.nonce)?;
    let amount = parse_u256(&req.amount)?;

    let message = auth::swap_request_message(
        state.bridge.chain_id(),
        req.sender,
        nonce,
        amount,
        req.dest_chain,
        req.recipient_hint,
    );
    auth::authenticate(req.sender, message, &req.signature)?;

    let swap_id = state
        .bridge
        .swap(req.sender, nonce, amount, req.dest_chain, req.recipient_hint)
        .await?;

    Ok(Json(SwapResponse { swap_id }))
}

async fn redeem(
    State(state): State<AppState>,
    Json(req): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>, ApiError> {
    let attestation = req.into_attestation()?;
    state
        .bridge
        .redeem(
            attestation.swap_id,
            attestation.amount,
            attestation.recipient,
            &attestation.signature,
        )
        .await?;

    Ok(Json(RedeemResponse {
        swap_id: attestation.swap_id,
        redeemed: true,
    }))
}

async fn get_swap(
    State(state): State<AppState>,
    Path(swap_id): Path<H256>,
) -> Result<Json<SwapRecord>, ApiError> {
    state
        .bridge
        .swap_record(swap_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("swap 0x{} not found", hex::encode(swap_id))))
}

async fn get_redeemed(
    State(state): State<AppState>,
    Path(swap_id): Path<H256>,
) -> impl IntoResponse {
    Json(RedeemResponse {
        swap_id,
        redeemed: state.bridge.is_redeemed(swap_id).await,
    })
}

async fn get_nonce(
    State(state): State<AppState>,
    Path((sender, nonce)): Path<(Address, String)>,
) -> Result<Json<NonceResponse>, ApiError> {
    let nonce = parse_u256(&nonce)?;
    Ok(Json(NonceResponse {
        sender,
        nonce,
        used: state.bridge.is_nonce_used(sender, nonce).await,
    }))
}

async fn get_balance(
    State(state): State<AppState>,
    Path(account): Path<Address>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.bridge.balance_of(account).await?;
    Ok(Json(BalanceResponse { account, balance }))
}

async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    Json(state.bridge.events(query.from.unwrap_or(0)))
}

// Request types

#[derive(Deserialize)]
struct AdminRequest {
    caller: Address,
    /// Unix seconds after which the signature is refused
    deadline: u64,
    signature: Bytes,
}

impl AdminRequest {
    /// Verify the caller signed this action and return the caller
    fn authenticate(
        &self,
        bridge: &Bridge,
        action: AdminAction,
        chain_id: u64,
    ) -> Result<Address, ApiError> {
        auth::check_deadline(self.deadline)?;
        let message =
            auth::admin_request_message(bridge.chain_id(), action, chain_id, self.deadline);
        auth::authenticate(self.caller, message, &self.signature)?;
        Ok(self.caller)
    }
}

#[derive(Deserialize)]
struct SwapRequest {
    sender: Address,
    /// Decimal or 0x-prefixed hex
    nonce: String,
    /// Decimal or 0x-prefixed hex
    amount: String,
    dest_chain: u64,
    recipient_hint: Address,
    /// Sender's signature over [`auth::swap_request_message`]
    signature: Bytes,
}

#[derive(Deserialize)]
struct RedeemRequest {
    swap_id: H256,
    /// Decimal or 0x-prefixed hex
    amount: String,
    recipient: Address,
    signature: Bytes,
}

impl RedeemRequest {
    fn into_attestation(self) -> Result<Attestation, ApiError> {
        Ok(Attestation {
            swap_id: self.swap_id,
            amount: parse_u256(&self.amount)?,
            recipient: self.recipient,
            signature: self.signature,
        })
    }
}

#[derive(Deserialize)]
struct EventsQuery {
    from: Option<u64>,
}

// Response types

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct InfoResponse {
    chain_id: u64,
    token: Address,
    validator: Address,
    admin: Address,
}

#[derive(Serialize)]
struct ChainsResponse {
    chain_id: u64,
    enabled_chains: Vec<u64>,
}

#[derive(Serialize)]
struct ChainStatusResponse {
    chain_id: u64,
    enabled: bool,
}

#[derive(Serialize)]
struct SwapResponse {
    swap_id: H256,
}

#[derive(Serialize)]
struct RedeemResponse {
    swap_id: H256,
    redeemed: bool,
}

#[derive(Serialize)]
struct NonceResponse {
    sender: Address,
    nonce: U256,
    used: bool,
}

#[derive(Serialize)]
struct BalanceResponse {
    account: Address,
    balance: U256,
}
