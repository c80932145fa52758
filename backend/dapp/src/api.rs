//! Axum handlers: one JSON view per screen plus the actions each screen offers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::chain::{ChainClient, FunctionId, ViewRequest};
use crate::config::Config;
use crate::errors::DappError;
use crate::faucet::{Faucet, FaucetEntry};
use crate::session::Session;
use crate::ve::VeScreen;
use crate::vote::VoteScreen;

pub struct AppState<C> {
    pub config: Config,
    pub chain: Arc<C>,
    pub session: Session,
    pub ve: VeScreen<C>,
    pub vote: VoteScreen<C>,
    pub faucet: Faucet<C>,
}

impl<C: ChainClient> AppState<C> {
    pub fn new(config: Config, chain: Arc<C>) -> Self {
        Self {
            ve: VeScreen::new(chain.clone(), config.ve_contract, config.notices),
            vote: VoteScreen::new(chain.clone(), config.vote_contract, config.notices),
            faucet: Faucet::new(chain.clone(), config.faucet_contract),
            session: Session::new(),
            chain,
            config,
        }
    }
}

pub fn router<C: ChainClient>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(swap))
        .route(
            "/session",
            get(get_session::<C>)
                .post(connect::<C>)
                .delete(disconnect::<C>),
        )
        .route("/ve", get(get_ve::<C>))
        .route("/ve/stake", post(stake::<C>))
        .route("/vote", get(get_vote::<C>))
        .route("/vote/refresh", post(refresh_vote::<C>))
        .route("/vote/:id/deposit", post(vote_deposit::<C>))
        .route("/vote/:id/withdraw", post(vote_withdraw::<C>))
        .route("/farm/:id", get(get_farm_pool::<C>))
        .route("/faucet", get(get_faucet::<C>))
        .route("/faucet/:name/mint", post(faucet_mint::<C>))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub account: Option<String>,
}

#[derive(Deserialize)]
pub struct ConnectRequest {
    pub address: String,
}

#[derive(Deserialize)]
pub struct StakeRequest {
    pub amount: String,
}

#[derive(Serialize)]
pub struct FarmPoolResponse {
    pub id: u64,
    pub pool_info: Vec<Value>,
}

#[derive(Serialize)]
pub struct FaucetResponse {
    pub entries: Vec<FaucetEntry>,
}

#[derive(Serialize)]
pub struct MintResponse {
    pub coin: String,
    pub hash: String,
}

fn error_response(e: DappError) -> Response {
    let status = match &e {
        DappError::Busy(_) => StatusCode::CONFLICT,
        DappError::NotConnected => StatusCode::UNAUTHORIZED,
        DappError::NotFound(_) => StatusCode::NOT_FOUND,
        DappError::InvalidAddress(_) | DappError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
        DappError::Transaction(_) | DappError::ReadFailed(_) | DappError::Http(_) => {
            StatusCode::BAD_GATEWAY
        }
        DappError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn accepted() -> Response {
    (StatusCode::ACCEPTED, Json(json!({ "phase": "pending" }))).into_response()
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /` — swap lives entirely in the browser; this only lists the screens.
pub async fn swap() -> impl IntoResponse {
    Json(json!({
        "screen": "swap",
        "screens": ["/", "/ve", "/farm", "/vote", "/faucet"],
    }))
}

/// `GET /session`
pub async fn get_session<C: ChainClient>(State(state): State<Arc<AppState<C>>>) -> impl IntoResponse {
    Json(SessionResponse {
        account: state.session.account().map(|a| a.to_string()),
    })
}

/// `POST /session` — connect or switch the acting account.
pub async fn connect<C: ChainClient>(
    State(state): State<Arc<AppState<C>>>,
    Json(body): Json<ConnectRequest>,
) -> Response {
    match state.session.connect(&body.address) {
        Ok(_) => Json(SessionResponse {
            account: state.session.account().map(|a| a.to_string()),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

/// `DELETE /session`
pub async fn disconnect<C: ChainClient>(State(state): State<Arc<AppState<C>>>) -> impl IntoResponse {
    state.session.disconnect();
    StatusCode::NO_CONTENT
}

/// `GET /ve`
pub async fn get_ve<C: ChainClient>(State(state): State<Arc<AppState<C>>>) -> impl IntoResponse {
    Json(state.ve.view())
}

/// `POST /ve/stake`
pub async fn stake<C: ChainClient>(
    State(state): State<Arc<AppState<C>>>,
    Json(body): Json<StakeRequest>,
) -> Response {
    let result = state
        .session
        .require()
        .and_then(|sender| state.ve.stake(sender, &body.amount));
    match result {
        Ok(()) => accepted(),
        Err(e) => error_response(e),
    }
}

/// `GET /vote`
pub async fn get_vote<C: ChainClient>(State(state): State<Arc<AppState<C>>>) -> impl IntoResponse {
    Json(state.vote.view())
}

/// `POST /vote/refresh` — re-issue every row read for the connected account.
pub async fn refresh_vote<C: ChainClient>(State(state): State<Arc<AppState<C>>>) -> Response {
    match state.session.require() {
        Ok(account) => {
            let batch = state.vote.refresh(account);
            (StatusCode::ACCEPTED, Json(json!({ "epoch": batch.epoch, "reads": batch.len() }))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// `POST /vote/:id/deposit`
pub async fn vote_deposit<C: ChainClient>(
    State(state): State<Arc<AppState<C>>>,
    Path(id): Path<u64>,
) -> Response {
    let result = state
        .session
        .require()
        .and_then(|sender| state.vote.vote(sender, id));
    match result {
        Ok(()) => accepted(),
        Err(e) => error_response(e),
    }
}

/// `POST /vote/:id/withdraw`
pub async fn vote_withdraw<C: ChainClient>(
    State(state): State<Arc<AppState<C>>>,
    Path(id): Path<u64>,
) -> Response {
    let result = state
        .session
        .require()
        .and_then(|sender| state.vote.unvote(sender, id));
    match result {
        Ok(()) => accepted(),
        Err(e) => error_response(e),
    }
}

/// `GET /farm/:id` — raw `get_pool_info` for a farm pool.
pub async fn get_farm_pool<C: ChainClient>(
    State(state): State<Arc<AppState<C>>>,
    Path(id): Path<u64>,
) -> Response {
    let function = FunctionId::new(state.config.chef_contract, "smart_chef", "get_pool_info");
    let request = ViewRequest::new(&function, vec![json!(id.to_string())]);
    match state.chain.view(&request).await {
        Ok(pool_info) => Json(FarmPoolResponse { id, pool_info }).into_response(),
        Err(e) => {
            warn!(pool = id, "Farm pool read failed: {e}");
            error_response(e)
        }
    }
}

/// `GET /faucet`
pub async fn get_faucet<C: ChainClient>(State(state): State<Arc<AppState<C>>>) -> impl IntoResponse {
    Json(FaucetResponse {
        entries: state.faucet.entries().to_vec(),
    })
}

/// `POST /faucet/:name/mint`
pub async fn faucet_mint<C: ChainClient>(
    State(state): State<Arc<AppState<C>>>,
    Path(name): Path<String>,
) -> Response {
    let sender = match state.session.require() {
        Ok(sender) => sender,
        Err(e) => return error_response(e),
    };
    match state.faucet.mint(sender, &name).await {
        Ok(handle) => Json(MintResponse {
            coin: name,
            hash: handle.hash,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TxFailure;

    #[test]
    fn errors_map_to_status_codes() {
        let cases = [
            (DappError::Busy("ve-stake".to_string()), StatusCode::CONFLICT),
            (DappError::NotConnected, StatusCode::UNAUTHORIZED),
            (DappError::NotFound("pool 9".to_string()), StatusCode::NOT_FOUND),
            (DappError::InvalidAmount("ten".to_string()), StatusCode::BAD_REQUEST),
            (
                DappError::Transaction(TxFailure::SignRejected("declined".to_string())),
                StatusCode::BAD_GATEWAY,
            ),
            (DappError::Config("bad".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(error_response(err).status(), status);
        }
    }
}
