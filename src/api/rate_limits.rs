use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{event, instrument, Level};

use crate::limiters::{RateLimiter, RatePolicy};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DecisionResponse {
    pub client_id: String,
    pub allowed: bool,
}

/// Run the admission decision for one client.
///
/// 200 when admitted, 429 when the policy rejects, 503 when the counter
/// store cannot answer (the decision fails closed; the caller retries or
/// sheds load, it never gets a silent allow).
#[instrument(skip(state), level = "debug")]
pub async fn rate_limit(
    Path(client_id): Path<String>,
    State(state): State<RateLimiter>,
) -> Result<axum::Json<DecisionResponse>, StatusCode> {
    match state.allow(&client_id).await {
        Ok(true) => Ok(axum::Json(DecisionResponse {
            client_id,
            allowed: true,
        })),
        Ok(false) => Err(StatusCode::TOO_MANY_REQUESTS),
        Err(err) => {
            event!(
                Level::ERROR,
                message = "Failed limiting client",
                err = format!("{:?}", err)
            );
            Err(err.status_code())
        }
    }
}

/// The policy this deployment enforces, for operators and smoke tests.
#[instrument(skip(state), level = "debug")]
pub async fn policy(State(state): State<RateLimiter>) -> axum::Json<RatePolicy> {
    axum::Json(*state.policy())
}
