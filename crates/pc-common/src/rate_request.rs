//! Rate-change request intake. Accepted requests are queued for manual review;
//! nothing in this crate approves or rejects them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{ensure_percentage, AppError, AppResult};

pub const MAX_JUSTIFICATION_LEN: usize = 4_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateChangeRequest {
    pub id: Uuid,
    pub account_id: Uuid,
    pub category: String,
    pub proposed_rate: f64,
    pub justification: String,
    pub submitted_at: DateTime<Utc>,
}

pub fn submit_request(
    account_id: Uuid,
    category: &str,
    proposed_rate: f64,
    justification: &str,
) -> AppResult<RateChangeRequest> {
    let category = category.trim();
    if category.is_empty() {
        return Err(AppError::InvalidInput("category is required".to_string()));
    }
    let justification = justification.trim();
    if justification.is_empty() {
        return Err(AppError::InvalidInput(
            "justification is required".to_string(),
        ));
    }
    if justification.chars().count() > MAX_JUSTIFICATION_LEN {
        return Err(AppError::InvalidInput(format!(
            "justification must be at most {MAX_JUSTIFICATION_LEN} characters"
        )));
    }
    ensure_percentage("proposed_rate", proposed_rate)?;

    let request = RateChangeRequest {
        id: Uuid::new_v4(),
        account_id,
        category: category.to_string(),
        proposed_rate,
        justification: justification.to_string(),
        submitted_at: Utc::now(),
    };

    info!(
        request_id = %request.id,
        account_id = %account_id,
        category = %request.category,
        proposed_rate,
        "rate change request submitted for review"
    );

    Ok(request)
}
