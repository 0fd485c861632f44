use axum::extract::State;
use axum::Json;
use pc_common::api::HealthResponse;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        boot_id: Some(state.boot_id.clone()),
        git_sha: state.git_sha.clone(),
    })
}
