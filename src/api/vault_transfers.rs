use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::api::routes::AppState;
use crate::db::vault_transfers::{self, VaultTransfer};
use crate::error::AppResult;

pub async fn list_vault_transfers(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<VaultTransfer>>> {
    let rows = vault_transfers::list_vault_transfers(&state.db).await?;
    Ok(Json(rows))
}
