//! Return settlement review endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{error::AppResult, models::settlement::ReturnSettlement};

use super::AuthenticatedUser;

/// Get a settlement (owner or admin)
#[utoipa::path(
    get,
    path = "/returns/{id}",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Settlement ID")),
    responses(
        (status = 200, description = "Settlement", body = ReturnSettlement),
        (status = 403, description = "Another borrower's settlement"),
        (status = 404, description = "Settlement not found")
    )
)]
pub async fn get_settlement(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReturnSettlement>> {
    let settlement = state.services.returns.get(&claims, id).await?;
    Ok(Json(settlement))
}

/// Accept a pending settlement
#[utoipa::path(
    post,
    path = "/returns/{id}/approve",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Settlement ID")),
    responses(
        (status = 200, description = "Settlement completed", body = ReturnSettlement),
        (status = 404, description = "Settlement not found"),
        (status = 409, description = "Already reviewed")
    )
)]
pub async fn approve_return(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReturnSettlement>> {
    claims.require_admin()?;
    let settlement = state.services.returns.approve(id).await?;
    Ok(Json(settlement))
}

/// Reject a pending settlement (exact ledger reversal)
#[utoipa::path(
    post,
    path = "/returns/{id}/reject",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Settlement ID")),
    responses(
        (status = 200, description = "Settlement rejected and reversed", body = ReturnSettlement),
        (status = 404, description = "Settlement not found"),
        (status = 409, description = "Already reviewed")
    )
)]
pub async fn reject_return(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReturnSettlement>> {
    claims.require_admin()?;
    let settlement = state.services.returns.reject(id).await?;
    Ok(Json(settlement))
}
