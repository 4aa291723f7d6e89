//! Borrow lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        enums::ReservationState,
        reservation::{BorrowReservation, CreateReservation, ReservationDetails},
        settlement::{ReturnSettlement, SubmitReturn},
    },
};

use super::AuthenticatedUser;

/// Borrow listing filter
#[derive(Deserialize, IntoParams)]
pub struct BorrowListQuery {
    pub state: Option<ReservationState>,
}

/// Submit a borrow request
#[utoipa::path(
    post,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation created", body = BorrowReservation),
        (status = 400, description = "Invalid window or quantity"),
        (status = 404, description = "Equipment not found"),
        (status = 422, description = "Not enough units over the window")
    )
)]
pub async fn submit_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<BorrowReservation>)> {
    let reservation = state.services.borrows.submit(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Get a reservation with its derived state (owner or admin)
#[utoipa::path(
    get,
    path = "/borrows/{id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = ReservationDetails),
        (status = 403, description = "Another borrower's reservation"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReservationDetails>> {
    let details = state.services.borrows.get(&claims, id).await?;
    Ok(Json(details))
}

/// List reservations, optionally filtered by state
#[utoipa::path(
    get,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(BorrowListQuery),
    responses(
        (status = 200, description = "Reservations", body = Vec<ReservationDetails>)
    )
)]
pub async fn list_borrows(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowListQuery>,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    claims.require_admin()?;
    let rows = state.services.borrows.list(query.state).await?;
    Ok(Json(rows))
}

/// List the caller's own reservations
#[utoipa::path(
    get,
    path = "/borrows/mine",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's reservations", body = Vec<ReservationDetails>)
    )
)]
pub async fn list_my_borrows(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    let rows = state.services.borrows.list_for_borrower(&claims.sub).await?;
    Ok(Json(rows))
}

/// List released reservations past their intended end
#[utoipa::path(
    get,
    path = "/borrows/overdue",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue reservations", body = Vec<ReservationDetails>)
    )
)]
pub async fn list_overdue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    claims.require_admin()?;
    let rows = state.services.borrows.list_overdue().await?;
    Ok(Json(rows))
}

/// Approve a pending reservation (window re-validated)
#[utoipa::path(
    post,
    path = "/borrows/{id}/approve",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation approved", body = ReservationDetails),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Not in an approvable state"),
        (status = 422, description = "Window no longer available")
    )
)]
pub async fn approve_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReservationDetails>> {
    claims.require_admin()?;
    let details = state.services.borrows.approve(id).await?;
    Ok(Json(details))
}

/// Reject a pending or approved reservation
#[utoipa::path(
    post,
    path = "/borrows/{id}/reject",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation rejected", body = ReservationDetails),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Not in a rejectable state")
    )
)]
pub async fn reject_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReservationDetails>> {
    claims.require_admin()?;
    let details = state.services.borrows.reject(id).await?;
    Ok(Json(details))
}

/// Mark equipment physically handed over (commits the borrowed impact)
#[utoipa::path(
    post,
    path = "/borrows/{id}/release",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Equipment released", body = ReservationDetails),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Capacity exceeded or wrong state")
    )
)]
pub async fn release_borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReservationDetails>> {
    claims.require_admin()?;
    let details = state.services.borrows.release(id).await?;
    Ok(Json(details))
}

/// Submit a return for review (owner or admin)
#[utoipa::path(
    post,
    path = "/borrows/{id}/return",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation ID")),
    request_body = SubmitReturn,
    responses(
        (status = 201, description = "Settlement pending review", body = ReturnSettlement),
        (status = 403, description = "Another borrower's reservation"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Not released or already settled"),
        (status = 422, description = "Invalid returned quantity")
    )
)]
pub async fn submit_return(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitReturn>,
) -> AppResult<(StatusCode, Json<ReturnSettlement>)> {
    let settlement = state.services.returns.submit(&claims, id, request).await?;
    Ok((StatusCode::CREATED, Json(settlement)))
}
