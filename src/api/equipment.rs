//! Equipment management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        enums::ImpactCategory,
        equipment::{AdjustMaintenance, CreateEquipment, EquipmentItem, SetBorrowable, UpdateEquipment},
    },
    services::availability::AvailabilityResult,
};

use super::AuthenticatedUser;

/// Availability query parameters
#[derive(Deserialize, IntoParams)]
pub struct AvailabilityQuery {
    /// Window start (inclusive)
    pub start: DateTime<Utc>,
    /// Window end (exclusive)
    pub end: DateTime<Utc>,
    /// Requested quantity
    pub qty: i32,
}

/// Generic ledger adjustment request (calibration/disposal workflows)
#[derive(Deserialize, ToSchema)]
pub struct AdjustImpactRequest {
    pub category: ImpactCategory,
    pub delta: i32,
}

/// List all equipment
#[utoipa::path(
    get,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Equipment list", body = Vec<EquipmentItem>)
    )
)]
pub async fn list_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<EquipmentItem>>> {
    let items = state.services.equipment.list().await?;
    Ok(Json(items))
}

/// Get equipment by ID
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment record", body = EquipmentItem),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn get_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<EquipmentItem>> {
    let item = state.services.equipment.get_by_id(id).await?;
    Ok(Json(item))
}

/// Create equipment (inventory intake)
#[utoipa::path(
    post,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Equipment created", body = EquipmentItem),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Asset tag already exists")
    )
)]
pub async fn create_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateEquipment>,
) -> AppResult<(StatusCode, Json<EquipmentItem>)> {
    claims.require_admin()?;
    let item = state.services.equipment.create(request).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Update equipment
#[utoipa::path(
    put,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = UpdateEquipment,
    responses(
        (status = 200, description = "Equipment updated", body = EquipmentItem),
        (status = 404, description = "Equipment not found"),
        (status = 422, description = "Total below outstanding impacts")
    )
)]
pub async fn update_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateEquipment>,
) -> AppResult<Json<EquipmentItem>> {
    claims.require_admin()?;
    let item = state.services.equipment.update(id, request).await?;
    Ok(Json(item))
}

/// Delete equipment
#[utoipa::path(
    delete,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    responses(
        (status = 204, description = "Equipment deleted"),
        (status = 404, description = "Equipment not found"),
        (status = 409, description = "Units still borrowed")
    )
)]
pub async fn delete_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.equipment.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Check whether a quantity can be borrowed over a window
#[utoipa::path(
    get,
    path = "/equipment/{id}/availability",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Equipment ID"),
        AvailabilityQuery
    ),
    responses(
        (status = 200, description = "Availability over the window", body = AvailabilityResult),
        (status = 400, description = "Invalid window"),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn check_availability(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<AvailabilityResult>> {
    let result = state
        .services
        .availability
        .check_window(id, query.start, query.end, query.qty)
        .await?;
    Ok(Json(result))
}

/// Adjust the maintenance impact (maintenance scheduling collaborator)
#[utoipa::path(
    post,
    path = "/equipment/{id}/maintenance",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = AdjustMaintenance,
    responses(
        (status = 200, description = "Ledger adjusted", body = EquipmentItem),
        (status = 404, description = "Equipment not found"),
        (status = 422, description = "Insufficient capacity")
    )
)]
pub async fn adjust_maintenance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AdjustMaintenance>,
) -> AppResult<Json<EquipmentItem>> {
    claims.require_admin()?;
    let item = state.services.equipment.adjust_maintenance(id, request).await?;
    Ok(Json(item))
}

/// Adjust an arbitrary impact counter (calibration/disposal workflows)
#[utoipa::path(
    post,
    path = "/equipment/{id}/impact",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = AdjustImpactRequest,
    responses(
        (status = 200, description = "Ledger adjusted", body = EquipmentItem),
        (status = 404, description = "Equipment not found"),
        (status = 422, description = "Insufficient capacity")
    )
)]
pub async fn adjust_impact(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AdjustImpactRequest>,
) -> AppResult<Json<EquipmentItem>> {
    claims.require_admin()?;
    let item = state
        .services
        .equipment
        .adjust_impact(id, request.category, request.delta)
        .await?;
    Ok(Json(item))
}

/// Flip the administrative borrowable override
#[utoipa::path(
    put,
    path = "/equipment/{id}/borrowable",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = SetBorrowable,
    responses(
        (status = 200, description = "Flag updated", body = EquipmentItem),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn set_borrowable(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<SetBorrowable>,
) -> AppResult<Json<EquipmentItem>> {
    claims.require_admin()?;
    let item = state.services.equipment.set_borrowable(id, request.allowed).await?;
    Ok(Json(item))
}
