//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{borrows, equipment, health, returns};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Labstock API",
        version = "0.3.0",
        description = "Lab Equipment Lending REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Labstock Team", email = "contact@labstock.org")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        equipment::check_availability,
        equipment::adjust_maintenance,
        equipment::adjust_impact,
        equipment::set_borrowable,
        // Borrows
        borrows::submit_borrow,
        borrows::get_borrow,
        borrows::list_borrows,
        borrows::list_my_borrows,
        borrows::list_overdue,
        borrows::approve_borrow,
        borrows::reject_borrow,
        borrows::release_borrow,
        borrows::submit_return,
        // Returns
        returns::get_settlement,
        returns::approve_return,
        returns::reject_return,
    ),
    components(
        schemas(
            // Equipment
            crate::models::equipment::EquipmentItem,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            crate::models::equipment::AdjustMaintenance,
            crate::models::equipment::SetBorrowable,
            crate::models::ledger::ImpactCounts,
            equipment::AdjustImpactRequest,
            // Borrows
            crate::models::reservation::BorrowReservation,
            crate::models::reservation::CreateReservation,
            crate::models::reservation::ReservationDetails,
            // Returns
            crate::models::settlement::ReturnSettlement,
            crate::models::settlement::SubmitReturn,
            // Availability
            crate::services::availability::AvailabilityResult,
            // Enums
            crate::models::enums::EquipmentCategory,
            crate::models::enums::EquipmentCondition,
            crate::models::enums::EquipmentStatus,
            crate::models::enums::MaintenanceNeed,
            crate::models::enums::ImpactCategory,
            crate::models::enums::ReservationState,
            crate::models::enums::SettlementState,
            crate::models::enums::DamageSeverity,
            crate::models::enums::BorrowerType,
            crate::models::enums::Role,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "equipment", description = "Equipment inventory and ledger"),
        (name = "borrows", description = "Borrow lifecycle"),
        (name = "returns", description = "Return settlement review")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
