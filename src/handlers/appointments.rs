// src/handlers/appointments.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::identity::{ClientContext, ProfessionalContext},
    models::scheduling::{Appointment, AppointmentStatus, Party},
    services::appointment_service::StatusChange,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    #[schema(example = "CANCELLED_BY_CLIENT")]
    pub status: AppointmentStatus,
    pub requested_by: Party,
}

// PATCH /api/appointments/{appointment_id}/status
#[utoipa::path(
    patch,
    path = "/api/appointments/{appointment_id}/status",
    tag = "Agendamentos",
    request_body = UpdateStatusPayload,
    params(
        ("appointment_id" = Uuid, Path, description = "ID do Agendamento"),
        ("x-client-id" = Option<Uuid>, Header, description = "Obrigatório quando o cliente cancela"),
        ("x-professional-id" = Option<Uuid>, Header, description = "Obrigatório quando o profissional altera o status")
    ),
    responses(
        (status = 200, description = "Status atualizado", body = Appointment),
        (status = 403, description = "Status não permitido para quem pediu ou agendamento de outra pessoa"),
        (status = 404, description = "Agendamento não encontrado"),
        (status = 422, description = "Transição de status inválida")
    )
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    client: Option<ClientContext>,
    professional: Option<ProfessionalContext>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let updated = app_state
        .appointment_service
        .change_status(StatusChange {
            appointment_id,
            status: payload.status,
            requested_by: payload.requested_by,
            client_id: client.map(|c| c.0),
            professional_id: professional.map(|p| p.0),
        })
        .await?;

    Ok((StatusCode::OK, Json(updated)))
}
