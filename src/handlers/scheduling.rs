// src/handlers/scheduling.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::identity::ClientContext,
    models::scheduling::{hhmm, Candidate, ServiceListing, ShopStatus},
    services::booking_service::{BookingConfirmation, BookingSelection},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct AvailabilityQuery {
    /// Data no formato YYYY-MM-DD (fuso do negócio).
    #[param(value_type = String, example = "2026-10-20")]
    pub date: NaiveDate,
}

// GET /api/professionals/{professional_id}/availability
#[utoipa::path(
    get,
    path = "/api/professionals/{professional_id}/availability",
    tag = "Agenda",
    params(
        ("professional_id" = Uuid, Path, description = "ID do Profissional"),
        AvailabilityQuery
    ),
    responses(
        (status = 200, description = "Horários livres na grade de 30 minutos", body = Vec<Candidate>),
        (status = 404, description = "Profissional não encontrado"),
        (status = 504, description = "Banco não respondeu a tempo")
    )
)]
pub async fn get_availability(
    State(app_state): State<AppState>,
    Path(professional_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<impl IntoResponse, AppError> {
    let candidates = app_state
        .availability_service
        .candidates_for(professional_id, query.date)
        .await?;

    Ok((StatusCode::OK, Json(candidates)))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: ShopStatus,
}

// GET /api/professionals/{professional_id}/status
#[utoipa::path(
    get,
    path = "/api/professionals/{professional_id}/status",
    tag = "Agenda",
    params(("professional_id" = Uuid, Path, description = "ID do Profissional")),
    responses(
        (status = 200, description = "Aberto, em almoço ou fechado agora", body = StatusResponse),
        (status = 404, description = "Profissional não encontrado")
    )
)]
pub async fn get_status(
    State(app_state): State<AppState>,
    Path(professional_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let status = app_state.schedule_service.current_status(professional_id).await?;
    Ok((StatusCode::OK, Json(StatusResponse { status })))
}

// GET /api/professionals/{professional_id}/services
#[utoipa::path(
    get,
    path = "/api/professionals/{professional_id}/services",
    tag = "Agenda",
    params(("professional_id" = Uuid, Path, description = "ID do Profissional")),
    responses(
        (status = 200, description = "Serviços ativos com preço efetivo", body = Vec<ServiceListing>)
    )
)]
pub async fn list_services(
    State(app_state): State<AppState>,
    Path(professional_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let services = app_state.schedule_service.active_services(professional_id).await?;

    let listings: Vec<ServiceListing> = services.into_iter().map(ServiceListing::from).collect();
    Ok((StatusCode::OK, Json(listings)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingPayload {
    pub professional_id: Uuid,

    #[schema(value_type = String, example = "2026-10-20")]
    pub date: NaiveDate,

    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "09:30")]
    pub time: i32,

    /// A ordem da lista define a ordem dos blocos de horário.
    #[validate(length(min = 1, message = "Selecione pelo menos um serviço."))]
    pub service_ids: Vec<Uuid>,
}

// POST /api/bookings
#[utoipa::path(
    post,
    path = "/api/bookings",
    tag = "Agenda",
    request_body = CreateBookingPayload,
    params(("x-client-id" = Uuid, Header, description = "ID do Cliente")),
    responses(
        (status = 201, description = "Serviços agendados em sequência", body = BookingConfirmation),
        (status = 409, description = "Horário não está mais disponível; nada foi gravado"),
        (status = 422, description = "Duração excede o horário, data sem expediente ou serviço inválido")
    )
)]
pub async fn create_booking(
    State(app_state): State<AppState>,
    client: ClientContext,
    Json(payload): Json<CreateBookingPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let confirmation = app_state
        .booking_service
        .book_selection(BookingSelection {
            professional_id: payload.professional_id,
            client_id: client.0,
            date: payload.date,
            time: payload.time,
            service_ids: payload.service_ids,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(confirmation)))
}
