// src/docs.rs

use utoipa::OpenApi;
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Agenda ---
        handlers::scheduling::get_availability,
        handlers::scheduling::get_status,
        handlers::scheduling::list_services,
        handlers::scheduling::create_booking,

        // --- Agendamentos ---
        handlers::appointments::update_status,
    ),
    components(
        schemas(
            // --- Agenda ---
            models::scheduling::TimeWindow,
            models::scheduling::Professional,
            models::scheduling::ShopStatus,
            models::scheduling::Service,
            models::scheduling::ServiceListing,
            models::scheduling::SlotOrigin,
            models::scheduling::Candidate,
            models::scheduling::TemporarySlot,

            // --- Agendamentos ---
            models::scheduling::AppointmentStatus,
            models::scheduling::Party,
            models::scheduling::Appointment,
            services::booking_service::BookingConfirmation,

            // --- Payloads ---
            handlers::scheduling::StatusResponse,
            handlers::scheduling::CreateBookingPayload,
            handlers::appointments::UpdateStatusPayload,
        )
    ),
    tags(
        (name = "Agenda", description = "Disponibilidade, serviços e reservas"),
        (name = "Agendamentos", description = "Ciclo de vida dos agendamentos")
    )
)]
pub struct ApiDoc;
