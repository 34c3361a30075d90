// src/services/booking_service.rs

use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::with_deadline,
        error::AppError,
        time::{add_minutes, minutes_to_time},
    },
    db::SchedulingStore,
    models::{
        booking_flow::{BookingFlow, BookingRequest},
        scheduling::{Appointment, AppointmentStatus, NewAppointment, Service, TimeWindow},
    },
    services::{
        availability_service::AvailabilityService,
        schedule_service::{works_on_date, ScheduleService},
    },
};

/// O que o cliente escolheu na vitrine, ainda sem validação.
#[derive(Debug, Clone)]
pub struct BookingSelection {
    pub professional_id: Uuid,
    pub client_id: Uuid,
    pub date: NaiveDate,
    pub time: i32,
    pub service_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub appointments: Vec<Appointment>,
    #[schema(example = 75)]
    pub total_duration: i32,
    #[schema(example = "90.00")]
    pub total_price: Decimal,
}

/// Blocos encostados, na ordem dos serviços: cada um começa onde o anterior termina.
pub fn plan_back_to_back(start: i32, services: &[Service]) -> Vec<TimeWindow> {
    let mut current = start;
    services
        .iter()
        .map(|service| {
            let window = TimeWindow::new(current, current + service.duration_minutes);
            current = window.end;
            window
        })
        .collect()
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn SchedulingStore>,
    schedule: ScheduleService,
    availability: AvailabilityService,
    deadline: Duration,
}

impl BookingService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        schedule: ScheduleService,
        availability: AvailabilityService,
        deadline: Duration,
    ) -> Self {
        Self { store, schedule, availability, deadline }
    }

    /// Resolve os ids na ordem pedida contra os serviços ativos do profissional.
    pub async fn resolve_services(&self, professional_id: Uuid, ids: &[Uuid]) -> Result<Vec<Service>, AppError> {
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Err(AppError::DuplicateService(*id));
            }
        }

        let available = self.schedule.active_services(professional_id).await?;

        ids.iter()
            .map(|id| {
                available
                    .iter()
                    .find(|s| s.id == *id)
                    .cloned()
                    .ok_or(AppError::ServiceNotFound(*id))
            })
            .collect()
    }

    /// Recalcula a disponibilidade no momento do pedido e monta o fluxo no servidor.
    pub async fn book_selection(&self, selection: BookingSelection) -> Result<BookingConfirmation, AppError> {
        if selection.service_ids.is_empty() {
            return Err(AppError::NoServicesSelected);
        }

        let professional = self.schedule.load_professional(selection.professional_id).await?;
        if !works_on_date(&professional, selection.date) {
            return Err(AppError::NotWorkingDate);
        }

        let mut flow = BookingFlow::start(professional.id);
        flow.choose_date(selection.date)?;

        let candidate = self
            .availability
            .candidates_for_professional(&professional, selection.date)
            .await?
            .into_iter()
            .find(|c| c.time == selection.time)
            .ok_or(AppError::SlotUnavailable)?;
        flow.choose_time(candidate)?;

        for service in self.resolve_services(professional.id, &selection.service_ids).await? {
            flow.add_service(service)?;
        }
        flow.review()?;

        self.book(flow.confirm(selection.client_id)?).await
    }

    /// Grava um agendamento por serviço, em sequência. Ou todos ficam, ou nenhum.
    pub async fn book(&self, request: BookingRequest) -> Result<BookingConfirmation, AppError> {
        if request.services.is_empty() {
            return Err(AppError::NoServicesSelected);
        }

        let professional = self.schedule.load_professional(request.professional_id).await?;
        if !works_on_date(&professional, request.date) {
            return Err(AppError::NotWorkingDate);
        }

        let requested = request.total_duration();
        if requested > request.candidate.max_duration {
            return Err(AppError::DurationExceedsCapacity {
                requested,
                available: request.candidate.max_duration,
            });
        }

        let plan = plan_back_to_back(request.candidate.time, &request.services);
        let mut booked: Vec<Appointment> = Vec::with_capacity(plan.len());

        for (service, window) in request.services.iter().zip(plan) {
            let new = NewAppointment {
                id: Uuid::new_v4(),
                professional_id: request.professional_id,
                client_id: request.client_id,
                service_id: service.id,
                date: request.date,
                window,
            };

            match with_deadline(self.deadline, "insert_appointment", self.store.insert_appointment(&new)).await {
                Ok(id) => booked.push(Appointment {
                    id,
                    professional_id: new.professional_id,
                    client_id: new.client_id,
                    service_id: new.service_id,
                    date: new.date,
                    window: new.window,
                    status: AppointmentStatus::Scheduled,
                    created_at: None,
                }),
                Err(err) => {
                    // A tentativa que falhou também entra: um timeout não prova que nada foi gravado.
                    let mut attempted: Vec<Uuid> = booked.iter().map(|a| a.id).collect();
                    attempted.push(new.id);
                    self.roll_back(&attempted).await?;
                    tracing::warn!(
                        "Agendamento desfeito ({} de {} confirmados) para {} em {} às {}: {}",
                        booked.len(),
                        request.services.len(),
                        request.professional_id,
                        request.date,
                        minutes_to_time(request.candidate.time),
                        err
                    );
                    return Err(AppError::BookingRolledBack(Box::new(err)));
                }
            }
        }

        let total_price = request.services.iter().map(Service::effective_price).sum();

        let start = minutes_to_time(request.candidate.time);
        tracing::info!(
            "✅ {} serviço(s) agendado(s) para {} em {} das {} às {}",
            booked.len(),
            request.professional_id,
            request.date,
            start,
            add_minutes(&start, requested)
        );

        Ok(BookingConfirmation { appointments: booked, total_duration: requested, total_price })
    }

    async fn roll_back(&self, inserted: &[Uuid]) -> Result<(), AppError> {
        if inserted.is_empty() {
            return Ok(());
        }

        match with_deadline(self.deadline, "delete_appointments", self.store.delete_appointments(inserted)).await {
            Ok(deleted) => {
                tracing::info!("Rollback removeu {} agendamento(s) de {} tentativa(s)", deleted, inserted.len());
                Ok(())
            }
            Err(e) => {
                tracing::error!("🔥 Falha no rollback, agendamentos órfãos {:?}: {}", inserted, e);
                Err(AppError::RollbackIncomplete { orphaned: inserted.to_vec() })
            }
        }
    }
}
