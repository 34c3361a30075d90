// src/models/booking_flow.rs
//
// Fluxo de agendamento de uma sessão: data -> horário -> serviços -> confirmação.
// Nada aqui é persistido.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::scheduling::{Candidate, Service},
};

/// Tudo o que a transação de agendamento precisa, já validado pelo fluxo.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub professional_id: Uuid,
    pub client_id: Uuid,
    pub date: NaiveDate,
    pub candidate: Candidate,
    /// Na ordem escolhida; a ordem define a sequência dos blocos de horário.
    pub services: Vec<Service>,
}

impl BookingRequest {
    pub fn total_duration(&self) -> i32 {
        total_duration(&self.services)
    }
}

fn total_duration(services: &[Service]) -> i32 {
    services.iter().map(|s| s.duration_minutes).sum()
}

#[derive(Debug, Clone)]
pub enum BookingFlow {
    SelectingDate {
        professional_id: Uuid,
    },
    SelectingTime {
        professional_id: Uuid,
        date: NaiveDate,
    },
    SelectingServices {
        professional_id: Uuid,
        date: NaiveDate,
        candidate: Candidate,
        services: Vec<Service>,
    },
    Confirming {
        professional_id: Uuid,
        date: NaiveDate,
        candidate: Candidate,
        services: Vec<Service>,
    },
}

impl BookingFlow {
    pub fn start(professional_id: Uuid) -> Self {
        BookingFlow::SelectingDate { professional_id }
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            BookingFlow::SelectingDate { .. } => "SelectingDate",
            BookingFlow::SelectingTime { .. } => "SelectingTime",
            BookingFlow::SelectingServices { .. } => "SelectingServices",
            BookingFlow::Confirming { .. } => "Confirming",
        }
    }

    pub fn professional_id(&self) -> Uuid {
        match self {
            BookingFlow::SelectingDate { professional_id }
            | BookingFlow::SelectingTime { professional_id, .. }
            | BookingFlow::SelectingServices { professional_id, .. }
            | BookingFlow::Confirming { professional_id, .. } => *professional_id,
        }
    }

    fn reject(&self, action: &'static str) -> AppError {
        AppError::InvalidFlowTransition { state: self.state_name(), action }
    }

    /// Escolher (ou trocar) a data descarta horário e serviços.
    pub fn choose_date(&mut self, date: NaiveDate) -> Result<(), AppError> {
        match self {
            BookingFlow::SelectingDate { professional_id } | BookingFlow::SelectingTime { professional_id, .. } => {
                *self = BookingFlow::SelectingTime { professional_id: *professional_id, date };
                Ok(())
            }
            _ => Err(self.reject("choose_date")),
        }
    }

    pub fn choose_time(&mut self, candidate: Candidate) -> Result<(), AppError> {
        match self {
            BookingFlow::SelectingTime { professional_id, date } => {
                *self = BookingFlow::SelectingServices {
                    professional_id: *professional_id,
                    date: *date,
                    candidate,
                    services: Vec::new(),
                };
                Ok(())
            }
            _ => Err(self.reject("choose_time")),
        }
    }

    /// Recusa serviço repetido, de outro profissional, ou que estoure o tempo livre do horário.
    pub fn add_service(&mut self, service: Service) -> Result<(), AppError> {
        match self {
            BookingFlow::SelectingServices { professional_id, candidate, services, .. } => {
                if service.professional_id != *professional_id || !service.active {
                    return Err(AppError::ServiceNotFound(service.id));
                }
                if services.iter().any(|s| s.id == service.id) {
                    return Err(AppError::DuplicateService(service.id));
                }

                let requested = total_duration(services) + service.duration_minutes;
                if requested > candidate.max_duration {
                    return Err(AppError::DurationExceedsCapacity { requested, available: candidate.max_duration });
                }

                services.push(service);
                Ok(())
            }
            _ => Err(self.reject("add_service")),
        }
    }

    pub fn remove_service(&mut self, service_id: Uuid) -> Result<(), AppError> {
        match self {
            BookingFlow::SelectingServices { services, .. } => {
                services.retain(|s| s.id != service_id);
                Ok(())
            }
            _ => Err(self.reject("remove_service")),
        }
    }

    pub fn review(&mut self) -> Result<(), AppError> {
        match self {
            BookingFlow::SelectingServices { services, .. } if services.is_empty() => {
                Err(AppError::NoServicesSelected)
            }
            BookingFlow::SelectingServices { professional_id, date, candidate, services } => {
                *self = BookingFlow::Confirming {
                    professional_id: *professional_id,
                    date: *date,
                    candidate: *candidate,
                    services: std::mem::take(services),
                };
                Ok(())
            }
            _ => Err(self.reject("review")),
        }
    }

    /// Fecha o fluxo e entrega o pedido para a transação de agendamento.
    pub fn confirm(self, client_id: Uuid) -> Result<BookingRequest, AppError> {
        match self {
            BookingFlow::Confirming { professional_id, date, candidate, services } => Ok(BookingRequest {
                professional_id,
                client_id,
                date,
                candidate,
                services,
            }),
            other => Err(other.reject("confirm")),
        }
    }

    /// Volta um passo, descartando o que foi escolhido no passo atual.
    pub fn step_back(&mut self) {
        let professional_id = self.professional_id();
        *self = match std::mem::replace(self, BookingFlow::SelectingDate { professional_id }) {
            BookingFlow::SelectingDate { professional_id } => BookingFlow::SelectingDate { professional_id },
            BookingFlow::SelectingTime { professional_id, .. } => BookingFlow::SelectingDate { professional_id },
            BookingFlow::SelectingServices { professional_id, date, .. } => {
                BookingFlow::SelectingTime { professional_id, date }
            }
            BookingFlow::Confirming { professional_id, date, candidate, services } => {
                BookingFlow::SelectingServices { professional_id, date, candidate, services }
            }
        };
    }
}
