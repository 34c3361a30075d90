// src/models/scheduling.rs

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Minutos desde a meia-noite <-> "HH:MM" no JSON.
pub mod hhmm {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use crate::common::time::{minutes_to_time, parse_time_strict};

    pub fn serialize<S: Serializer>(minutes: &i32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&minutes_to_time(*minutes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_time_strict(&raw).ok_or_else(|| D::Error::custom(format!("horário inválido: '{raw}'")))
    }
}

/// Intervalo semiaberto `[start, end)` em minutos desde a meia-noite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "12:00")]
    pub start: i32,
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "13:00")]
    pub end: i32,
}

impl TimeWindow {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, minute: i32) -> bool {
        self.start <= minute && minute < self.end
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration(&self) -> i32 {
        self.end - self.start
    }
}

// --- Profissional ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Professional {
    pub id: Uuid,
    #[schema(example = "João Barbeiro")]
    pub display_name: String,
    /// Dias normalizados (0 = domingo). Vazio significa "atende todos os dias".
    #[schema(value_type = Vec<u8>)]
    pub working_days: BTreeSet<u8>,
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "08:00")]
    pub opening: i32,
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "18:00")]
    pub closing: i32,
    pub lunch: Option<TimeWindow>,
    pub active: bool,
}

impl Professional {
    pub fn working_window(&self) -> TimeWindow {
        TimeWindow::new(self.opening, self.closing)
    }
}

/// Situação atual do estabelecimento do profissional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShopStatus {
    Closed,
    Lunch,
    Open,
}

// --- Serviço ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Uuid,
    pub professional_id: Uuid,
    #[schema(example = "Corte + Barba")]
    pub name: String,
    #[schema(example = 45)]
    pub duration_minutes: i32,
    #[schema(example = "50.00")]
    pub price: Decimal,
    #[schema(example = "40.00")]
    pub promotional_price: Option<Decimal>,
    pub active: bool,
}

impl Service {
    /// Preço promocional quando positivo e menor que o base; senão o base.
    pub fn effective_price(&self) -> Decimal {
        match self.promotional_price {
            Some(promo) if promo > Decimal::ZERO && promo < self.price => promo,
            _ => self.price,
        }
    }

    pub fn has_valid_promotion(&self) -> bool {
        self.effective_price() != self.price
    }
}

/// Serviço como aparece na vitrine pública.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceListing {
    #[serde(flatten)]
    pub service: Service,
    #[schema(example = "40.00")]
    pub effective_price: Decimal,
    pub on_promotion: bool,
}

impl From<Service> for ServiceListing {
    fn from(service: Service) -> Self {
        Self {
            effective_price: service.effective_price(),
            on_promotion: service.has_valid_promotion(),
            service,
        }
    }
}

// --- Agendamento ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")] // Banco
#[serde(rename_all = "SCREAMING_SNAKE_CASE")] // JSON
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    CancelledByClient,
    CancelledByProfessional,
    NoShow,
}

impl AppointmentStatus {
    /// Status cujo intervalo ainda ocupa a agenda.
    pub const BLOCKING: [AppointmentStatus; 3] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
    ];

    pub fn blocks_calendar(self) -> bool {
        Self::BLOCKING.contains(&self)
    }

    pub fn is_cancellation(self) -> bool {
        matches!(
            self,
            AppointmentStatus::CancelledByClient | AppointmentStatus::CancelledByProfessional
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed
                | AppointmentStatus::CancelledByClient
                | AppointmentStatus::CancelledByProfessional
                | AppointmentStatus::NoShow
        )
    }

    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (Scheduled, Confirmed) => true,
            (Confirmed, Completed) => true,
            (Scheduled | Confirmed, CancelledByClient | CancelledByProfessional | NoShow) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::CancelledByClient => "cancelled_by_client",
            AppointmentStatus::CancelledByProfessional => "cancelled_by_professional",
            AppointmentStatus::NoShow => "no_show",
        }
    }
}

/// Quem pede a mudança de status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Party {
    Client,
    Professional,
}

impl Party {
    pub fn may_set(self, status: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        match self {
            Party::Client => status == CancelledByClient,
            Party::Professional => matches!(status, Confirmed | Completed | CancelledByProfessional | NoShow),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub window: TimeWindow,
    pub status: AppointmentStatus,
    pub created_at: Option<DateTime<Utc>>,
}

/// Dados para inserir um agendamento. Sempre nasce como `Scheduled`.
/// O id é gerado antes do insert para que o rollback alcance até uma
/// tentativa cuja resposta se perdeu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub client_id: Uuid,
    pub service_id: Uuid,
    pub date: NaiveDate,
    pub window: TimeWindow,
}

// --- Slot temporário (reaberto após cancelamento) ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemporarySlot {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub window: TimeWindow,
    pub active: bool,
}

// --- Horários candidatos ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotOrigin {
    /// Agenda livre comum.
    Open,
    /// Janela reaberta por cancelamento.
    Slot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "09:30")]
    pub time: i32,
    pub origin: SlotOrigin,
    #[schema(example = 90)]
    pub max_duration: i32,
}
