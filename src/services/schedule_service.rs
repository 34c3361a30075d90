// src/services/schedule_service.rs

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::with_deadline,
        error::AppError,
        time::{day_of_week, CivilClock},
    },
    db::SchedulingStore,
    models::scheduling::{Professional, Service, ShopStatus},
};

/// Normaliza os dias de atendimento: 7 vira 0 (domingo), fora de [0, 6] é
/// descartado, repetidos somem. Conjunto vazio = atende todos os dias.
pub fn normalize_working_days(raw: Option<&[i32]>) -> BTreeSet<u8> {
    raw.unwrap_or_default()
        .iter()
        .map(|&day| if day == 7 { 0 } else { day })
        .filter(|day| (0..=6).contains(day))
        .map(|day| day as u8)
        .collect()
}

pub fn works_on_date(professional: &Professional, date: NaiveDate) -> bool {
    professional.active
        && (professional.working_days.is_empty() || professional.working_days.contains(&day_of_week(date)))
}

/// CLOSED vence LUNCH, que vence OPEN.
pub fn status_at(professional: &Professional, date: NaiveDate, now: i32) -> ShopStatus {
    if !works_on_date(professional, date) || !professional.working_window().contains(now) {
        return ShopStatus::Closed;
    }
    match professional.lunch {
        Some(lunch) if lunch.contains(now) => ShopStatus::Lunch,
        _ => ShopStatus::Open,
    }
}

#[derive(Clone)]
pub struct ScheduleService {
    store: Arc<dyn SchedulingStore>,
    clock: CivilClock,
    deadline: Duration,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn SchedulingStore>, clock: CivilClock, deadline: Duration) -> Self {
        Self { store, clock, deadline }
    }

    pub async fn load_professional(&self, professional_id: Uuid) -> Result<Professional, AppError> {
        with_deadline(self.deadline, "find_professional", self.store.find_professional(professional_id))
            .await?
            .ok_or(AppError::ProfessionalNotFound)
    }

    pub async fn active_services(&self, professional_id: Uuid) -> Result<Vec<Service>, AppError> {
        with_deadline(
            self.deadline,
            "list_active_services",
            self.store.list_active_services(professional_id),
        )
        .await
    }

    pub async fn current_status(&self, professional_id: Uuid) -> Result<ShopStatus, AppError> {
        let professional = self.load_professional(professional_id).await?;
        let (today, now) = self.clock.current_date_and_minutes();
        Ok(status_at(&professional, today, now))
    }
}
