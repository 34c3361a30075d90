// src/services/availability_service.rs

use std::{cmp::Ordering, sync::Arc, time::Duration};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::with_deadline,
        error::AppError,
        time::{round_up_to_step, CivilClock, DEFAULT_STEP},
    },
    db::SchedulingStore,
    models::scheduling::{Candidate, Professional, SlotOrigin, TimeWindow},
    services::schedule_service::{works_on_date, ScheduleService},
};

/// Percorre a grade de 30 em 30 minutos dentro do expediente.
///
/// `busy` são os intervalos ocupados (agendamentos e almoço), `slots` as
/// janelas reabertas. `now_floor` corta os horários já passados de hoje.
pub fn compute_candidates(
    professional: &Professional,
    busy: &[TimeWindow],
    slots: &[TimeWindow],
    now_floor: Option<i32>,
) -> Vec<Candidate> {
    let mut busy = busy.to_vec();
    if let Some(lunch) = professional.lunch {
        busy.push(lunch);
    }
    busy.sort_by_key(|w| w.start);

    let mut candidates = Vec::new();
    let mut cur = professional.opening;

    while cur < professional.closing {
        let time = cur;
        cur += DEFAULT_STEP;

        if now_floor.is_some_and(|floor| time < floor) {
            continue;
        }
        if busy.iter().any(|w| w.contains(time)) {
            continue;
        }

        let mut free_end = busy
            .iter()
            .find(|w| w.start > time)
            .map_or(professional.closing, |w| w.start)
            .min(professional.closing);

        // Slot reaberto limita a duração ao próprio fim, mesmo com agenda livre depois.
        let mut origin = SlotOrigin::Open;
        if let Some(slot_end) = slots.iter().filter(|s| s.start == time).map(|s| s.end).max() {
            free_end = free_end.min(slot_end);
            origin = SlotOrigin::Slot;
        }

        let max_duration = free_end - time;
        if max_duration > 0 {
            candidates.push(Candidate { time, origin, max_duration });
        }
    }

    candidates
}

#[derive(Clone)]
pub struct AvailabilityService {
    store: Arc<dyn SchedulingStore>,
    schedule: ScheduleService,
    clock: CivilClock,
    deadline: Duration,
}

impl AvailabilityService {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        schedule: ScheduleService,
        clock: CivilClock,
        deadline: Duration,
    ) -> Self {
        Self { store, schedule, clock, deadline }
    }

    pub async fn candidates_for(&self, professional_id: Uuid, date: NaiveDate) -> Result<Vec<Candidate>, AppError> {
        let professional = self.schedule.load_professional(professional_id).await?;
        self.candidates_for_professional(&professional, date).await
    }

    /// Falha fechada: qualquer erro de leitura vira erro para o chamador,
    /// nunca uma lista parcial.
    pub async fn candidates_for_professional(
        &self,
        professional: &Professional,
        date: NaiveDate,
    ) -> Result<Vec<Candidate>, AppError> {
        if !works_on_date(professional, date) {
            return Ok(Vec::new());
        }

        let (today, now) = self.clock.current_date_and_minutes();
        let now_floor = match date.cmp(&today) {
            Ordering::Less => return Ok(Vec::new()),
            Ordering::Equal => Some(round_up_to_step(now, DEFAULT_STEP)),
            Ordering::Greater => None,
        };

        let busy = with_deadline(
            self.deadline,
            "list_blocking_appointments",
            self.store.list_blocking_appointments(professional.id, date),
        )
        .await
        .inspect_err(|e| tracing::warn!("Disponibilidade indisponível para {}: {}", professional.id, e))?;

        let slots = with_deadline(
            self.deadline,
            "list_active_slots",
            self.store.list_active_slots(professional.id, date),
        )
        .await
        .inspect_err(|e| tracing::warn!("Disponibilidade indisponível para {}: {}", professional.id, e))?;

        let busy: Vec<TimeWindow> = busy.iter().map(|a| a.window).collect();
        let slots: Vec<TimeWindow> = slots.iter().map(|s| s.window).collect();

        Ok(compute_candidates(professional, &busy, &slots, now_floor))
    }
}
