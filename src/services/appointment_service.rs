// src/services/appointment_service.rs

use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    common::{db_utils::with_deadline, error::AppError, time::CivilClock},
    db::SchedulingStore,
    models::scheduling::{Appointment, AppointmentStatus, Party},
};

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub appointment_id: Uuid,
    pub status: AppointmentStatus,
    pub requested_by: Party,
    /// Identidades vindas dos cabeçalhos. Cada parte só mexe nos agendamentos
    /// de que participa.
    pub client_id: Option<Uuid>,
    pub professional_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct AppointmentService {
    store: Arc<dyn SchedulingStore>,
    clock: CivilClock,
    deadline: Duration,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn SchedulingStore>, clock: CivilClock, deadline: Duration) -> Self {
        Self { store, clock, deadline }
    }

    pub async fn change_status(&self, change: StatusChange) -> Result<Appointment, AppError> {
        let current = with_deadline(
            self.deadline,
            "find_appointment",
            self.store.find_appointment(change.appointment_id),
        )
        .await?
        .ok_or(AppError::AppointmentNotFound)?;

        if !change.requested_by.may_set(change.status) {
            return Err(AppError::StatusNotAllowedForParty(change.status));
        }
        let participates = match change.requested_by {
            Party::Client => change.client_id == Some(current.client_id),
            Party::Professional => change.professional_id == Some(current.professional_id),
        };
        if !participates {
            return Err(AppError::StatusNotAllowedForParty(change.status));
        }
        if !current.status.can_transition_to(change.status) {
            return Err(AppError::InvalidStatusTransition { from: current.status, to: change.status });
        }

        let (today, now) = self.clock.current_date_and_minutes();
        let has_ended = current.date < today || (current.date == today && current.window.end <= now);
        let has_started = current.date < today || (current.date == today && current.window.start <= now);

        if change.status == AppointmentStatus::NoShow && !has_ended {
            return Err(AppError::InvalidStatusTransition { from: current.status, to: change.status });
        }

        let updated = with_deadline(
            self.deadline,
            "update_appointment_status",
            self.store.update_appointment_status(current.id, current.status, change.status),
        )
        .await?
        // Outra sessão mudou o status entre a leitura e a escrita.
        .ok_or(AppError::InvalidStatusTransition { from: current.status, to: change.status })?;

        tracing::info!(
            "Agendamento {} mudou de {} para {}",
            updated.id,
            current.status.as_str(),
            updated.status.as_str()
        );

        // O intervalo liberado volta como slot temporário. Se falhar, o horário
        // continua livre pela agenda comum; só perde a marcação de slot.
        if change.status.is_cancellation() && !has_started {
            if let Err(e) = with_deadline(
                self.deadline,
                "insert_temporary_slot",
                self.store.insert_temporary_slot(updated.professional_id, updated.date, updated.window),
            )
            .await
            {
                tracing::warn!("Slot temporário não criado para o agendamento {}: {}", updated.id, e);
            }
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_store::{appointment, InMemoryStore};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    // Segunda, 10:00 em São Paulo.
    fn service(store: Arc<InMemoryStore>) -> AppointmentService {
        let clock = CivilClock::frozen(
            chrono_tz::America::Sao_Paulo,
            Utc.with_ymd_and_hms(2026, 10, 19, 13, 0, 0).unwrap(),
        );
        AppointmentService::new(store, clock, Duration::from_millis(200))
    }

    fn seeded(date: NaiveDate, start: i32, end: i32) -> (Arc<InMemoryStore>, Appointment) {
        let store = Arc::new(InMemoryStore::new());
        let booked = appointment(Uuid::new_v4(), date, start, end);
        store.add_appointment(booked.clone());
        (store, booked)
    }

    fn change(booked: &Appointment, status: AppointmentStatus, by: Party) -> StatusChange {
        StatusChange {
            appointment_id: booked.id,
            status,
            requested_by: by,
            client_id: (by == Party::Client).then_some(booked.client_id),
            professional_id: (by == Party::Professional).then_some(booked.professional_id),
        }
    }

    #[tokio::test]
    async fn professional_confirms_then_completes() {
        let (store, booked) = seeded(monday(), 540, 570);
        let svc = service(store);

        let confirmed = svc.change_status(change(&booked, AppointmentStatus::Confirmed, Party::Professional)).await.unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        let completed = svc.change_status(change(&booked, AppointmentStatus::Completed, Party::Professional)).await.unwrap();
        assert_eq!(completed.status, AppointmentStatus::Completed);
    }

    #[tokio::test]
    async fn client_cancellation_reopens_a_slot() {
        let tomorrow = monday().succ_opt().unwrap();
        let (store, booked) = seeded(tomorrow, 840, 870);
        let svc = service(store.clone());

        let cancelled = svc
            .change_status(change(&booked, AppointmentStatus::CancelledByClient, Party::Client))
            .await
            .unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::CancelledByClient);

        let slots = store.slots();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].window, booked.window);
        assert_eq!(slots[0].date, tomorrow);
    }

    #[tokio::test]
    async fn clients_only_cancel_their_own_appointments() {
        let (store, booked) = seeded(monday().succ_opt().unwrap(), 840, 870);
        let svc = service(store);

        let mut foreign = change(&booked, AppointmentStatus::CancelledByClient, Party::Client);
        foreign.client_id = Some(Uuid::new_v4());
        assert!(matches!(svc.change_status(foreign).await, Err(AppError::StatusNotAllowedForParty(_))));

        let confirm = change(&booked, AppointmentStatus::Confirmed, Party::Client);
        assert!(matches!(svc.change_status(confirm).await, Err(AppError::StatusNotAllowedForParty(_))));
    }

    #[tokio::test]
    async fn professionals_only_touch_their_own_agenda() {
        let (store, booked) = seeded(monday().succ_opt().unwrap(), 840, 870);
        let svc = service(store.clone());

        let mut other_barber = change(&booked, AppointmentStatus::CancelledByProfessional, Party::Professional);
        other_barber.professional_id = Some(Uuid::new_v4());
        assert!(matches!(svc.change_status(other_barber).await, Err(AppError::StatusNotAllowedForParty(_))));

        let mut anonymous = change(&booked, AppointmentStatus::Confirmed, Party::Professional);
        anonymous.professional_id = None;
        assert!(matches!(svc.change_status(anonymous).await, Err(AppError::StatusNotAllowedForParty(_))));

        // O cliente dono do agendamento não vira profissional só por dizer que é.
        let mut posing = change(&booked, AppointmentStatus::Confirmed, Party::Professional);
        posing.professional_id = None;
        posing.client_id = Some(booked.client_id);
        assert!(matches!(svc.change_status(posing).await, Err(AppError::StatusNotAllowedForParty(_))));

        assert_eq!(store.appointments()[0].status, AppointmentStatus::Scheduled);
        assert!(store.slots().is_empty());
    }

    #[tokio::test]
    async fn terminal_states_stay_terminal() {
        let (store, booked) = seeded(monday().succ_opt().unwrap(), 840, 870);
        let svc = service(store);

        svc.change_status(change(&booked, AppointmentStatus::CancelledByProfessional, Party::Professional))
            .await
            .unwrap();
        let err = svc
            .change_status(change(&booked, AppointmentStatus::Confirmed, Party::Professional))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidStatusTransition {
                from: AppointmentStatus::CancelledByProfessional,
                to: AppointmentStatus::Confirmed
            }
        ));
    }

    #[tokio::test]
    async fn no_show_only_after_the_appointment_ended() {
        let (store, upcoming) = seeded(monday(), 630, 660);
        let past = appointment(upcoming.professional_id, monday(), 540, 570);
        store.add_appointment(past.clone());
        let svc = service(store.clone());

        assert!(svc
            .change_status(change(&upcoming, AppointmentStatus::NoShow, Party::Professional))
            .await
            .is_err());
        let marked = svc
            .change_status(change(&past, AppointmentStatus::NoShow, Party::Professional))
            .await
            .unwrap();
        assert_eq!(marked.status, AppointmentStatus::NoShow);
        assert!(store.slots().is_empty());
    }

    #[tokio::test]
    async fn unknown_appointments_are_not_found() {
        let svc = service(Arc::new(InMemoryStore::new()));
        let missing = StatusChange {
            appointment_id: Uuid::new_v4(),
            status: AppointmentStatus::Confirmed,
            requested_by: Party::Professional,
            client_id: None,
            professional_id: Some(Uuid::new_v4()),
        };
        assert!(matches!(svc.change_status(missing).await, Err(AppError::AppointmentNotFound)));
    }
}
