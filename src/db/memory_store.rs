// src/db/memory_store.rs
//
// Armazenamento em memória com o mesmo contrato do repositório PostgreSQL,
// usado pelos testes de serviço e de handler. Permite injetar falhas.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::SchedulingStore,
    models::scheduling::{
        Appointment, AppointmentStatus, NewAppointment, Professional, Service, TemporarySlot, TimeWindow,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertFault {
    /// Falha de rede/banco comum.
    Transient,
    /// O banco recusou por sobreposição (constraint de exclusão).
    Conflict,
    /// O insert grava, mas a resposta demora além de qualquer prazo.
    CommitThenStall,
}

#[derive(Default)]
struct State {
    professionals: HashMap<Uuid, Professional>,
    services: Vec<Service>,
    appointments: Vec<Appointment>,
    slots: Vec<TemporarySlot>,
    fail_reads: bool,
    fail_deletes: bool,
    stall: Option<Duration>,
    // (n, falha): a n-ésima tentativa de insert (1-based) falha.
    insert_fault: Option<(usize, InsertFault)>,
    insert_attempts: usize,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

fn transient() -> AppError {
    AppError::DatabaseError(sqlx::Error::PoolTimedOut)
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_professional(&self, professional: Professional) {
        self.lock().professionals.insert(professional.id, professional);
    }

    pub fn add_service(&self, service: Service) {
        self.lock().services.push(service);
    }

    pub fn add_appointment(&self, appointment: Appointment) {
        self.lock().appointments.push(appointment);
    }

    pub fn add_slot(&self, slot: TemporarySlot) {
        self.lock().slots.push(slot);
    }

    pub fn fail_reads(&self) {
        self.lock().fail_reads = true;
    }

    pub fn fail_deletes(&self) {
        self.lock().fail_deletes = true;
    }

    pub fn stall_calls(&self, delay: Duration) {
        self.lock().stall = Some(delay);
    }

    pub fn fail_insert(&self, attempt: usize, fault: InsertFault) {
        self.lock().insert_fault = Some((attempt, fault));
    }

    pub fn insert_attempts(&self) -> usize {
        self.lock().insert_attempts
    }

    pub fn appointments(&self) -> Vec<Appointment> {
        self.lock().appointments.clone()
    }

    pub fn slots(&self) -> Vec<TemporarySlot> {
        self.lock().slots.clone()
    }

    async fn before_call(&self) -> Result<(), AppError> {
        let (stall, fail) = {
            let state = self.lock();
            (state.stall, state.fail_reads)
        };
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        if fail { Err(transient()) } else { Ok(()) }
    }
}

#[async_trait]
impl SchedulingStore for InMemoryStore {
    async fn find_professional(&self, id: Uuid) -> Result<Option<Professional>, AppError> {
        self.before_call().await?;
        Ok(self.lock().professionals.get(&id).cloned())
    }

    async fn list_active_services(&self, professional_id: Uuid) -> Result<Vec<Service>, AppError> {
        self.before_call().await?;
        Ok(self
            .lock()
            .services
            .iter()
            .filter(|s| s.professional_id == professional_id && s.active)
            .cloned()
            .collect())
    }

    async fn list_blocking_appointments(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppError> {
        self.before_call().await?;
        let mut found: Vec<Appointment> = self
            .lock()
            .appointments
            .iter()
            .filter(|a| a.professional_id == professional_id && a.date == date && a.status.blocks_calendar())
            .cloned()
            .collect();
        found.sort_by_key(|a| a.window.start);
        Ok(found)
    }

    async fn list_active_slots(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TemporarySlot>, AppError> {
        self.before_call().await?;
        Ok(self
            .lock()
            .slots
            .iter()
            .filter(|s| s.professional_id == professional_id && s.date == date && s.active)
            .cloned()
            .collect())
    }

    async fn insert_appointment(&self, new: &NewAppointment) -> Result<Uuid, AppError> {
        let stall = self.lock().stall;
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }

        let stall_after_commit = {
            let mut state = self.lock();
            state.insert_attempts += 1;

            let fault = state
                .insert_fault
                .filter(|(attempt, _)| *attempt == state.insert_attempts)
                .map(|(_, fault)| fault);
            match fault {
                Some(InsertFault::Transient) => return Err(transient()),
                Some(InsertFault::Conflict) => return Err(AppError::SlotUnavailable),
                _ => {}
            }

            // Mesma regra da constraint de exclusão do banco.
            let overlaps = state.appointments.iter().any(|a| {
                a.professional_id == new.professional_id
                    && a.date == new.date
                    && a.status.blocks_calendar()
                    && a.window.overlaps(&new.window)
            });
            if overlaps {
                return Err(AppError::SlotUnavailable);
            }

            state.appointments.push(Appointment {
                id: new.id,
                professional_id: new.professional_id,
                client_id: new.client_id,
                service_id: new.service_id,
                date: new.date,
                window: new.window,
                status: AppointmentStatus::Scheduled,
                created_at: Some(Utc::now()),
            });
            fault == Some(InsertFault::CommitThenStall)
        };

        if stall_after_commit {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(new.id)
    }

    async fn delete_appointments(&self, ids: &[Uuid]) -> Result<u64, AppError> {
        let mut state = self.lock();
        if state.fail_deletes {
            return Err(transient());
        }
        let before = state.appointments.len();
        state.appointments.retain(|a| !ids.contains(&a.id));
        Ok((before - state.appointments.len()) as u64)
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>, AppError> {
        self.before_call().await?;
        Ok(self.lock().appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn update_appointment_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppError> {
        self.before_call().await?;
        let mut state = self.lock();
        match state.appointments.iter_mut().find(|a| a.id == id && a.status == expected) {
            Some(appointment) => {
                appointment.status = status;
                Ok(Some(appointment.clone()))
            }
            None => Ok(None),
        }
    }

    async fn insert_temporary_slot(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        window: TimeWindow,
    ) -> Result<Uuid, AppError> {
        self.before_call().await?;
        let id = Uuid::new_v4();
        self.lock().slots.push(TemporarySlot { id, professional_id, date, window, active: true });
        Ok(id)
    }
}

// ---
// Fixtures
// ---

pub fn professional(opening: i32, closing: i32) -> Professional {
    Professional {
        id: Uuid::new_v4(),
        display_name: "Barbeiro Teste".into(),
        working_days: BTreeSet::new(),
        opening,
        closing,
        lunch: None,
        active: true,
    }
}

pub fn service(professional_id: Uuid, name: &str, duration_minutes: i32, price_cents: i64) -> Service {
    Service {
        id: Uuid::new_v4(),
        professional_id,
        name: name.into(),
        duration_minutes,
        price: Decimal::new(price_cents, 2),
        promotional_price: None,
        active: true,
    }
}

pub fn appointment(professional_id: Uuid, date: NaiveDate, start: i32, end: i32) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        professional_id,
        client_id: Uuid::new_v4(),
        service_id: Uuid::new_v4(),
        date,
        window: TimeWindow::new(start, end),
        status: AppointmentStatus::Scheduled,
        created_at: None,
    }
}

pub fn slot(professional_id: Uuid, date: NaiveDate, start: i32, end: i32) -> TemporarySlot {
    TemporarySlot {
        id: Uuid::new_v4(),
        professional_id,
        date,
        window: TimeWindow::new(start, end),
        active: true,
    }
}
