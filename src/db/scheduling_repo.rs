// src/db/scheduling_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        time::{minutes_to_time, time_to_minutes},
    },
    models::scheduling::{
        Appointment, AppointmentStatus, NewAppointment, Professional, Service, TemporarySlot, TimeWindow,
    },
    services::schedule_service::normalize_working_days,
};

// SQLSTATE de violação de EXCLUDE (o unique é 23505, coberto por is_unique_violation).
const EXCLUSION_VIOLATION: &str = "23P01";

/// O "sistema de registro" da agenda. O núcleo só conversa com o banco por aqui.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn find_professional(&self, id: Uuid) -> Result<Option<Professional>, AppError>;

    async fn list_active_services(&self, professional_id: Uuid) -> Result<Vec<Service>, AppError>;

    /// Agendamentos que ainda ocupam a agenda (nem cancelados, nem no-show), ordenados pelo início.
    async fn list_blocking_appointments(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppError>;

    async fn list_active_slots(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TemporarySlot>, AppError>;

    /// Devolve o id inserido, ou `AppError::SlotUnavailable` se o banco recusar por sobreposição.
    async fn insert_appointment(&self, new: &NewAppointment) -> Result<Uuid, AppError>;

    async fn delete_appointments(&self, ids: &[Uuid]) -> Result<u64, AppError>;

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>, AppError>;

    /// Troca o status só se o atual ainda for `expected`. `None` quando outra
    /// sessão mudou o registro antes.
    async fn update_appointment_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppError>;

    async fn insert_temporary_slot(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        window: TimeWindow,
    ) -> Result<Uuid, AppError>;
}

// ---
// Linhas cruas do banco. A conversão para as entidades tipadas acontece aqui, na borda.
// ---

#[derive(Debug, FromRow)]
struct ProfessionalRow {
    id: Uuid,
    display_name: String,
    working_days: Option<Vec<i32>>,
    opening_time: String,
    closing_time: String,
    lunch_start: Option<String>,
    lunch_end: Option<String>,
    active: bool,
}

impl TryFrom<ProfessionalRow> for Professional {
    type Error = AppError;

    fn try_from(row: ProfessionalRow) -> Result<Self, Self::Error> {
        let opening = time_to_minutes(&row.opening_time);
        let closing = time_to_minutes(&row.closing_time);
        if opening >= closing {
            return Err(AppError::InvalidRecord(format!(
                "profissional {}: abertura {} não é anterior ao fechamento {}",
                row.id, row.opening_time, row.closing_time
            )));
        }

        let lunch = match (row.lunch_start.as_deref(), row.lunch_end.as_deref()) {
            (Some(start), Some(end)) => {
                let window = TimeWindow::new(time_to_minutes(start), time_to_minutes(end));
                if window.start < window.end && window.start >= opening && window.end <= closing {
                    Some(window)
                } else {
                    tracing::warn!(
                        "Almoço {}-{} fora do expediente do profissional {}; ignorado",
                        start,
                        end,
                        row.id
                    );
                    None
                }
            }
            _ => None,
        };

        Ok(Professional {
            id: row.id,
            display_name: row.display_name,
            working_days: normalize_working_days(row.working_days.as_deref()),
            opening,
            closing,
            lunch,
            active: row.active,
        })
    }
}

#[derive(Debug, FromRow)]
struct ServiceRow {
    id: Uuid,
    professional_id: Uuid,
    name: String,
    duration_minutes: i32,
    price: Decimal,
    promotional_price: Option<Decimal>,
    active: bool,
}

impl TryFrom<ServiceRow> for Service {
    type Error = AppError;

    fn try_from(row: ServiceRow) -> Result<Self, Self::Error> {
        if row.duration_minutes <= 0 {
            return Err(AppError::InvalidRecord(format!(
                "serviço {}: duração {} min",
                row.id, row.duration_minutes
            )));
        }
        if row.price.is_sign_negative() {
            return Err(AppError::InvalidRecord(format!("serviço {}: preço negativo", row.id)));
        }

        Ok(Service {
            id: row.id,
            professional_id: row.professional_id,
            name: row.name,
            duration_minutes: row.duration_minutes,
            price: row.price,
            promotional_price: row.promotional_price.filter(|p| *p > Decimal::ZERO),
            active: row.active,
        })
    }
}

#[derive(Debug, FromRow)]
struct AppointmentRow {
    id: Uuid,
    professional_id: Uuid,
    client_id: Uuid,
    service_id: Uuid,
    appointment_date: NaiveDate,
    start_time: String,
    end_time: String,
    status: AppointmentStatus,
    created_at: Option<DateTime<Utc>>,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Appointment {
            id: row.id,
            professional_id: row.professional_id,
            client_id: row.client_id,
            service_id: row.service_id,
            date: row.appointment_date,
            window: TimeWindow::new(time_to_minutes(&row.start_time), time_to_minutes(&row.end_time)),
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SlotRow {
    id: Uuid,
    professional_id: Uuid,
    slot_date: NaiveDate,
    start_time: String,
    end_time: String,
    active: bool,
}

impl From<SlotRow> for TemporarySlot {
    fn from(row: SlotRow) -> Self {
        TemporarySlot {
            id: row.id,
            professional_id: row.professional_id,
            date: row.slot_date,
            window: TimeWindow::new(time_to_minutes(&row.start_time), time_to_minutes(&row.end_time)),
            active: row.active,
        }
    }
}

const APPOINTMENT_COLUMNS: &str = r#"
    id, professional_id, client_id, service_id, appointment_date,
    to_char(start_time, 'HH24:MI') AS start_time,
    to_char(end_time, 'HH24:MI') AS end_time,
    status, created_at
"#;

// ---
// Implementação PostgreSQL
// ---

#[derive(Clone)]
pub struct SchedulingRepository {
    pool: PgPool,
}

impl SchedulingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchedulingStore for SchedulingRepository {
    async fn find_professional(&self, id: Uuid) -> Result<Option<Professional>, AppError> {
        let row = sqlx::query_as::<_, ProfessionalRow>(
            r#"
            SELECT
                id, display_name, working_days,
                to_char(opening_time, 'HH24:MI') AS opening_time,
                to_char(closing_time, 'HH24:MI') AS closing_time,
                to_char(lunch_start, 'HH24:MI') AS lunch_start,
                to_char(lunch_end, 'HH24:MI') AS lunch_end,
                active
            FROM professionals
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Professional::try_from).transpose()
    }

    async fn list_active_services(&self, professional_id: Uuid) -> Result<Vec<Service>, AppError> {
        let rows = sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT id, professional_id, name, duration_minutes, price, promotional_price, active
            FROM services
            WHERE professional_id = $1 AND active = TRUE
            ORDER BY name ASC
            "#,
        )
        .bind(professional_id)
        .fetch_all(&self.pool)
        .await?;

        // Um serviço malformado não derruba a vitrine inteira.
        let services = rows
            .into_iter()
            .filter_map(|row| match Service::try_from(row) {
                Ok(service) => Some(service),
                Err(e) => {
                    tracing::warn!("Serviço ignorado: {}", e);
                    None
                }
            })
            .collect();

        Ok(services)
    }

    async fn list_blocking_appointments(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppError> {
        let sql = format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointments
            WHERE professional_id = $1
              AND appointment_date = $2
              AND status::text = ANY($3)
            ORDER BY start_time ASC
            "#
        );

        let rows = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(professional_id)
            .bind(date)
            .bind(AppointmentStatus::BLOCKING.map(|s| s.as_str().to_string()).to_vec())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Appointment::from).collect())
    }

    async fn list_active_slots(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TemporarySlot>, AppError> {
        let rows = sqlx::query_as::<_, SlotRow>(
            r#"
            SELECT
                id, professional_id, slot_date,
                to_char(start_time, 'HH24:MI') AS start_time,
                to_char(end_time, 'HH24:MI') AS end_time,
                active
            FROM temporary_slots
            WHERE professional_id = $1 AND slot_date = $2 AND active = TRUE
            ORDER BY start_time ASC
            "#,
        )
        .bind(professional_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TemporarySlot::from).collect())
    }

    async fn insert_appointment(&self, new: &NewAppointment) -> Result<Uuid, AppError> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO appointments (
                id, professional_id, client_id, service_id, appointment_date,
                start_time, end_time, status
            )
            VALUES ($1, $2, $3, $4, $5, $6::time, $7::time, 'scheduled')
            RETURNING id
            "#,
        )
        .bind(new.id)
        .bind(new.professional_id)
        .bind(new.client_id)
        .bind(new.service_id)
        .bind(new.date)
        .bind(minutes_to_time(new.window.start))
        .bind(minutes_to_time(new.window.end))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // A constraint de exclusão do banco é a palavra final sobre sobreposição.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() || db_err.code().as_deref() == Some(EXCLUSION_VIOLATION) {
                    return AppError::SlotUnavailable;
                }
            }
            AppError::DatabaseError(e)
        })
    }

    async fn delete_appointments(&self, ids: &[Uuid]) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>, AppError> {
        let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");

        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Appointment::from))
    }

    async fn update_appointment_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        status: AppointmentStatus,
    ) -> Result<Option<Appointment>, AppError> {
        let sql = format!(
            r#"
            UPDATE appointments
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(status)
            .bind(id)
            .bind(expected)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Appointment::from))
    }

    async fn insert_temporary_slot(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        window: TimeWindow,
    ) -> Result<Uuid, AppError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO temporary_slots (professional_id, slot_date, start_time, end_time, active)
            VALUES ($1, $2, $3::time, $4::time, TRUE)
            RETURNING id
            "#,
        )
        .bind(professional_id)
        .bind(date)
        .bind(minutes_to_time(window.start))
        .bind(minutes_to_time(window.end))
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }
}
