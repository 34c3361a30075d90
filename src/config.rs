// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use chrono_tz::Tz;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::time::CivilClock,
    db::{SchedulingRepository, SchedulingStore},
    services::{AppointmentService, AvailabilityService, BookingService, ScheduleService},
};

const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub database_url: String,
    pub timezone: Tz,
    /// Prazo rígido de cada chamada ao banco.
    pub store_timeout: Duration,
    pub max_connections: u32,
    pub server_addr: String,
}

impl AppSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Lê as configurações de qualquer fonte chave -> valor.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL deve ser definida")?;

        let tz_name = lookup("BUSINESS_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = tz_name
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("BUSINESS_TIMEZONE inválido '{}': {}", tz_name, e))?;

        let store_timeout_ms = match lookup("STORE_TIMEOUT_MS") {
            Some(raw) => raw.parse::<u64>().context("STORE_TIMEOUT_MS deve ser um inteiro")?,
            None => DEFAULT_STORE_TIMEOUT_MS,
        };
        anyhow::ensure!(store_timeout_ms > 0, "STORE_TIMEOUT_MS deve ser maior que zero");

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse::<u32>().context("DB_MAX_CONNECTIONS deve ser um inteiro")?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            timezone,
            store_timeout: Duration::from_millis(store_timeout_ms),
            max_connections,
            server_addr: lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
        })
    }

    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.store_timeout)
            .connect(&self.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        Ok(pool)
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub schedule_service: ScheduleService,
    pub availability_service: AvailabilityService,
    pub booking_service: BookingService,
    pub appointment_service: AppointmentService,
}

impl AppState {
    pub fn new(pool: PgPool, settings: &AppSettings) -> Self {
        let clock = CivilClock::new(settings.timezone);
        Self::with_store(Arc::new(SchedulingRepository::new(pool)), clock, settings.store_timeout)
    }

    /// Monta o gráfico de dependências sobre qualquer armazenamento.
    pub fn with_store(store: Arc<dyn SchedulingStore>, clock: CivilClock, deadline: Duration) -> Self {
        let schedule_service = ScheduleService::new(store.clone(), clock.clone(), deadline);
        let availability_service =
            AvailabilityService::new(store.clone(), schedule_service.clone(), clock.clone(), deadline);
        let booking_service = BookingService::new(
            store.clone(),
            schedule_service.clone(),
            availability_service.clone(),
            deadline,
        );
        let appointment_service = AppointmentService::new(store, clock, deadline);

        Self {
            schedule_service,
            availability_service,
            booking_service,
            appointment_service,
        }
    }
}
