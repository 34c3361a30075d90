//src/main.rs

use axum::{
    routing::{get, patch, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppSettings, AppState};
use crate::docs::ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG tem prioridade; sem ele, nível info.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let settings = AppSettings::from_env()?;
    let pool = settings.connect().await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app_state = AppState::new(pool, &settings);

    let listener = TcpListener::bind(&settings.server_addr).await?;
    tracing::info!(
        "🚀 Servidor escutando em {} (fuso {})",
        listener.local_addr()?,
        settings.timezone
    );
    axum::serve(listener, app(app_state)).await?;

    Ok(())
}

fn app(app_state: AppState) -> Router {
    // Rotas da vitrine: disponibilidade, status e serviços do profissional
    let professional_routes = Router::new()
        .route("/{professional_id}/availability", get(handlers::scheduling::get_availability))
        .route("/{professional_id}/status", get(handlers::scheduling::get_status))
        .route("/{professional_id}/services", get(handlers::scheduling::list_services));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/professionals", professional_routes)
        .route("/api/bookings", post(handlers::scheduling::create_booking))
        .route("/api/appointments/{appointment_id}/status", patch(handlers::appointments::update_status))
        .with_state(app_state)
}
