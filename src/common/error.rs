// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::scheduling::AppointmentStatus;

// Um único tipo de erro para repositórios, serviços e handlers.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Validação (rejeitado antes de qualquer escrita) ---
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Nenhum serviço selecionado")]
    NoServicesSelected,

    #[error("Serviço {0} selecionado mais de uma vez")]
    DuplicateService(Uuid),

    #[error("Serviço {0} não encontrado ou inativo para este profissional")]
    ServiceNotFound(Uuid),

    #[error("Duração total de {requested} min excede os {available} min livres neste horário")]
    DurationExceedsCapacity { requested: i32, available: i32 },

    #[error("O profissional não atende nesta data")]
    NotWorkingDate,

    #[error("Registro inválido vindo do banco: {0}")]
    InvalidRecord(String),

    // --- Não encontrados ---
    #[error("Profissional não encontrado")]
    ProfessionalNotFound,

    #[error("Agendamento não encontrado")]
    AppointmentNotFound,

    // --- Conflito definitivo ---
    #[error("Horário não está mais disponível")]
    SlotUnavailable,

    // --- Transientes (o chamador pode tentar de novo manualmente) ---
    #[error("Tempo limite excedido em '{0}'")]
    Timeout(&'static str),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // --- Falhas agregadas do agendamento com vários serviços ---
    #[error("Agendamento desfeito, nenhum agendamento foi criado: {0}")]
    BookingRolledBack(Box<AppError>),

    #[error("Falha ao desfazer agendamento parcial ({} registros órfãos)", .orphaned.len())]
    RollbackIncomplete { orphaned: Vec<Uuid> },

    // --- Máquinas de estado ---
    #[error("Transição de status inválida: {from:?} -> {to:?}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Esta parte não pode definir o status {0:?}")]
    StatusNotAllowedForParty(AppointmentStatus),

    #[error("Ação '{action}' inválida no estado '{state}' do agendamento")]
    InvalidFlowTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("Cabeçalho inválido: {0}")]
    InvalidHeader(&'static str),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Falhas transientes: o chamador pode repetir a mesma operação.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Timeout(_) | AppError::DatabaseError(_) => true,
            AppError::BookingRolledBack(inner) => inner.is_retryable(),
            _ => false,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::NoServicesSelected
            | AppError::DuplicateService(_)
            | AppError::InvalidHeader(_) => StatusCode::BAD_REQUEST,

            AppError::ServiceNotFound(_)
            | AppError::DurationExceedsCapacity { .. }
            | AppError::NotWorkingDate
            | AppError::InvalidStatusTransition { .. }
            | AppError::InvalidFlowTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            AppError::StatusNotAllowedForParty(_) => StatusCode::FORBIDDEN,

            AppError::ProfessionalNotFound | AppError::AppointmentNotFound => StatusCode::NOT_FOUND,

            AppError::SlotUnavailable => StatusCode::CONFLICT,

            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::DatabaseError(_) => StatusCode::SERVICE_UNAVAILABLE,

            AppError::BookingRolledBack(inner) => match inner.as_ref() {
                AppError::SlotUnavailable => StatusCode::CONFLICT,
                other => other.status_code(),
            },

            AppError::InvalidRecord(_)
            | AppError::RollbackIncomplete { .. }
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retryable = self.is_retryable();

        if let AppError::ValidationError(errors) = &self {
            let mut details = std::collections::HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = Json(json!({
                "error": "Um ou mais campos são inválidos.",
                "details": details,
                "retryable": false,
            }));
            return (status, body).into_response();
        }

        // O detalhe de erros internos fica só no log.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
            "Ocorreu um erro inesperado.".to_string()
        } else {
            if status.is_server_error() {
                tracing::warn!("Falha transiente: {}", self);
            }
            self.to_string()
        };

        let body = Json(json!({ "error": message, "retryable": retryable }));
        (status, body).into_response()
    }
}
