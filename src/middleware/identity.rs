// src/middleware/identity.rs

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::common::error::AppError;

// Os nomes dos nossos cabeçalhos HTTP customizados.
// A autenticação em si fica com o provedor externo; aqui só chegam os ids já resolvidos.
pub const CLIENT_ID_HEADER: &str = "x-client-id";
pub const PROFESSIONAL_ID_HEADER: &str = "x-professional-id";

#[derive(Debug, Clone, Copy)]
pub struct ClientContext(pub Uuid);

#[derive(Debug, Clone, Copy)]
pub struct ProfessionalContext(pub Uuid);

fn parse_uuid_header(
    parts: &Parts,
    header: &'static str,
    not_utf8: &'static str,
    not_uuid: &'static str,
) -> Result<Option<Uuid>, AppError> {
    let Some(value) = parts.headers.get(header) else {
        return Ok(None);
    };

    let value_str = value.to_str().map_err(|_| AppError::InvalidHeader(not_utf8))?;

    Uuid::parse_str(value_str.trim())
        .map(Some)
        .map_err(|_| AppError::InvalidHeader(not_uuid))
}

fn parse_client(parts: &Parts) -> Result<Option<ClientContext>, AppError> {
    Ok(parse_uuid_header(
        parts,
        CLIENT_ID_HEADER,
        "X-Client-ID contém caracteres inválidos",
        "X-Client-ID não é um UUID",
    )?
    .map(ClientContext))
}

fn parse_professional(parts: &Parts) -> Result<Option<ProfessionalContext>, AppError> {
    Ok(parse_uuid_header(
        parts,
        PROFESSIONAL_ID_HEADER,
        "X-Professional-ID contém caracteres inválidos",
        "X-Professional-ID não é um UUID",
    )?
    .map(ProfessionalContext))
}

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_client(parts)?.ok_or(AppError::InvalidHeader("X-Client-ID é obrigatório"))
    }
}

// Para rotas em que o cliente é opcional (ex.: mudança de status feita pelo profissional).
impl<S> OptionalFromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Option<Self>, Self::Rejection> {
        parse_client(parts)
    }
}

impl<S> FromRequestParts<S> for ProfessionalContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_professional(parts)?.ok_or(AppError::InvalidHeader("X-Professional-ID é obrigatório"))
    }
}

impl<S> OptionalFromRequestParts<S> for ProfessionalContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Option<Self>, Self::Rejection> {
        parse_professional(parts)
    }
}
