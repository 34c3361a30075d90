// src/common/db_utils.rs

use std::{future::Future, time::Duration};

use crate::common::error::AppError;

// ---
// Prazo rígido para chamadas ao banco
// ---
/// Toda chamada ao armazenamento passa por aqui. Estourar o prazo é tratado
/// exatamente como uma consulta que falhou: sem retry automático.
pub(crate) async fn with_deadline<T, F>(
    limit: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("⏱️ Operação '{}' excedeu o prazo de {:?}", operation, limit);
            Err(AppError::Timeout(operation))
        }
    }
}
