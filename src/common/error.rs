// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

use crate::models::pipeline::Stage;

// Todos os erros do núcleo e da API passam por aqui.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] ValidationErrors),

    #[error("Fase desconhecida: '{0}'")]
    UnknownStage(String),

    #[error("Transição de fase não permitida: '{from}' -> '{to}'")]
    StageTransitionNotAllowed { from: Stage, to: Stage },

    #[error("Upload inválido: {0}")]
    InvalidUpload(String),

    #[error("Arquivo acima do limite de upload: {0}")]
    PayloadTooLarge(String),

    #[error("Cliente {0} não encontrado")]
    CustomerNotFound(i64),

    #[error("Cabeçalho x-crm-role ausente ou inválido")]
    MissingRole,

    #[error("Permissão '{0}' necessária")]
    Forbidden(&'static str),

    // Falha ao gravar/remover bytes no blob store
    #[error("Erro de E/S no armazenamento de documentos: {0}")]
    BlobIoError(#[from] std::io::Error),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro ao executar migrações: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Erro ao gerar a planilha: {0}")]
    ExportError(#[from] rust_xlsxwriter::XlsxError),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::UnknownStage(_)
            | AppError::StageTransitionNotAllowed { .. }
            | AppError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::CustomerNotFound(_) => StatusCode::NOT_FOUND,
            AppError::MissingRole => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BlobIoError(_)
            | AppError::DatabaseError(_)
            | AppError::MigrationError(_)
            | AppError::ExportError(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Monta um `ValidationError` para um único campo (ex: "owner" -> "unknown_owner").
pub fn field_error(field: &'static str, code: &'static str) -> AppError {
    let mut errors = ValidationErrors::new();
    let mut error = ValidationError::new(code);
    error.message = Some(code.into());
    errors.add(field, error);
    AppError::ValidationError(errors)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                })
            }

            // Erros 5xx: loga o detalhe, devolve mensagem genérica.
            ref e if status.is_server_error() => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                json!({ "error": "Ocorreu um erro inesperado." })
            }

            e => json!({ "error": e.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
