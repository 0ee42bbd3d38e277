// src/middleware/role.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use utoipa::ToSchema;

use crate::common::error::AppError;

// O nome do nosso cabeçalho HTTP customizado
pub const ROLE_HEADER: &str = "x-crm-role";

/// Qual das duas telas está chamando a API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CrmRole {
    /// Tela completa: filtros, funil, notas, exportação
    Manager,
    /// Tela de inserção: lista, cadastro e upload
    Operator,
}

impl CrmRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manager" => Some(CrmRole::Manager),
            "operator" => Some(CrmRole::Operator),
            _ => None,
        }
    }

    pub fn permissions(self) -> &'static [&'static str] {
        match self {
            CrmRole::Manager => &[
                "crm:read",
                "crm:write",
                "crm:filter",
                "crm:pipeline",
                "documents:write",
                "reports:export",
            ],
            CrmRole::Operator => &["crm:read", "crm:write", "documents:write"],
        }
    }

    pub fn has_permission(self, slug: &str) -> bool {
        self.permissions().contains(&slug)
    }
}

impl<S> FromRequestParts<S> for CrmRole
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(CrmRole::parse)
            .ok_or(AppError::MissingRole)
    }
}
