// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{common::error::AppError, middleware::role::CrmRole};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// 2. O Extractor (Guardião). Carrega o papel para o handler, se precisar.
pub struct RequirePermission<T>(pub CrmRole, pub PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // A. Extrai o papel
        let role = CrmRole::from_request_parts(parts, state).await?;

        // B. Confere na tabela estática
        let required_perm = T::slug();
        if !role.has_permission(required_perm) {
            tracing::warn!(role = ?role, permission = required_perm, "🚫 Acesso negado");
            return Err(AppError::Forbidden(required_perm));
        }

        Ok(RequirePermission(role, PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermCrmRead;
impl PermissionDef for PermCrmRead {
    fn slug() -> &'static str { "crm:read" }
}

pub struct PermCrmWrite;
impl PermissionDef for PermCrmWrite {
    fn slug() -> &'static str { "crm:write" }
}

pub struct PermCrmFilter;
impl PermissionDef for PermCrmFilter {
    fn slug() -> &'static str { "crm:filter" }
}

pub struct PermPipelineWrite;
impl PermissionDef for PermPipelineWrite {
    fn slug() -> &'static str { "crm:pipeline" }
}

pub struct PermDocumentWrite;
impl PermissionDef for PermDocumentWrite {
    fn slug() -> &'static str { "documents:write" }
}

pub struct PermReportExport;
impl PermissionDef for PermReportExport {
    fn slug() -> &'static str { "reports:export" }
}
