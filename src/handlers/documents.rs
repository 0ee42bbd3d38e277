// src/handlers/documents.rs

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{PermCrmRead, PermDocumentWrite, RequirePermission},
    models::documents::Document,
};

/// Formulário multipart do upload (apenas para a documentação).
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct UploadDocumentForm {
    /// O arquivo (pdf, jpg, jpeg, png, docx)
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,

    /// Opcional, padrão "Generic"
    #[schema(example = "Generic")]
    document_type: Option<String>,
}

/// Mantém o status do próprio erro de multipart: 413 quando o corpo
/// passa do limite, 400 para o resto.
fn upload_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::InvalidUpload(e.body_text())
    }
}

// POST /api/crm/customers/{id}/documents
#[utoipa::path(
    post,
    path = "/api/crm/customers/{id}/documents",
    tag = "Documents",
    params(("id" = i64, Path, description = "ID do cliente")),
    request_body(content = UploadDocumentForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Documento anexado", body = Document),
        (status = 400, description = "Arquivo ausente ou extensão não aceita"),
        (status = 413, description = "Arquivo acima de MAX_UPLOAD_BYTES"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("crm_role" = []))
)]
pub async fn upload_document(
    State(app_state): State<AppState>,
    _perm: RequirePermission<PermDocumentWrite>,
    Path(customer_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut document_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(upload_error)?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::InvalidUpload("o campo 'file' não tem nome de arquivo".into()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(upload_error)?;
                file = Some((file_name, bytes.to_vec()));
            }
            Some("documentType") => {
                let text = field
                    .text()
                    .await
                    .map_err(upload_error)?;
                document_type = Some(text);
            }
            // Campos desconhecidos são ignorados
            _ => {}
        }
    }

    let (file_name, content) =
        file.ok_or_else(|| AppError::InvalidUpload("campo 'file' ausente".into()))?;

    let document = app_state
        .document_service
        .attach_document(customer_id, &file_name, &content, document_type.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(document)))
}

// GET /api/crm/customers/{id}/documents
#[utoipa::path(
    get,
    path = "/api/crm/customers/{id}/documents",
    tag = "Documents",
    params(("id" = i64, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Documentos do cliente", body = Vec<Document>),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("crm_role" = []))
)]
pub async fn list_documents(
    State(app_state): State<AppState>,
    _perm: RequirePermission<PermCrmRead>,
    Path(customer_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let documents = app_state.document_service.list_documents(customer_id).await?;
    Ok((StatusCode::OK, Json(documents)))
}
