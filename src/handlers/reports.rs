// src/handlers/reports.rs

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{PermReportExport, RequirePermission},
    services::export_service::XLSX_CONTENT_TYPE,
};

// GET /api/reports/customers
#[utoipa::path(
    get,
    path = "/api/reports/customers",
    tag = "Reports",
    responses(
        (status = 200, description = "Planilha com todos os clientes",
            content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 403, description = "Somente gestão")
    ),
    security(("crm_role" = []))
)]
pub async fn export_customers(
    State(app_state): State<AppState>,
    _perm: RequirePermission<PermReportExport>,
) -> Result<Response, AppError> {
    let today = chrono::Local::now().date_naive();

    let report = app_state.export_service.export_customers(today).await?;

    // Configura os Headers para o navegador baixar a planilha
    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", report.file_name),
        ),
    ];

    Ok((headers, report.bytes).into_response())
}
