// src/handlers/crm.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{
        PermCrmFilter, PermCrmRead, PermCrmWrite, PermPipelineWrite, PermissionDef,
        RequirePermission,
    },
    models::{
        crm::{Customer, Filter, FilterOptions, NewCustomer, FILTER_ALL},
        pipeline::{PipelineInfo, Stage},
    },
    services::crm_service::{filter_customers, filter_options},
};

// =============================================================================
//  ÁREA 1: FUNIL
// =============================================================================

// GET /api/crm/pipeline/stages
#[utoipa::path(
    get,
    path = "/api/crm/pipeline/stages",
    tag = "CRM",
    responses(
        (status = 200, description = "Fases do funil, em ordem", body = PipelineInfo)
    ),
    security(("crm_role" = []))
)]
pub async fn list_stages(
    State(app_state): State<AppState>,
    _perm: RequirePermission<PermCrmRead>,
) -> Json<PipelineInfo> {
    Json(app_state.crm_service.policy().describe())
}

// =============================================================================
//  ÁREA 2: CLIENTES
// =============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCustomersQuery {
    /// Responsável, ou "All"
    #[param(example = "Elena")]
    pub owner: Option<String>,

    /// Rótulo da fase, ou "All"
    #[param(example = "3. Quote Creation")]
    pub stage: Option<String>,
}

impl ListCustomersQuery {
    fn filters(&self) -> Result<(Filter<String>, Filter<Stage>), AppError> {
        let owner = match self.owner.as_deref() {
            None | Some(FILTER_ALL) => Filter::All,
            Some(raw) => Filter::Only(raw.to_string()),
        };
        let stage: Filter<Stage> = match self.stage.as_deref() {
            Some(raw) => raw.parse()?,
            None => Filter::All,
        };
        Ok((owner, stage))
    }
}

// GET /api/crm/customers
#[utoipa::path(
    get,
    path = "/api/crm/customers",
    tag = "CRM",
    params(ListCustomersQuery),
    responses(
        (status = 200, description = "Lista de clientes", body = Vec<Customer>),
        (status = 403, description = "Filtro sem a permissão crm:filter")
    ),
    security(("crm_role" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    RequirePermission(role, _): RequirePermission<PermCrmRead>,
    Query(query): Query<ListCustomersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (owner, stage) = query.filters()?;

    // Operador só lista; filtrar é coisa da tela de gestão
    if !(owner.is_all() && stage.is_all()) && !role.has_permission(PermCrmFilter::slug()) {
        return Err(AppError::Forbidden(PermCrmFilter::slug()));
    }

    let customers = app_state.crm_service.list_customers().await?;
    let customers = filter_customers(customers, &owner, &stage);

    Ok((StatusCode::OK, Json(customers)))
}

// GET /api/crm/customers/filters
#[utoipa::path(
    get,
    path = "/api/crm/customers/filters",
    tag = "CRM",
    responses(
        (status = 200, description = "Valores disponíveis para os filtros", body = FilterOptions)
    ),
    security(("crm_role" = []))
)]
pub async fn get_filter_options(
    State(app_state): State<AppState>,
    _perm: RequirePermission<PermCrmFilter>,
) -> Result<impl IntoResponse, AppError> {
    let customers = app_state.crm_service.list_customers().await?;
    Ok((StatusCode::OK, Json(filter_options(&customers))))
}

// POST /api/crm/customers
#[utoipa::path(
    post,
    path = "/api/crm/customers",
    tag = "CRM",
    request_body = NewCustomer,
    responses(
        (status = 201, description = "Cliente criado", body = Customer),
        (status = 400, description = "Dados inválidos")
    ),
    security(("crm_role" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    _perm: RequirePermission<PermCrmWrite>,
    Json(payload): Json<NewCustomer>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let customer = app_state.crm_service.create_customer(payload).await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

// GET /api/crm/customers/{id}
#[utoipa::path(
    get,
    path = "/api/crm/customers/{id}",
    tag = "CRM",
    params(("id" = i64, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente", body = Customer),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("crm_role" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    _perm: RequirePermission<PermCrmRead>,
    Path(customer_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let customer = app_state.crm_service.find_customer(customer_id).await?;
    Ok((StatusCode::OK, Json(customer)))
}

// =============================================================================
//  ÁREA 3: FASE E NOTAS (somente gestão)
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStagePayload {
    #[schema(example = "3. Quote Creation")]
    pub stage: Stage,

    /// Se vier, a nota é gravada na mesma transação
    #[schema(example = "Preventivo inviato")]
    pub note: Option<String>,
}

// PUT /api/crm/customers/{id}/stage
#[utoipa::path(
    put,
    path = "/api/crm/customers/{id}/stage",
    tag = "CRM",
    params(("id" = i64, Path, description = "ID do cliente")),
    request_body = UpdateStagePayload,
    responses(
        (status = 200, description = "Fase atualizada, status 'In progress'", body = Customer),
        (status = 400, description = "Transição não permitida"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("crm_role" = []))
)]
pub async fn update_stage(
    State(app_state): State<AppState>,
    _perm: RequirePermission<PermPipelineWrite>,
    Path(customer_id): Path<i64>,
    Json(payload): Json<UpdateStagePayload>,
) -> Result<impl IntoResponse, AppError> {
    let customer = app_state
        .crm_service
        .advance_customer(customer_id, payload.stage, payload.note.as_deref())
        .await?;

    Ok((StatusCode::OK, Json(customer)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotePayload {
    #[schema(example = "Richiamare lunedì")]
    pub note: String,
}

// PUT /api/crm/customers/{id}/note
#[utoipa::path(
    put,
    path = "/api/crm/customers/{id}/note",
    tag = "CRM",
    params(("id" = i64, Path, description = "ID do cliente")),
    request_body = UpdateNotePayload,
    responses(
        (status = 200, description = "Nota gravada", body = Customer),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("crm_role" = []))
)]
pub async fn update_note(
    State(app_state): State<AppState>,
    _perm: RequirePermission<PermPipelineWrite>,
    Path(customer_id): Path<i64>,
    Json(payload): Json<UpdateNotePayload>,
) -> Result<impl IntoResponse, AppError> {
    let customer = app_state
        .crm_service
        .update_note(customer_id, &payload.note)
        .await?;

    Ok((StatusCode::OK, Json(customer)))
}
