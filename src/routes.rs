// src/routes.rs

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers};

/// Monta o router completo da aplicação.
pub fn build_router(app_state: AppState) -> Router {
    let max_upload_bytes = app_state.config.max_upload_bytes;

    let crm_routes = Router::new()
        // Funil
        .route("/pipeline/stages", get(handlers::crm::list_stages))
        // Gestão de Clientes
        .route(
            "/customers",
            get(handlers::crm::list_customers).post(handlers::crm::create_customer),
        )
        .route("/customers/filters", get(handlers::crm::get_filter_options))
        .route("/customers/{id}", get(handlers::crm::get_customer))
        .route("/customers/{id}/stage", put(handlers::crm::update_stage))
        .route("/customers/{id}/note", put(handlers::crm::update_note))
        // Documentos
        .route(
            "/customers/{id}/documents",
            get(handlers::documents::list_documents)
                .post(handlers::documents::upload_document)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        );

    let report_routes = Router::new().route("/customers", get(handlers::reports::export_customers));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/crm", crm_routes)
        .nest("/api/reports", report_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
