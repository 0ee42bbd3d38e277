// src/docs.rs

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::middleware;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- CRM ---
        handlers::crm::list_stages,
        handlers::crm::list_customers,
        handlers::crm::get_filter_options,
        handlers::crm::create_customer,
        handlers::crm::get_customer,
        handlers::crm::update_stage,
        handlers::crm::update_note,

        // --- Documents ---
        handlers::documents::upload_document,
        handlers::documents::list_documents,

        // --- Reports ---
        handlers::reports::export_customers,
    ),
    components(
        schemas(
            // --- CRM ---
            models::crm::CustomerType,
            models::crm::Customer,
            models::crm::NewCustomer,
            models::crm::FilterOptions,
            models::pipeline::Stage,
            models::pipeline::CustomerStatus,
            models::pipeline::PipelineInfo,
            handlers::crm::UpdateStagePayload,
            handlers::crm::UpdateNotePayload,

            // --- Documents ---
            models::documents::Document,
            handlers::documents::UploadDocumentForm,

            // --- Roles ---
            middleware::role::CrmRole,
        )
    ),
    tags(
        (name = "CRM", description = "Clientes e funil de troca de fornecedor"),
        (name = "Documents", description = "Documentos anexados aos clientes"),
        (name = "Reports", description = "Exportação da planilha de clientes")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "crm_role",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                middleware::role::ROLE_HEADER,
            ))),
        );
    }
}
