pub mod crm_service;
pub mod document_service;
pub mod export_service;
