pub mod crm_repo;
pub use crm_repo::CrmRepository;
pub mod document_repo;
pub use document_repo::DocumentRepository;
