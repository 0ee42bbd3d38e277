pub mod crm;
pub mod documents;
pub mod pipeline;
