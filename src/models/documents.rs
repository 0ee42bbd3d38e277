// src/models/documents.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Tipo usado quando o upload não informa nenhum.
pub const DEFAULT_DOCUMENT_TYPE: &str = "Generic";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = 1)]
    pub customer_id: i64,

    #[schema(example = "Generic")]
    pub document_type: String,

    #[schema(example = "contract.pdf")]
    pub file_name: String,
}
