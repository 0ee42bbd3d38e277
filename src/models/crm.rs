// src/models/crm.rs

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::pipeline::{CustomerStatus, Stage};

// --- ENUMS ---

/// Tipo de cliente. Conjunto fechado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum CustomerType {
    /// Empresa com partita IVA / CNPJ
    Business,
    Condominium,
    /// Pessoa física
    Private,
}

impl CustomerType {
    pub fn label(self) -> &'static str {
        match self {
            CustomerType::Business => "Business",
            CustomerType::Condominium => "Condominium",
            CustomerType::Private => "Private",
        }
    }
}

// --- CLIENTE ---

/// Colunas da tabela `customers`, na ordem do schema.
/// A exportação usa exatamente esta ordem.
pub const CUSTOMER_COLUMNS: [&str; 9] = [
    "id",
    "name",
    "customer_type",
    "owner",
    "stage",
    "status",
    "email",
    "phone",
    "note",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = "Acme Corp")]
    pub name: String,

    pub customer_type: CustomerType,

    #[schema(example = "Elena")]
    pub owner: String,

    pub stage: Stage,
    pub status: CustomerStatus,

    #[schema(example = "a@x.com")]
    pub email: String,

    #[schema(example = "555-0100")]
    pub phone: Option<String>,

    pub note: Option<String>,
}

/// Dados para cadastrar um cliente. Fase e status não entram: são sempre
/// a primeira fase e "Pending".
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Acme Corp")]
    pub name: String,

    #[schema(example = "Business")]
    pub customer_type: CustomerType,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Elena")]
    pub owner: String,

    #[validate(length(min = 1, message = "required"), email(message = "invalid_email"))]
    #[schema(example = "a@x.com")]
    pub email: String,

    #[schema(example = "555-0100")]
    pub phone: Option<String>,
}

// --- FILTROS ---

/// Valor sentinela que desliga um filtro.
pub const FILTER_ALL: &str = "All";

/// Filtro de coluna: "All" ou um valor específico.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter<T> {
    All,
    Only(T),
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Filter::All
    }
}

impl<T: PartialEq> Filter<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Filter::All => true,
            Filter::Only(expected) => expected == value,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All)
    }
}

impl<T: FromStr> FromStr for Filter<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == FILTER_ALL {
            return Ok(Filter::All);
        }
        s.parse().map(Filter::Only)
    }
}

/// Valores distintos presentes na lista, para montar os dropdowns de filtro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    #[schema(example = json!(["Elena", "Ingrid"]))]
    pub owners: Vec<String>,
    pub stages: Vec<Stage>,
}
