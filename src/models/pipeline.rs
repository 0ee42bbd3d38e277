// src/models/pipeline.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::error::AppError;

// --- Enums ---

/// As seis fases do funil de troca de fornecedor, em ordem.
///
/// O rótulo textual é o que vai para o banco, para o JSON e para a planilha.
/// O schema tem um CHECK com os mesmos seis valores.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
pub enum Stage {
    #[serde(rename = "1. Customer Identification")]
    #[sqlx(rename = "1. Customer Identification")]
    CustomerIdentification,

    #[serde(rename = "2. Preliminary Verification")]
    #[sqlx(rename = "2. Preliminary Verification")]
    PreliminaryVerification,

    #[serde(rename = "3. Quote Creation")]
    #[sqlx(rename = "3. Quote Creation")]
    QuoteCreation,

    #[serde(rename = "4. Awaiting Customer Response")]
    #[sqlx(rename = "4. Awaiting Customer Response")]
    AwaitingCustomerResponse,

    #[serde(rename = "5. Offer Generation")]
    #[sqlx(rename = "5. Offer Generation")]
    OfferGeneration,

    #[serde(rename = "6. System Entry")]
    #[sqlx(rename = "6. System Entry")]
    SystemEntry,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::CustomerIdentification,
        Stage::PreliminaryVerification,
        Stage::QuoteCreation,
        Stage::AwaitingCustomerResponse,
        Stage::OfferGeneration,
        Stage::SystemEntry,
    ];

    /// Fase atribuída a todo cliente novo.
    pub const FIRST: Stage = Stage::CustomerIdentification;

    pub fn label(self) -> &'static str {
        match self {
            Stage::CustomerIdentification => "1. Customer Identification",
            Stage::PreliminaryVerification => "2. Preliminary Verification",
            Stage::QuoteCreation => "3. Quote Creation",
            Stage::AwaitingCustomerResponse => "4. Awaiting Customer Response",
            Stage::OfferGeneration => "5. Offer Generation",
            Stage::SystemEntry => "6. System Entry",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stage {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.label() == s)
            .ok_or_else(|| AppError::UnknownStage(s.to_string()))
    }
}

/// Status grosseiro do cliente. Só muda junto com a fase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum CustomerStatus {
    #[serde(rename = "Pending")]
    #[sqlx(rename = "Pending")]
    Pending,

    #[serde(rename = "In progress")]
    #[sqlx(rename = "In progress")]
    InProgress,
}

impl CustomerStatus {
    pub fn label(self) -> &'static str {
        match self {
            CustomerStatus::Pending => "Pending",
            CustomerStatus::InProgress => "In progress",
        }
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// O funil como a tela precisa montar o dropdown de fases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineInfo {
    pub stages: Vec<Stage>,
    #[schema(example = false)]
    pub forward_only: bool,
}

// --- Política do Funil ---

/// Regras de transição entre fases.
///
/// Por padrão qualquer fase pode ir para qualquer outra (inclusive voltar).
/// Com `forward_only` ligado, voltar no funil é recusado.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelinePolicy {
    forward_only: bool,
}

impl PipelinePolicy {
    pub fn new(forward_only: bool) -> Self {
        Self { forward_only }
    }

    pub fn check_transition(&self, from: Stage, to: Stage) -> Result<(), AppError> {
        if self.forward_only && to < from {
            return Err(AppError::StageTransitionNotAllowed { from, to });
        }
        Ok(())
    }

    pub fn describe(&self) -> PipelineInfo {
        PipelineInfo {
            stages: Stage::ALL.to_vec(),
            forward_only: self.forward_only,
        }
    }

    /// Status resultante de qualquer mudança de fase.
    pub fn status_after_stage_change(&self) -> CustomerStatus {
        CustomerStatus::InProgress
    }
}
