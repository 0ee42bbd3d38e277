// src/config.rs

use std::{env, path::PathBuf, sync::Arc};

use anyhow::{bail, Context};
use sqlx::SqlitePool;

use crate::{
    common::db_utils::{connect_pool, run_migrations},
    db::{CrmRepository, DocumentRepository},
    models::pipeline::PipelinePolicy,
    services::{
        crm_service::CrmService, document_service::DocumentService, export_service::ExportService,
    },
    storage::{BlobStore, FilesystemBlobStore},
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub bind_addr: String,
    /// Responsáveis aceitos no cadastro de clientes
    pub owners: Vec<String>,
    /// Extensões aceitas no upload, minúsculas e sem ponto
    pub allowed_extensions: Vec<String>,
    pub max_upload_bytes: usize,
    pub db_max_connections: u32,
    pub pipeline_forward_only: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte chave -> valor.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let owners = parse_list(&get("CRM_OWNERS", "Elena,Ingrid,Michela"));
        if owners.is_empty() {
            bail!("CRM_OWNERS deve ter pelo menos um responsável");
        }

        let allowed_extensions = parse_list(&get("ALLOWED_EXTENSIONS", "pdf,jpg,jpeg,png,docx"))
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        let max_upload_bytes = get("MAX_UPLOAD_BYTES", "10485760")
            .parse()
            .context("MAX_UPLOAD_BYTES deve ser um número inteiro")?;

        let db_max_connections = get("DB_MAX_CONNECTIONS", "5")
            .parse()
            .context("DB_MAX_CONNECTIONS deve ser um número inteiro")?;

        let pipeline_forward_only = parse_bool(&get("PIPELINE_FORWARD_ONLY", "false"))
            .context("PIPELINE_FORWARD_ONLY deve ser true/false")?;

        Ok(Self {
            database_url: get("DATABASE_URL", "sqlite://crm.db"),
            upload_dir: PathBuf::from(get("UPLOAD_DIR", "uploaded_documents")),
            bind_addr: get("BIND_ADDR", "0.0.0.0:3000"),
            owners,
            allowed_extensions,
            max_upload_bytes,
            db_max_connections,
            pipeline_forward_only,
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => bail!("valor booleano inválido: '{other}'"),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub crm_service: CrmService,
    pub document_service: DocumentService,
    pub export_service: ExportService,
}

impl AppState {
    /// Conecta, migra e monta o gráfico de dependências.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db_pool = connect_pool(&config.database_url, config.db_max_connections)
            .await
            .with_context(|| format!("Falha ao conectar em {}", config.database_url))?;
        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        run_migrations(&db_pool)
            .await
            .context("Falha ao rodar as migrações do banco de dados.")?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        let blob_store = FilesystemBlobStore::new(config.upload_dir.clone());
        blob_store
            .init()
            .await
            .with_context(|| format!("Falha ao criar {}", config.upload_dir.display()))?;

        Ok(Self::build(db_pool, config, Arc::new(blob_store)))
    }

    /// Monta os services sobre uma pool já pronta.
    pub fn build(db_pool: SqlitePool, config: AppConfig, blob_store: Arc<dyn BlobStore>) -> Self {
        let policy = PipelinePolicy::new(config.pipeline_forward_only);

        let crm_service = CrmService::new(
            db_pool.clone(),
            CrmRepository::new(),
            policy,
            config.owners.clone(),
        );
        let document_service = DocumentService::new(
            db_pool,
            CrmRepository::new(),
            DocumentRepository::new(),
            blob_store,
            config.allowed_extensions.clone(),
        );
        let export_service = ExportService::new(crm_service.clone());

        Self {
            config: Arc::new(config),
            crm_service,
            document_service,
            export_service,
        }
    }
}
