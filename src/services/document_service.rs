// src/services/document_service.rs

use std::{path::Path, sync::Arc};

use sqlx::SqlitePool;

use crate::{
    common::error::{field_error, AppError},
    db::{CrmRepository, DocumentRepository},
    models::documents::{Document, DEFAULT_DOCUMENT_TYPE},
    storage::{blob_key, BlobStore},
};

#[derive(Clone)]
pub struct DocumentService {
    pool: SqlitePool,
    customers: CrmRepository,
    repo: DocumentRepository,
    blob_store: Arc<dyn BlobStore>,
    allowed_extensions: Arc<Vec<String>>,
}

impl DocumentService {
    pub fn new(
        pool: SqlitePool,
        customers: CrmRepository,
        repo: DocumentRepository,
        blob_store: Arc<dyn BlobStore>,
        allowed_extensions: Vec<String>,
    ) -> Self {
        Self {
            pool,
            customers,
            repo,
            blob_store,
            allowed_extensions: Arc::new(allowed_extensions),
        }
    }

    /// Grava os bytes no blob store e registra os metadados.
    ///
    /// Mesmo cliente + mesmo nome de arquivo sobrescreve o blob anterior
    /// (e gera uma nova linha de metadados). Se o INSERT falhar depois de
    /// um blob novo ter sido criado, o blob é removido.
    pub async fn attach_document(
        &self,
        customer_id: i64,
        file_name: &str,
        content: &[u8],
        document_type: Option<&str>,
    ) -> Result<Document, AppError> {
        // 1. Validações antes de qualquer escrita
        self.validate_file_name(file_name)?;
        let document_type = document_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_DOCUMENT_TYPE);

        if !self.customers.customer_exists(&self.pool, customer_id).await? {
            return Err(AppError::CustomerNotFound(customer_id));
        }

        // 2. Blob
        let key = blob_key(customer_id, file_name);
        let overwrote = self.blob_store.exists(&key).await?;
        if overwrote {
            tracing::warn!(customer_id, key = %key, "⚠️ Blob já existe e será sobrescrito");
        }
        self.blob_store.put(&key, content).await?;

        // 3. Metadados
        let document = match self
            .repo
            .insert_document(&self.pool, customer_id, document_type, file_name)
            .await
        {
            Ok(document) => document,
            Err(err) => {
                self.compensate_blob(&key, overwrote).await;
                return Err(err);
            }
        };

        tracing::info!(
            customer_id,
            document_id = document.id,
            size = content.len(),
            "📎 Documento anexado"
        );
        Ok(document)
    }

    pub async fn list_documents(&self, customer_id: i64) -> Result<Vec<Document>, AppError> {
        if !self.customers.customer_exists(&self.pool, customer_id).await? {
            return Err(AppError::CustomerNotFound(customer_id));
        }
        self.repo.list_for_customer(&self.pool, customer_id).await
    }

    fn validate_file_name(&self, file_name: &str) -> Result<(), AppError> {
        // Nome plano: sem separadores, sem ocultos (o que também barra "." e "..")
        if file_name.trim().is_empty()
            || file_name.contains(['/', '\\'])
            || file_name.starts_with('.')
        {
            return Err(field_error("fileName", "invalid_file_name"));
        }

        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension {
            Some(ext) if self.allowed_extensions.iter().any(|allowed| *allowed == ext) => Ok(()),
            _ => Err(field_error("fileName", "unsupported_extension")),
        }
    }

    /// Desfaz o blob quando o INSERT falha. Um blob que sobrescreveu outro
    /// fica onde está: o conteúdo anterior já se perdeu.
    async fn compensate_blob(&self, key: &str, overwrote: bool) {
        if overwrote {
            tracing::error!(key, "🔥 INSERT do documento falhou; blob sobrescrito mantido");
            return;
        }
        if let Err(e) = self.blob_store.delete(key).await {
            tracing::error!(key, error = %e, "🔥 Falha ao remover blob órfão");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use async_trait::async_trait;

    use crate::{
        common::db_utils::{test_pool, test_pool_with},
        models::{
            crm::{CustomerType, NewCustomer},
            pipeline::{PipelinePolicy, Stage},
        },
        services::crm_service::CrmService,
        storage::FilesystemBlobStore,
    };

    struct Fixture {
        _db_dir: tempfile::TempDir,
        blob_dir: tempfile::TempDir,
        crm: CrmService,
        docs: DocumentService,
        blobs: Arc<FilesystemBlobStore>,
    }

    fn extensions() -> Vec<String> {
        ["pdf", "jpg", "jpeg", "png", "docx"].map(String::from).to_vec()
    }

    async fn fixture() -> Fixture {
        let (db_dir, pool) = test_pool().await;
        fixture_on(db_dir, pool)
    }

    fn fixture_on(db_dir: tempfile::TempDir, pool: SqlitePool) -> Fixture {
        let blob_dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(FilesystemBlobStore::new(blob_dir.path()));

        let crm = CrmService::new(
            pool.clone(),
            CrmRepository::new(),
            PipelinePolicy::default(),
            vec!["Elena".into()],
        );
        let docs = DocumentService::new(
            pool,
            CrmRepository::new(),
            DocumentRepository::new(),
            blobs.clone(),
            extensions(),
        );
        Fixture { _db_dir: db_dir, blob_dir, crm, docs, blobs }
    }

    async fn acme(crm: &CrmService) -> i64 {
        crm.create_customer(NewCustomer {
            name: "Acme Corp".into(),
            customer_type: CustomerType::Business,
            owner: "Elena".into(),
            email: "a@x.com".into(),
            phone: Some("555-0100".into()),
        })
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn attach_writes_blob_and_metadata() {
        let f = fixture().await;
        let id = acme(&f.crm).await;
        f.crm.update_stage(id, Stage::QuoteCreation).await.unwrap();

        let doc = f.docs.attach_document(id, "contract.pdf", b"%PDF-1.7", None).await.unwrap();
        assert_eq!(doc.customer_id, id);
        assert_eq!(doc.file_name, "contract.pdf");
        assert_eq!(doc.document_type, "Generic");

        let stored = std::fs::read(f.blob_dir.path().join(format!("{id}_contract.pdf"))).unwrap();
        assert_eq!(stored, b"%PDF-1.7");

        let listed = f.docs.list_documents(id).await.unwrap();
        assert_eq!(listed, vec![doc]);
    }

    #[tokio::test]
    async fn same_name_overwrites_the_blob() {
        let f = fixture().await;
        let id = acme(&f.crm).await;

        f.docs.attach_document(id, "offer.docx", b"v1", Some("Offer")).await.unwrap();
        let second = f.docs.attach_document(id, "offer.docx", b"v2", Some("Offer")).await.unwrap();

        assert_eq!(f.blobs.get(&blob_key(id, &second.file_name)).await.unwrap(), b"v2");
        assert_eq!(f.docs.list_documents(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_customer_is_rejected_before_any_write() {
        let f = fixture().await;

        let err = f.docs.attach_document(99, "contract.pdf", b"x", None).await.unwrap_err();
        assert!(matches!(err, AppError::CustomerNotFound(99)));
        assert!(!f.blobs.exists("99_contract.pdf").await.unwrap());

        let err = f.docs.list_documents(99).await.unwrap_err();
        assert!(matches!(err, AppError::CustomerNotFound(99)));
    }

    #[tokio::test]
    async fn bad_file_names_are_validation_errors() {
        let f = fixture().await;
        let id = acme(&f.crm).await;

        for name in ["", "..", "../etc/passwd", "a/b.pdf", "virus.exe", "noextension", ".pdf"] {
            let err = f.docs.attach_document(id, name, b"x", None).await.unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)), "{name}");
        }
        // extensão é comparada sem diferenciar maiúsculas
        f.docs.attach_document(id, "SCAN.JPG", b"x", None).await.unwrap();
        // ponto duplo no meio de um nome plano é só um nome
        let doc = f.docs.attach_document(id, "offer..v2.pdf", b"x", None).await.unwrap();
        assert_eq!(doc.file_name, "offer..v2.pdf");
    }

    #[tokio::test]
    async fn concurrent_uploads_of_one_name_all_land() {
        let (db_dir, pool) = test_pool_with(5).await;
        let f = fixture_on(db_dir, pool);
        let id = acme(&f.crm).await;

        let payloads: Vec<Vec<u8>> = (0..6u8).map(|i| vec![i; 64 * 1024]).collect();
        let mut tasks = Vec::new();
        for payload in payloads.clone() {
            let docs = f.docs.clone();
            tasks.push(tokio::spawn(async move {
                docs.attach_document(id, "contract.pdf", &payload, None).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // uma linha por upload, um único blob com o conteúdo de um deles
        assert_eq!(f.docs.list_documents(id).await.unwrap().len(), payloads.len());
        let stored = f.blobs.get(&blob_key(id, "contract.pdf")).await.unwrap();
        assert!(payloads.contains(&stored));
    }

    #[tokio::test]
    async fn failed_insert_removes_the_fresh_blob() {
        let f = fixture().await;
        let id = acme(&f.crm).await;

        sqlx::query("DROP TABLE documents").execute(&f.docs.pool).await.unwrap();

        let err = f.docs.attach_document(id, "contract.pdf", b"x", None).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
        assert!(!f.blobs.exists(&blob_key(id, "contract.pdf")).await.unwrap());
    }

    struct BrokenDisk;

    #[async_trait]
    impl BlobStore for BrokenDisk {
        async fn put(&self, _key: &str, _data: &[u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
        async fn get(&self, _key: &str) -> io::Result<Vec<u8>> {
            Err(io::Error::from(io::ErrorKind::NotFound))
        }
        async fn delete(&self, _key: &str) -> io::Result<()> {
            Ok(())
        }
        async fn exists(&self, _key: &str) -> io::Result<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn blob_failure_is_an_io_error_and_skips_metadata() {
        let f = fixture().await;
        let id = acme(&f.crm).await;
        let docs = DocumentService::new(
            f.docs.pool.clone(),
            CrmRepository::new(),
            DocumentRepository::new(),
            Arc::new(BrokenDisk),
            extensions(),
        );

        let err = docs.attach_document(id, "contract.pdf", b"x", None).await.unwrap_err();
        assert!(matches!(err, AppError::BlobIoError(_)));
        assert!(docs.list_documents(id).await.unwrap().is_empty());
    }
}
