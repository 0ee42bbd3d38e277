// src/storage/blob_store.rs

use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

/// Chave plana do blob: `{customer_id}_{file_name}`.
///
/// Sem subdiretórios, sem hash de conteúdo. Dois uploads com o mesmo
/// cliente e o mesmo nome caem na mesma chave.
pub fn blob_key(customer_id: i64, file_name: &str) -> String {
    format!("{}_{}", customer_id, file_name)
}

/// Onde ficam os bytes dos documentos.
///
/// Trait para permitir trocar o backend (e usar dublês nos testes).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Grava (ou sobrescreve) os bytes na chave.
    async fn put(&self, key: &str, data: &[u8]) -> io::Result<()>;

    async fn get(&self, key: &str) -> io::Result<Vec<u8>>;

    /// Remove o blob. Chave inexistente não é erro.
    async fn delete(&self, key: &str) -> io::Result<()>;

    async fn exists(&self, key: &str) -> io::Result<bool>;
}

/// Backend em diretório plano do sistema de arquivos.
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    base_dir: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Garante que o diretório exista. Chamado uma vez na inicialização.
    pub async fn init(&self) -> io::Result<()> {
        fs::create_dir_all(&self.base_dir).await
    }

    fn full_path(&self, key: &str) -> io::Result<PathBuf> {
        // A chave nunca pode sair do diretório base nem colidir com os temporários
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("chave de blob inválida: {key}"),
            ));
        }
        Ok(self.base_dir.join(key))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, key: &str, data: &[u8]) -> io::Result<()> {
        let full_path = self.full_path(key)?;
        debug!(key, full_path = %full_path.display(), size = data.len(), "blob_store: put");

        fs::create_dir_all(&self.base_dir).await?;

        // Escrita atômica: arquivo temporário (único por escrita) + rename
        let temp_path = self.base_dir.join(format!(".{key}.{}.tmp", Uuid::new_v4()));
        let result = write_then_rename(&temp_path, &full_path, data).await;
        if result.is_err() {
            // Nada de `.tmp` esquecido no diretório
            let _ = fs::remove_file(&temp_path).await;
        }
        result
    }

    async fn get(&self, key: &str) -> io::Result<Vec<u8>> {
        fs::read(self.full_path(key)?).await
    }

    async fn delete(&self, key: &str) -> io::Result<()> {
        let full_path = self.full_path(key)?;
        if fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> io::Result<bool> {
        fs::try_exists(self.full_path(key)?).await
    }
}

async fn write_then_rename(temp_path: &Path, full_path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(temp_path).await.map_err(|e| {
        warn!(temp_path = %temp_path.display(), error = %e, "blob_store: File::create falhou");
        e
    })?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(temp_path, full_path).await.map_err(|e| {
        warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "blob_store: rename falhou");
        e
    })
}
