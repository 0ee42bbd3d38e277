// src/common/db_utils.rs

use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::common::error::AppError;

/// Abre a pool SQLite (criando o arquivo se preciso) com FKs ligadas.
pub async fn connect_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        // Escritores concorrentes esperam a vez em vez de falhar com SQLITE_BUSY
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Roda as migrações versionadas de `migrations/`. Só na inicialização.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Banco descartável num diretório temporário, já migrado.
/// O `TempDir` precisa continuar vivo enquanto a pool for usada.
#[cfg(test)]
pub(crate) async fn test_pool() -> (tempfile::TempDir, SqlitePool) {
    test_pool_with(1).await
}

/// Como `test_pool`, mas com várias conexões (testes de concorrência).
#[cfg(test)]
pub(crate) async fn test_pool_with(max_connections: u32) -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("crm-test.db").display());
    let pool = connect_pool(&url, max_connections).await.expect("pool de teste");
    run_migrations(&pool).await.expect("migrações de teste");
    (dir, pool)
}
