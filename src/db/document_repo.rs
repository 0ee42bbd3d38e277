// src/db/document_repo.rs

use sqlx::{Executor, Sqlite};

use crate::{common::error::AppError, models::documents::Document};

/// Acesso à tabela `documents` (somente metadados).
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentRepository;

impl DocumentRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert_document<'e, E>(
        &self,
        executor: E,
        customer_id: i64,
        document_type: &str,
        file_name: &str,
    ) -> Result<Document, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (customer_id, document_type, file_name)
            VALUES (?, ?, ?)
            RETURNING id, customer_id, document_type, file_name
            "#,
        )
        .bind(customer_id)
        .bind(document_type)
        .bind(file_name)
        .fetch_one(executor)
        .await?;

        Ok(document)
    }

    pub async fn list_for_customer<'e, E>(
        &self,
        executor: E,
        customer_id: i64,
    ) -> Result<Vec<Document>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, customer_id, document_type, file_name
            FROM documents
            WHERE customer_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(customer_id)
        .fetch_all(executor)
        .await?;

        Ok(documents)
    }
}
