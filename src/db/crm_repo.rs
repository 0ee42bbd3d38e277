// src/db/crm_repo.rs

use sqlx::{Executor, Sqlite};

use crate::{
    common::error::AppError,
    models::{
        crm::{Customer, CustomerType},
        pipeline::{CustomerStatus, Stage},
    },
};

// Mesma ordem de CUSTOMER_COLUMNS
const CUSTOMER_SELECT: &str = r#"
    SELECT id, name, customer_type, owner, stage, status, email, phone, note
    FROM customers
"#;

/// Acesso à tabela `customers`.
///
/// Não guarda conexão: cada método recebe o executor (pool, conexão ou
/// transação) de quem chama, para o service decidir o escopo transacional.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrmRepository;

impl CrmRepository {
    pub fn new() -> Self {
        Self
    }

    /// Insere um cliente já validado, com fase e status iniciais.
    pub async fn create_customer<'e, E>(
        &self,
        executor: E,
        name: &str,
        customer_type: CustomerType,
        owner: &str,
        email: &str,
        phone: Option<&str>,
        initial_stage: Stage,
        initial_status: CustomerStatus,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (name, customer_type, owner, stage, status, email, phone)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, name, customer_type, owner, stage, status, email, phone, note
            "#,
        )
        .bind(name)
        .bind(customer_type)
        .bind(owner)
        .bind(initial_stage)
        .bind(initial_status)
        .bind(email)
        .bind(phone)
        .fetch_one(executor)
        .await?;

        Ok(customer)
    }

    /// Todos os clientes, na ordem natural da tabela (id crescente).
    pub async fn list_customers<'e, E>(&self, executor: E) -> Result<Vec<Customer>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{CUSTOMER_SELECT} ORDER BY id ASC");
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .fetch_all(executor)
            .await?;

        Ok(customers)
    }

    pub async fn find_customer<'e, E>(
        &self,
        executor: E,
        customer_id: i64,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("{CUSTOMER_SELECT} WHERE id = ?");
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(customer_id)
            .fetch_optional(executor)
            .await?;

        Ok(customer)
    }

    /// Troca a fase e o status numa única instrução.
    /// Id inexistente vira `CustomerNotFound`, nunca um no-op silencioso.
    pub async fn update_stage<'e, E>(
        &self,
        executor: E,
        customer_id: i64,
        stage: Stage,
        status: CustomerStatus,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE customers SET stage = ?, status = ? WHERE id = ?")
            .bind(stage)
            .bind(status)
            .bind(customer_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::CustomerNotFound(customer_id));
        }
        Ok(())
    }

    pub async fn update_note<'e, E>(
        &self,
        executor: E,
        customer_id: i64,
        note: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("UPDATE customers SET note = ? WHERE id = ?")
            .bind(note)
            .bind(customer_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::CustomerNotFound(customer_id));
        }
        Ok(())
    }

    pub async fn customer_exists<'e, E>(&self, executor: E, customer_id: i64) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM customers WHERE id = ?)")
            .bind(customer_id)
            .fetch_one(executor)
            .await?;

        Ok(exists != 0)
    }
}
