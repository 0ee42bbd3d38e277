// src/services/crm_service.rs

use std::sync::Arc;

use sqlx::{Sqlite, SqlitePool, Transaction};
use validator::Validate;

use crate::{
    common::error::{field_error, AppError},
    db::CrmRepository,
    models::{
        crm::{Customer, Filter, FilterOptions, NewCustomer},
        pipeline::{CustomerStatus, PipelinePolicy, Stage},
    },
};

#[derive(Clone)]
pub struct CrmService {
    pool: SqlitePool,
    repo: CrmRepository,
    policy: PipelinePolicy,
    owners: Arc<Vec<String>>,
}

impl CrmService {
    pub fn new(
        pool: SqlitePool,
        repo: CrmRepository,
        policy: PipelinePolicy,
        owners: Vec<String>,
    ) -> Self {
        Self {
            pool,
            repo,
            policy,
            owners: Arc::new(owners),
        }
    }

    pub fn policy(&self) -> PipelinePolicy {
        self.policy
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        self.repo.list_customers(&self.pool).await
    }

    pub async fn find_customer(&self, customer_id: i64) -> Result<Customer, AppError> {
        self.repo
            .find_customer(&self.pool, customer_id)
            .await?
            .ok_or(AppError::CustomerNotFound(customer_id))
    }

    // =========================================================================
    //  CADASTRO
    // =========================================================================

    /// Cadastra o cliente na primeira fase, com status "Pending".
    /// Nada é gravado se a validação falhar.
    pub async fn create_customer(&self, new: NewCustomer) -> Result<Customer, AppError> {
        new.validate()?;

        // length(min = 1) deixa passar "   "
        let name = new.name.trim();
        if name.is_empty() {
            return Err(field_error("name", "required"));
        }

        let owner = new.owner.trim();
        if !self.owners.iter().any(|known| known == owner) {
            return Err(field_error("owner", "unknown_owner"));
        }

        let phone = new.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());

        let customer = self
            .repo
            .create_customer(
                &self.pool,
                name,
                new.customer_type,
                owner,
                new.email.trim(),
                phone,
                Stage::FIRST,
                CustomerStatus::Pending,
            )
            .await?;

        tracing::info!(
            customer_id = customer.id,
            owner = %customer.owner,
            "🆕 Cliente cadastrado"
        );
        Ok(customer)
    }

    // =========================================================================
    //  FUNIL
    // =========================================================================

    /// Move o cliente para `new_stage`; o status vira "In progress".
    pub async fn update_stage(&self, customer_id: i64, new_stage: Stage) -> Result<Customer, AppError> {
        self.advance_customer(customer_id, new_stage, None).await
    }

    /// Grava a nota interna. Chamar de novo com o mesmo texto não muda nada.
    pub async fn update_note(&self, customer_id: i64, note: &str) -> Result<Customer, AppError> {
        let mut tx = self.begin_write().await?;

        self.repo.update_note(&mut *tx, customer_id, note).await?;
        let customer = self
            .repo
            .find_customer(&mut *tx, customer_id)
            .await?
            .ok_or(AppError::CustomerNotFound(customer_id))?;

        tx.commit().await?;

        tracing::info!(customer_id, "📝 Nota atualizada");
        Ok(customer)
    }

    /// Fase + nota (opcional) numa única transação.
    pub async fn advance_customer(
        &self,
        customer_id: i64,
        new_stage: Stage,
        note: Option<&str>,
    ) -> Result<Customer, AppError> {
        let mut tx = self.begin_write().await?;

        // 1. Fase atual (e existência do cliente)
        let current = self
            .repo
            .find_customer(&mut *tx, customer_id)
            .await?
            .ok_or(AppError::CustomerNotFound(customer_id))?;

        // 2. Regra de transição
        self.policy.check_transition(current.stage, new_stage)?;

        // 3. Fase + status
        self.repo
            .update_stage(
                &mut *tx,
                customer_id,
                new_stage,
                self.policy.status_after_stage_change(),
            )
            .await?;

        // 4. Nota
        if let Some(note) = note {
            self.repo.update_note(&mut *tx, customer_id, note).await?;
        }

        let updated = self
            .repo
            .find_customer(&mut *tx, customer_id)
            .await?
            .ok_or(AppError::CustomerNotFound(customer_id))?;

        // Se falhar antes daqui, o tx sofre rollback ao sair do escopo
        tx.commit().await?;

        tracing::info!(
            customer_id,
            from = %current.stage,
            to = %updated.stage,
            with_note = note.is_some(),
            "🔀 Fase do cliente atualizada"
        );
        Ok(updated)
    }

    /// Transação que já nasce com o lock de escrita (`BEGIN IMMEDIATE`):
    /// escritores concorrentes esperam no busy_timeout, último a gravar vence.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }
}

// =============================================================================
//  FILTROS (puros, sem estado)
// =============================================================================

/// Mantém os clientes que batem com os dois filtros, preservando a ordem.
pub fn filter_customers(
    customers: Vec<Customer>,
    owner: &Filter<String>,
    stage: &Filter<Stage>,
) -> Vec<Customer> {
    if owner.is_all() && stage.is_all() {
        return customers;
    }
    customers
        .into_iter()
        .filter(|c| owner.matches(&c.owner) && stage.matches(&c.stage))
        .collect()
}

/// Responsáveis e fases presentes na lista, na ordem em que aparecem.
pub fn filter_options(customers: &[Customer]) -> FilterOptions {
    let mut owners: Vec<String> = Vec::new();
    let mut stages: Vec<Stage> = Vec::new();

    for customer in customers {
        if !owners.contains(&customer.owner) {
            owners.push(customer.owner.clone());
        }
        if !stages.contains(&customer.stage) {
            stages.push(customer.stage);
        }
    }

    FilterOptions { owners, stages }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::db_utils::{test_pool, test_pool_with},
        models::crm::CustomerType,
    };

    fn service(pool: SqlitePool, forward_only: bool) -> CrmService {
        CrmService::new(
            pool,
            CrmRepository::new(),
            PipelinePolicy::new(forward_only),
            vec!["Elena".into(), "Ingrid".into(), "Michela".into()],
        )
    }

    fn acme() -> NewCustomer {
        NewCustomer {
            name: "Acme Corp".into(),
            customer_type: CustomerType::Business,
            owner: "Elena".into(),
            email: "a@x.com".into(),
            phone: Some("555-0100".into()),
        }
    }

    fn customer(id: i64, owner: &str, stage: Stage) -> Customer {
        Customer {
            id,
            name: format!("Cliente {id}"),
            customer_type: CustomerType::Private,
            owner: owner.into(),
            stage,
            status: CustomerStatus::Pending,
            email: format!("c{id}@x.com"),
            phone: None,
            note: None,
        }
    }

    fn validation_fields(err: AppError) -> Vec<String> {
        match err {
            AppError::ValidationError(errors) => {
                let mut fields: Vec<String> =
                    errors.field_errors().keys().map(|k| k.to_string()).collect();
                fields.sort();
                fields
            }
            other => panic!("esperava ValidationError, veio {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_then_list_yields_one_pending_row_in_first_stage() {
        let (_dir, pool) = test_pool().await;
        let crm = service(pool, false);

        let created = crm.create_customer(acme()).await.unwrap();
        let all = crm.list_customers().await.unwrap();

        assert_eq!(all, vec![created.clone()]);
        assert_eq!(created.stage.label(), "1. Customer Identification");
        assert_eq!(created.status, CustomerStatus::Pending);
        assert_eq!(created.customer_type, CustomerType::Business);
    }

    #[tokio::test]
    async fn create_rejects_missing_required_fields_without_writing() {
        let (_dir, pool) = test_pool().await;
        let crm = service(pool, false);

        let mut blank = acme();
        blank.name = "   ".into();
        assert_eq!(validation_fields(crm.create_customer(blank).await.unwrap_err()), vec!["name"]);

        let mut no_email = acme();
        no_email.email = String::new();
        assert_eq!(validation_fields(crm.create_customer(no_email).await.unwrap_err()), vec!["email"]);

        let mut stranger = acme();
        stranger.owner = "Mallory".into();
        assert_eq!(validation_fields(crm.create_customer(stranger).await.unwrap_err()), vec!["owner"]);

        assert!(crm.list_customers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_phone_is_stored_as_null() {
        let (_dir, pool) = test_pool().await;
        let crm = service(pool, false);

        let mut input = acme();
        input.phone = Some("  ".into());
        let created = crm.create_customer(input).await.unwrap();
        assert_eq!(created.phone, None);
    }

    #[tokio::test]
    async fn update_stage_always_sets_in_progress() {
        let (_dir, pool) = test_pool().await;
        let crm = service(pool, false);
        let created = crm.create_customer(acme()).await.unwrap();

        for stage in [Stage::SystemEntry, Stage::QuoteCreation, Stage::FIRST] {
            crm.update_stage(created.id, stage).await.unwrap();
            let found = crm.find_customer(created.id).await.unwrap();
            assert_eq!(found.stage, stage);
            assert_eq!(found.status, CustomerStatus::InProgress);
        }
    }

    #[tokio::test]
    async fn update_stage_on_missing_id_leaves_table_untouched() {
        let (_dir, pool) = test_pool().await;
        let crm = service(pool, false);
        crm.create_customer(acme()).await.unwrap();
        let before = crm.list_customers().await.unwrap();

        let err = crm.update_stage(4242, Stage::OfferGeneration).await.unwrap_err();
        assert!(matches!(err, AppError::CustomerNotFound(4242)));

        assert_eq!(crm.list_customers().await.unwrap(), before);
    }

    #[tokio::test]
    async fn update_note_is_idempotent_and_reports_missing_ids() {
        let (_dir, pool) = test_pool().await;
        let crm = service(pool, false);
        let created = crm.create_customer(acme()).await.unwrap();

        let first = crm.update_note(created.id, "Richiamare lunedì").await.unwrap();
        let second = crm.update_note(created.id, "Richiamare lunedì").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.note.as_deref(), Some("Richiamare lunedì"));
        // a nota não mexe no funil
        assert_eq!(second.status, CustomerStatus::Pending);

        let err = crm.update_note(77, "x").await.unwrap_err();
        assert!(matches!(err, AppError::CustomerNotFound(77)));
    }

    #[tokio::test]
    async fn advance_writes_stage_and_note_together() {
        let (_dir, pool) = test_pool().await;
        let crm = service(pool, false);
        let created = crm.create_customer(acme()).await.unwrap();

        let updated = crm
            .advance_customer(created.id, Stage::QuoteCreation, Some("Preventivo inviato"))
            .await
            .unwrap();
        assert_eq!(updated.stage, Stage::QuoteCreation);
        assert_eq!(updated.status, CustomerStatus::InProgress);
        assert_eq!(updated.note.as_deref(), Some("Preventivo inviato"));
    }

    #[tokio::test]
    async fn forward_only_rejects_backward_move_and_rolls_back() {
        let (_dir, pool) = test_pool().await;
        let crm = service(pool, true);
        let created = crm.create_customer(acme()).await.unwrap();
        crm.update_stage(created.id, Stage::OfferGeneration).await.unwrap();

        let err = crm
            .advance_customer(created.id, Stage::PreliminaryVerification, Some("indietro"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StageTransitionNotAllowed { .. }));

        let found = crm.find_customer(created.id).await.unwrap();
        assert_eq!(found.stage, Stage::OfferGeneration);
        assert_eq!(found.note, None);
    }

    #[tokio::test]
    async fn concurrent_advances_on_one_customer_all_commit() {
        let (_dir, pool) = test_pool_with(5).await;
        let crm = service(pool, false);
        let id = crm.create_customer(acme()).await.unwrap().id;

        for _round in 0..5 {
            let mut tasks = Vec::new();
            for stage in Stage::ALL {
                let crm = crm.clone();
                tasks.push(tokio::spawn(async move {
                    crm.advance_customer(id, stage, Some(stage.label())).await
                }));
            }
            for task in tasks {
                task.await.unwrap().unwrap();
            }

            // o último a gravar vence, fase e nota juntas
            let found = crm.find_customer(id).await.unwrap();
            assert_eq!(found.note.as_deref(), Some(found.stage.label()));
            assert_eq!(found.status, CustomerStatus::InProgress);
        }
    }

    #[tokio::test]
    async fn concurrent_notes_leave_one_of_the_written_values() {
        let (_dir, pool) = test_pool_with(5).await;
        let crm = service(pool, false);
        let id = crm.create_customer(acme()).await.unwrap().id;

        let notes: Vec<String> = (0..8).map(|i| format!("nota {i}")).collect();
        let mut tasks = Vec::new();
        for note in notes.clone() {
            let crm = crm.clone();
            tasks.push(tokio::spawn(async move { crm.update_note(id, &note).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let found = crm.find_customer(id).await.unwrap();
        assert!(notes.contains(&found.note.unwrap()));
    }

    #[tokio::test]
    async fn acme_scenario_through_the_pipeline() {
        let (_dir, pool) = test_pool().await;
        let crm = service(pool, false);

        let acme = crm.create_customer(acme()).await.unwrap();
        let listed = crm.list_customers().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].stage.label(), "1. Customer Identification");
        assert_eq!(listed[0].status.label(), "Pending");

        let moved = crm.update_stage(acme.id, "3. Quote Creation".parse().unwrap()).await.unwrap();
        assert_eq!(moved.stage.label(), "3. Quote Creation");
        assert_eq!(moved.status.label(), "In progress");
    }

    #[test]
    fn all_all_filter_returns_the_list_unchanged() {
        let list = vec![
            customer(3, "Ingrid", Stage::QuoteCreation),
            customer(1, "Elena", Stage::FIRST),
            customer(2, "Ingrid", Stage::FIRST),
        ];
        let filtered = filter_customers(list.clone(), &Filter::All, &Filter::All);
        assert_eq!(filtered, list);
    }

    #[test]
    fn filters_combine_and_keep_relative_order() {
        let list = vec![
            customer(1, "Ingrid", Stage::FIRST),
            customer(2, "Elena", Stage::FIRST),
            customer(3, "Ingrid", Stage::QuoteCreation),
            customer(4, "Ingrid", Stage::FIRST),
        ];

        let by_owner = filter_customers(list.clone(), &Filter::Only("Ingrid".into()), &Filter::All);
        assert_eq!(by_owner.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 3, 4]);

        let both = filter_customers(list.clone(), &Filter::Only("Ingrid".into()), &Filter::Only(Stage::FIRST));
        assert_eq!(both.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 4]);

        let none = filter_customers(list, &Filter::Only("Michela".into()), &Filter::All);
        assert!(none.is_empty());
    }

    #[test]
    fn filter_values_parse_the_all_sentinel() {
        assert_eq!("All".parse::<Filter<Stage>>().unwrap(), Filter::All);
        assert_eq!(
            "5. Offer Generation".parse::<Filter<Stage>>().unwrap(),
            Filter::Only(Stage::OfferGeneration)
        );
        assert!("Tutti i clienti".parse::<Filter<Stage>>().is_err());
        assert_eq!("Elena".parse::<Filter<String>>().unwrap(), Filter::Only("Elena".to_string()));
    }

    #[test]
    fn options_are_distinct_in_first_seen_order() {
        let list = vec![
            customer(1, "Michela", Stage::QuoteCreation),
            customer(2, "Elena", Stage::FIRST),
            customer(3, "Michela", Stage::FIRST),
        ];
        let options = filter_options(&list);
        assert_eq!(options.owners, vec!["Michela", "Elena"]);
        assert_eq!(options.stages, vec![Stage::QuoteCreation, Stage::FIRST]);
    }
}
