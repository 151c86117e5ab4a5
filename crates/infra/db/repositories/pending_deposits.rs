use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::pending_deposits},
};
use domain::{
    entities::pending_deposits::{InsertPendingDepositEntity, PendingDepositEntity},
    repositories::pending_deposits::PendingDepositRepository,
    value_objects::enums::deposit_statuses::DepositStatus,
};

pub struct PendingDepositPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PendingDepositPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PendingDepositRepository for PendingDepositPostgres {
    async fn create(&self, entity: InsertPendingDepositEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(pending_deposits::table)
            .values(&entity)
            .returning(pending_deposits::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(result)
    }

    async fn find_pending_for_subscriber(
        &self,
        subscriber_id: Uuid,
    ) -> Result<Option<PendingDepositEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = pending_deposits::table
            .filter(pending_deposits::subscriber_id.eq(subscriber_id))
            .filter(pending_deposits::status.eq(DepositStatus::Pending.as_str()))
            .order(pending_deposits::created_at.desc())
            .select(PendingDepositEntity::as_select())
            .first::<PendingDepositEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn mark_reviewed(
        &self,
        deposit_id: Uuid,
        status: DepositStatus,
        transaction_hash: Option<&str>,
        admin_notes: Option<&str>,
        reviewed_by: &str,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(pending_deposits::table.find(deposit_id))
            .set((
                pending_deposits::status.eq(status.as_str()),
                pending_deposits::transaction_hash.eq(transaction_hash),
                pending_deposits::admin_notes.eq(admin_notes),
                pending_deposits::reviewed_at.eq(Some(Utc::now())),
                pending_deposits::reviewed_by.eq(Some(reviewed_by)),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
