use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, dsl::count_star, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{pending_deposits, scheduled_messages, subscribers},
    },
};
use domain::{
    entities::subscribers::{InsertSubscriberEntity, SubscriberEntity},
    repositories::subscribers::SubscriberRepository,
    value_objects::{
        enums::{
            payment_providers::PaymentProvider, subscription_statuses::SubscriptionStatus,
        },
        provider_bindings::ProviderBinding,
    },
};

pub struct SubscriberPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriberPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriberRepository for SubscriberPostgres {
    async fn create(&self, insert_subscriber_entity: InsertSubscriberEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(subscribers::table)
            .values(&insert_subscriber_entity)
            .returning(subscribers::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id(&self, subscriber_id: Uuid) -> Result<Option<SubscriberEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscribers::table
            .find(subscriber_id)
            .select(SubscriberEntity::as_select())
            .first::<SubscriberEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_provider_ref(
        &self,
        provider: PaymentProvider,
        provider_ref: &str,
    ) -> Result<Option<SubscriberEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscribers::table
            .filter(subscribers::payment_provider.eq(provider.as_str()))
            .filter(subscribers::provider_ref.eq(provider_ref))
            .select(SubscriberEntity::as_select())
            .first::<SubscriberEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn current_status(&self, subscriber_id: Uuid) -> Result<Option<SubscriptionStatus>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let status = subscribers::table
            .find(subscriber_id)
            .select(subscribers::status)
            .first::<String>(&mut conn)
            .optional()?;

        Ok(status.map(|value| SubscriptionStatus::from_str(&value)))
    }

    async fn transition_status(
        &self,
        subscriber_id: Uuid,
        expected: SubscriptionStatus,
        next: SubscriptionStatus,
        binding: Option<ProviderBinding>,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let target = subscribers::table
            .filter(subscribers::id.eq(subscriber_id))
            .filter(subscribers::status.eq(expected.as_str()));

        let affected = match binding {
            Some(binding) => {
                let (provider, provider_ref) = binding.to_columns();
                update(target)
                    .set((
                        subscribers::status.eq(next.as_str()),
                        subscribers::payment_provider.eq(provider),
                        subscribers::provider_ref.eq(provider_ref),
                        subscribers::updated_at.eq(Utc::now()),
                    ))
                    .execute(&mut conn)?
            }
            None => update(target)
                .set((
                    subscribers::status.eq(next.as_str()),
                    subscribers::updated_at.eq(Utc::now()),
                ))
                .execute(&mut conn)?,
        };

        Ok(affected > 0)
    }

    async fn list_active_in_group(&self, group_id: Uuid) -> Result<Vec<SubscriberEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = subscribers::table
            .filter(subscribers::group_id.eq(group_id))
            .filter(subscribers::status.eq(SubscriptionStatus::Active.as_str()))
            .select(SubscriberEntity::as_select())
            .load::<SubscriberEntity>(&mut conn)?;

        Ok(results)
    }

    async fn status_counts(&self) -> Result<Vec<(String, i64)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = subscribers::table
            .group_by(subscribers::status)
            .select((subscribers::status, count_star()))
            .load::<(String, i64)>(&mut conn)?;

        Ok(results)
    }

    async fn purge(&self, subscriber_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<(), diesel::result::Error, _>(|conn| {
            diesel::delete(
                scheduled_messages::table
                    .filter(scheduled_messages::subscriber_id.eq(subscriber_id)),
            )
            .execute(conn)?;
            diesel::delete(
                pending_deposits::table.filter(pending_deposits::subscriber_id.eq(subscriber_id)),
            )
            .execute(conn)?;
            diesel::delete(subscribers::table.find(subscriber_id)).execute(conn)?;
            Ok(())
        })?;

        Ok(())
    }
}
