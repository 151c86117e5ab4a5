use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::processed_events},
};
use domain::{
    entities::processed_events::ProcessedEventEntity,
    repositories::processed_events::ProcessedEventRepository,
    value_objects::enums::payment_providers::PaymentProvider,
};

pub struct ProcessedEventPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ProcessedEventPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ProcessedEventRepository for ProcessedEventPostgres {
    async fn seen(
        &self,
        subscriber_id: Uuid,
        provider: PaymentProvider,
        event_id: &str,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let existing = processed_events::table
            .filter(processed_events::subscriber_id.eq(subscriber_id))
            .filter(processed_events::provider.eq(provider.as_str()))
            .filter(processed_events::event_id.eq(event_id))
            .select(processed_events::event_id)
            .first::<String>(&mut conn)
            .optional()?;

        Ok(existing.is_some())
    }

    async fn record(
        &self,
        subscriber_id: Uuid,
        provider: PaymentProvider,
        event_id: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let entity = ProcessedEventEntity {
            subscriber_id,
            provider: provider.as_str().to_string(),
            event_id: event_id.to_string(),
            observed_at,
        };

        insert_into(processed_events::table)
            .values(&entity)
            .on_conflict_do_nothing()
            .execute(&mut conn)?;

        Ok(())
    }
}
