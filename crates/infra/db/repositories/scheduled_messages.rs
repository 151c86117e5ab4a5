use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::scheduled_messages},
};
use domain::{
    entities::scheduled_messages::{InsertScheduledMessageEntity, ScheduledMessageEntity},
    repositories::scheduled_messages::ScheduledMessageRepository,
    value_objects::enums::delivery_outcomes::DeliveryOutcome,
};

pub struct ScheduledMessagePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ScheduledMessagePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ScheduledMessageRepository for ScheduledMessagePostgres {
    async fn enqueue(&self, entity: InsertScheduledMessageEntity) -> Result<Uuid> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(scheduled_messages::table)
            .values(&entity)
            .returning(scheduled_messages::id)
            .get_result::<Uuid>(&mut conn)?;

        Ok(result)
    }

    async fn enqueue_batch(&self, entities: Vec<InsertScheduledMessageEntity>) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let inserted = insert_into(scheduled_messages::table)
            .values(&entities)
            .execute(&mut conn)?;

        Ok(inserted)
    }

    async fn due_messages(&self, as_of: DateTime<Utc>) -> Result<Vec<ScheduledMessageEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = scheduled_messages::table
            .filter(scheduled_messages::sent.eq(false))
            .filter(scheduled_messages::delivery_outcome.eq(DeliveryOutcome::Pending.as_str()))
            .filter(scheduled_messages::scheduled_for.le(as_of))
            .filter(
                scheduled_messages::next_attempt_at
                    .is_null()
                    .or(scheduled_messages::next_attempt_at.le(as_of)),
            )
            .order(scheduled_messages::scheduled_for.asc())
            .select(ScheduledMessageEntity::as_select())
            .load::<ScheduledMessageEntity>(&mut conn)?;

        Ok(results)
    }

    async fn mark_sent(
        &self,
        message_id: Uuid,
        sent_at: DateTime<Utc>,
        outcome: DeliveryOutcome,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Conditional on the sent flag so a second call is a no-op and an
        // already-recorded sent_at is never overwritten.
        let affected = update(
            scheduled_messages::table
                .filter(scheduled_messages::id.eq(message_id))
                .filter(scheduled_messages::sent.eq(false)),
        )
        .set((
            scheduled_messages::sent.eq(true),
            scheduled_messages::sent_at.eq(Some(sent_at)),
            scheduled_messages::delivery_outcome.eq(outcome.as_str()),
        ))
        .execute(&mut conn)?;

        Ok(affected > 0)
    }

    async fn record_failure(
        &self,
        message_id: Uuid,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<i32> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let attempts = update(scheduled_messages::table.find(message_id))
            .set((
                scheduled_messages::attempts.eq(scheduled_messages::attempts + 1),
                scheduled_messages::last_error.eq(Some(error)),
                scheduled_messages::next_attempt_at.eq(Some(next_attempt_at)),
            ))
            .returning(scheduled_messages::attempts)
            .get_result::<i32>(&mut conn)?;

        Ok(attempts)
    }

    async fn mark_failed(&self, message_id: Uuid, error: &str) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(
            scheduled_messages::table
                .filter(scheduled_messages::id.eq(message_id))
                .filter(scheduled_messages::sent.eq(false)),
        )
        .set((
            scheduled_messages::delivery_outcome.eq(DeliveryOutcome::Failed.as_str()),
            scheduled_messages::last_error.eq(Some(error)),
        ))
        .execute(&mut conn)?;

        Ok(())
    }

    async fn list_for_subscriber(
        &self,
        subscriber_id: Uuid,
    ) -> Result<Vec<ScheduledMessageEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = scheduled_messages::table
            .filter(scheduled_messages::subscriber_id.eq(subscriber_id))
            .order(scheduled_messages::scheduled_for.desc())
            .select(ScheduledMessageEntity::as_select())
            .load::<ScheduledMessageEntity>(&mut conn)?;

        Ok(results)
    }

    async fn message_counts(&self) -> Result<(i64, i64)> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let pending = scheduled_messages::table
            .filter(scheduled_messages::sent.eq(false))
            .count()
            .get_result::<i64>(&mut conn)?;
        let sent = scheduled_messages::table
            .filter(scheduled_messages::sent.eq(true))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok((pending, sent))
    }
}
