use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::service_groups},
};
use domain::{
    entities::service_groups::ServiceGroupEntity,
    repositories::service_groups::ServiceGroupRepository,
};

pub struct ServiceGroupPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ServiceGroupPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ServiceGroupRepository for ServiceGroupPostgres {
    async fn find_by_id(&self, group_id: Uuid) -> Result<Option<ServiceGroupEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = service_groups::table
            .find(group_id)
            .select(ServiceGroupEntity::as_select())
            .first::<ServiceGroupEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }
}
