use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::service_groups::ServiceGroupEntity;

#[async_trait]
#[automock]
pub trait ServiceGroupRepository {
    async fn find_by_id(&self, group_id: Uuid) -> Result<Option<ServiceGroupEntity>>;
}
