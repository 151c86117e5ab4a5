use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use textline::domain::repositories::{
    scheduled_messages::ScheduledMessageRepository, subscribers::SubscriberRepository,
};
use tracing::info;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OverviewReport {
    pub subscribers_by_status: BTreeMap<String, i64>,
    pub messages_pending: i64,
    pub messages_sent: i64,
}

/// Aggregated counts for reporting surfaces.
pub struct ReportingUseCase<S, M>
where
    S: SubscriberRepository + Send + Sync + 'static,
    M: ScheduledMessageRepository + Send + Sync + 'static,
{
    subscriber_repo: Arc<S>,
    message_repo: Arc<M>,
}

impl<S, M> ReportingUseCase<S, M>
where
    S: SubscriberRepository + Send + Sync + 'static,
    M: ScheduledMessageRepository + Send + Sync + 'static,
{
    pub fn new(subscriber_repo: Arc<S>, message_repo: Arc<M>) -> Self {
        Self {
            subscriber_repo,
            message_repo,
        }
    }

    pub async fn overview(&self) -> Result<OverviewReport> {
        let subscribers_by_status = self
            .subscriber_repo
            .status_counts()
            .await?
            .into_iter()
            .collect::<BTreeMap<String, i64>>();
        let (messages_pending, messages_sent) = self.message_repo.message_counts().await?;

        info!(
            messages_pending,
            messages_sent,
            "reporting: overview computed"
        );

        Ok(OverviewReport {
            subscribers_by_status,
            messages_pending,
            messages_sent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use textline::domain::repositories::{
        scheduled_messages::MockScheduledMessageRepository,
        subscribers::MockSubscriberRepository,
    };

    #[tokio::test]
    async fn overview_aggregates_counts() {
        let mut subscriber_repo = MockSubscriberRepository::new();
        subscriber_repo.expect_status_counts().returning(|| {
            Box::pin(async {
                Ok(vec![
                    ("active".to_string(), 12),
                    ("past_due".to_string(), 2),
                    ("canceled".to_string(), 3),
                ])
            })
        });

        let mut message_repo = MockScheduledMessageRepository::new();
        message_repo
            .expect_message_counts()
            .returning(|| Box::pin(async { Ok((7, 40)) }));

        let usecase =
            ReportingUseCase::new(Arc::new(subscriber_repo), Arc::new(message_repo));

        let report = usecase.overview().await.unwrap();
        assert_eq!(report.subscribers_by_status.get("active"), Some(&12));
        assert_eq!(report.messages_pending, 7);
        assert_eq!(report.messages_sent, 40);
    }
}
