use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use textline::domain::{
    entities::scheduled_messages::InsertScheduledMessageEntity,
    repositories::{
        scheduled_messages::ScheduledMessageRepository, service_groups::ServiceGroupRepository,
        subscribers::SubscriberRepository,
    },
    value_objects::{
        enums::{
            delivery_outcomes::DeliveryOutcome, delivery_preferences::DeliveryPreference,
        },
        service_groups::ServiceGroupModel,
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("service group not found")]
    GroupNotFound,
    #[error("service group is inactive")]
    GroupInactive,
    #[error("group has no slot named {0}")]
    UnknownSlot(String),
    #[error("slot time is not HH:MM: {0}")]
    InvalidSlotTime(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ScheduleError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            ScheduleError::GroupNotFound => StatusCode::NOT_FOUND,
            ScheduleError::GroupInactive
            | ScheduleError::UnknownSlot(_)
            | ScheduleError::InvalidSlotTime(_) => StatusCode::BAD_REQUEST,
            ScheduleError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScheduleSummary {
    pub slot: String,
    pub date: NaiveDate,
    pub scheduled: usize,
    pub timezone_matched: usize,
    pub utc_fixed: usize,
    pub missing_timezone: usize,
    pub excluded_on_demand: usize,
}

/// Computes the UTC send instant for a slot's clock time. With timezone
/// matching the slot time is local at the subscriber's offset, so UTC is
/// local minus the offset; without an offset to match against, the slot
/// time is read directly as UTC and the fallback flag is raised.
/// Day-boundary crossings fall out of the arithmetic and are correct.
pub fn slot_instant(
    date: NaiveDate,
    slot_time: NaiveTime,
    offset_minutes: Option<i32>,
    timezone_match: bool,
) -> (DateTime<Utc>, bool) {
    let local = date.and_time(slot_time);
    match (timezone_match, offset_minutes) {
        (true, Some(offset)) => (
            Utc.from_utc_datetime(&(local - Duration::minutes(offset as i64))),
            false,
        ),
        (true, None) => (Utc.from_utc_datetime(&local), true),
        (false, _) => (Utc.from_utc_datetime(&local), false),
    }
}

/// Turns a group slot into one scheduled message per eligible subscriber.
pub struct DeliveryWindowCalculator<G, S, M>
where
    G: ServiceGroupRepository + Send + Sync + 'static,
    S: SubscriberRepository + Send + Sync + 'static,
    M: ScheduledMessageRepository + Send + Sync + 'static,
{
    group_repo: Arc<G>,
    subscriber_repo: Arc<S>,
    message_repo: Arc<M>,
}

impl<G, S, M> DeliveryWindowCalculator<G, S, M>
where
    G: ServiceGroupRepository + Send + Sync + 'static,
    S: SubscriberRepository + Send + Sync + 'static,
    M: ScheduledMessageRepository + Send + Sync + 'static,
{
    pub fn new(group_repo: Arc<G>, subscriber_repo: Arc<S>, message_repo: Arc<M>) -> Self {
        Self {
            group_repo,
            subscriber_repo,
            message_repo,
        }
    }

    pub async fn compute_schedule(
        &self,
        group_id: Uuid,
        slot_name: &str,
        date: NaiveDate,
    ) -> Result<ScheduleSummary, ScheduleError> {
        let group = self.load_group(group_id).await?;
        self.schedule_slot(&group, slot_name, date).await
    }

    /// Schedules every slot the group defines for the given date.
    pub async fn schedule_daily(
        &self,
        group_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<ScheduleSummary>, ScheduleError> {
        let group = self.load_group(group_id).await?;

        let mut summaries = Vec::with_capacity(group.slots.len());
        for slot_name in group.slots.keys() {
            summaries.push(self.schedule_slot(&group, slot_name, date).await?);
        }
        Ok(summaries)
    }

    async fn load_group(&self, group_id: Uuid) -> Result<ServiceGroupModel, ScheduleError> {
        let group = self
            .group_repo
            .find_by_id(group_id)
            .await
            .map_err(|err| {
                error!(%group_id, db_error = ?err, "delivery_windows: failed to load group");
                ScheduleError::Internal(err)
            })?
            .ok_or(ScheduleError::GroupNotFound)?;

        let group = ServiceGroupModel::from(group);
        if !group.is_active {
            return Err(ScheduleError::GroupInactive);
        }
        Ok(group)
    }

    async fn schedule_slot(
        &self,
        group: &ServiceGroupModel,
        slot_name: &str,
        date: NaiveDate,
    ) -> Result<ScheduleSummary, ScheduleError> {
        let slot = group
            .slots
            .get(slot_name)
            .ok_or_else(|| ScheduleError::UnknownSlot(slot_name.to_string()))?;
        let slot_time = slot
            .parse_time()
            .ok_or_else(|| ScheduleError::InvalidSlotTime(slot.time.clone()))?;

        let body = slot
            .template
            .clone()
            .unwrap_or_else(|| format!("Good {slot_name}!"));

        let subscribers = self.subscriber_repo.list_active_in_group(group.id).await?;

        let mut summary = ScheduleSummary {
            slot: slot_name.to_string(),
            date,
            scheduled: 0,
            timezone_matched: 0,
            utc_fixed: 0,
            missing_timezone: 0,
            excluded_on_demand: 0,
        };
        let mut entities = Vec::with_capacity(subscribers.len());

        for subscriber in subscribers {
            let preference = DeliveryPreference::from_str(&subscriber.delivery_preference)
                .unwrap_or_default();

            // On-demand subscribers are pull-only, never broadcast targets.
            if preference == DeliveryPreference::OnDemand {
                summary.excluded_on_demand += 1;
                continue;
            }

            let timezone_match = preference == DeliveryPreference::ScheduledTimezone;
            let (scheduled_for, fallback) = slot_instant(
                date,
                slot_time,
                subscriber.timezone_offset_minutes,
                timezone_match,
            );

            if fallback {
                summary.missing_timezone += 1;
                warn!(
                    subscriber_id = %subscriber.id,
                    group_id = %group.id,
                    slot = slot_name,
                    "delivery_windows: timezone matching requested but no offset stored; falling back to UTC"
                );
            } else if timezone_match {
                summary.timezone_matched += 1;
            } else {
                summary.utc_fixed += 1;
            }

            entities.push(InsertScheduledMessageEntity {
                subscriber_id: subscriber.id,
                body: body.clone(),
                image_url: None,
                scheduled_for,
                sent: false,
                delivery_outcome: DeliveryOutcome::Pending.as_str().to_string(),
                attempts: 0,
                timezone_offset_minutes: subscriber.timezone_offset_minutes,
                timezone_label: subscriber.timezone_label.clone(),
            });
        }

        summary.scheduled = entities.len();
        if !entities.is_empty() {
            self.message_repo.enqueue_batch(entities).await?;
        }

        info!(
            group_id = %group.id,
            slot = slot_name,
            date = %date,
            scheduled = summary.scheduled,
            timezone_matched = summary.timezone_matched,
            utc_fixed = summary.utc_fixed,
            missing_timezone = summary.missing_timezone,
            excluded_on_demand = summary.excluded_on_demand,
            "delivery_windows: slot scheduled"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use textline::domain::{
        entities::{service_groups::ServiceGroupEntity, subscribers::SubscriberEntity},
        repositories::{
            scheduled_messages::MockScheduledMessageRepository,
            service_groups::MockServiceGroupRepository, subscribers::MockSubscriberRepository,
        },
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, min, 0).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn est_slot_maps_to_afternoon_utc() {
        let (instant, fallback) =
            slot_instant(date(2025, 6, 1), time(8, 0), Some(-300), true);
        assert_eq!(instant, utc(2025, 6, 1, 13, 0));
        assert!(!fallback);
    }

    #[test]
    fn ist_slot_maps_to_early_morning_utc() {
        let (instant, fallback) =
            slot_instant(date(2025, 6, 1), time(8, 0), Some(330), true);
        assert_eq!(instant, utc(2025, 6, 1, 2, 30));
        assert!(!fallback);
    }

    #[test]
    fn non_matched_subscriber_reads_slot_as_utc() {
        let (instant, fallback) =
            slot_instant(date(2025, 6, 1), time(8, 0), Some(-300), false);
        assert_eq!(instant, utc(2025, 6, 1, 8, 0));
        assert!(!fallback);
    }

    #[test]
    fn missing_offset_falls_back_to_utc_and_flags_it() {
        let matched = slot_instant(date(2025, 6, 1), time(8, 0), None, true);
        let fixed = slot_instant(date(2025, 6, 1), time(8, 0), Some(-300), false);
        assert_eq!(matched.0, fixed.0);
        assert!(matched.1);
    }

    #[test]
    fn far_west_evening_slot_crosses_the_utc_day_boundary() {
        let (instant, _) = slot_instant(date(2025, 6, 1), time(20, 0), Some(-600), true);
        assert_eq!(instant, utc(2025, 6, 2, 6, 0));
    }

    fn sample_group(id: Uuid) -> ServiceGroupEntity {
        let now = Utc::now();
        ServiceGroupEntity {
            id,
            name: "Morning Motivation".to_string(),
            description: None,
            slots: serde_json::json!({
                "morning": {"time": "08:00", "template": "Rise and shine"},
                "evening": {"time": "20:00"}
            }),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn group_subscriber(
        group_id: Uuid,
        preference: &str,
        offset: Option<i32>,
    ) -> SubscriberEntity {
        let now = Utc::now();
        SubscriberEntity {
            id: Uuid::new_v4(),
            phone_number: "5551234567".to_string(),
            carrier: "verizon".to_string(),
            timezone_offset_minutes: offset,
            timezone_label: offset.map(|o| format!("UTC{o:+}")),
            delivery_preference: preference.to_string(),
            status: "active".to_string(),
            payment_provider: Some("card_billing".to_string()),
            provider_ref: Some("sub_1".to_string()),
            group_id: Some(group_id),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn compute_schedule_mixes_preferences_correctly() {
        let group_id = Uuid::new_v4();

        let mut group_repo = MockServiceGroupRepository::new();
        let group = sample_group(group_id);
        group_repo.expect_find_by_id().returning(move |_| {
            let group = group.clone();
            Box::pin(async move { Ok(Some(group)) })
        });

        let mut subscriber_repo = MockSubscriberRepository::new();
        let subscribers = vec![
            group_subscriber(group_id, "scheduled", Some(-300)),
            group_subscriber(group_id, "scheduled_timezone", Some(-300)),
            group_subscriber(group_id, "scheduled_timezone", None),
            group_subscriber(group_id, "on_demand", Some(60)),
        ];
        subscriber_repo
            .expect_list_active_in_group()
            .returning(move |_| {
                let subscribers = subscribers.clone();
                Box::pin(async move { Ok(subscribers) })
            });

        let mut message_repo = MockScheduledMessageRepository::new();
        message_repo
            .expect_enqueue_batch()
            .withf(|entities| {
                entities.len() == 3
                    && entities.iter().all(|e| e.body == "Rise and shine" && !e.sent)
            })
            .times(1)
            .returning(|entities| {
                let count = entities.len();
                Box::pin(async move { Ok(count) })
            });

        let calculator = DeliveryWindowCalculator::new(
            Arc::new(group_repo),
            Arc::new(subscriber_repo),
            Arc::new(message_repo),
        );

        let summary = calculator
            .compute_schedule(group_id, "morning", date(2025, 6, 1))
            .await
            .unwrap();

        assert_eq!(summary.scheduled, 3);
        assert_eq!(summary.timezone_matched, 1);
        assert_eq!(summary.utc_fixed, 1);
        assert_eq!(summary.missing_timezone, 1);
        assert_eq!(summary.excluded_on_demand, 1);
    }

    #[tokio::test]
    async fn unknown_slot_is_rejected() {
        let group_id = Uuid::new_v4();

        let mut group_repo = MockServiceGroupRepository::new();
        let group = sample_group(group_id);
        group_repo.expect_find_by_id().returning(move |_| {
            let group = group.clone();
            Box::pin(async move { Ok(Some(group)) })
        });

        let calculator = DeliveryWindowCalculator::new(
            Arc::new(group_repo),
            Arc::new(MockSubscriberRepository::new()),
            Arc::new(MockScheduledMessageRepository::new()),
        );

        let result = calculator
            .compute_schedule(group_id, "midnight", date(2025, 6, 1))
            .await;
        assert!(matches!(result, Err(ScheduleError::UnknownSlot(_))));
    }

    #[tokio::test]
    async fn schedule_daily_walks_every_slot() {
        let group_id = Uuid::new_v4();

        let mut group_repo = MockServiceGroupRepository::new();
        let group = sample_group(group_id);
        group_repo.expect_find_by_id().returning(move |_| {
            let group = group.clone();
            Box::pin(async move { Ok(Some(group)) })
        });

        let mut subscriber_repo = MockSubscriberRepository::new();
        let subscribers = vec![group_subscriber(group_id, "scheduled", None)];
        subscriber_repo
            .expect_list_active_in_group()
            .returning(move |_| {
                let subscribers = subscribers.clone();
                Box::pin(async move { Ok(subscribers) })
            });

        let mut message_repo = MockScheduledMessageRepository::new();
        message_repo
            .expect_enqueue_batch()
            .times(2)
            .returning(|entities| {
                let count = entities.len();
                Box::pin(async move { Ok(count) })
            });

        let calculator = DeliveryWindowCalculator::new(
            Arc::new(group_repo),
            Arc::new(subscriber_repo),
            Arc::new(message_repo),
        );

        let summaries = calculator
            .schedule_daily(group_id, date(2025, 6, 1))
            .await
            .unwrap();

        let slots: Vec<&str> = summaries.iter().map(|s| s.slot.as_str()).collect();
        assert_eq!(slots, vec!["evening", "morning"]);
    }
}
