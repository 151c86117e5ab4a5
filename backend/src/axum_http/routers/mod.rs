pub mod groups;
pub mod provider_webhooks;
pub mod reports;
pub mod subscribers;

use textline::infra::db::repositories::{
    pending_deposits::PendingDepositPostgres, processed_events::ProcessedEventPostgres,
    scheduled_messages::ScheduledMessagePostgres, service_groups::ServiceGroupPostgres,
    subscribers::SubscriberPostgres,
};

use crate::usecases::{
    delivery_windows::DeliveryWindowCalculator, onboarding::OnboardingUseCase,
    provider_events::ProviderEventNormalizer, reporting::ReportingUseCase,
    subscription_state::SubscriptionStateMachine,
};

pub type Normalizer = ProviderEventNormalizer<SubscriberPostgres, PendingDepositPostgres>;
pub type StateMachine = SubscriptionStateMachine<SubscriberPostgres, ProcessedEventPostgres>;
pub type Onboarding =
    OnboardingUseCase<SubscriberPostgres, ScheduledMessagePostgres, PendingDepositPostgres>;
pub type Calculator =
    DeliveryWindowCalculator<ServiceGroupPostgres, SubscriberPostgres, ScheduledMessagePostgres>;
pub type Reporting = ReportingUseCase<SubscriberPostgres, ScheduledMessagePostgres>;
