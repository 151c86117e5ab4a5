pub mod delivery_outcomes;
pub mod delivery_preferences;
pub mod deposit_statuses;
pub mod payment_providers;
pub mod subscription_statuses;
