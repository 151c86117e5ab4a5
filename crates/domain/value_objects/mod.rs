pub mod enums;
pub mod normalized_events;
pub mod pending_deposits;
pub mod provider_bindings;
pub mod scheduled_messages;
pub mod service_groups;
pub mod subscribers;
