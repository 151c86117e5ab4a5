pub mod pending_deposits;
pub mod processed_events;
pub mod scheduled_messages;
pub mod service_groups;
pub mod subscribers;
