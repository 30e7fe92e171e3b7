pub mod formatter;
pub mod pubsub_service;
pub mod registry_service;
