//! Infrastructure layer: event storage, the aggregate repository, configuration.

pub mod config;
pub mod event_store;
pub mod repository;


pub use config::{ConfigError, RepositoryConfig, SubscriberFailurePolicy};
pub use event_store::{
    EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent,
};
pub use repository::{AggregateRepository, RepositoryError};
