//! Events, envelopes and the event-sourced aggregate abstraction.
//!
//! Write side: an [`Aggregate`] records changes as [`EventEnvelope`]s in its
//! [`Timeline`] and derives every field from it.
//! Read side: committed events are published as [`Notification`]s to
//! [`Subscriber`]s, either synchronously or through a queued [`Subscription`].

pub mod aggregate;
pub mod bus;
pub mod envelope;
pub mod event;
pub mod notification;
pub mod subscriber;

pub use aggregate::{Aggregate, Timeline};
pub use bus::{QueueSubscriber, Subscription};
pub use envelope::EventEnvelope;
pub use event::{Event, EventKind};
pub use notification::{DecodeError, Notification};
pub use subscriber::{Subscriber, SubscriberError, SubscriberId, SubscriberRegistry};
