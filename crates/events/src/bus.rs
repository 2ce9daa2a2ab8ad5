//! Queued (decoupled) delivery of notifications.
//!
//! Synchronous subscribers run on the saving thread, so a slow projector slows
//! the writer. A [`QueueSubscriber`] instead forwards each notification into a
//! channel and returns immediately; the consumer drains the paired
//! [`Subscription`] on its own thread.
//!
//! Ordering is preserved: a subscription receives notifications in exactly the
//! order the repository published them.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use crate::notification::Notification;
use crate::subscriber::{Subscriber, SubscriberError};

/// Receiving end of a queued subscription.
///
/// ## Usage Pattern
///
/// ```ignore
/// let (_id, subscription) = repository.subscribe_queue();
///
/// std::thread::spawn(move || loop {
///     match subscription.recv_timeout(Duration::from_secs(1)) {
///         Ok(notification) => projector.apply(&notification),
///         Err(RecvTimeoutError::Timeout) => continue,   // check for shutdown
///         Err(RecvTimeoutError::Disconnected) => break, // unsubscribed / repository dropped
///     }
/// });
/// ```
///
/// Subscriptions are designed for single-threaded consumption.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Subscriber that enqueues notifications for a [`Subscription`].
#[derive(Debug, Clone)]
pub struct QueueSubscriber {
    sender: Sender<Notification>,
}

impl QueueSubscriber {
    /// Create a subscriber and its paired subscription.
    pub fn channel() -> (Self, Subscription<Notification>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, Subscription::new(receiver))
    }
}

impl Subscriber for QueueSubscriber {
    fn notify(&self, notification: &Notification) -> Result<(), SubscriberError> {
        self.sender
            .send(notification.clone())
            .map_err(|_| SubscriberError::new("queued subscription was dropped"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::EventEnvelope;
    use seekyours_core::{AggregateId, EventId};

    fn notification(seq: u64) -> Notification {
        Notification::new(
            "tests.thing",
            seq,
            EventEnvelope::from_parts(
                EventId::new(),
                AggregateId::new(),
                "tests.thing.happened",
                chrono::Utc::now(),
                serde_json::json!({ "seq": seq }),
            ),
        )
    }

    #[test]
    fn queued_notifications_arrive_in_order() {
        let (subscriber, subscription) = QueueSubscriber::channel();
        for seq in 1..=3 {
            subscriber.notify(&notification(seq)).unwrap();
        }

        let received: Vec<u64> = subscription
            .drain()
            .iter()
            .map(Notification::sequence_number)
            .collect();
        assert_eq!(received, vec![1, 2, 3]);
        assert!(subscription.try_recv().is_err());
    }

    #[test]
    fn dropped_subscription_reports_error() {
        let (subscriber, subscription) = QueueSubscriber::channel();
        drop(subscription);
        let err = subscriber.notify(&notification(1)).unwrap_err();
        assert!(err.message().contains("dropped"));
    }

    #[test]
    fn recv_timeout_times_out_when_empty() {
        let (_subscriber, subscription) = QueueSubscriber::channel();
        let res = subscription.recv_timeout(Duration::from_millis(5));
        assert!(matches!(res, Err(mpsc::RecvTimeoutError::Timeout)));
    }
}
