use seekyours_core::AggregateId;

/// A domain event: the event enum of one aggregate kind.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **tagged**: every variant has a stable discriminant (`event_type`)
/// - **owned** by exactly one aggregate instance (`aggregate_id`)
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier of the variant (e.g. "customers.customer.created").
    fn event_type(&self) -> &'static str;

    /// Identity of the aggregate this fact belongs to.
    fn aggregate_id(&self) -> AggregateId;

    /// Schema version for this event type.
    fn version(&self) -> u32 {
        1
    }
}

/// A payload struct that is one variant of the event enum `E`.
///
/// This is the typed handle used to append a change and to look up the last
/// change of a given kind without any runtime type inspection: lookups compare
/// `EVENT_TYPE` against the envelope tag, then project the variant out.
pub trait EventKind<E: Event>: Sized {
    /// Discriminant of this variant; must equal `self.into_event().event_type()`.
    const EVENT_TYPE: &'static str;

    fn into_event(self) -> E;

    fn from_event(event: &E) -> Option<&Self>;
}

/// Implements [`EventKind`] for a payload struct wrapped by a tuple variant.
///
/// ```ignore
/// impl_event_kind!(CustomerEvent, Created(CustomerCreated) => "customers.customer.created");
/// ```
#[macro_export]
macro_rules! impl_event_kind {
    ($event:ident, $variant:ident($payload:ty) => $tag:literal) => {
        impl $crate::EventKind<$event> for $payload {
            const EVENT_TYPE: &'static str = $tag;

            fn into_event(self) -> $event {
                $event::$variant(self)
            }

            fn from_event(event: &$event) -> Option<&Self> {
                match event {
                    $event::$variant(inner) => Some(inner),
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }
        }
    };
}
