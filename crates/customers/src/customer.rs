use serde::{Deserialize, Serialize};

use seekyours_core::{AggregateId, AggregateRoot, DomainError, DomainResult};
use seekyours_events::{Aggregate, Event, Timeline, impl_event_kind};

/// Event: CustomerCreated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerCreated {
    pub id: AggregateId,
    pub name: String,
}

/// Event: CustomerChanged (renamed).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerChanged {
    pub id: AggregateId,
    pub name: String,
}

/// Event: CustomerRemoved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRemoved {
    pub id: AggregateId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerEvent {
    Created(CustomerCreated),
    Changed(CustomerChanged),
    Removed(CustomerRemoved),
}

impl Event for CustomerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CustomerEvent::Created(_) => "customers.customer.created",
            CustomerEvent::Changed(_) => "customers.customer.changed",
            CustomerEvent::Removed(_) => "customers.customer.removed",
        }
    }

    fn aggregate_id(&self) -> AggregateId {
        match self {
            CustomerEvent::Created(e) => e.id,
            CustomerEvent::Changed(e) => e.id,
            CustomerEvent::Removed(e) => e.id,
        }
    }
}

impl_event_kind!(CustomerEvent, Created(CustomerCreated) => "customers.customer.created");
impl_event_kind!(CustomerEvent, Changed(CustomerChanged) => "customers.customer.changed");
impl_event_kind!(CustomerEvent, Removed(CustomerRemoved) => "customers.customer.removed");

/// Aggregate root: Customer.
///
/// Precedence for every derived field: a removal anywhere in the timeline wins,
/// then the most recent change, then the creation event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Customer {
    timeline: Timeline<CustomerEvent>,
}

impl Customer {
    /// A fresh, not-yet-created customer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current name; `None` once removed or before creation.
    pub fn name(&self) -> Option<&str> {
        if self.is_removed() {
            return None;
        }
        match self.last_of::<CustomerChanged>() {
            Some(changed) => Some(changed.name.as_str()),
            None => self.last_of::<CustomerCreated>().map(|c| c.name.as_str()),
        }
    }

    pub fn is_removed(&self) -> bool {
        self.contains::<CustomerRemoved>()
    }

    pub fn create(&mut self, id: AggregateId, name: impl Into<String>) -> DomainResult<()> {
        if id.is_empty() {
            return Err(DomainError::invalid_id("customer id cannot be empty"));
        }
        if self.contains::<CustomerCreated>() {
            return Err(DomainError::conflict("customer already exists"));
        }
        let name = validated_name(name.into())?;

        self.apply_change(CustomerCreated { id, name });
        Ok(())
    }

    pub fn change(&mut self, name: impl Into<String>) -> DomainResult<()> {
        let id = self.ensure_live()?;
        let name = validated_name(name.into())?;

        self.apply_change(CustomerChanged { id, name });
        Ok(())
    }

    pub fn remove(&mut self) -> DomainResult<()> {
        let id = self.ensure_live()?;

        self.apply_change(CustomerRemoved { id });
        Ok(())
    }

    /// Identity to stamp on follow-up events; rejects removed or never-created customers.
    fn ensure_live(&self) -> DomainResult<AggregateId> {
        if self.is_removed() {
            return Err(DomainError::invariant("customer has been removed"));
        }
        let id = self.id();
        if id.is_empty() {
            return Err(DomainError::not_found());
        }
        Ok(id)
    }
}

fn validated_name(name: String) -> DomainResult<String> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(name)
}

impl AggregateRoot for Customer {
    fn id(&self) -> AggregateId {
        if self.is_removed() {
            return AggregateId::EMPTY;
        }
        self.last_of::<CustomerCreated>()
            .map(|created| created.id)
            .unwrap_or(AggregateId::EMPTY)
    }

    fn version(&self) -> u64 {
        self.timeline.len() as u64
    }
}

impl Aggregate for Customer {
    type Event = CustomerEvent;
    const AGGREGATE_TYPE: &'static str = "customers.customer";

    fn from_timeline(timeline: Timeline<CustomerEvent>) -> Self {
        Self { timeline }
    }

    fn timeline(&self) -> &Timeline<CustomerEvent> {
        &self.timeline
    }

    fn timeline_mut(&mut self) -> &mut Timeline<CustomerEvent> {
        &mut self.timeline
    }
}
