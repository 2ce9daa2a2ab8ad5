//! Customers domain module (event-sourced).
//!
//! The reference aggregate for the SeekYouRS core: a customer is created with a
//! name, may be renamed any number of times, and may be removed. All state is
//! derived from its event timeline.

pub mod customer;

pub use customer::{Customer, CustomerChanged, CustomerCreated, CustomerEvent, CustomerRemoved};
