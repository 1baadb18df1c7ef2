//! Multi-tenant booking and availability engine.
//!
//! Availability rules describe when a provider can be booked; the engine turns
//! them into concrete time slots, detects conflicts against existing bookings,
//! and persists new bookings through a [`store::DocumentStore`] that enforces
//! the no-double-booking constraint atomically.

pub mod access;
pub mod clock;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod split;
pub mod store;

pub use engine::{BookingEngine, EngineError};
