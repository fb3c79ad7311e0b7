//! Notification fan-out for lifecycle events.
//!
//! The center is the concrete [`EventPublisher`](crate::jobs::EventPublisher):
//! it renders each event for its recipients, keeps a per-user inbox, and pushes
//! every stored notification onto a broadcast channel for live clients.

pub mod center;
pub mod router;

#[cfg(test)]
mod tests;

pub use center::{render, Notification, NotificationCenter, NotificationId};
pub use router::notification_router;
