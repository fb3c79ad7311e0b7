//! Core of the Juba freelance marketplace.
//!
//! Clients post jobs, freelancers apply with a proposed rate, and the job owner
//! selects a single freelancer. [`jobs::JobLifecycleService`] owns those
//! transitions and hands domain events to the notification fan-out without
//! letting delivery failures leak back into the state change.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod jobs;
pub mod notifications;
pub mod rate_limit;
pub mod ratings;
pub mod reports;
pub mod telemetry;
