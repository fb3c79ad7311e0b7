//! User reports about another marketplace member.
//!
//! Members file reports here; reviewing and resolving them is left to
//! moderation tooling outside this crate.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{Report, ReportId, ReportStatus, ReportSubmission, ReportType};
pub use repository::ReportRepository;
pub use router::report_router;
pub use service::ReportService;
