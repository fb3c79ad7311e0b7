//! Mutual ratings between the client and the hired freelancer of a completed job.
//!
//! Only the author of a rating may edit or delete it.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Rating, RatingEdit, RatingHistory, RatingId, RatingSubmission, RatingSummary, Score,
};
pub use repository::RatingRepository;
pub use router::rating_router;
pub use service::RatingService;
