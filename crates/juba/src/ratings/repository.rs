use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{Rating, RatingId, Score};
use crate::jobs::domain::{JobId, UserId};
use crate::jobs::RepositoryError;

#[async_trait]
pub trait RatingRepository: Send + Sync {
    /// Store a rating. Fails with [`RepositoryError::Conflict`] when the
    /// reviewer already rated the same user for the same job.
    async fn insert(&self, rating: Rating) -> Result<Rating, RepositoryError>;
    async fn fetch(&self, id: RatingId) -> Result<Option<Rating>, RepositoryError>;
    /// Ratings received by `user_id`, newest first.
    async fn received_by(&self, user_id: UserId) -> Result<Vec<Rating>, RepositoryError>;
    /// Ratings written by `user_id`, newest first.
    async fn given_by(&self, user_id: UserId) -> Result<Vec<Rating>, RepositoryError>;
    /// Ratings left on `job_id`, newest first.
    async fn for_job(&self, job_id: JobId) -> Result<Vec<Rating>, RepositoryError>;
    async fn exists(
        &self,
        job_id: JobId,
        reviewer_id: UserId,
        reviewed_id: UserId,
    ) -> Result<bool, RepositoryError>;
    /// Replace score and comment where the row was written by `reviewer_id`.
    /// `None` when no such row exists.
    async fn update(
        &self,
        id: RatingId,
        reviewer_id: UserId,
        score: Score,
        comment: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Rating>, RepositoryError>;
    /// Remove the row where it was written by `reviewer_id`. Returns affected rows.
    async fn delete(&self, id: RatingId, reviewer_id: UserId) -> Result<u64, RepositoryError>;
}
