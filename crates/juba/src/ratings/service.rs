use std::sync::Arc;

use tracing::info;

use super::domain::{
    Rating, RatingEdit, RatingHistory, RatingId, RatingSubmission, RatingSummary, Score,
};
use super::repository::RatingRepository;
use crate::clock::Clock;
use crate::jobs::{
    Actor, ApplicationFilter, ApplicationRepository, ApplicationStatus, Collaborators, ErrorCode,
    JobId, JobRepository, JobStatus, LifecycleError, RepositoryError, UserId,
};

pub const MAX_COMMENT_CHARS: usize = 1000;

/// Lets the two parties of a completed job rate each other once.
pub struct RatingService {
    jobs: Arc<dyn JobRepository>,
    applications: Arc<dyn ApplicationRepository>,
    ratings: Arc<dyn RatingRepository>,
    clock: Arc<dyn Clock>,
}

impl RatingService {
    pub fn new(collaborators: &Collaborators) -> Self {
        Self {
            jobs: collaborators.jobs.clone(),
            applications: collaborators.applications.clone(),
            ratings: collaborators.ratings.clone(),
            clock: collaborators.clock.clone(),
        }
    }

    pub async fn submit(
        &self,
        actor: &Actor,
        submission: RatingSubmission,
    ) -> Result<Rating, LifecycleError> {
        let score = checked_score(submission.score)?;
        let comment = checked_comment(submission.comment.as_deref())?;

        let job = self
            .jobs
            .fetch(submission.job_id)
            .await?
            .ok_or_else(LifecycleError::job_not_found)?;
        if job.status != JobStatus::Completed {
            return Err(LifecycleError::conflict(
                ErrorCode::JobNotCompleted,
                "only completed jobs can be rated",
            ));
        }

        let freelancer = self
            .applications
            .find(&ApplicationFilter::for_job(job.id).with_status(ApplicationStatus::Accepted))
            .await?
            .into_iter()
            .next()
            .map(|application| application.freelancer_id)
            .ok_or_else(|| {
                LifecycleError::conflict(
                    ErrorCode::NoAcceptedApplication,
                    "job has no accepted freelancer to rate",
                )
            })?;

        let counterpart = counterpart(actor.actor_id, job.client_id, freelancer).ok_or_else(|| {
            LifecycleError::unauthorized(
                ErrorCode::NotJobParticipant,
                "only the client and the hired freelancer can rate this job",
            )
        })?;
        if submission.reviewed_id != counterpart {
            return Err(LifecycleError::validation(
                "reviewed_id",
                "you can only rate the other participant of this job",
            ));
        }

        if self
            .ratings
            .exists(job.id, actor.actor_id, counterpart)
            .await?
        {
            return Err(already_rated());
        }

        let rating = Rating {
            id: RatingId::new(),
            job_id: job.id,
            reviewer_id: actor.actor_id,
            reviewed_id: counterpart,
            score,
            comment,
            created_at: self.clock.now(),
            updated_at: None,
        };
        let stored = self.ratings.insert(rating).await.map_err(|err| match err {
            RepositoryError::Conflict => already_rated(),
            other => other.into(),
        })?;

        info!(
            job_id = %stored.job_id,
            reviewer_id = %stored.reviewer_id,
            reviewed_id = %stored.reviewed_id,
            score = stored.score.get(),
            "rating recorded"
        );
        Ok(stored)
    }

    pub async fn summary(&self, user_id: UserId) -> Result<RatingSummary, LifecycleError> {
        let ratings = self.ratings.received_by(user_id).await?;
        Ok(RatingSummary::from_ratings(user_id, ratings.iter()))
    }

    /// Every rating left on a job, newest first.
    pub async fn for_job(&self, job_id: JobId) -> Result<Vec<Rating>, LifecycleError> {
        Ok(self.ratings.for_job(job_id).await?)
    }

    pub async fn history(&self, actor: &Actor) -> Result<RatingHistory, LifecycleError> {
        Ok(RatingHistory {
            given: self.ratings.given_by(actor.actor_id).await?,
            received: self.ratings.received_by(actor.actor_id).await?,
        })
    }

    pub async fn update(
        &self,
        actor: &Actor,
        rating_id: RatingId,
        edit: RatingEdit,
    ) -> Result<Rating, LifecycleError> {
        let score = checked_score(edit.score)?;
        let comment = checked_comment(edit.comment.as_deref())?;
        self.load_own(actor, rating_id).await?;

        let updated = self
            .ratings
            .update(rating_id, actor.actor_id, score, comment, self.clock.now())
            .await?
            .ok_or_else(rating_not_found)?;
        info!(rating_id = %rating_id, score = updated.score.get(), "rating edited");
        Ok(updated)
    }

    pub async fn delete(&self, actor: &Actor, rating_id: RatingId) -> Result<(), LifecycleError> {
        self.load_own(actor, rating_id).await?;
        if self.ratings.delete(rating_id, actor.actor_id).await? == 0 {
            return Err(rating_not_found());
        }
        info!(rating_id = %rating_id, reviewer_id = %actor.actor_id, "rating deleted");
        Ok(())
    }

    async fn load_own(&self, actor: &Actor, rating_id: RatingId) -> Result<Rating, LifecycleError> {
        let rating = self
            .ratings
            .fetch(rating_id)
            .await?
            .ok_or_else(rating_not_found)?;
        if rating.reviewer_id != actor.actor_id {
            return Err(LifecycleError::unauthorized(
                ErrorCode::NotRatingAuthor,
                "you can only change your own ratings",
            ));
        }
        Ok(rating)
    }
}

fn checked_score(raw: i64) -> Result<Score, LifecycleError> {
    u8::try_from(raw)
        .map_err(|_| format!("rating must be between {} and {}", Score::MIN, Score::MAX))
        .and_then(Score::try_from)
        .map_err(|message| LifecycleError::validation("score", message))
}

fn checked_comment(raw: Option<&str>) -> Result<Option<String>, LifecycleError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > MAX_COMMENT_CHARS => Err(LifecycleError::validation(
            "comment",
            format!("comment must be at most {MAX_COMMENT_CHARS} characters"),
        )),
        Some(text) => Ok(Some(text.to_string())),
    }
}

fn counterpart(reviewer: UserId, client: UserId, freelancer: UserId) -> Option<UserId> {
    if reviewer == client {
        Some(freelancer)
    } else if reviewer == freelancer {
        Some(client)
    } else {
        None
    }
}

fn rating_not_found() -> LifecycleError {
    LifecycleError::not_found(ErrorCode::RatingNotFound, "rating not found")
}

fn already_rated() -> LifecycleError {
    LifecycleError::conflict(ErrorCode::AlreadyRated, "you have already rated this job")
}
