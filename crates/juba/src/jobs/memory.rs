//! In-process persistence gateway backing the service binary and the tests.
//!
//! Each table sits behind its own `std::sync::Mutex`. Every conditional write
//! checks its predicate and mutates under one guard, and no guard is held
//! across an `.await`.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Job, JobFields, JobId, JobStatus,
    PaymentStatus, TransactionRecord, UserId,
};
use super::repository::{
    ApplicationFilter, ApplicationRepository, JobFilter, JobRepository, RepositoryError,
    StatusChange, TransactionRepository,
};
use crate::ratings::{Rating, RatingId, RatingRepository, Score};
use crate::reports::{Report, ReportRepository};

#[derive(Debug, Default)]
pub struct MemoryStore {
    jobs: Mutex<Vec<Job>>,
    applications: Mutex<Vec<Application>>,
    transactions: Mutex<Vec<TransactionRecord>>,
    ratings: Mutex<Vec<Rating>>,
    reports: Mutex<Vec<Report>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transaction row, oldest first.
    pub fn transactions(&self) -> Result<Vec<TransactionRecord>, RepositoryError> {
        Ok(lock(&self.transactions)?.clone())
    }

    /// Every filed report, oldest first.
    pub fn reports(&self) -> Result<Vec<Report>, RepositoryError> {
        Ok(lock(&self.reports)?.clone())
    }
}

fn lock<T>(table: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    table
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory table lock poisoned".to_string()))
}

/// Matching rows, newest first. Rows created in the same instant keep
/// reverse insertion order.
fn newest_first<T: Clone>(
    rows: &[T],
    keep: impl Fn(&T) -> bool,
    created_at: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut matched: Vec<T> = rows.iter().rev().filter(|row| keep(row)).cloned().collect();
    matched.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    matched
}

#[async_trait]
impl JobRepository for MemoryStore {
    async fn insert(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut jobs = lock(&self.jobs)?;
        if jobs.iter().any(|existing| existing.id == job.id) {
            return Err(RepositoryError::Conflict);
        }
        jobs.push(job.clone());
        Ok(job)
    }

    async fn fetch(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(lock(&self.jobs)?.iter().find(|job| job.id == id).cloned())
    }

    async fn find(&self, filter: &JobFilter) -> Result<Vec<Job>, RepositoryError> {
        let jobs = lock(&self.jobs)?;
        Ok(newest_first(&jobs, |job| filter.matches(job), |job| job.created_at))
    }

    async fn update_status(
        &self,
        id: JobId,
        expected: JobStatus,
        change: StatusChange,
    ) -> Result<u64, RepositoryError> {
        let mut jobs = lock(&self.jobs)?;
        let Some(job) = jobs
            .iter_mut()
            .find(|job| job.id == id && job.status == expected)
        else {
            return Ok(0);
        };
        job.status = change.to;
        if change.completed_at.is_some() {
            job.completed_at = change.completed_at;
        }
        if change.archive_at.is_some() {
            job.archive_at = change.archive_at;
        }
        Ok(1)
    }

    async fn update_fields(
        &self,
        id: JobId,
        expected: JobStatus,
        fields: JobFields,
    ) -> Result<u64, RepositoryError> {
        let mut jobs = lock(&self.jobs)?;
        let Some(job) = jobs
            .iter_mut()
            .find(|job| job.id == id && job.status == expected)
        else {
            return Ok(0);
        };
        job.title = fields.title;
        job.description = fields.description;
        job.location = fields.location;
        job.timeline = fields.timeline;
        Ok(1)
    }

    async fn delete(&self, id: JobId, expected: JobStatus) -> Result<u64, RepositoryError> {
        let mut jobs = lock(&self.jobs)?;
        let before = jobs.len();
        jobs.retain(|job| !(job.id == id && job.status == expected));
        Ok((before - jobs.len()) as u64)
    }
}

#[async_trait]
impl ApplicationRepository for MemoryStore {
    async fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut applications = lock(&self.applications)?;
        if applications.iter().any(|existing| existing.id == application.id) {
            return Err(RepositoryError::Conflict);
        }
        applications.push(application.clone());
        Ok(application)
    }

    async fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(lock(&self.applications)?
            .iter()
            .find(|application| application.id == id)
            .cloned())
    }

    async fn find(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, RepositoryError> {
        let applications = lock(&self.applications)?;
        Ok(newest_first(
            &applications,
            |application| filter.matches(application),
            |application| application.created_at,
        ))
    }

    async fn update_status(
        &self,
        filter: &ApplicationFilter,
        expected: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Vec<Application>, RepositoryError> {
        let mut applications = lock(&self.applications)?;
        let mut changed = Vec::new();
        for application in applications
            .iter_mut()
            .filter(|application| application.status == expected && filter.matches(application))
        {
            application.status = to;
            changed.push(application.clone());
        }
        Ok(changed)
    }

    async fn delete(&self, filter: &ApplicationFilter) -> Result<u64, RepositoryError> {
        let mut applications = lock(&self.applications)?;
        let before = applications.len();
        applications.retain(|application| !filter.matches(application));
        Ok((before - applications.len()) as u64)
    }
}

#[async_trait]
impl TransactionRepository for MemoryStore {
    async fn insert(
        &self,
        record: TransactionRecord,
    ) -> Result<TransactionRecord, RepositoryError> {
        let mut transactions = lock(&self.transactions)?;
        if transactions.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        transactions.push(record.clone());
        Ok(record)
    }

    async fn mark_paid(
        &self,
        job_id: JobId,
        reference: String,
        paid_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut transactions = lock(&self.transactions)?;
        let mut affected = 0;
        for record in transactions.iter_mut().filter(|record| {
            record.job_id == job_id && record.payment_status == PaymentStatus::Pending
        }) {
            record.payment_status = PaymentStatus::Completed;
            record.payment_reference = Some(reference.clone());
            record.payment_date = Some(paid_at);
            affected += 1;
        }
        Ok(affected)
    }
}

#[async_trait]
impl RatingRepository for MemoryStore {
    async fn insert(&self, rating: Rating) -> Result<Rating, RepositoryError> {
        let mut ratings = lock(&self.ratings)?;
        let duplicate = ratings.iter().any(|existing| {
            existing.job_id == rating.job_id
                && existing.reviewer_id == rating.reviewer_id
                && existing.reviewed_id == rating.reviewed_id
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        ratings.push(rating.clone());
        Ok(rating)
    }

    async fn fetch(&self, id: RatingId) -> Result<Option<Rating>, RepositoryError> {
        Ok(lock(&self.ratings)?
            .iter()
            .find(|rating| rating.id == id)
            .cloned())
    }

    async fn received_by(&self, user_id: UserId) -> Result<Vec<Rating>, RepositoryError> {
        let ratings = lock(&self.ratings)?;
        Ok(newest_first(
            &ratings,
            |rating| rating.reviewed_id == user_id,
            |rating| rating.created_at,
        ))
    }

    async fn given_by(&self, user_id: UserId) -> Result<Vec<Rating>, RepositoryError> {
        let ratings = lock(&self.ratings)?;
        Ok(newest_first(
            &ratings,
            |rating| rating.reviewer_id == user_id,
            |rating| rating.created_at,
        ))
    }

    async fn for_job(&self, job_id: JobId) -> Result<Vec<Rating>, RepositoryError> {
        let ratings = lock(&self.ratings)?;
        Ok(newest_first(
            &ratings,
            |rating| rating.job_id == job_id,
            |rating| rating.created_at,
        ))
    }

    async fn exists(
        &self,
        job_id: JobId,
        reviewer_id: UserId,
        reviewed_id: UserId,
    ) -> Result<bool, RepositoryError> {
        Ok(lock(&self.ratings)?.iter().any(|rating| {
            rating.job_id == job_id
                && rating.reviewer_id == reviewer_id
                && rating.reviewed_id == reviewed_id
        }))
    }

    async fn update(
        &self,
        id: RatingId,
        reviewer_id: UserId,
        score: Score,
        comment: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Rating>, RepositoryError> {
        let mut ratings = lock(&self.ratings)?;
        Ok(ratings
            .iter_mut()
            .find(|rating| rating.id == id && rating.reviewer_id == reviewer_id)
            .map(|rating| {
                rating.score = score;
                rating.comment = comment;
                rating.updated_at = Some(updated_at);
                rating.clone()
            }))
    }

    async fn delete(&self, id: RatingId, reviewer_id: UserId) -> Result<u64, RepositoryError> {
        let mut ratings = lock(&self.ratings)?;
        let before = ratings.len();
        ratings.retain(|rating| !(rating.id == id && rating.reviewer_id == reviewer_id));
        Ok((before - ratings.len()) as u64)
    }
}

#[async_trait]
impl ReportRepository for MemoryStore {
    async fn insert(&self, report: Report) -> Result<Report, RepositoryError> {
        let mut reports = lock(&self.reports)?;
        if reports.iter().any(|existing| existing.id == report.id) {
            return Err(RepositoryError::Conflict);
        }
        reports.push(report.clone());
        Ok(report)
    }
}
