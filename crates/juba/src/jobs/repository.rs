//! Persistence ports for jobs, applications, and payment placeholders.
//!
//! Every status change goes through a conditional update that names the status
//! the caller observed. Adapters must apply the predicate and the write as one
//! step and report how many rows changed, so a losing racer sees `0` instead
//! of silently overwriting the winner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{
    Application, ApplicationId, ApplicationStatus, Job, JobFields, JobId, JobStatus,
    TransactionRecord, UserId,
};

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Predicate over job rows. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub ids: Option<Vec<JobId>>,
    pub client_id: Option<UserId>,
    pub status: Option<JobStatus>,
    /// Case-insensitive substring of the title.
    pub title_contains: Option<String>,
}

impl JobFilter {
    pub fn owned_by(client_id: UserId) -> Self {
        Self {
            client_id: Some(client_id),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, job: &Job) -> bool {
        self.ids.as_ref().map_or(true, |ids| ids.contains(&job.id))
            && self.client_id.map_or(true, |client| job.client_id == client)
            && self.status.map_or(true, |status| job.status == status)
            && self.title_contains.as_ref().map_or(true, |needle| {
                job.title.to_lowercase().contains(&needle.to_lowercase())
            })
    }
}

/// Status write applied by [`JobRepository::update_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub to: JobStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub archive_at: Option<DateTime<Utc>>,
}

impl StatusChange {
    pub const fn to(status: JobStatus) -> Self {
        Self {
            to: status,
            completed_at: None,
            archive_at: None,
        }
    }
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert(&self, job: Job) -> Result<Job, RepositoryError>;
    async fn fetch(&self, id: JobId) -> Result<Option<Job>, RepositoryError>;
    /// Matching jobs, newest first.
    async fn find(&self, filter: &JobFilter) -> Result<Vec<Job>, RepositoryError>;
    /// Set status (and timestamps when given) where `id` matches and the row
    /// still holds `expected`. Returns affected rows.
    async fn update_status(
        &self,
        id: JobId,
        expected: JobStatus,
        change: StatusChange,
    ) -> Result<u64, RepositoryError>;
    /// Replace editable fields where the row still holds `expected`.
    async fn update_fields(
        &self,
        id: JobId,
        expected: JobStatus,
        fields: JobFields,
    ) -> Result<u64, RepositoryError>;
    /// Remove the row where it still holds `expected`.
    async fn delete(&self, id: JobId, expected: JobStatus) -> Result<u64, RepositoryError>;
}

/// Predicate over application rows. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub id: Option<ApplicationId>,
    pub job_ids: Option<Vec<JobId>>,
    pub freelancer_id: Option<UserId>,
    pub status: Option<ApplicationStatus>,
    pub exclude_id: Option<ApplicationId>,
}

impl ApplicationFilter {
    pub fn by_id(id: ApplicationId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn for_job(job_id: JobId) -> Self {
        Self::for_jobs(vec![job_id])
    }

    pub fn for_jobs(job_ids: Vec<JobId>) -> Self {
        Self {
            job_ids: Some(job_ids),
            ..Self::default()
        }
    }

    pub fn by_freelancer(freelancer_id: UserId) -> Self {
        Self {
            freelancer_id: Some(freelancer_id),
            ..Self::default()
        }
    }

    pub fn with_freelancer(mut self, freelancer_id: UserId) -> Self {
        self.freelancer_id = Some(freelancer_id);
        self
    }

    pub fn with_status(mut self, status: ApplicationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn excluding(mut self, id: ApplicationId) -> Self {
        self.exclude_id = Some(id);
        self
    }

    pub fn matches(&self, application: &Application) -> bool {
        self.id.map_or(true, |id| application.id == id)
            && self
                .job_ids
                .as_ref()
                .map_or(true, |jobs| jobs.contains(&application.job_id))
            && self
                .freelancer_id
                .map_or(true, |freelancer| application.freelancer_id == freelancer)
            && self.status.map_or(true, |status| application.status == status)
            && self.exclude_id.map_or(true, |id| application.id != id)
    }
}

#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn insert(&self, application: Application) -> Result<Application, RepositoryError>;
    async fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError>;
    /// Matching applications, newest first.
    async fn find(&self, filter: &ApplicationFilter)
        -> Result<Vec<Application>, RepositoryError>;
    /// Move every row matching `filter` that still holds `expected` to `to`.
    /// Returns the rows that changed; their count is the affected-row count.
    async fn update_status(
        &self,
        filter: &ApplicationFilter,
        expected: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Vec<Application>, RepositoryError>;
    async fn delete(&self, filter: &ApplicationFilter) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert(&self, record: TransactionRecord)
        -> Result<TransactionRecord, RepositoryError>;
    /// Mark the job's pending transaction completed. Returns affected rows.
    async fn mark_paid(
        &self,
        job_id: JobId,
        reference: String,
        paid_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;
}
