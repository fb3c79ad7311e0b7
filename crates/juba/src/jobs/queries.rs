use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Actor, Application, ApplicationStatus, Job, JobId, JobStatus};
use super::error::LifecycleError;
use super::repository::{ApplicationFilter, JobFilter};
use super::service::JobLifecycleService;
use crate::ratings::RatingSummary;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_BATCH_IDS: usize = 100;

/// Browse filters. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobQuery {
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl JobQuery {
    /// 1-based page and a limit clamped to `1..=MAX_PAGE_SIZE`.
    pub fn window(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (page, limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: Job,
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClientStats {
    pub total_jobs: usize,
    pub active_jobs: usize,
    pub completed_jobs: usize,
    pub total_applications: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreelancerStats {
    pub applications_sent: usize,
    pub jobs_won: usize,
    pub average_rating: f64,
    pub total_earnings: f64,
}

/// Compact job view for dashboards polling several jobs at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatusView {
    pub id: JobId,
    pub title: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl JobLifecycleService {
    /// Public browse, newest first.
    pub async fn list_jobs(&self, query: &JobQuery) -> Result<Page<Job>, LifecycleError> {
        let (page, limit) = query.window();
        let filter = JobFilter {
            status: query.status,
            title_contains: query
                .search
                .as_deref()
                .map(str::trim)
                .filter(|needle| !needle.is_empty())
                .map(str::to_string),
            ..JobFilter::default()
        };

        let jobs = self.jobs.find(&filter).await?;
        let total = jobs.len();
        let offset = (page as usize - 1).saturating_mul(limit as usize);
        let items = jobs.into_iter().skip(offset).take(limit as usize).collect();

        Ok(Page {
            items,
            page,
            limit,
            total,
        })
    }

    pub async fn job_detail(&self, job_id: JobId) -> Result<JobDetail, LifecycleError> {
        let job = self.load_job(job_id).await?;
        let applications = self
            .applications
            .find(&ApplicationFilter::for_job(job_id))
            .await?;
        Ok(JobDetail { job, applications })
    }

    pub async fn job_applications(&self, job_id: JobId) -> Result<Vec<Application>, LifecycleError> {
        self.load_job(job_id).await?;
        Ok(self
            .applications
            .find(&ApplicationFilter::for_job(job_id))
            .await?)
    }

    /// Jobs posted by the actor, newest first.
    pub async fn my_jobs(&self, actor: &Actor) -> Result<Vec<Job>, LifecycleError> {
        Ok(self.jobs.find(&JobFilter::owned_by(actor.actor_id)).await?)
    }

    /// Applications sent by the actor, newest first.
    pub async fn my_applications(&self, actor: &Actor) -> Result<Vec<Application>, LifecycleError> {
        Ok(self
            .applications
            .find(&ApplicationFilter::by_freelancer(actor.actor_id))
            .await?)
    }

    pub async fn client_stats(&self, actor: &Actor) -> Result<ClientStats, LifecycleError> {
        let jobs = self.jobs.find(&JobFilter::owned_by(actor.actor_id)).await?;
        let total_applications = if jobs.is_empty() {
            0
        } else {
            let ids = jobs.iter().map(|job| job.id).collect();
            self.applications
                .find(&ApplicationFilter::for_jobs(ids))
                .await?
                .len()
        };

        Ok(ClientStats {
            total_jobs: jobs.len(),
            active_jobs: jobs.iter().filter(|job| job.status.is_active()).count(),
            completed_jobs: jobs
                .iter()
                .filter(|job| job.status == JobStatus::Completed)
                .count(),
            total_applications,
        })
    }

    pub async fn freelancer_stats(&self, actor: &Actor) -> Result<FreelancerStats, LifecycleError> {
        let applications = self
            .applications
            .find(&ApplicationFilter::by_freelancer(actor.actor_id))
            .await?;
        let won: Vec<&Application> = applications
            .iter()
            .filter(|application| application.status == ApplicationStatus::Accepted)
            .collect();
        let earned_cents: u64 = won
            .iter()
            .map(|application| application.proposed_rate.cents())
            .sum();

        let ratings = self.ratings.received_by(actor.actor_id).await?;
        let summary = RatingSummary::from_ratings(actor.actor_id, ratings.iter());

        Ok(FreelancerStats {
            applications_sent: applications.len(),
            jobs_won: won.len(),
            average_rating: summary.average,
            total_earnings: earned_cents as f64 / 100.0,
        })
    }

    /// Status snapshot for up to [`MAX_BATCH_IDS`] jobs. Unknown ids are skipped.
    pub async fn batch_status(&self, ids: Vec<JobId>) -> Result<Vec<JobStatusView>, LifecycleError> {
        if ids.is_empty() {
            return Err(LifecycleError::validation("ids", "at least one job id is required"));
        }
        if ids.len() > MAX_BATCH_IDS {
            return Err(LifecycleError::validation(
                "ids",
                format!("at most {MAX_BATCH_IDS} job ids per request"),
            ));
        }

        let jobs = self
            .jobs
            .find(&JobFilter {
                ids: Some(ids),
                ..JobFilter::default()
            })
            .await?;
        Ok(jobs
            .into_iter()
            .map(|job| JobStatusView {
                id: job.id,
                title: job.title,
                status: job.status,
                created_at: job.created_at,
            })
            .collect())
    }
}
