use std::sync::Arc;

use tracing::info;

use super::domain::{Report, ReportId, ReportStatus, ReportSubmission, ReportType};
use super::repository::ReportRepository;
use crate::clock::Clock;
use crate::jobs::{Actor, Collaborators, JobRepository, LifecycleError};

pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// Files member reports for moderator review.
pub struct ReportService {
    jobs: Arc<dyn JobRepository>,
    reports: Arc<dyn ReportRepository>,
    clock: Arc<dyn Clock>,
}

impl ReportService {
    pub fn new(collaborators: &Collaborators) -> Self {
        Self {
            jobs: collaborators.jobs.clone(),
            reports: collaborators.reports.clone(),
            clock: collaborators.clock.clone(),
        }
    }

    pub async fn file(
        &self,
        actor: &Actor,
        submission: ReportSubmission,
    ) -> Result<Report, LifecycleError> {
        let report_type = submission
            .report_type
            .parse::<ReportType>()
            .map_err(|message| LifecycleError::validation("report_type", message))?;
        let description = submission.description.trim();
        if description.is_empty() {
            return Err(LifecycleError::validation(
                "description",
                "description is required",
            ));
        }
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(LifecycleError::validation(
                "description",
                format!("description must be at most {MAX_DESCRIPTION_CHARS} characters"),
            ));
        }
        if submission.reported_user_id == actor.actor_id {
            return Err(LifecycleError::validation(
                "reported_user_id",
                "you cannot report yourself",
            ));
        }
        if let Some(job_id) = submission.job_id {
            self.jobs
                .fetch(job_id)
                .await?
                .ok_or_else(LifecycleError::job_not_found)?;
        }
        let chat_id = submission
            .chat_id
            .map(|raw| raw.trim().to_string())
            .filter(|chat| !chat.is_empty());

        let report = self
            .reports
            .insert(Report {
                id: ReportId::new(),
                reporter_id: actor.actor_id,
                reported_user_id: submission.reported_user_id,
                report_type,
                description: description.to_string(),
                job_id: submission.job_id,
                chat_id,
                status: ReportStatus::Pending,
                created_at: self.clock.now(),
            })
            .await?;

        info!(
            report_id = %report.id,
            reporter_id = %report.reporter_id,
            reported_user_id = %report.reported_user_id,
            report_type = %report.report_type,
            "report filed"
        );
        Ok(report)
    }
}
