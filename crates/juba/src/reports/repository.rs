use async_trait::async_trait;

use super::domain::Report;
use crate::jobs::RepositoryError;

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn insert(&self, report: Report) -> Result<Report, RepositoryError>;
}
