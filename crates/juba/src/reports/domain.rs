use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::jobs::domain::{uuid_id, JobId, UserId};

uuid_id!(
    /// Identifier of a filed report.
    ReportId
);

/// Reason a member gives for reporting another member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    InappropriateBehavior,
    Spam,
    Fraud,
    Harassment,
    FakeProfile,
    Other,
}

impl ReportType {
    pub const ALL: [ReportType; 6] = [
        ReportType::InappropriateBehavior,
        ReportType::Spam,
        ReportType::Fraud,
        ReportType::Harassment,
        ReportType::FakeProfile,
        ReportType::Other,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ReportType::InappropriateBehavior => "inappropriate_behavior",
            ReportType::Spam => "spam",
            ReportType::Fraud => "fraud",
            ReportType::Harassment => "harassment",
            ReportType::FakeProfile => "fake_profile",
            ReportType::Other => "other",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.label() == wanted)
            .ok_or_else(|| format!("unknown report type '{}'", raw.trim()))
    }
}

/// Review state of a report. Every report is filed as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub reporter_id: UserId,
    pub reported_user_id: UserId,
    pub report_type: ReportType,
    pub description: String,
    pub job_id: Option<JobId>,
    pub chat_id: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Body of a report. The type stays a string so an unknown value is reported
/// against its field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReportSubmission {
    pub reported_user_id: UserId,
    pub report_type: String,
    pub description: String,
    #[serde(default)]
    pub job_id: Option<JobId>,
    #[serde(default)]
    pub chat_id: Option<String>,
}
