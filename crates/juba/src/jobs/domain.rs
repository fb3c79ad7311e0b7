use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub ::uuid::Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(::uuid::Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                ::uuid::Uuid::parse_str(raw.trim()).map(Self)
            }
        }
    };
}

pub(crate) use uuid_id;

uuid_id!(
    /// Identifier of a posted job.
    JobId
);
uuid_id!(
    /// Identifier of a freelancer's application to a job.
    ApplicationId
);
uuid_id!(
    /// Identifier of a marketplace user acting as client, freelancer, or both.
    UserId
);
uuid_id!(
    /// Identifier of a payment transaction placeholder.
    TransactionId
);

/// Monetary amount held as whole cents so comparisons and sums stay exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rate(u64);

/// Why an amount could not become a [`Rate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    #[error("amount must be a finite number")]
    NotFinite,
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("amount must be in whole cents")]
    FractionalCents,
    #[error("amount is too large")]
    TooLarge,
}

impl Rate {
    const MAX_CENTS: f64 = 1e15;
    const CENT_TOLERANCE: f64 = 1e-6;

    pub const fn from_cents(cents: u64) -> Option<Self> {
        if cents == 0 {
            None
        } else {
            Some(Self(cents))
        }
    }

    pub fn from_amount(amount: f64) -> Result<Self, RateError> {
        if !amount.is_finite() {
            return Err(RateError::NotFinite);
        }
        if amount <= 0.0 {
            return Err(RateError::NotPositive);
        }
        let scaled = amount * 100.0;
        let cents = scaled.round();
        if cents > Self::MAX_CENTS {
            return Err(RateError::TooLarge);
        }
        // Tolerance only absorbs binary representation error, e.g. 150.1 * 100.
        if cents < 1.0 || (scaled - cents).abs() > Self::CENT_TOLERANCE {
            return Err(RateError::FractionalCents);
        }
        Ok(Self(cents as u64))
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    pub fn amount(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Rate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.amount())
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Rate::from_amount(amount).map_err(serde::de::Error::custom)
    }
}

/// Lifecycle status of a job. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Posted,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Posted => "posted",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    /// Counts toward a client's active-job cap.
    pub const fn is_active(self) -> bool {
        matches!(self, JobStatus::Posted | JobStatus::InProgress)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "posted" => Ok(JobStatus::Posted),
            "in_progress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// Status of a freelancer's bid. `Accepted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A task posted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub client_id: UserId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub timeline: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Informational only; nothing archives the job automatically.
    pub archive_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn posted(client_id: UserId, fields: JobFields, created_at: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            client_id,
            title: fields.title,
            description: fields.description,
            location: fields.location,
            timeline: fields.timeline,
            status: JobStatus::Posted,
            created_at,
            completed_at: None,
            archive_at: None,
        }
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.client_id == user
    }

    pub fn fields(&self) -> JobFields {
        JobFields {
            title: self.title.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            timeline: self.timeline.clone(),
        }
    }
}

/// Client-editable attributes of a job, as submitted on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFields {
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub timeline: Option<String>,
}

/// Partial edit applied while a job is still `posted`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub timeline: Option<String>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.timeline.is_none()
    }

    pub fn merge_into(self, mut fields: JobFields) -> JobFields {
        if let Some(title) = self.title {
            fields.title = title;
        }
        if let Some(description) = self.description {
            fields.description = description;
        }
        if let Some(location) = self.location {
            fields.location = location;
        }
        if let Some(timeline) = self.timeline {
            fields.timeline = Some(timeline);
        }
        fields
    }
}

/// A freelancer's bid on a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub freelancer_id: UserId,
    pub proposed_rate: Rate,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

impl Application {
    pub fn pending(
        job_id: JobId,
        freelancer_id: UserId,
        proposed_rate: Rate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ApplicationId::new(),
            job_id,
            freelancer_id,
            proposed_rate,
            status: ApplicationStatus::Pending,
            created_at,
        }
    }
}

/// Capacity a user acts in. The same user may post and apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Client,
    Freelancer,
    #[default]
    Both,
}

impl ActorRole {
    pub const fn can_post(self) -> bool {
        matches!(self, ActorRole::Client | ActorRole::Both)
    }

    pub const fn can_apply(self) -> bool {
        matches!(self, ActorRole::Freelancer | ActorRole::Both)
    }
}

impl FromStr for ActorRole {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(ActorRole::Client),
            "freelancer" => Ok(ActorRole::Freelancer),
            "both" | "" => Ok(ActorRole::Both),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Authenticated caller identity handed to every lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub actor_id: UserId,
    pub role: ActorRole,
    pub is_admin: bool,
}

impl Actor {
    pub const fn new(actor_id: UserId, role: ActorRole) -> Self {
        Self {
            actor_id,
            role,
            is_admin: false,
        }
    }

    pub const fn client(actor_id: UserId) -> Self {
        Self::new(actor_id, ActorRole::Client)
    }

    pub const fn freelancer(actor_id: UserId) -> Self {
        Self::new(actor_id, ActorRole::Freelancer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

/// Payment placeholder created when a client accepts an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub job_id: JobId,
    pub client_id: UserId,
    pub freelancer_id: UserId,
    pub amount: Rate,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
}

impl TransactionRecord {
    pub fn placeholder(job: &Job, application: &Application) -> Self {
        Self {
            id: TransactionId::new(),
            job_id: job.id,
            client_id: job.client_id,
            freelancer_id: application.freelancer_id,
            amount: application.proposed_rate,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            payment_date: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_whole_cents_and_rejects_non_positive() {
        assert_eq!(Rate::from_amount(150.0).map(Rate::cents), Ok(15_000));
        assert_eq!(Rate::from_amount(150.1).map(Rate::cents), Ok(15_010));
        assert_eq!(Rate::from_amount(0.01).map(Rate::cents), Ok(1));
        assert_eq!(Rate::from_amount(0.004), Err(RateError::FractionalCents));
        assert_eq!(Rate::from_amount(10.005), Err(RateError::FractionalCents));
        assert_eq!(Rate::from_amount(0.0), Err(RateError::NotPositive));
        assert_eq!(Rate::from_amount(-20.0), Err(RateError::NotPositive));
        assert_eq!(Rate::from_amount(f64::NAN), Err(RateError::NotFinite));
        assert_eq!(Rate::from_cents(0), None);
    }

    #[test]
    fn rate_serializes_as_amount() {
        let rate = Rate::from_amount(199.5).expect("valid rate");
        assert_eq!(rate.to_string(), "199.50");
        assert_eq!(serde_json::to_value(rate).expect("serializes"), 199.5);
        let parsed: Rate = serde_json::from_value(serde_json::json!(199.5)).expect("parses");
        assert_eq!(parsed, rate);
        assert!(serde_json::from_value::<Rate>(serde_json::json!(0)).is_err());
    }

    #[test]
    fn status_labels_match_wire_names() {
        for status in [
            JobStatus::Posted,
            JobStatus::InProgress,
            JobStatus::Completed,
            JobStatus::Cancelled,
        ] {
            let wire = serde_json::to_value(status).expect("serializes");
            assert_eq!(wire, status.label());
            assert_eq!(status.label().parse::<JobStatus>(), Ok(status));
        }
    }

    #[test]
    fn application_status_displays_its_wire_name() {
        for status in [
            ApplicationStatus::Pending,
            ApplicationStatus::Accepted,
            ApplicationStatus::Rejected,
        ] {
            assert_eq!(status.to_string(), status.label());
            assert_eq!(serde_json::to_value(status).expect("serializes"), status.label());
        }
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let base = JobFields {
            title: "Fix leaky faucet".to_string(),
            description: "Kitchen tap drips all night long".to_string(),
            location: "Cape Town".to_string(),
            timeline: None,
        };
        let merged = JobPatch {
            location: Some("Stellenbosch".to_string()),
            ..JobPatch::default()
        }
        .merge_into(base.clone());
        assert_eq!(merged.title, base.title);
        assert_eq!(merged.location, "Stellenbosch");
    }

    #[test]
    fn roles_gate_posting_and_applying() {
        assert!(ActorRole::Client.can_post());
        assert!(!ActorRole::Client.can_apply());
        assert!(ActorRole::Freelancer.can_apply());
        assert!(!ActorRole::Freelancer.can_post());
        assert!(ActorRole::Both.can_post() && ActorRole::Both.can_apply());
        assert_eq!("".parse::<ActorRole>(), Ok(ActorRole::Both));
    }
}
