use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::jobs::domain::{uuid_id, JobId, UserId};

uuid_id!(
    /// Identifier of a rating left after a completed job.
    RatingId
);

/// Star score, 1 through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Score {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!(
                "rating must be between {} and {}",
                Self::MIN,
                Self::MAX
            ))
        }
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub id: RatingId,
    pub job_id: JobId,
    pub reviewer_id: UserId,
    pub reviewed_id: UserId,
    pub score: Score,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set when the reviewer edits the rating.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of a rating submission. The score is range-checked by the service so
/// the failure names the field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RatingSubmission {
    pub job_id: JobId,
    pub reviewed_id: UserId,
    pub score: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// New score and comment for an existing rating. The comment is replaced,
/// so omitting it clears the old one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RatingEdit {
    pub score: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Ratings a user has written and received, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingHistory {
    pub given: Vec<Rating>,
    pub received: Vec<Rating>,
}

/// Aggregate of every rating a user has received.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    pub user_id: UserId,
    /// Mean score rounded to one decimal; `0.0` without ratings.
    pub average: f64,
    pub total: u32,
    /// Count per star, keyed 1 through 5.
    pub breakdown: BTreeMap<u8, u32>,
}

impl RatingSummary {
    pub fn from_ratings<'a>(user_id: UserId, ratings: impl IntoIterator<Item = &'a Rating>) -> Self {
        let mut breakdown: BTreeMap<u8, u32> = (Score::MIN..=Score::MAX).map(|s| (s, 0)).collect();
        let mut total = 0u32;
        let mut sum = 0u64;

        for rating in ratings {
            total += 1;
            sum += u64::from(rating.score.get());
            *breakdown.entry(rating.score.get()).or_default() += 1;
        }

        Self {
            user_id,
            average: one_decimal_mean(sum, total),
            total,
            breakdown,
        }
    }
}

fn one_decimal_mean(sum: u64, count: u32) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let mean = sum as f64 / f64::from(count);
    (mean * 10.0).round() / 10.0
}
