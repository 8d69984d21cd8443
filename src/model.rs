use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::date_util::{parse_timestamp, to_db_timestamp};

/// A source-control account (a GitHub user linked to an organization member).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub organization_id: String,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: String,
    pub organization_id: String,
    pub author_account_id: Uuid,
    #[serde(default)]
    pub title: String,
    pub created_at: String,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub additions: i64,
    #[serde(default)]
    pub deletions: i64,
    #[serde(default)]
    pub changed_files: i64,
}

impl PullRequest {
    /// Copy with every timestamp rewritten to the storage format.
    /// Returns `None` if any present timestamp can't be parsed.
    pub fn normalized(&self) -> Option<PullRequest> {
        Some(PullRequest {
            created_at: normalize(&self.created_at)?,
            merged_at: normalize_opt(self.merged_at.as_deref())?,
            closed_at: normalize_opt(self.closed_at.as_deref())?,
            ..self.clone()
        })
    }

    /// Seconds from open to merge; `None` for unmerged PRs or inverted timestamps.
    pub fn seconds_to_merge(&self) -> Option<i64> {
        let created = parse_timestamp(&self.created_at)?;
        let merged = parse_timestamp(self.merged_at.as_deref()?)?;
        let secs = (merged - created).num_seconds();
        (secs >= 0).then_some(secs)
    }

    pub fn complexity(&self) -> f64 {
        complexity_score(self.additions, self.deletions, self.changed_files)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub pull_request_id: String,
    pub organization_id: String,
    pub reviewer_account_id: Uuid,
    #[serde(default)]
    pub state: Option<String>,
    pub submitted_at: String,
}

impl Review {
    pub fn normalized(&self) -> Option<Review> {
        Some(Review {
            submitted_at: normalize(&self.submitted_at)?,
            ..self.clone()
        })
    }
}

/// Review complexity of a pull request: grows with the log of lines touched
/// and the square root of files touched. Rounded to two decimals.
pub fn complexity_score(additions: i64, deletions: i64, changed_files: i64) -> f64 {
    let lines = (additions.max(0) + deletions.max(0)) as f64;
    let files = changed_files.max(0) as f64;
    let raw = lines.ln_1p() + files.sqrt();
    (raw * 100.0).round() / 100.0
}

fn normalize(s: &str) -> Option<String> {
    parse_timestamp(s).map(to_db_timestamp)
}

/// `Some(None)` for an absent timestamp, `None` for an unparseable one.
fn normalize_opt(s: Option<&str>) -> Option<Option<String>> {
    match s {
        None => Some(None),
        Some(s) => normalize(s).map(Some),
    }
}
