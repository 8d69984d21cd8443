use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Account, PullRequest, Review};
use crate::storage::{repository, Database};

/// A JSON export of source-control activity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub pull_requests: Vec<PullRequest>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Dataset {
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Import(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }
}

/// Report returned after an import completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub accounts: u64,
    pub pull_requests: u64,
    pub reviews: u64,
    /// Rows left out because of bad timestamps or a missing pull request.
    pub skipped: u64,
}

/// Upsert a dataset into the warehouse in one transaction.
pub async fn import_dataset(db: &Database, dataset: Dataset) -> Result<ImportReport> {
    let report = db
        .writer()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut report = ImportReport::default();

            for account in &dataset.accounts {
                repository::upsert_account(&tx, account)?;
                report.accounts += 1;
            }

            for pr in &dataset.pull_requests {
                match pr.normalized() {
                    Some(pr) => {
                        repository::upsert_pull_request(&tx, &pr)?;
                        report.pull_requests += 1;
                    }
                    None => {
                        log::warn!("Skipping pull request {}: unparseable timestamp", pr.id);
                        report.skipped += 1;
                    }
                }
            }

            for review in &dataset.reviews {
                let Some(normalized) = review.normalized() else {
                    log::warn!("Skipping review {}: unparseable timestamp", review.id);
                    report.skipped += 1;
                    continue;
                };
                if !repository::pull_request_exists(&tx, &review.pull_request_id)? {
                    log::warn!(
                        "Skipping review {}: unknown pull request {}",
                        review.id,
                        review.pull_request_id
                    );
                    report.skipped += 1;
                    continue;
                }
                repository::upsert_review(&tx, &normalized)?;
                report.reviews += 1;
            }

            tx.commit()?;
            Ok::<ImportReport, rusqlite::Error>(report)
        })
        .await?;

    log::info!(
        "Imported {} accounts, {} pull requests, {} reviews ({} skipped)",
        report.accounts,
        report.pull_requests,
        report.reviews,
        report.skipped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"{
        "accounts": [
            {"id": "00000000-0000-0000-0000-00000000000a", "organization_id": "org-1", "login": "alice"},
            {"id": "00000000-0000-0000-0000-00000000000b", "organization_id": "org-1"}
        ],
        "pull_requests": [
            {
                "id": "pr-1",
                "organization_id": "org-1",
                "author_account_id": "00000000-0000-0000-0000-00000000000a",
                "title": "feat: exporter",
                "created_at": "2025-01-06T08:00:00Z",
                "merged_at": "2025-01-06T12:00:00Z",
                "additions": 40,
                "deletions": 2,
                "changed_files": 3
            },
            {
                "id": "pr-2",
                "organization_id": "org-1",
                "author_account_id": "00000000-0000-0000-0000-00000000000a",
                "created_at": "sometime"
            }
        ],
        "reviews": [
            {
                "id": "rv-1",
                "pull_request_id": "pr-1",
                "organization_id": "org-1",
                "reviewer_account_id": "00000000-0000-0000-0000-00000000000b",
                "state": "APPROVED",
                "submitted_at": "2025-01-06T10:00:00Z"
            },
            {
                "id": "rv-2",
                "pull_request_id": "pr-404",
                "organization_id": "org-1",
                "reviewer_account_id": "00000000-0000-0000-0000-00000000000b",
                "submitted_at": "2025-01-06T10:00:00Z"
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_import_counts_and_skips() {
        let db = Database::open_memory().await.unwrap();
        let dataset = Dataset::from_json(EXPORT).unwrap();

        let report = import_dataset(&db, dataset).await.unwrap();
        assert_eq!(
            report,
            ImportReport {
                accounts: 2,
                pull_requests: 1,
                reviews: 1,
                skipped: 2,
            }
        );

        let (seconds, complexity): (Option<i64>, f64) = db
            .reader()
            .call(|conn| {
                conn.query_row(
                    "SELECT seconds_to_merge, complexity FROM fact_pull_requests WHERE pr_id = 'pr-1'",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
            })
            .await
            .unwrap();
        assert_eq!(seconds, Some(4 * 3600));
        assert_eq!(complexity, crate::model::complexity_score(40, 2, 3));
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let db = Database::open_memory().await.unwrap();
        import_dataset(&db, Dataset::from_json(EXPORT).unwrap()).await.unwrap();
        import_dataset(&db, Dataset::from_json(EXPORT).unwrap()).await.unwrap();

        let counts = db
            .reader()
            .call(|conn| repository::warehouse_counts(conn))
            .await
            .unwrap();
        assert_eq!(counts.pull_requests, 1);
        assert_eq!(counts.reviews, 1);
        assert_eq!(counts.accounts, 2);
    }

    #[test]
    fn test_rejects_malformed_account_id() {
        let err = Dataset::from_json(r#"{"accounts": [{"id": "alice", "organization_id": "o"}]}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Import(_)));
    }
}
