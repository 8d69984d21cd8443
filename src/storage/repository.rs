use rusqlite::{params, Connection, OptionalExtension};

use crate::metrics::types::Dimension;
use crate::model::{Account, PullRequest, Review};

// ── Accounts ───────────────────────────────────────────────────────

pub fn upsert_account(conn: &Connection, account: &Account) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO dim_accounts (account_id, organization_id, login, display_name, cached_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))
         ON CONFLICT(account_id) DO UPDATE SET
            organization_id=excluded.organization_id,
            login=COALESCE(excluded.login, dim_accounts.login),
            display_name=COALESCE(excluded.display_name, dim_accounts.display_name),
            cached_at=excluded.cached_at",
        params![
            account.id.to_string(),
            account.organization_id,
            account.login,
            account.display_name,
        ],
    )?;
    Ok(())
}

// ── Pull requests ──────────────────────────────────────────────────

/// Insert or replace a pull request. Timestamps must already be in storage
/// format (see [`PullRequest::normalized`]).
pub fn upsert_pull_request(conn: &Connection, pr: &PullRequest) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO fact_pull_requests (
            pr_id, organization_id, author_account_id, title,
            created_at, merged_at, closed_at,
            additions, deletions, changed_files,
            seconds_to_merge, complexity, cached_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, datetime('now'))
        ON CONFLICT(pr_id) DO UPDATE SET
            organization_id=excluded.organization_id,
            author_account_id=excluded.author_account_id,
            title=excluded.title,
            created_at=excluded.created_at,
            merged_at=excluded.merged_at,
            closed_at=excluded.closed_at,
            additions=excluded.additions,
            deletions=excluded.deletions,
            changed_files=excluded.changed_files,
            seconds_to_merge=excluded.seconds_to_merge,
            complexity=excluded.complexity,
            cached_at=excluded.cached_at",
        params![
            pr.id,
            pr.organization_id,
            pr.author_account_id.to_string(),
            pr.title,
            pr.created_at,
            pr.merged_at,
            pr.closed_at,
            pr.additions,
            pr.deletions,
            pr.changed_files,
            pr.seconds_to_merge(),
            pr.complexity(),
        ],
    )?;
    Ok(())
}

// ── Reviews ────────────────────────────────────────────────────────

pub fn upsert_review(conn: &Connection, review: &Review) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO fact_reviews (
            review_id, pr_id, organization_id, reviewer_account_id, state, submitted_at, cached_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))",
        params![
            review.id,
            review.pull_request_id,
            review.organization_id,
            review.reviewer_account_id.to_string(),
            review.state,
            review.submitted_at,
        ],
    )?;
    Ok(())
}

pub fn pull_request_exists(conn: &Connection, pr_id: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT 1 FROM fact_pull_requests WHERE pr_id = ?1",
        params![pr_id],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

// ── Activity ───────────────────────────────────────────────────────

/// Selects the per-PR values one dimension aggregates over.
#[derive(Debug, Clone)]
pub struct ActivityFilter {
    pub dimension: Dimension,
    pub organization_id: String,
    /// Empty means every account in the organization.
    pub account_ids: Vec<String>,
    pub prefixes: Vec<String>,
    /// Inclusive bounds, storage format.
    pub start: String,
    pub end: String,
}

struct DimensionSql {
    select: &'static str,
    from: &'static str,
    time_col: &'static str,
    account_col: &'static str,
    org_col: &'static str,
    group_by: &'static str,
}

fn dimension_sql(dimension: Dimension) -> DimensionSql {
    const MERGED_FROM: &str = "fact_pull_requests pr WHERE pr.merged_at IS NOT NULL";
    // One row per (reviewer, PR) pair; self-reviews don't count.
    const REVIEWED_FROM: &str = "fact_reviews r
         JOIN fact_pull_requests pr ON pr.pr_id = r.pr_id
         WHERE r.reviewer_account_id != pr.author_account_id";
    const REVIEWED_GROUP: &str = " GROUP BY r.reviewer_account_id, r.pr_id";

    let merged = |select| DimensionSql {
        select,
        from: MERGED_FROM,
        time_col: "pr.merged_at",
        account_col: "pr.author_account_id",
        org_col: "pr.organization_id",
        group_by: "",
    };
    let reviewed = |select| DimensionSql {
        select,
        from: REVIEWED_FROM,
        time_col: "r.submitted_at",
        account_col: "r.reviewer_account_id",
        org_col: "r.organization_id",
        group_by: REVIEWED_GROUP,
    };

    match dimension {
        Dimension::TimeToMerge => DimensionSql {
            from: "fact_pull_requests pr
                   WHERE pr.merged_at IS NOT NULL AND pr.seconds_to_merge IS NOT NULL",
            ..merged("pr.merged_at, CAST(pr.seconds_to_merge AS REAL)")
        },
        Dimension::PrsMerged => merged("pr.merged_at, 1.0"),
        Dimension::LocAdded => merged("pr.merged_at, CAST(pr.additions AS REAL)"),
        Dimension::LocRemoved => merged("pr.merged_at, CAST(pr.deletions AS REAL)"),
        Dimension::PrsReviewed => reviewed("MIN(r.submitted_at), 1.0"),
        Dimension::ReviewComplexity => reviewed("MIN(r.submitted_at), MAX(pr.complexity)"),
    }
}

/// Load `(occurred_at, value)` pairs for a dimension, ordered by time.
pub fn activity_values(
    conn: &Connection,
    filter: &ActivityFilter,
) -> Result<Vec<(String, f64)>, rusqlite::Error> {
    let parts = dimension_sql(filter.dimension);
    let mut sql = format!(
        "SELECT {} FROM {} AND {} = ? AND {} >= ? AND {} <= ?",
        parts.select, parts.from, parts.org_col, parts.time_col, parts.time_col
    );
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![
        Box::new(filter.organization_id.clone()),
        Box::new(filter.start.clone()),
        Box::new(filter.end.clone()),
    ];

    if !filter.account_ids.is_empty() {
        let placeholders = filter
            .account_ids
            .iter()
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(",");
        sql.push_str(&format!(" AND {} IN ({placeholders})", parts.account_col));
        for id in &filter.account_ids {
            params.push(Box::new(id.clone()));
        }
    }

    if !filter.prefixes.is_empty() {
        // substr() rather than LIKE: prefixes are literal and case-sensitive.
        let clauses = filter
            .prefixes
            .iter()
            .map(|_| "substr(pr.title, 1, ?) = ?")
            .collect::<Vec<_>>()
            .join(" OR ");
        sql.push_str(&format!(" AND ({clauses})"));
        for prefix in &filter.prefixes {
            params.push(Box::new(prefix.chars().count() as i64));
            params.push(Box::new(prefix.clone()));
        }
    }

    sql.push_str(parts.group_by);
    sql.push_str(" ORDER BY 1");

    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
    })?;
    rows.collect()
}

// ── Status ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarehouseCounts {
    pub accounts: u64,
    pub pull_requests: u64,
    pub merged_pull_requests: u64,
    pub reviews: u64,
}

pub fn warehouse_counts(conn: &Connection) -> Result<WarehouseCounts, rusqlite::Error> {
    let count = |sql: &str| conn.query_row(sql, [], |row| row.get::<_, i64>(0)).map(|n| n as u64);
    Ok(WarehouseCounts {
        accounts: count("SELECT COUNT(*) FROM dim_accounts")?,
        pull_requests: count("SELECT COUNT(*) FROM fact_pull_requests")?,
        merged_pull_requests: count(
            "SELECT COUNT(*) FROM fact_pull_requests WHERE merged_at IS NOT NULL",
        )?,
        reviews: count("SELECT COUNT(*) FROM fact_reviews")?,
    })
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}
