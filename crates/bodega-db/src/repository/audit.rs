//! # Audit Session Repository
//!
//! Persistence for branch count sessions.
//!
//! ## Snapshot Semantics
//! Sessions are persisted as whole snapshots (branch-keyed upsert with
//! the counted items serialized as one JSON column). The in-memory
//! session in the audit engine stays authoritative while a count runs;
//! the stored row exists so an interrupted count survives a restart.
//! Reads of the live count never come from here.

use std::str::FromStr;

use sqlx::SqlitePool;
use tracing::debug;

use bodega_core::{AuditSession, AuditStatus};

use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct AuditSessionRow {
    branch: String,
    status: String,
    items: String,
    reported_by: String,
}

impl TryFrom<AuditSessionRow> for AuditSession {
    type Error = DbError;

    fn try_from(row: AuditSessionRow) -> Result<Self, Self::Error> {
        let status = AuditStatus::from_str(&row.status)
            .map_err(|_| DbError::decode("status", &row.status))?;
        let items =
            serde_json::from_str(&row.items).map_err(|_| DbError::decode("items", &row.items))?;

        Ok(AuditSession {
            branch: row.branch,
            status,
            items,
            reported_by: row.reported_by,
        })
    }
}

/// Repository for audit session snapshots.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new audit repository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Loads the session snapshot for a branch, if one exists.
    pub async fn get(&self, branch: &str) -> DbResult<Option<AuditSession>> {
        let row = sqlx::query_as::<_, AuditSessionRow>(
            "SELECT branch, status, items, reported_by FROM audit_sessions WHERE branch = ?1",
        )
        .bind(branch)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AuditSession::try_from).transpose()
    }

    /// Upserts the session snapshot for its branch (last writer wins).
    pub async fn save(&self, session: &AuditSession) -> DbResult<()> {
        let items = serde_json::to_string(&session.items)
            .map_err(|e| DbError::Internal(e.to_string()))?;

        sqlx::query(
            "INSERT INTO audit_sessions (branch, status, items, reported_by, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(branch) DO UPDATE SET \
               status = excluded.status, \
               items = excluded.items, \
               reported_by = excluded.reported_by, \
               updated_at = excluded.updated_at",
        )
        .bind(&session.branch)
        .bind(session.status.as_str())
        .bind(items)
        .bind(&session.reported_by)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(
            branch = %session.branch,
            items = session.items.len(),
            status = %session.status,
            "Audit session snapshot saved"
        );
        Ok(())
    }

    /// Deletes the session snapshot for a branch. Missing rows are fine.
    pub async fn delete(&self, branch: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM audit_sessions WHERE branch = ?1")
            .bind(branch)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use bodega_core::{AuditSession, AuditStatus};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_save_and_get_round_trip() {
        let db = test_db().await;
        let repo = db.audits();

        let mut session = AuditSession::new("Merkez", "ayse");
        session.record_count("P1", 5).unwrap();
        session.record_count("P2", 0).unwrap();

        repo.save(&session).await.unwrap();

        let loaded = repo.get("Merkez").await.unwrap().unwrap();
        assert_eq!(loaded.branch, "Merkez");
        assert_eq!(loaded.status, AuditStatus::InProgress);
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items["P1"], 5);
        assert_eq!(loaded.reported_by, "ayse");
    }

    #[tokio::test]
    async fn test_save_is_upsert() {
        let db = test_db().await;
        let repo = db.audits();

        let mut session = AuditSession::new("Merkez", "ayse");
        session.record_count("P1", 5).unwrap();
        repo.save(&session).await.unwrap();

        session.record_count("P1", 9).unwrap();
        session.status = AuditStatus::Completed;
        repo.save(&session).await.unwrap();

        let loaded = repo.get("Merkez").await.unwrap().unwrap();
        assert_eq!(loaded.items["P1"], 9);
        assert_eq!(loaded.status, AuditStatus::Completed);
    }

    #[tokio::test]
    async fn test_get_missing_and_delete() {
        let db = test_db().await;
        let repo = db.audits();

        assert!(repo.get("Merkez").await.unwrap().is_none());

        repo.save(&AuditSession::new("Merkez", "ayse")).await.unwrap();
        repo.delete("Merkez").await.unwrap();
        assert!(repo.get("Merkez").await.unwrap().is_none());

        // Deleting a missing row is not an error
        repo.delete("Merkez").await.unwrap();
    }
}
