//! Append-only activity log sink
//!
//! Records every computed policy change and alert transition for audit.
//! Writes are best-effort: a failed insert is logged and swallowed so it can
//! never roll back the policy or alert mutation that triggered it.

use sqlx::PgPool;

/// Activity log write sink
#[derive(Clone)]
pub struct ActivityLogService {
    db: PgPool,
}

impl ActivityLogService {
    /// Create a new ActivityLogService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append one audit entry. Failures are logged, never propagated.
    pub async fn record(&self, kind: &str, drug_id: Option<i32>, payload: serde_json::Value) {
        let result = sqlx::query(
            "INSERT INTO activity_log (kind, drug_id, payload) VALUES ($1, $2, $3)",
        )
        .bind(kind)
        .bind(drug_id)
        .bind(&payload)
        .execute(&self.db)
        .await;

        if let Err(e) = result {
            tracing::warn!(kind, ?drug_id, error = %e, "activity log write failed");
        }
    }
}
