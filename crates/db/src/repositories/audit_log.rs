use chrono::{DateTime, Utc};
use sqlx::Row;

use buyline_core::domain::audit::{AuditEntry, AuditOperation, AuditStatus};
use buyline_core::domain::order::MediaBuyId;
use buyline_core::domain::principal::PrincipalId;

use super::{AuditLogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAuditLogRepository {
    pool: DbPool,
}

impl SqlAuditLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<AuditEntry, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: String = row.try_get("id").map_err(decode)?;
    let operation_str: String = row.try_get("operation").map_err(decode)?;
    let media_buy_id: String = row.try_get("media_buy_id").map_err(decode)?;
    let principal_id: Option<String> = row.try_get("principal_id").map_err(decode)?;
    let tenant_id: Option<String> = row.try_get("tenant_id").map_err(decode)?;
    let tool_name: String = row.try_get("tool_name").map_err(decode)?;
    let request_params_str: String = row.try_get("request_params").map_err(decode)?;
    let response_data_str: String = row.try_get("response_data").map_err(decode)?;
    let status_str: String = row.try_get("status").map_err(decode)?;
    let performed_by: Option<String> = row.try_get("performed_by").map_err(decode)?;
    let timestamp_str: String = row.try_get("timestamp").map_err(decode)?;

    let operation = AuditOperation::parse(&operation_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown operation `{operation_str}`")))?;
    let request_params = serde_json::from_str(&request_params_str)
        .map_err(|e| RepositoryError::Decode(format!("request_params: {e}")))?;
    let response_data = serde_json::from_str(&response_data_str)
        .map_err(|e| RepositoryError::Decode(format!("response_data: {e}")))?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(AuditEntry {
        id,
        operation,
        media_buy_id: MediaBuyId(media_buy_id),
        principal_id: principal_id.map(PrincipalId),
        tenant_id,
        tool_name,
        request_params,
        response_data,
        status: AuditStatus::parse(&status_str),
        performed_by,
        timestamp,
    })
}

#[async_trait::async_trait]
impl AuditLogRepository for SqlAuditLogRepository {
    async fn append(&self, entry: AuditEntry) -> Result<String, RepositoryError> {
        let request_params = serde_json::to_string(&entry.request_params)
            .map_err(|e| RepositoryError::Decode(format!("request_params: {e}")))?;
        let response_data = serde_json::to_string(&entry.response_data)
            .map_err(|e| RepositoryError::Decode(format!("response_data: {e}")))?;

        sqlx::query(
            "INSERT INTO audit_log (id, operation, media_buy_id, principal_id, tenant_id,
                                    tool_name, request_params, response_data, status,
                                    performed_by, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(entry.operation.as_str())
        .bind(&entry.media_buy_id.0)
        .bind(entry.principal_id.as_ref().map(|p| p.0.as_str()))
        .bind(&entry.tenant_id)
        .bind(&entry.tool_name)
        .bind(request_params)
        .bind(response_data)
        .bind(entry.status.as_str())
        .bind(&entry.performed_by)
        .bind(entry.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(entry.id)
    }

    async fn list_for_media_buy(
        &self,
        media_buy_id: &MediaBuyId,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, operation, media_buy_id, principal_id, tenant_id, tool_name,
                    request_params, response_data, status, performed_by, timestamp
             FROM audit_log WHERE media_buy_id = ? ORDER BY timestamp ASC, id ASC",
        )
        .bind(&media_buy_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect::<Result<Vec<_>, _>>()
    }

    async fn count_by_operation(
        &self,
        media_buy_id: &MediaBuyId,
        operation: AuditOperation,
    ) -> Result<i64, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM audit_log WHERE media_buy_id = ? AND operation = ?",
        )
        .bind(&media_buy_id.0)
        .bind(operation.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_get::<i64, _>("count").map_err(|e| RepositoryError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use buyline_core::domain::audit::{AuditEntry, AuditOperation, AuditStatus};
    use buyline_core::domain::order::MediaBuyId;
    use buyline_core::domain::principal::PrincipalId;

    use super::SqlAuditLogRepository;
    use crate::repositories::AuditLogRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_entry(operation: AuditOperation, media_buy_id: &str) -> AuditEntry {
        AuditEntry::new(operation, MediaBuyId(media_buy_id.to_string()))
            .with_principal(Some(PrincipalId("nike".to_string())))
            .with_tenant(Some("yahoo".to_string()))
            .with_request(serde_json::json!({"media_buy_id": media_buy_id}))
            .with_response(serde_json::json!({"all_passed": true}))
            .performed_by("U123")
    }

    #[tokio::test]
    async fn append_and_list_preserves_json_payloads() {
        let pool = setup().await;
        let repo = SqlAuditLogRepository::new(pool);
        let entry = sample_entry(AuditOperation::Validation, "mb_audit");

        let id = repo.append(entry.clone()).await.expect("append");
        assert_eq!(id, entry.id);

        let entries = repo
            .list_for_media_buy(&MediaBuyId("mb_audit".to_string()))
            .await
            .expect("list");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tool_name, "cem_workflow:mb_audit");
        assert_eq!(entries[0].response_data, serde_json::json!({"all_passed": true}));
        assert_eq!(entries[0].status, AuditStatus::Success);
        assert_eq!(entries[0].performed_by.as_deref(), Some("U123"));
    }

    #[tokio::test]
    async fn count_by_operation_is_scoped() {
        let pool = setup().await;
        let repo = SqlAuditLogRepository::new(pool);

        repo.append(sample_entry(AuditOperation::Validation, "mb_one")).await.expect("1");
        repo.append(sample_entry(AuditOperation::Approved, "mb_one")).await.expect("2");
        repo.append(sample_entry(AuditOperation::Approved, "mb_two")).await.expect("3");

        let approved = repo
            .count_by_operation(&MediaBuyId("mb_one".to_string()), AuditOperation::Approved)
            .await
            .expect("count");
        assert_eq!(approved, 1);

        let rejected = repo
            .count_by_operation(&MediaBuyId("mb_one".to_string()), AuditOperation::Rejected)
            .await
            .expect("count");
        assert_eq!(rejected, 0);
    }

    #[tokio::test]
    async fn entries_are_returned_in_insertion_order() {
        let pool = setup().await;
        let repo = SqlAuditLogRepository::new(pool);

        for operation in [
            AuditOperation::Validation,
            AuditOperation::ApprovalRequested,
            AuditOperation::Approved,
        ] {
            repo.append(sample_entry(operation, "mb_seq")).await.expect("append");
        }

        let entries =
            repo.list_for_media_buy(&MediaBuyId("mb_seq".to_string())).await.expect("list");
        let operations: Vec<&str> = entries.iter().map(|e| e.operation.as_str()).collect();
        assert_eq!(operations, vec!["cem_validation", "cem_approval_requested", "cem_approved"]);
    }
}
