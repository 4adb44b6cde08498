use sqlx::Row;

use buyline_core::domain::principal::{AccessLevel, Principal, PrincipalId};

use super::{PrincipalRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPrincipalRepository {
    pool: DbPool,
}

impl SqlPrincipalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_principal(row: &sqlx::sqlite::SqliteRow) -> Result<Principal, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: String = row.try_get("id").map_err(decode)?;
    let tenant_id: String = row.try_get("tenant_id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let access_level: String = row.try_get("access_level").map_err(decode)?;
    let active: i64 = row.try_get("active").map_err(decode)?;

    Ok(Principal {
        id: PrincipalId(id),
        tenant_id,
        name,
        access_level: AccessLevel::parse(&access_level),
        active: active != 0,
    })
}

#[async_trait::async_trait]
impl PrincipalRepository for SqlPrincipalRepository {
    async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<Principal>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, tenant_id, name, access_level, active FROM principals WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_principal(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, principal: Principal) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO principals (id, tenant_id, name, access_level, active)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 tenant_id = excluded.tenant_id,
                 name = excluded.name,
                 access_level = excluded.access_level,
                 active = excluded.active",
        )
        .bind(&principal.id.0)
        .bind(&principal.tenant_id)
        .bind(&principal.name)
        .bind(principal.access_level.as_str())
        .bind(i64::from(principal.active))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
