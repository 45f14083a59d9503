use super::util::downcast;
use crate::application_port::DomainError;
use crate::domain_model::{ProfileField, ProfileFieldKey, UserId};
use crate::domain_port::{ProfileRepo, StorageTx};
use sqlx::{MySqlPool, Row};
use tracing::warn;

pub struct MySqlProfileRepo {
    pool: MySqlPool,
}

impl MySqlProfileRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlProfileRepo { pool }
    }
}

#[async_trait::async_trait]
impl ProfileRepo for MySqlProfileRepo {
    async fn list_fields(&self, user: UserId) -> Result<Vec<ProfileField>, DomainError> {
        let rows = sqlx::query(
            r#"
SELECT field_key, field_value, updated_at
FROM profile_field
WHERE user_id = ?
ORDER BY field_key
"#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Store(format!("list profile: {e}")))?;

        let mut fields = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_key: String = row.get("field_key");
            match raw_key.parse::<ProfileFieldKey>() {
                Ok(key) => fields.push(ProfileField {
                    key,
                    value: row.get("field_value"),
                    updated_at: row.get("updated_at"),
                }),
                Err(e) => warn!(user = %user, "skipping profile row: {e}"),
            }
        }
        Ok(fields)
    }

    async fn set_field_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        key: ProfileFieldKey,
        value: &str,
    ) -> Result<(), DomainError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
INSERT INTO profile_field (user_id, field_key, field_value)
VALUES (?, ?, ?)
ON DUPLICATE KEY UPDATE field_value = VALUES(field_value), updated_at = CURRENT_TIMESTAMP
"#,
        )
        .bind(user)
        .bind(key.as_str())
        .bind(value)
        .execute(tx.conn())
        .await
        .map_err(|e| DomainError::Store(format!("set profile field: {e}")))?;

        Ok(())
    }

    async fn unset_field_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        key: ProfileFieldKey,
    ) -> Result<bool, DomainError> {
        let tx = downcast(tx);

        let result =
            sqlx::query(r#"DELETE FROM profile_field WHERE user_id = ? AND field_key = ?"#)
                .bind(user)
                .bind(key.as_str())
                .execute(tx.conn())
                .await
                .map_err(|e| DomainError::Store(format!("unset profile field: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
