use super::util::downcast;
use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::{AuthRecord, AuthRepo, StorageTx};
use sqlx::{MySqlPool, Row};

pub struct MySqlAuthRepo {
    pool: MySqlPool,
}

impl MySqlAuthRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlAuthRepo { pool }
    }
}

#[async_trait::async_trait]
impl AuthRepo for MySqlAuthRepo {
    async fn create_credentials_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        username: &str,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
INSERT INTO auth_credential (user_id, username, password_hash, is_active)
VALUES (?, ?, ?, ?)
"#,
        )
        .bind(user_id)
        .bind(username)
        .bind(password_hash)
        .bind(true)
        .execute(tx.conn())
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<AuthRecord>, AuthError> {
        let row = sqlx::query(
            r#"
SELECT user_id, username, password_hash, is_active
FROM auth_credential
WHERE username = ?
"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(row.map(|row| AuthRecord {
            user_id: row.get("user_id"),
            username: row.get("username"),
            password_hash: row.get("password_hash"),
            is_active: row.get("is_active"),
        }))
    }
}
