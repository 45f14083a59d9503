use super::util::{downcast, is_dup_key};
use crate::application_port::DomainError;
use crate::domain_model::{AppliedPromocode, Promocode, PromocodeCode, UserId};
use crate::domain_port::{PromocodeRepo, StorageTx};
use sqlx::{MySqlPool, Row};

pub struct MySqlPromocodeRepo {
    pool: MySqlPool,
}

impl MySqlPromocodeRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlPromocodeRepo { pool }
    }
}

fn promocode_from_row(row: sqlx::mysql::MySqlRow) -> Promocode {
    Promocode {
        code: row.get("code"),
        discount_percent: row.get("discount_percent"),
        is_active: row.get("is_active"),
        expires_at: row.get("expires_at"),
    }
}

#[async_trait::async_trait]
impl PromocodeRepo for MySqlPromocodeRepo {
    async fn find_code(&self, code: &PromocodeCode) -> Result<Option<Promocode>, DomainError> {
        let row = sqlx::query(
            r#"
SELECT code, discount_percent, is_active, expires_at
FROM promocode
WHERE code = ?
"#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Store(format!("find promocode: {e}")))?;

        Ok(row.map(promocode_from_row))
    }

    async fn list_codes(&self) -> Result<Vec<Promocode>, DomainError> {
        let rows = sqlx::query(
            r#"
SELECT code, discount_percent, is_active, expires_at
FROM promocode
ORDER BY code
"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Store(format!("list promocodes: {e}")))?;

        Ok(rows.into_iter().map(promocode_from_row).collect())
    }

    async fn insert_code_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        code: &Promocode,
    ) -> Result<bool, DomainError> {
        let tx = downcast(tx);

        match sqlx::query(
            r#"
INSERT INTO promocode (code, discount_percent, is_active, expires_at)
VALUES (?, ?, ?, ?)
"#,
        )
        .bind(&code.code)
        .bind(code.discount_percent)
        .bind(code.is_active)
        .bind(code.expires_at)
        .execute(tx.conn())
        .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_dup_key(&e) => Ok(false),
            Err(e) => Err(DomainError::Store(format!("insert promocode: {e}"))),
        }
    }

    async fn retire_code_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        code: &PromocodeCode,
    ) -> Result<bool, DomainError> {
        let tx = downcast(tx);

        let result =
            sqlx::query(r#"UPDATE promocode SET is_active = 0 WHERE code = ? AND is_active = 1"#)
                .bind(code)
                .execute(tx.conn())
                .await
                .map_err(|e| DomainError::Store(format!("retire promocode: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_applied(&self, user: UserId) -> Result<Vec<AppliedPromocode>, DomainError> {
        let rows = sqlx::query(
            r#"
SELECT code, discount_percent, applied_at
FROM promocode_redemption
WHERE user_id = ?
ORDER BY applied_at, code
"#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Store(format!("list applied promocodes: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|row| AppliedPromocode {
                code: row.get("code"),
                discount_percent: row.get("discount_percent"),
                applied_at: row.get("applied_at"),
            })
            .collect())
    }

    async fn apply_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        applied: &AppliedPromocode,
    ) -> Result<bool, DomainError> {
        let tx = downcast(tx);

        match sqlx::query(
            r#"
INSERT INTO promocode_redemption (user_id, code, discount_percent)
VALUES (?, ?, ?)
"#,
        )
        .bind(user)
        .bind(&applied.code)
        .bind(applied.discount_percent)
        .execute(tx.conn())
        .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_dup_key(&e) => Ok(false),
            Err(e) => Err(DomainError::Store(format!("apply promocode: {e}"))),
        }
    }

    async fn release_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        code: &PromocodeCode,
    ) -> Result<bool, DomainError> {
        let tx = downcast(tx);

        let result =
            sqlx::query(r#"DELETE FROM promocode_redemption WHERE user_id = ? AND code = ?"#)
                .bind(user)
                .bind(code)
                .execute(tx.conn())
                .await
                .map_err(|e| DomainError::Store(format!("release promocode: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
