use super::util::{downcast, is_dup_key};
use crate::application_port::DomainError;
use crate::domain_model::{CartEntry, ProductId, UserId};
use crate::domain_port::{CartRepo, StorageTx};
use sqlx::{MySqlPool, Row};

pub struct MySqlCartRepo {
    pool: MySqlPool,
}

impl MySqlCartRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlCartRepo { pool }
    }
}

#[async_trait::async_trait]
impl CartRepo for MySqlCartRepo {
    async fn list_with_details(&self, user: UserId) -> Result<Vec<CartEntry>, DomainError> {
        let rows = sqlx::query(
            r#"
SELECT c.product_id, p.title, p.unit_price_cents, c.quantity, c.added_at
FROM cart_item c
JOIN product p ON p.product_id = c.product_id
WHERE c.user_id = ?
ORDER BY c.added_at, c.product_id
"#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Store(format!("list cart: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|row| CartEntry {
                product_id: row.get("product_id"),
                title: row.get("title"),
                unit_price_cents: row.get("unit_price_cents"),
                quantity: row.get("quantity"),
                added_at: row.get("added_at"),
            })
            .collect())
    }

    async fn count(&self, user: UserId) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM cart_item WHERE user_id = ?"#)
            .bind(user)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::Store(e.to_string()))?;

        Ok(count as u64)
    }

    async fn add_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<bool, DomainError> {
        let tx = downcast(tx);

        match sqlx::query(
            r#"
INSERT INTO cart_item (user_id, product_id, quantity)
VALUES (?, ?, ?)
"#,
        )
        .bind(user)
        .bind(product)
        .bind(quantity)
        .execute(tx.conn())
        .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_dup_key(&e) => Ok(false),
            Err(e) => Err(DomainError::Store(format!("add cart item: {e}"))),
        }
    }

    async fn set_quantity_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<bool, DomainError> {
        let tx = downcast(tx);

        // rows_affected is 0 for a same-value update, so presence is
        // checked separately to keep the idempotent case a success
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM cart_item WHERE user_id = ? AND product_id = ?"#,
        )
        .bind(user)
        .bind(product)
        .fetch_one(tx.conn())
        .await
        .map_err(|e| DomainError::Store(e.to_string()))?;

        if count == 0 {
            return Ok(false);
        }

        sqlx::query(r#"UPDATE cart_item SET quantity = ? WHERE user_id = ? AND product_id = ?"#)
            .bind(quantity)
            .bind(user)
            .bind(product)
            .execute(tx.conn())
            .await
            .map_err(|e| DomainError::Store(format!("set quantity: {e}")))?;

        Ok(true)
    }

    async fn remove_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, DomainError> {
        let tx = downcast(tx);

        let result =
            sqlx::query(r#"DELETE FROM cart_item WHERE user_id = ? AND product_id = ?"#)
                .bind(user)
                .bind(product)
                .execute(tx.conn())
                .await
                .map_err(|e| DomainError::Store(format!("remove cart item: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
