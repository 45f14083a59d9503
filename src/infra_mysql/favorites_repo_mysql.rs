use super::util::{downcast, is_dup_key};
use crate::application_port::DomainError;
use crate::domain_model::{FavoriteEntry, ProductId, UserId};
use crate::domain_port::{FavoritesRepo, StorageTx};
use sqlx::{MySqlPool, Row};

pub struct MySqlFavoritesRepo {
    pool: MySqlPool,
}

impl MySqlFavoritesRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlFavoritesRepo { pool }
    }
}

#[async_trait::async_trait]
impl FavoritesRepo for MySqlFavoritesRepo {
    async fn list_with_details(&self, user: UserId) -> Result<Vec<FavoriteEntry>, DomainError> {
        let rows = sqlx::query(
            r#"
SELECT f.product_id, p.title, p.unit_price_cents, f.added_at
FROM favorite f
JOIN product p ON p.product_id = f.product_id
WHERE f.user_id = ?
ORDER BY f.added_at, f.product_id
"#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::Store(format!("list favorites: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|row| FavoriteEntry {
                product_id: row.get("product_id"),
                title: row.get("title"),
                unit_price_cents: row.get("unit_price_cents"),
                added_at: row.get("added_at"),
            })
            .collect())
    }

    async fn count(&self, user: UserId) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM favorite WHERE user_id = ?"#)
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
    ) -> Result<bool, DomainError> {
        let tx = downcast(tx);

        match sqlx::query(r#"INSERT INTO favorite (user_id, product_id) VALUES (?, ?)"#)
            .bind(user)
            .bind(product)
            .execute(tx.conn())
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_dup_key(&e) => Ok(false),
            Err(e) => Err(DomainError::Store(format!("add favorite: {e}"))),
        }
    }

    async fn remove_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, DomainError> {
        let tx = downcast(tx);

        let result = sqlx::query(r#"DELETE FROM favorite WHERE user_id = ? AND product_id = ?"#)
            .bind(user)
            .bind(product)
            .execute(tx.conn())
            .await
            .map_err(|e| DomainError::Store(format!("remove favorite: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
