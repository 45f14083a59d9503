use crate::application_port::DomainError;
use crate::domain_model::{ProductId, ProductRecord};
use crate::domain_port::CatalogRepo;
use sqlx::{MySqlPool, Row};

pub struct MySqlCatalogRepo {
    pool: MySqlPool,
}

impl MySqlCatalogRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlCatalogRepo { pool }
    }
}

#[async_trait::async_trait]
impl CatalogRepo for MySqlCatalogRepo {
    async fn find(&self, product: ProductId) -> Result<Option<ProductRecord>, DomainError> {
        let row = sqlx::query(
            r#"
SELECT product_id, title, unit_price_cents, is_active
FROM product
WHERE product_id = ?
"#,
        )
        .bind(product)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Store(e.to_string()))?;

        Ok(row.map(|row| ProductRecord {
            product_id: row.get("product_id"),
            title: row.get("title"),
            unit_price_cents: row.get("unit_price_cents"),
            is_active: row.get("is_active"),
        }))
    }

    async fn product_exists(&self, product: ProductId) -> Result<bool, DomainError> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(1) FROM product WHERE product_id = ? AND is_active = 1"#)
                .bind(product)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::Store(e.to_string()))?;

        Ok(count > 0)
    }
}
