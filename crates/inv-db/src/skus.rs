use sqlx::PgPool;
use sqlx::Row;

use crate::error::InventoryError;
use crate::models::Sku;

pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Sku>, InventoryError> {
    let row = sqlx::query(
        r#"
        select id, code, name
        from skus
        where code = $1
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else { return Ok(None) };

    Ok(Some(Sku {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
    }))
}
