//! C5: the read-only query surface. No locks are taken; reads observe the
//! last committed snapshot (spec §4.5).

use sqlx::{PgPool, Row};

use crate::error::InventoryError;
use crate::models::{Batch, Sku};

#[derive(Debug, Clone)]
pub struct AvailableInventory {
    pub sku: Sku,
    pub batches: Vec<Batch>,
}

impl AvailableInventory {
    pub fn total_available(&self) -> i64 {
        self.batches.iter().map(|b| b.available_quantity as i64).sum()
    }
}

/// A single join from SKU to Batch, ordered by `expires_at` ascending with
/// nulls last, then `id` ascending (spec §4.5). Returns `None` if the SKU
/// code is unknown.
pub async fn available_inventory(
    pool: &PgPool,
    sku_code: &str,
) -> Result<Option<AvailableInventory>, InventoryError> {
    let rows = sqlx::query(
        r#"
        select
            s.id as sku_id, s.code as sku_code, s.name as sku_name,
            b.id as batch_id, b.external_batch_id, b.lot_number, b.expires_at,
            b.total_quantity, b.unallocatable_quantity, b.available_quantity,
            b.version, b.updated_at
        from skus s
        left join batches b on b.sku_id = s.id
        where s.code = $1
        order by b.expires_at asc nulls last, b.id asc
        "#,
    )
    .bind(sku_code)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let sku = Sku {
        id: rows[0].try_get("sku_id")?,
        code: rows[0].try_get("sku_code")?,
        name: rows[0].try_get("sku_name")?,
    };

    let mut batches = Vec::with_capacity(rows.len());
    for row in &rows {
        let batch_id: Option<i64> = row.try_get("batch_id")?;
        let Some(batch_id) = batch_id else { continue };
        batches.push(Batch {
            id: batch_id,
            sku_id: sku.id,
            external_batch_id: row.try_get("external_batch_id")?,
            lot_number: row.try_get("lot_number")?,
            expires_at: row.try_get("expires_at")?,
            total_quantity: row.try_get("total_quantity")?,
            unallocatable_quantity: row.try_get("unallocatable_quantity")?,
            available_quantity: row.try_get("available_quantity")?,
            version: row.try_get("version")?,
            updated_at: row.try_get("updated_at")?,
        });
    }

    Ok(Some(AvailableInventory { sku, batches }))
}
