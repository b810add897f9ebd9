//! The business error taxonomy (spec §7). A business error bubbles to the
//! HTTP boundary and maps 1:1 to a status code; anything else is an
//! invariant violation and panics rather than returning here.

use std::fmt;

#[derive(Debug)]
pub enum InventoryError {
    InvalidQuantity { message: String },
    BatchNotFound { batch_id: i64 },
    OrderNotFound { order_id: String },
    InsufficientInventory { batch_id: i64, requested: i32, available: i32 },
    OrderAlreadyReserved { order_id: String },
    WmsApiError { message: String },
    Internal(anyhow::Error),
}

impl InventoryError {
    pub fn code(&self) -> &'static str {
        match self {
            InventoryError::InvalidQuantity { .. } => "INVALID_QUANTITY",
            InventoryError::BatchNotFound { .. } => "BATCH_NOT_FOUND",
            InventoryError::OrderNotFound { .. } => "ORDER_NOT_FOUND",
            InventoryError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            InventoryError::OrderAlreadyReserved { .. } => "ORDER_ALREADY_RESERVED",
            InventoryError::WmsApiError { .. } => "WMS_API_ERROR",
            InventoryError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status this error maps to at the hot-path boundary. `WmsApiError`
    /// is consumer-side only (no HTTP mapping); callers that surface it over
    /// HTTP anyway get 500.
    pub fn http_status(&self) -> u16 {
        match self {
            InventoryError::InvalidQuantity { .. } => 400,
            InventoryError::BatchNotFound { .. } => 404,
            InventoryError::OrderNotFound { .. } => 404,
            InventoryError::InsufficientInventory { .. } => 409,
            InventoryError::OrderAlreadyReserved { .. } => 409,
            InventoryError::WmsApiError { .. } => 500,
            InventoryError::Internal(_) => 500,
        }
    }
}

impl fmt::Display for InventoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryError::InvalidQuantity { message } => {
                write!(f, "invalid quantity: {message}")
            }
            InventoryError::BatchNotFound { batch_id } => {
                write!(f, "batch not found: {batch_id}")
            }
            InventoryError::OrderNotFound { order_id } => {
                write!(f, "order not found: {order_id}")
            }
            InventoryError::InsufficientInventory { batch_id, requested, available } => write!(
                f,
                "insufficient inventory for batch {batch_id}: requested {requested}, available {available}"
            ),
            InventoryError::OrderAlreadyReserved { order_id } => {
                write!(f, "order already reserved with a different line set: {order_id}")
            }
            InventoryError::WmsApiError { message } => write!(f, "wms api error: {message}"),
            InventoryError::Internal(e) => write!(f, "internal error: {e}"),
        }
    }
}

impl std::error::Error for InventoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InventoryError::Internal(e) => e.source(),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::Internal(anyhow::Error::new(e))
    }
}

impl From<anyhow::Error> for InventoryError {
    fn from(e: anyhow::Error) -> Self {
        InventoryError::Internal(e)
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(e: serde_json::Error) -> Self {
        InventoryError::Internal(anyhow::Error::new(e))
    }
}
