//! Wire-level shapes shared across the inventory services: outbox event
//! payloads published to the domain-event exchange, and the sync-request
//! command consumed off the `wms.forceSync` queue.
//!
//! These types describe the JSON the broker carries (spec §6). The broker
//! binding itself (exchanges, queues, DLQ topology) is out of scope; this
//! crate only fixes the shapes so a real binding has something concrete to
//! (de)serialize.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Domain event types, used both as the outbox `type` column and to derive
/// the broker routing key `inventory.<event_type>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    InventoryAllocated,
    InventoryReleased,
    InventoryAdjusted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::InventoryAllocated => "InventoryAllocated",
            EventType::InventoryReleased => "InventoryReleased",
            EventType::InventoryAdjusted => "InventoryAdjusted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "InventoryAllocated" => Some(EventType::InventoryAllocated),
            "InventoryReleased" => Some(EventType::InventoryReleased),
            "InventoryAdjusted" => Some(EventType::InventoryAdjusted),
            _ => None,
        }
    }

    /// Broker routing key for this event type (spec §6: `inventory.<eventType>`).
    pub fn routing_key(&self) -> String {
        format!("inventory.{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAllocated {
    pub order_id: String,
    pub batch_id: i64,
    pub quantity: i32,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReleased {
    pub order_id: String,
    pub batch_id: i64,
    pub quantity: i32,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAdjusted {
    pub batch_id: i64,
    pub quantity_delta: i32,
    pub new_available: i32,
    pub source: String,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// The command carried by the `wms.forceSync` queue (spec §6, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceWmsSync {
    pub sync_request_id: i64,
    pub batch_id: Option<i64>,
}

/// Envelope wrapping a published message: JSON, persistent, with a
/// `timestamp` and `messageId` equal to the originating outbox event id
/// (spec §6 broker topology).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub message_id: i64,
    pub routing_key: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Value,
}
