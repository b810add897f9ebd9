//! `WmsClient`: the boundary to the external warehouse management system
//! (spec §4.3). `MockWmsClient` gives deterministic in-memory responses for
//! tests, recording every call for later assertions; `HttpWmsClient` is a
//! thin `reqwest` wrapper with no retry/backoff of its own — that policy
//! belongs to the caller (spec §1, §4.3).

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status-code classification used by the outbound worker to decide
/// nack-requeue vs. nack-to-dead-letter (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmsResponseClass {
    Retriable,
    NonRetriable,
}

impl WmsResponseClass {
    pub fn classify(status: u16) -> Self {
        match status {
            429 | 503 | 504 => WmsResponseClass::Retriable,
            _ => WmsResponseClass::NonRetriable,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WmsCallError {
    pub message: String,
    pub class: WmsResponseClass,
}

impl std::fmt::Display for WmsCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "wms call failed ({:?}): {}", self.class, self.message)
    }
}

impl std::error::Error for WmsCallError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WmsSnapshotResponse {
    /// Matches `batches.external_batch_id`. The driver resolves this to a
    /// local batch id (or treats it as unmatched) — the WMS client has no
    /// notion of the store's primary keys (spec §4.4 step 3).
    pub wms_batch_id: String,
    pub reported_orderable: i32,
    pub reported_unallocatable: Option<i32>,
    pub raw_payload: Value,
}

/// Which slice of the WMS's batch state to fetch (spec §4.4 step 2). The
/// exact wire protocol for full vs. incremental sync is left to the WMS
/// client (spec open question); this crate only fixes the three scopes a
/// `ForceWmsSync` command can request.
pub enum SyncScope<'a> {
    /// Scoped to one batch (`ForceWmsSync.batch_id` was present).
    Batch(&'a str),
    /// No prior incremental token — fetch everything.
    Full,
    /// Resume from a previously returned token.
    Incremental(&'a str),
}

/// One page of snapshot entries plus the token to resume from next time.
/// `next_incremental_token` is `None` for a `Batch`-scoped fetch.
#[derive(Debug, Clone, Default)]
pub struct SyncPage {
    pub entries: Vec<WmsSnapshotResponse>,
    pub next_incremental_token: Option<String>,
}

#[async_trait::async_trait]
pub trait WmsClient: Send + Sync {
    async fn allocate(
        &self,
        external_batch_id: &str,
        quantity: i32,
        order_ref: &str,
    ) -> Result<(), WmsCallError>;

    async fn release(
        &self,
        external_batch_id: &str,
        quantity: i32,
        order_ref: &str,
    ) -> Result<(), WmsCallError>;

    async fn fetch_sync_page(&self, scope: SyncScope<'_>) -> Result<SyncPage, WmsCallError>;
}

#[derive(Debug, Clone)]
pub enum RecordedCall {
    Allocate { external_batch_id: String, quantity: i32, order_ref: String },
    Release { external_batch_id: String, quantity: i32, order_ref: String },
    FetchSyncPage { scope: String },
}

/// Deterministic in-memory `WmsClient`: every call succeeds unless
/// `fail_next` was set, in which case exactly one call fails with the given
/// error and the flag clears.
pub struct MockWmsClient {
    calls: Mutex<Vec<RecordedCall>>,
    fail_next: Mutex<Option<WmsCallError>>,
    page_to_return: Mutex<Option<SyncPage>>,
}

impl MockWmsClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            page_to_return: Mutex::new(None),
        }
    }

    pub fn fail_next_call(&self, error: WmsCallError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    /// Queue the page returned by the next `fetch_sync_page` call, regardless
    /// of requested scope.
    pub fn set_next_sync_page(&self, page: SyncPage) {
        *self.page_to_return.lock().unwrap() = Some(page);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn take_failure(&self) -> Option<WmsCallError> {
        self.fail_next.lock().unwrap().take()
    }
}

impl Default for MockWmsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl WmsClient for MockWmsClient {
    async fn allocate(
        &self,
        external_batch_id: &str,
        quantity: i32,
        order_ref: &str,
    ) -> Result<(), WmsCallError> {
        self.calls.lock().unwrap().push(RecordedCall::Allocate {
            external_batch_id: external_batch_id.to_string(),
            quantity,
            order_ref: order_ref.to_string(),
        });
        match self.take_failure() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn release(
        &self,
        external_batch_id: &str,
        quantity: i32,
        order_ref: &str,
    ) -> Result<(), WmsCallError> {
        self.calls.lock().unwrap().push(RecordedCall::Release {
            external_batch_id: external_batch_id.to_string(),
            quantity,
            order_ref: order_ref.to_string(),
        });
        match self.take_failure() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn fetch_sync_page(&self, scope: SyncScope<'_>) -> Result<SyncPage, WmsCallError> {
        let scope_label = match scope {
            SyncScope::Batch(id) => format!("batch:{id}"),
            SyncScope::Full => "full".to_string(),
            SyncScope::Incremental(token) => format!("incremental:{token}"),
        };
        self.calls.lock().unwrap().push(RecordedCall::FetchSyncPage { scope: scope_label });
        if let Some(e) = self.take_failure() {
            return Err(e);
        }
        Ok(self.page_to_return.lock().unwrap().clone().unwrap_or_default())
    }
}

/// A thin `reqwest` binding to the real WMS HTTP API. Issues the call once;
/// retry/backoff policy is explicitly out of scope (spec §1) and belongs to
/// the outbound worker that consults `WmsResponseClass`.
pub struct HttpWmsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpWmsClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self { http: reqwest::Client::new(), base_url, api_key }
    }

    async fn post_action(
        &self,
        action: &str,
        external_batch_id: &str,
        quantity: i32,
        order_ref: &str,
    ) -> Result<(), WmsCallError> {
        let url = format!("{}/batches/{}/{}", self.base_url, external_batch_id, action);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({ "quantity": quantity, "orderRef": order_ref }))
            .send()
            .await
            .map_err(|e| WmsCallError { message: e.to_string(), class: WmsResponseClass::NonRetriable })?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(WmsCallError {
            message: format!("wms returned {status}: {body}"),
            class: WmsResponseClass::classify(status),
        })
    }
}

#[async_trait::async_trait]
impl WmsClient for HttpWmsClient {
    async fn allocate(
        &self,
        external_batch_id: &str,
        quantity: i32,
        order_ref: &str,
    ) -> Result<(), WmsCallError> {
        self.post_action("allocate", external_batch_id, quantity, order_ref).await
    }

    async fn release(
        &self,
        external_batch_id: &str,
        quantity: i32,
        order_ref: &str,
    ) -> Result<(), WmsCallError> {
        self.post_action("release", external_batch_id, quantity, order_ref).await
    }

    async fn fetch_sync_page(&self, scope: SyncScope<'_>) -> Result<SyncPage, WmsCallError> {
        let (url, is_batch_scoped) = match scope {
            SyncScope::Batch(wms_batch_id) => {
                (format!("{}/batches/{}/snapshot", self.base_url, wms_batch_id), true)
            }
            SyncScope::Full => (format!("{}/batches/snapshot", self.base_url), false),
            SyncScope::Incremental(token) => {
                (format!("{}/batches/snapshot?token={}", self.base_url, token), false)
            }
        };

        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| WmsCallError { message: e.to_string(), class: WmsResponseClass::NonRetriable })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WmsCallError {
                message: format!("wms returned {status}: {body}"),
                class: WmsResponseClass::classify(status),
            });
        }

        if is_batch_scoped {
            let entry = response
                .json::<WmsSnapshotResponse>()
                .await
                .map_err(|e| WmsCallError { message: e.to_string(), class: WmsResponseClass::NonRetriable })?;
            return Ok(SyncPage { entries: vec![entry], next_incremental_token: None });
        }

        response
            .json::<SyncPageWire>()
            .await
            .map(|wire| SyncPage { entries: wire.entries, next_incremental_token: wire.next_incremental_token })
            .map_err(|e| WmsCallError { message: e.to_string(), class: WmsResponseClass::NonRetriable })
    }
}

/// Wire shape for a full/incremental snapshot page. The WMS's actual field
/// naming is unspecified (spec §9 open question); this is this client's pick.
#[derive(Debug, Clone, Deserialize)]
struct SyncPageWire {
    entries: Vec<WmsSnapshotResponse>,
    next_incremental_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn retriable_status_codes_classify_correctly() {
        assert_eq!(WmsResponseClass::classify(429), WmsResponseClass::Retriable);
        assert_eq!(WmsResponseClass::classify(503), WmsResponseClass::Retriable);
        assert_eq!(WmsResponseClass::classify(504), WmsResponseClass::Retriable);
        assert_eq!(WmsResponseClass::classify(400), WmsResponseClass::NonRetriable);
        assert_eq!(WmsResponseClass::classify(500), WmsResponseClass::NonRetriable);
    }

    #[tokio::test]
    async fn mock_client_records_calls_in_order() {
        let client = MockWmsClient::new();
        client.allocate("EXT-1", 10, "O1").await.unwrap();
        client.release("EXT-1", 4, "O1").await.unwrap();
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test]
    async fn mock_client_fails_exactly_once() {
        let client = MockWmsClient::new();
        client.fail_next_call(WmsCallError {
            message: "simulated".to_string(),
            class: WmsResponseClass::Retriable,
        });
        assert!(client.allocate("EXT-1", 10, "O1").await.is_err());
        assert!(client.allocate("EXT-1", 10, "O1").await.is_ok());
    }

    #[tokio::test]
    async fn mock_client_returns_queued_sync_page() {
        let client = MockWmsClient::new();
        client.set_next_sync_page(SyncPage {
            entries: vec![WmsSnapshotResponse {
                wms_batch_id: "EXT-1".to_string(),
                reported_orderable: 85,
                reported_unallocatable: None,
                raw_payload: Value::Null,
            }],
            next_incremental_token: Some("tok-1".to_string()),
        });

        let page = client.fetch_sync_page(SyncScope::Full).await.unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].reported_orderable, 85);
        assert_eq!(page.next_incremental_token.as_deref(), Some("tok-1"));
    }
}
