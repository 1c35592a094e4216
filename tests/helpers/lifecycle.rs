// tests/helpers/lifecycle.rs
// ============================================================================
// Module: Stub Lifecycle Adapter
// Description: DatabaseLifecycle implementation against the backend stub.
// Purpose: Provision and drop scenario databases over the stub admin surface.
// Dependencies: query-tool-system-tests, reqwest, async-trait
// ============================================================================

//! ## Overview
//! HTTP-backed lifecycle adapter for the stub's admin surface. It owns its
//! reqwest client and never touches the query session, matching the
//! maintenance-connection separation the runner's teardown relies on.

use std::time::Duration;

use async_trait::async_trait;
use query_tool_system_tests::lifecycle::DatabaseLifecycle;
use query_tool_system_tests::lifecycle::LifecycleError;
use serde_json::Value;
use serde_json::json;

/// Lifecycle adapter speaking to the stub admin endpoints.
pub struct StubDatabaseLifecycle {
    /// Stub base URL.
    base_url: String,
    /// Dedicated maintenance client, independent of the query session.
    client: reqwest::Client,
}

impl StubDatabaseLifecycle {
    /// Creates an adapter for the stub at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, LifecycleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| LifecycleError::Connection(err.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl DatabaseLifecycle for StubDatabaseLifecycle {
    async fn create_database(&self, name: &str) -> Result<u64, LifecycleError> {
        let url = format!("{}/admin/databases", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({"name": name}))
            .send()
            .await
            .map_err(|err| LifecycleError::Connection(err.to_string()))?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(LifecycleError::Create {
                name: name.to_string(),
                detail: format!("admin create returned status {status}"),
            });
        }
        let body: Value = response.json().await.map_err(|err| LifecycleError::Create {
            name: name.to_string(),
            detail: format!("invalid create payload: {err}"),
        })?;
        body.get("id").and_then(Value::as_u64).ok_or_else(|| LifecycleError::Create {
            name: name.to_string(),
            detail: "create payload carries no id".to_string(),
        })
    }

    async fn drop_database(&self, name: &str) -> Result<(), LifecycleError> {
        let url = format!("{}/admin/databases/{name}", self.base_url);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(|err| LifecycleError::Connection(err.to_string()))?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(LifecycleError::Drop {
                name: name.to_string(),
                detail: format!("admin drop returned status {status}"),
            });
        }
        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<String>, LifecycleError> {
        let url = format!("{}/admin/databases", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| LifecycleError::Connection(err.to_string()))?;
        let body: Value = response
            .json()
            .await
            .map_err(|err| LifecycleError::Connection(format!("invalid list payload: {err}")))?;
        let names = body
            .get("databases")
            .and_then(Value::as_array)
            .map(|entries| {
                entries.iter().filter_map(Value::as_str).map(ToString::to_string).collect()
            })
            .unwrap_or_default();
        Ok(names)
    }
}
