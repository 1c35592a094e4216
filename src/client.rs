// src/client.rs
// ============================================================================
// Module: Query Tool HTTP Client
// Description: HTTP client for the query tool backend under test.
// Purpose: Issue connect, session-init, and download calls with transcripts.
// Dependencies: reqwest, serde
// ============================================================================

//! ## Overview
//! Thin reqwest wrapper over the query tool backend endpoints the download
//! scenarios exercise. Calls are synchronous from the scenario's point of
//! view: one request, one response, no retries and no recovery. Every call is
//! recorded in an in-memory transcript that suites export as a test artifact.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Error Types
// ============================================================================

/// Transport and decoding failures from the query tool backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build http client: {0}")]
    Build(String),
    /// The request could not be sent or the response body not read.
    #[error("http request to {path} failed: {detail}")]
    Transport {
        /// Request path.
        path: String,
        /// Underlying failure description.
        detail: String,
    },
    /// The backend answered with a status the call does not accept.
    #[error("unexpected http status {status} from {path}")]
    UnexpectedStatus {
        /// Request path.
        path: String,
        /// Observed status code.
        status: u16,
    },
    /// The response body did not match the documented payload shape.
    #[error("invalid payload from {path}: {detail}")]
    Payload {
        /// Request path.
        path: String,
        /// Decoding failure description.
        detail: String,
    },
}

// ============================================================================
// SECTION: Response Types
// ============================================================================

/// Raw download response; the runner branches on the outcome class.
#[derive(Debug, Clone)]
pub struct DownloadResponse {
    /// HTTP status code of the download call.
    pub status: u16,
    /// Raw response bytes, CSV or JSON depending on the outcome.
    pub body: Vec<u8>,
}

impl DownloadResponse {
    /// Decodes the body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error when the body is not valid JSON.
    pub fn json(&self) -> Result<Value, String> {
        serde_json::from_slice(&self.body).map_err(|err| format!("body is not JSON: {err}"))
    }
}

/// One recorded HTTP exchange with the backend.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    /// Monotonic sequence number within this client.
    pub sequence: u64,
    /// Request path relative to the base URL.
    pub path: String,
    /// Response status, when a response arrived.
    pub status: Option<u16>,
    /// Failure description, when the call failed.
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// HTTP client for the query tool backend with transcript capture.
#[derive(Debug, Clone)]
pub struct QueryToolClient {
    /// Base URL of the backend under test, without a trailing slash.
    base_url: String,
    /// Shared reqwest client.
    client: Client,
    /// Recorded exchanges, in call order.
    transcript: Arc<Mutex<Vec<TranscriptEntry>>>,
}

/// Default per-request timeout when the fixture does not override it.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

impl QueryToolClient {
    /// Creates a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Build`] when the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|err| ClientError::Build(err.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            transcript: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Returns the backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns a snapshot of the transcript entries.
    #[must_use]
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().map_or_else(|_| Vec::new(), |entries| entries.clone())
    }

    /// Connects a database through the backend and returns the info string.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the call fails or the payload carries
    /// no `info` field. The caller decides whether the info string signals a
    /// usable connection.
    pub async fn connect_database(
        &self,
        server_group: u64,
        server_id: u64,
        database_id: u64,
    ) -> Result<String, ClientError> {
        let path = format!("/browser/database/connect/{server_group}/{server_id}/{database_id}");
        let body = self.post_expecting_success(&path).await?;
        body.get("info").and_then(Value::as_str).map(ToString::to_string).ok_or_else(|| {
            ClientError::Payload {
                path,
                detail: "missing info field in connect response".to_string(),
            }
        })
    }

    /// Disconnects a database through the backend. Best effort.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the call fails outright.
    pub async fn disconnect_database(
        &self,
        server_group: u64,
        server_id: u64,
        database_id: u64,
    ) -> Result<(), ClientError> {
        let path =
            format!("/browser/database/disconnect/{server_group}/{server_id}/{database_id}");
        let _ = self.post_expecting_success(&path).await?;
        Ok(())
    }

    /// Initializes a query session and returns the opaque transaction id.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the status is not 200 or the payload
    /// carries no `data.gridTransId`.
    pub async fn initialize_query_tool(&self, path: &str) -> Result<String, ClientError> {
        let body = self.post_expecting_success(path).await?;
        let trans_id = body.get("data").and_then(|data| data.get("gridTransId"));
        match trans_id {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(ClientError::Payload {
                path: path.to_string(),
                detail: "missing data.gridTransId in init response".to_string(),
            }),
        }
    }

    /// Submits SQL and a filename to the download endpoint.
    ///
    /// Any status is returned to the caller; the scenario decides which
    /// statuses are expected.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the request cannot be sent or the body
    /// cannot be read.
    pub async fn download(
        &self,
        path: &str,
        sql: &str,
        filename: &str,
    ) -> Result<DownloadResponse, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let form = [("query", sql), ("filename", filename)];
        let response = self.client.post(&url).form(&form).send().await.map_err(|err| {
            let error = ClientError::Transport {
                path: path.to_string(),
                detail: err.to_string(),
            };
            self.record(path, None, Some(error.to_string()));
            error
        })?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| {
                let error = ClientError::Transport {
                    path: path.to_string(),
                    detail: format!("failed to read body: {err}"),
                };
                self.record(path, Some(status), Some(error.to_string()));
                error
            })?
            .to_vec();
        self.record(path, Some(status), None);
        Ok(DownloadResponse {
            status,
            body,
        })
    }

    /// Issues a bodyless POST and decodes a JSON response, requiring 200.
    async fn post_expecting_success(&self, path: &str) -> Result<Value, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let response = self.client.post(&url).send().await.map_err(|err| {
            let error = ClientError::Transport {
                path: path.to_string(),
                detail: err.to_string(),
            };
            self.record(path, None, Some(error.to_string()));
            error
        })?;
        let status = response.status().as_u16();
        if status != 200 {
            let error = ClientError::UnexpectedStatus {
                path: path.to_string(),
                status,
            };
            self.record(path, Some(status), Some(error.to_string()));
            return Err(error);
        }
        let body = response.json::<Value>().await.map_err(|err| {
            let error = ClientError::Payload {
                path: path.to_string(),
                detail: err.to_string(),
            };
            self.record(path, Some(status), Some(error.to_string()));
            error
        })?;
        self.record(path, Some(status), None);
        Ok(body)
    }

    /// Appends one exchange to the transcript.
    fn record(&self, path: &str, status: Option<u16>, error: Option<String>) {
        let Ok(mut guard) = self.transcript.lock() else {
            return;
        };
        let sequence = u64::try_from(guard.len()).unwrap_or(u64::MAX).saturating_add(1);
        guard.push(TranscriptEntry {
            sequence,
            path: path.to_string(),
            status,
            error,
        });
    }
}
