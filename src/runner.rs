// src/runner.rs
// ============================================================================
// Module: Download Scenario Runner
// Description: Setup, run, and teardown for the CSV download scenarios.
// Purpose: Drive one scenario end to end and assert its expected outcome.
// Dependencies: thiserror, serde
// ============================================================================

//! ## Overview
//! The runner executes one scenario through five ordered phases: Setup,
//! Connect, InitSession, Download and Assert, Teardown. There is no branching
//! back, no retry, and no recovery; a deviation from the expectation fails
//! the scenario with the unmet assertion, and teardown runs regardless of how
//! the run phase ended.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::client::ClientError;
use crate::client::DownloadResponse;
use crate::client::QueryToolClient;
use crate::config::ServerFixtureConfig;
use crate::lifecycle::DatabaseLifecycle;
use crate::lifecycle::LifecycleError;
use crate::scenario::DOWNLOAD_FILENAME;
use crate::scenario::DownloadCsvScenario;
use crate::scenario::ExpectedOutcome;
use crate::scenario::INVALID_TRANSACTION_SUFFIX;
use crate::scenario::MISSING_RELATION_ERROR;
use crate::scenario::unique_database_name;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exact info string the backend returns for a usable connection. Anything
/// else signals an environment failure, not a feature bug.
const CONNECTED_INFO: &str = "Database connected.";

// ============================================================================
// SECTION: Error Types
// ============================================================================

/// Scenario execution errors.
///
/// Expected negative outcomes (invalid SQL, corrupted transaction id) are not
/// errors; they are asserted positively during the run phase.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The provisioned database could not be connected or the backend
    /// answered with an unexpected connect payload. Infrastructure breakage.
    #[error("environment failure: {0}")]
    Environment(String),
    /// Transport or decoding failure from the HTTP client.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// Creating or dropping the scenario database failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// The response deviated from the scenario's expectation.
    #[error("scenario {scenario:?} failed: {detail}")]
    Assertion {
        /// Name of the failing scenario.
        scenario: String,
        /// The unmet assertion.
        detail: String,
    },
}

// ============================================================================
// SECTION: Run Types
// ============================================================================

/// Per-scenario mutable state created in setup and destroyed in teardown.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Uniquely suffixed scenario database name.
    pub database_name: String,
    /// Server identifier from the fixture configuration.
    pub server_id: u64,
    /// Backend id of the created database.
    pub database_id: u64,
}

/// Summary of one completed scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub scenario: String,
    /// Database the scenario ran against.
    pub database_name: String,
    /// Transaction id submitted to the download endpoint, after any
    /// deliberate corruption.
    pub transaction_id: String,
    /// HTTP status of the download call.
    pub download_status: u16,
    /// Outcome class the scenario asserted.
    pub outcome: &'static str,
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Drives one download scenario end to end against the backend.
pub struct DownloadCsvScenarioRunner<'a> {
    /// Fixture configuration for the backend under test.
    config: ServerFixtureConfig,
    /// HTTP client for the query session endpoints.
    client: QueryToolClient,
    /// Lifecycle seam for create and drop, independent of the session.
    lifecycle: &'a dyn DatabaseLifecycle,
}

impl<'a> DownloadCsvScenarioRunner<'a> {
    /// Creates a runner for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] when the HTTP client cannot be built.
    pub fn new(
        config: ServerFixtureConfig,
        lifecycle: &'a dyn DatabaseLifecycle,
    ) -> Result<Self, ScenarioError> {
        let client = QueryToolClient::new(&config.base_url, config.timeout)?;
        Ok(Self {
            config,
            client,
            lifecycle,
        })
    }

    /// Returns the HTTP client, for transcript export.
    #[must_use]
    pub const fn client(&self) -> &QueryToolClient {
        &self.client
    }

    /// Executes one scenario: setup, run, unconditional teardown.
    ///
    /// Teardown always runs once setup has produced a database, even when
    /// the run phase failed. A run failure is reported in preference to a
    /// teardown failure.
    ///
    /// # Errors
    ///
    /// Returns a [`ScenarioError`] classifying the first failure.
    pub async fn execute(
        &self,
        scenario: &DownloadCsvScenario,
    ) -> Result<ScenarioReport, ScenarioError> {
        let context = self.set_up().await?;
        let outcome = self.run(scenario, &context).await;
        let teardown = self.tear_down(&context).await;
        match outcome {
            Ok(report) => teardown.map(|()| report),
            Err(error) => Err(error),
        }
    }

    /// Provisions a uniquely named scenario database.
    async fn set_up(&self) -> Result<RunContext, ScenarioError> {
        let database_name = unique_database_name();
        let database_id = self.lifecycle.create_database(&database_name).await?;
        Ok(RunContext {
            database_name,
            server_id: self.config.server_id,
            database_id,
        })
    }

    /// Runs the connect, init, download, and assert phases.
    async fn run(
        &self,
        scenario: &DownloadCsvScenario,
        context: &RunContext,
    ) -> Result<ScenarioReport, ScenarioError> {
        let group = self.config.server_group;
        let info = self
            .client
            .connect_database(group, context.server_id, context.database_id)
            .await
            .map_err(|err| {
                ScenarioError::Environment(format!("could not connect to the database: {err}"))
            })?;
        if info != CONNECTED_INFO {
            return Err(ScenarioError::Environment(format!(
                "unexpected connect info {info:?}, wanted {CONNECTED_INFO:?}"
            )));
        }

        let init_url = scenario.init_url(group, context.server_id, context.database_id);
        let mut transaction_id = self.client.initialize_query_tool(&init_url).await?;
        // Simulate a stale session reference: the corrupted id matches no id
        // the backend ever issues.
        if !scenario.transaction_id_is_valid {
            transaction_id.push_str(INVALID_TRANSACTION_SUFFIX);
        }

        let download_url = scenario.download_url(&transaction_id);
        let response =
            self.client.download(&download_url, &scenario.sql, DOWNLOAD_FILENAME).await?;

        let outcome = scenario.expected_outcome();
        match outcome {
            ExpectedOutcome::CsvBody => assert_csv_body(scenario, &response)?,
            ExpectedOutcome::BackendError => assert_backend_error(scenario, &response)?,
            ExpectedOutcome::SessionRejected => assert_session_rejected(scenario, &response)?,
        }

        self.client.disconnect_database(group, context.server_id, context.database_id).await?;

        Ok(ScenarioReport {
            scenario: scenario.name.clone(),
            database_name: context.database_name.clone(),
            transaction_id,
            download_status: response.status,
            outcome: outcome_label(outcome),
        })
    }

    /// Drops the scenario database through the lifecycle seam.
    async fn tear_down(&self, context: &RunContext) -> Result<(), ScenarioError> {
        self.lifecycle.drop_database(&context.database_name).await?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Assertions
// ============================================================================

/// Stable label for a scenario outcome class.
const fn outcome_label(outcome: ExpectedOutcome) -> &'static str {
    match outcome {
        ExpectedOutcome::CsvBody => "csv",
        ExpectedOutcome::BackendError => "backend_error",
        ExpectedOutcome::SessionRejected => "session_rejected",
    }
}

/// Builds an assertion failure for the scenario.
fn assertion(scenario: &DownloadCsvScenario, detail: String) -> ScenarioError {
    ScenarioError::Assertion {
        scenario: scenario.name.clone(),
        detail,
    }
}

/// Asserts a 200 response whose text contains both expected substrings.
fn assert_csv_body(
    scenario: &DownloadCsvScenario,
    response: &DownloadResponse,
) -> Result<(), ScenarioError> {
    if response.status != 200 {
        return Err(assertion(scenario, format!("wanted status 200, got {}", response.status)));
    }
    let text = response.text();
    let columns = scenario
        .expected_columns
        .as_deref()
        .ok_or_else(|| assertion(scenario, "scenario lists no expected columns".to_string()))?;
    let values = scenario
        .expected_values
        .as_deref()
        .ok_or_else(|| assertion(scenario, "scenario lists no expected values".to_string()))?;
    if !text.contains(columns) {
        return Err(assertion(scenario, format!("body does not contain columns {columns:?}")));
    }
    if !text.contains(values) {
        return Err(assertion(scenario, format!("body does not contain values {values:?}")));
    }
    Ok(())
}

/// Asserts a 200 JSON error payload naming the missing relation.
fn assert_backend_error(
    scenario: &DownloadCsvScenario,
    response: &DownloadResponse,
) -> Result<(), ScenarioError> {
    if response.status != 200 {
        return Err(assertion(scenario, format!("wanted status 200, got {}", response.status)));
    }
    let body = response.json().map_err(|err| assertion(scenario, err))?;
    let status = body.get("data").and_then(|data| data.get("status")).and_then(Value::as_bool);
    if status != Some(false) {
        return Err(assertion(scenario, format!("wanted data.status false, got {status:?}")));
    }
    let result = body
        .get("data")
        .and_then(|data| data.get("result"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !result.contains(MISSING_RELATION_ERROR) {
        return Err(assertion(
            scenario,
            format!("data.result does not mention the missing relation: {result:?}"),
        ));
    }
    Ok(())
}

/// Asserts the 500 rejection for an unknown session reference.
fn assert_session_rejected(
    scenario: &DownloadCsvScenario,
    response: &DownloadResponse,
) -> Result<(), ScenarioError> {
    if response.status != 500 {
        return Err(assertion(scenario, format!("wanted status 500, got {}", response.status)));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
