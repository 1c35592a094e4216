// tests/suites/download_csv.rs
// ============================================================================
// Module: Download CSV Tests
// Description: Scenario and property coverage for the download endpoint.
// Purpose: Validate CSV, backend-error, and session-rejection outcomes.
// Dependencies: query-tool-system-tests, helpers
// ============================================================================

//! Download scenario tests, run hermetically against the backend stub.

use async_trait::async_trait;
use helpers::artifacts::TestReporter;
use helpers::backend_stub::BackendStubHandle;
use helpers::backend_stub::spawn_backend_stub;
use helpers::lifecycle::StubDatabaseLifecycle;
use query_tool_system_tests::config::ServerFixtureConfig;
use query_tool_system_tests::lifecycle::DatabaseLifecycle;
use query_tool_system_tests::lifecycle::LifecycleError;
use query_tool_system_tests::runner::DownloadCsvScenarioRunner;
use query_tool_system_tests::runner::ScenarioError;
use query_tool_system_tests::scenario::DownloadCsvScenario;
use query_tool_system_tests::scenario::INVALID_TRANSACTION_SUFFIX;
use query_tool_system_tests::scenario::builtin_scenarios;

use crate::helpers;

/// Builds a fixture config pointing at the stub.
fn fixture_config(stub: &BackendStubHandle) -> ServerFixtureConfig {
    ServerFixtureConfig {
        base_url: stub.base_url().to_string(),
        ..ServerFixtureConfig::default()
    }
}

/// Returns the builtin scenario at `index`.
fn scenario_at(index: usize) -> Result<DownloadCsvScenario, String> {
    builtin_scenarios()
        .into_iter()
        .nth(index)
        .ok_or_else(|| format!("missing builtin scenario {index}"))
}

#[tokio::test(flavor = "multi_thread")]
async fn valid_query_downloads_csv() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("valid_query_downloads_csv")?;
    let stub = spawn_backend_stub().await?;
    let lifecycle = StubDatabaseLifecycle::new(stub.base_url())?;
    let runner = DownloadCsvScenarioRunner::new(fixture_config(&stub), &lifecycle)?;

    let scenario = scenario_at(0)?;
    reporter.record_scenario(&scenario.name);
    let report = runner.execute(&scenario).await?;

    if report.outcome != "csv" {
        return Err(format!("wanted csv outcome, got {}", report.outcome).into());
    }
    if report.download_status != 200 {
        return Err(format!("wanted status 200, got {}", report.download_status).into());
    }
    if !stub.database_names().is_empty() {
        return Err("scenario database survived teardown".into());
    }

    reporter.artifacts().write_transcript(&runner.client().transcript())?;
    reporter.artifacts().write_json("scenario_report.json", &report)?;
    reporter.finish(
        "pass",
        vec!["valid query yields a CSV body with the expected substrings".to_string()],
        vec![
            "summary.json".to_string(),
            "summary.md".to_string(),
            "http_transcript.json".to_string(),
            "scenario_report.json".to_string(),
        ],
    )?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn corrupted_transaction_id_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("corrupted_transaction_id_is_rejected")?;
    let stub = spawn_backend_stub().await?;
    let lifecycle = StubDatabaseLifecycle::new(stub.base_url())?;
    let runner = DownloadCsvScenarioRunner::new(fixture_config(&stub), &lifecycle)?;

    let scenario = scenario_at(1)?;
    reporter.record_scenario(&scenario.name);
    let report = runner.execute(&scenario).await?;

    if report.outcome != "session_rejected" {
        return Err(format!("wanted session_rejected outcome, got {}", report.outcome).into());
    }
    if report.download_status != 500 {
        return Err(format!("wanted status 500, got {}", report.download_status).into());
    }
    if !report.transaction_id.ends_with(INVALID_TRANSACTION_SUFFIX) {
        return Err(format!("transaction id {} lacks the corruption suffix", report.transaction_id)
            .into());
    }
    if !stub.database_names().is_empty() {
        return Err("scenario database survived teardown".into());
    }

    reporter.artifacts().write_transcript(&runner.client().transcript())?;
    reporter.finish(
        "pass",
        vec!["unknown session reference yields HTTP 500".to_string()],
        vec![
            "summary.json".to_string(),
            "summary.md".to_string(),
            "http_transcript.json".to_string(),
        ],
    )?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_query_reports_missing_relation() -> Result<(), Box<dyn std::error::Error>> {
    let mut reporter = TestReporter::new("invalid_query_reports_missing_relation")?;
    let stub = spawn_backend_stub().await?;
    let lifecycle = StubDatabaseLifecycle::new(stub.base_url())?;
    let runner = DownloadCsvScenarioRunner::new(fixture_config(&stub), &lifecycle)?;

    let scenario = scenario_at(2)?;
    reporter.record_scenario(&scenario.name);
    let report = runner.execute(&scenario).await?;

    if report.outcome != "backend_error" {
        return Err(format!("wanted backend_error outcome, got {}", report.outcome).into());
    }
    if report.download_status != 200 {
        return Err(format!("wanted status 200, got {}", report.download_status).into());
    }
    if !stub.database_names().is_empty() {
        return Err("scenario database survived teardown".into());
    }

    reporter.artifacts().write_transcript(&runner.client().transcript())?;
    reporter.finish(
        "pass",
        vec!["invalid SQL yields the backend relation error payload".to_string()],
        vec![
            "summary.json".to_string(),
            "summary.md".to_string(),
            "http_transcript.json".to_string(),
        ],
    )?;
    drop(reporter);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn rerun_is_isolated_and_repeatable() -> Result<(), Box<dyn std::error::Error>> {
    let stub = spawn_backend_stub().await?;
    let lifecycle = StubDatabaseLifecycle::new(stub.base_url())?;
    let runner = DownloadCsvScenarioRunner::new(fixture_config(&stub), &lifecycle)?;

    let scenario = scenario_at(0)?;
    let first = runner.execute(&scenario).await?;
    let second = runner.execute(&scenario).await?;

    if first.outcome != second.outcome {
        return Err(format!("outcomes diverged: {} vs {}", first.outcome, second.outcome).into());
    }
    // Fresh session per run; no cross-run state leaks through the backend.
    if first.transaction_id == second.transaction_id {
        return Err("reruns shared a transaction id".into());
    }
    if !stub.database_names().is_empty() {
        return Err("a scenario database survived teardown".into());
    }
    if stub.sessions_issued() != 2 {
        return Err(format!("wanted 2 issued sessions, got {}", stub.sessions_issued()).into());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_assertion_still_drops_database() -> Result<(), Box<dyn std::error::Error>> {
    let stub = spawn_backend_stub().await?;
    let lifecycle = StubDatabaseLifecycle::new(stub.base_url())?;
    let runner = DownloadCsvScenarioRunner::new(fixture_config(&stub), &lifecycle)?;

    let mut scenario = scenario_at(0)?;
    scenario.expected_values = Some("9,9,9".to_string());
    let outcome = runner.execute(&scenario).await;

    let Err(ScenarioError::Assertion {
        scenario: failed_name,
        detail,
    }) = outcome
    else {
        return Err("wanted an assertion failure".into());
    };
    if failed_name != scenario.name {
        return Err(format!("assertion names the wrong scenario: {failed_name}").into());
    }
    if !detail.contains("9,9,9") {
        return Err(format!("assertion detail does not name the substring: {detail}").into());
    }
    // Teardown must run even though the run phase failed.
    if !stub.database_names().is_empty() {
        return Err("scenario database survived a failing run".into());
    }
    Ok(())
}

/// Lifecycle wrapper that reports a database id the backend never issued.
struct MisprovisionedLifecycle {
    /// Real adapter used for create, drop, and list.
    inner: StubDatabaseLifecycle,
}

#[async_trait]
impl DatabaseLifecycle for MisprovisionedLifecycle {
    async fn create_database(&self, name: &str) -> Result<u64, LifecycleError> {
        let id = self.inner.create_database(name).await?;
        Ok(id + 1_000_000)
    }

    async fn drop_database(&self, name: &str) -> Result<(), LifecycleError> {
        self.inner.drop_database(name).await
    }

    async fn list_databases(&self) -> Result<Vec<String>, LifecycleError> {
        self.inner.list_databases().await
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn unconnectable_database_is_an_environment_failure() -> Result<(), Box<dyn std::error::Error>>
{
    let stub = spawn_backend_stub().await?;
    let lifecycle = MisprovisionedLifecycle {
        inner: StubDatabaseLifecycle::new(stub.base_url())?,
    };
    let runner = DownloadCsvScenarioRunner::new(fixture_config(&stub), &lifecycle)?;

    let scenario = scenario_at(0)?;
    let outcome = runner.execute(&scenario).await;

    let Err(ScenarioError::Environment(detail)) = outcome else {
        return Err("wanted an environment failure".into());
    };
    if !detail.contains("could not connect") {
        return Err(format!("environment detail is unexpected: {detail}").into());
    }
    // No session was opened, and the database was still cleaned up.
    if stub.sessions_issued() != 0 {
        return Err("a session was issued despite the failed connect".into());
    }
    if !stub.database_names().is_empty() {
        return Err("scenario database survived the aborted run".into());
    }
    Ok(())
}
