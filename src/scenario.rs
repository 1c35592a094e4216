// src/scenario.rs
// ============================================================================
// Module: Download Scenarios
// Description: Scenario records for the CSV download system tests.
// Purpose: Provide the fixed scenario table and database naming helpers.
// Dependencies: rand
// ============================================================================

//! ## Overview
//! Each scenario is one fixed (input, expected-outcome) pair driving a full
//! setup, run, and teardown cycle against the query tool backend. The table
//! is the entire input space; order is irrelevant and every scenario runs
//! independently against its own uniquely named database.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::Rng;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix shared by every scenario database name.
pub const DATABASE_NAME_PREFIX: &str = "download_csv_";

/// Inclusive lower bound of the random database-name suffix.
pub const DATABASE_SUFFIX_MIN: u32 = 10_000;

/// Inclusive upper bound of the random database-name suffix.
pub const DATABASE_SUFFIX_MAX: u32 = 65_535;

/// Literal appended to a transaction id to simulate a stale session
/// reference. Guaranteed not to match any id the backend issues.
pub const INVALID_TRANSACTION_SUFFIX: &str = "007";

/// Fixed filename submitted with every download request.
pub const DOWNLOAD_FILENAME: &str = "test.csv";

/// Backend error substring expected for the invalid-query scenario.
pub const MISSING_RELATION_ERROR: &str =
    r#"relation "this_table_does_not_exist" does not exist"#;

// ============================================================================
// SECTION: Scenario Types
// ============================================================================

/// One fixed input and expectation pair for the download endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCsvScenario {
    /// Human-readable scenario name, reported on failure.
    pub name: String,
    /// SQL text submitted to the download endpoint.
    pub sql: String,
    /// Session-init URL template with named placeholders.
    pub init_url_template: String,
    /// Download URL template with named placeholders.
    pub download_url_template: String,
    /// Column-header substring expected in a CSV body, when applicable.
    pub expected_columns: Option<String>,
    /// Value-row substring expected in a CSV body, when applicable.
    pub expected_values: Option<String>,
    /// False when the transaction id is deliberately corrupted.
    pub transaction_id_is_valid: bool,
    /// False when the SQL is expected to fail inside the backend.
    pub query_is_valid: bool,
}

/// Outcome class a scenario expects from the download call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedOutcome {
    /// HTTP 200 with a CSV body containing the expected substrings.
    CsvBody,
    /// HTTP 200 with a JSON error payload from the backend.
    BackendError,
    /// HTTP 500 because the session reference is unknown.
    SessionRejected,
}

impl DownloadCsvScenario {
    /// Classifies the scenario by its expected outcome.
    #[must_use]
    pub const fn expected_outcome(&self) -> ExpectedOutcome {
        if !self.transaction_id_is_valid {
            return ExpectedOutcome::SessionRejected;
        }
        if self.query_is_valid {
            return ExpectedOutcome::CsvBody;
        }
        ExpectedOutcome::BackendError
    }

    /// Builds the session-init URL for the given fixture identifiers.
    #[must_use]
    pub fn init_url(&self, server_group: u64, server_id: u64, database_id: u64) -> String {
        fill_template(&self.init_url_template, &[
            ("server_group", server_group.to_string()),
            ("server_id", server_id.to_string()),
            ("database_id", database_id.to_string()),
        ])
    }

    /// Builds the download URL for the given transaction id.
    #[must_use]
    pub fn download_url(&self, transaction_id: &str) -> String {
        fill_template(&self.download_url_template, &[(
            "transaction_id",
            transaction_id.to_string(),
        )])
    }
}

// ============================================================================
// SECTION: Scenario Table
// ============================================================================

/// Session-init URL template shared by every scenario.
const INIT_URL_TEMPLATE: &str =
    "/datagrid/initialize/query_tool/{server_group}/{server_id}/{database_id}";

/// Download URL template shared by every scenario.
const DOWNLOAD_URL_TEMPLATE: &str = "/sqleditor/query_tool/download/{transaction_id}";

/// Returns the fixed ordered list of download scenarios.
#[must_use]
pub fn builtin_scenarios() -> Vec<DownloadCsvScenario> {
    vec![
        DownloadCsvScenario {
            name: "Download csv URL with valid query".to_string(),
            sql: r#"SELECT 1 as "A",2 as "B",3 as "C""#.to_string(),
            init_url_template: INIT_URL_TEMPLATE.to_string(),
            download_url_template: DOWNLOAD_URL_TEMPLATE.to_string(),
            expected_columns: Some(r#""A","B","C""#.to_string()),
            expected_values: Some("1,2,3".to_string()),
            transaction_id_is_valid: true,
            query_is_valid: true,
        },
        DownloadCsvScenario {
            name: "Download csv URL with wrong TX id".to_string(),
            sql: r#"SELECT 1 as "A",2 as "B",3 as "C""#.to_string(),
            init_url_template: INIT_URL_TEMPLATE.to_string(),
            download_url_template: DOWNLOAD_URL_TEMPLATE.to_string(),
            expected_columns: None,
            expected_values: None,
            transaction_id_is_valid: false,
            query_is_valid: false,
        },
        DownloadCsvScenario {
            name: "Download csv URL with wrong query".to_string(),
            sql: "SELECT * FROM this_table_does_not_exist".to_string(),
            init_url_template: INIT_URL_TEMPLATE.to_string(),
            download_url_template: DOWNLOAD_URL_TEMPLATE.to_string(),
            expected_columns: None,
            expected_values: None,
            transaction_id_is_valid: true,
            query_is_valid: false,
        },
    ]
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Generates a uniquely suffixed scenario database name.
///
/// Uniqueness is probabilistic only; callers must not assume the range is
/// collision free across concurrent runs.
#[must_use]
pub fn unique_database_name() -> String {
    let suffix = rand::thread_rng().gen_range(DATABASE_SUFFIX_MIN..=DATABASE_SUFFIX_MAX);
    format!("{DATABASE_NAME_PREFIX}{suffix}")
}

/// Fills named `{placeholder}` slots in a URL template.
fn fill_template(template: &str, pairs: &[(&str, String)]) -> String {
    let mut filled = template.to_string();
    for (key, value) in pairs {
        filled = filled.replace(&format!("{{{key}}}"), value);
    }
    filled
}

// ============================================================================
// SECTION: Tests
// ============================================================================
