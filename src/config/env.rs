// src/config/env.rs
// ============================================================================
// Module: Fixture Environment
// Description: Environment-backed server fixture configuration.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std, url
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid
//! silent misconfiguration. Invalid UTF-8, empty values, and out-of-range
//! numbers fail closed. The resulting [`ServerFixtureConfig`] is the explicit
//! replacement for the fixture globals the original test suite relied on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys for the server fixture configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureEnv {
    /// Base URL of the query tool backend under test.
    BaseUrl,
    /// Server group identifier used in session-init URLs.
    ServerGroup,
    /// Server identifier used in session-init URLs.
    ServerId,
    /// Database host for the maintenance connection.
    DbHost,
    /// Database port for the maintenance connection.
    DbPort,
    /// Database user for the maintenance connection.
    DbUsername,
    /// Database password for the maintenance connection.
    DbPassword,
    /// Maintenance database name used for create/drop statements.
    MaintenanceDb,
    /// TLS mode for the maintenance connection.
    SslMode,
    /// Optional HTTP timeout override in seconds (positive integer).
    TimeoutSeconds,
    /// Optional artifact run-root override.
    RunRoot,
}

impl FixtureEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BaseUrl => "QUERY_TOOL_SYSTEM_TEST_BASE_URL",
            Self::ServerGroup => "QUERY_TOOL_SYSTEM_TEST_SERVER_GROUP",
            Self::ServerId => "QUERY_TOOL_SYSTEM_TEST_SERVER_ID",
            Self::DbHost => "QUERY_TOOL_SYSTEM_TEST_DB_HOST",
            Self::DbPort => "QUERY_TOOL_SYSTEM_TEST_DB_PORT",
            Self::DbUsername => "QUERY_TOOL_SYSTEM_TEST_DB_USERNAME",
            Self::DbPassword => "QUERY_TOOL_SYSTEM_TEST_DB_PASSWORD",
            Self::MaintenanceDb => "QUERY_TOOL_SYSTEM_TEST_MAINTENANCE_DB",
            Self::SslMode => "QUERY_TOOL_SYSTEM_TEST_SSLMODE",
            Self::TimeoutSeconds => "QUERY_TOOL_SYSTEM_TEST_TIMEOUT_SEC",
            Self::RunRoot => "QUERY_TOOL_SYSTEM_TEST_RUN_ROOT",
        }
    }
}

/// Accepted `sslmode` literals for the maintenance connection.
const SSL_MODES: [&str; 6] = ["disable", "allow", "prefer", "require", "verify-ca", "verify-full"];

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed server fixture configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerFixtureConfig {
    /// Base URL of the query tool backend under test.
    pub base_url: String,
    /// Server group identifier used in session-init URLs.
    pub server_group: u64,
    /// Server identifier used in session-init URLs.
    pub server_id: u64,
    /// Database host for the maintenance connection.
    pub db_host: String,
    /// Database port for the maintenance connection.
    pub db_port: u16,
    /// Database user for the maintenance connection.
    pub db_username: String,
    /// Database password for the maintenance connection, when required.
    pub db_password: Option<String>,
    /// Maintenance database name used for create/drop statements.
    pub maintenance_db: String,
    /// TLS mode for the maintenance connection.
    pub sslmode: String,
    /// Optional HTTP timeout override.
    pub timeout: Option<Duration>,
    /// Optional artifact run-root override.
    pub run_root: Option<PathBuf>,
}

impl Default for ServerFixtureConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5050".to_string(),
            server_group: 1,
            server_id: 1,
            db_host: "127.0.0.1".to_string(),
            db_port: 5432,
            db_username: "postgres".to_string(),
            db_password: None,
            maintenance_db: "postgres".to_string(),
            sslmode: "prefer".to_string(),
            timeout: None,
            run_root: None,
        }
    }
}

impl ServerFixtureConfig {
    /// Loads configuration from environment variables, falling back to the
    /// loopback defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, is
    /// empty, or fails validation (for example, a malformed base URL, a zero
    /// port, or an unknown sslmode).
    pub fn load() -> Result<Self, String> {
        let defaults = Self::default();
        let base_url = match read_env_nonempty(FixtureEnv::BaseUrl.as_str())? {
            Some(value) => parse_base_url(FixtureEnv::BaseUrl.as_str(), &value)?,
            None => defaults.base_url,
        };
        let server_group = read_env_nonempty(FixtureEnv::ServerGroup.as_str())?
            .map(|value| parse_positive_u64(FixtureEnv::ServerGroup.as_str(), &value))
            .transpose()?
            .unwrap_or(defaults.server_group);
        let server_id = read_env_nonempty(FixtureEnv::ServerId.as_str())?
            .map(|value| parse_positive_u64(FixtureEnv::ServerId.as_str(), &value))
            .transpose()?
            .unwrap_or(defaults.server_id);
        let db_host =
            read_env_nonempty(FixtureEnv::DbHost.as_str())?.unwrap_or(defaults.db_host);
        let db_port = read_env_nonempty(FixtureEnv::DbPort.as_str())?
            .map(|value| parse_port(FixtureEnv::DbPort.as_str(), &value))
            .transpose()?
            .unwrap_or(defaults.db_port);
        let db_username =
            read_env_nonempty(FixtureEnv::DbUsername.as_str())?.unwrap_or(defaults.db_username);
        let db_password = read_env_nonempty(FixtureEnv::DbPassword.as_str())?;
        let maintenance_db = read_env_nonempty(FixtureEnv::MaintenanceDb.as_str())?
            .unwrap_or(defaults.maintenance_db);
        let sslmode = match read_env_nonempty(FixtureEnv::SslMode.as_str())? {
            Some(value) => parse_sslmode(FixtureEnv::SslMode.as_str(), &value)?,
            None => defaults.sslmode,
        };
        let timeout = read_env_nonempty(FixtureEnv::TimeoutSeconds.as_str())?
            .map(|value| parse_timeout_seconds(FixtureEnv::TimeoutSeconds.as_str(), &value))
            .transpose()?;
        let run_root = read_env_nonempty(FixtureEnv::RunRoot.as_str())?.map(PathBuf::from);
        Ok(Self {
            base_url,
            server_group,
            server_id,
            db_host,
            db_port,
            db_username,
            db_password,
            maintenance_db,
            sslmode,
            timeout,
            run_root,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns an error when the variable is set but empty or whitespace.
fn read_env_nonempty(name: &str) -> Result<Option<String>, String> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Validates a base URL and strips any trailing slash.
///
/// # Errors
///
/// Returns an error when the value is not an absolute http(s) URL.
fn parse_base_url(name: &str, raw: &str) -> Result<String, String> {
    let parsed = Url::parse(raw.trim()).map_err(|err| format!("{name} is not a URL: {err}"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(format!("{name} must use http or https"));
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}

/// Parses a positive integer identifier from an environment value.
///
/// # Errors
///
/// Returns an error when the value is non-numeric or zero.
fn parse_positive_u64(name: &str, raw: &str) -> Result<u64, String> {
    let value: u64 =
        raw.trim().parse().map_err(|_| format!("{name} must be a positive integer"))?;
    if value == 0 {
        return Err(format!("{name} must be greater than zero"));
    }
    Ok(value)
}

/// Parses a non-zero TCP port from an environment value.
///
/// # Errors
///
/// Returns an error when the value is non-numeric or zero.
fn parse_port(name: &str, raw: &str) -> Result<u16, String> {
    let value: u16 = raw.trim().parse().map_err(|_| format!("{name} must be a TCP port"))?;
    if value == 0 {
        return Err(format!("{name} must be greater than zero"));
    }
    Ok(value)
}

/// Validates an sslmode literal against the accepted set.
///
/// # Errors
///
/// Returns an error when the value is not a recognized sslmode.
fn parse_sslmode(name: &str, raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if SSL_MODES.contains(&trimmed) {
        return Ok(trimmed.to_string());
    }
    Err(format!("{name} must be one of: {}", SSL_MODES.join(", ")))
}

/// Parses a positive timeout value from an environment variable string.
///
/// # Errors
///
/// Returns an error when the value is missing, non-numeric, or zero.
fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(format!("{name} must be a positive integer number of seconds"));
    }
    let secs: u64 = trimmed
        .parse()
        .map_err(|_| format!("{name} must be a positive integer number of seconds"))?;
    if secs == 0 {
        return Err(format!("{name} must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}
