// src/lifecycle.rs
// ============================================================================
// Module: Database Lifecycle
// Description: Seam for creating and dropping scenario databases.
// Purpose: Keep provisioning and teardown independent of the query session.
// Dependencies: async-trait, thiserror
// ============================================================================

//! ## Overview
//! Scenario databases are created before a run and dropped after it through
//! this seam, never through the HTTP query session. The invalid-session
//! scenario deliberately breaks its session, so teardown must not depend on
//! that session still being valid. Implementations typically hold their own
//! maintenance connection built from the fixture credentials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// SECTION: Error Types
// ============================================================================

/// Database lifecycle errors.
///
/// # Invariants
/// - Variants are stable for error classification.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The maintenance connection could not be established.
    #[error("maintenance connection failed: {0}")]
    Connection(String),
    /// Creating the scenario database failed.
    #[error("create database {name} failed: {detail}")]
    Create {
        /// Database name.
        name: String,
        /// Backend failure description.
        detail: String,
    },
    /// Dropping the scenario database failed.
    #[error("drop database {name} failed: {detail}")]
    Drop {
        /// Database name.
        name: String,
        /// Backend failure description.
        detail: String,
    },
}

// ============================================================================
// SECTION: Lifecycle Seam
// ============================================================================

/// Creates and destroys isolated scenario databases.
#[async_trait]
pub trait DatabaseLifecycle: Send + Sync {
    /// Creates a database with the given name and returns its backend id.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] when the maintenance connection or the
    /// create statement fails.
    async fn create_database(&self, name: &str) -> Result<u64, LifecycleError>;

    /// Drops the named database.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] when the maintenance connection or the
    /// drop statement fails.
    async fn drop_database(&self, name: &str) -> Result<(), LifecycleError>;

    /// Lists the databases currently known to the backend.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] when the maintenance connection fails.
    async fn list_databases(&self) -> Result<Vec<String>, LifecycleError>;
}
