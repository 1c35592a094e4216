// src/lib.rs
// ============================================================================
// Module: Query Tool System Tests Library
// Description: Scenario runner for the query tool CSV download endpoint.
// Purpose: Provide the harness used by the download system-test binaries.
// Dependencies: reqwest, serde, thiserror
// ============================================================================

//! ## Overview
//! This crate hosts the black-box harness that drives the query tool backend
//! over HTTP: provision an isolated database, open a query session, submit
//! SQL, download the CSV (or error) response, assert the outcome, and tear
//! the database down. The backend under test is external; this crate only
//! implements the test procedure and its pass/fail criteria.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod config;
pub mod lifecycle;
pub mod runner;
pub mod scenario;
