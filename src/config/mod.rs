// src/config/mod.rs
// ============================================================================
// Module: Fixture Configuration
// Description: Centralized configuration for the download system tests.
// Purpose: Provide typed access to server fixture settings and defaults.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Fixture configuration is read from environment variables and mapped into a
//! small typed structure passed explicitly to the scenario runner. Nothing in
//! this crate reads ambient global state at run time.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::FixtureEnv;
pub use env::ServerFixtureConfig;
pub use env::read_env_strict;
