//! Integration test suite for the Tide ledger.
//!
//! Exercises the ledger, vault and node together: the reference scenarios,
//! the accrual and rate properties under generated inputs, and failure paths
//! that must leave state untouched.

pub mod helpers;
