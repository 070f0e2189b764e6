//! Integration tests for epicenter-sqlite.

mod helpers;
mod idempotent_pull;
mod schema_drift;
