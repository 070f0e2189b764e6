//! Integration tests for epicenter-core.
//!
//! Organized as a single integration test binary, mirroring the library's own module
//! structure:
//! - crud_roundtrip: Table API insert/get/update/delete round trips (scenario S1)
//! - observer_ordering: commit/dispatch ordering through the Observer Bus
//! - remote_sync: CRDT merge convergence across two `Workspace`s (scenario S6)
//! - dependency_ordering: Epicenter startup/shutdown ordering (property 7)

mod crud_roundtrip;
mod dependency_ordering;
mod helpers;
mod observer_ordering;
mod remote_sync;
