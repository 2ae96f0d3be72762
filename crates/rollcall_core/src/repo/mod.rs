//! Persistence layer for the registration snapshot.
//!
//! # Responsibility
//! - Define the snapshot load/save contract used by the synchronized store.
//! - Isolate file-format details from service orchestration.
//!
//! # Invariants
//! - Load paths reject invalid persisted state instead of masking it.
//! - Ledger and roster are loaded and saved as one unit.

pub mod snapshot_repo;
