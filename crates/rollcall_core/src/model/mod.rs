//! Domain model for capacity-bounded role registration.
//!
//! # Responsibility
//! - Define the typed records behind catalog, ledger and roster data.
//! - Keep the ledger/roster pair as one aggregate with one mutation path.
//!
//! # Invariants
//! - Role records are immutable for the lifetime of a session.
//! - Ledger and roster are two projections of the same facts and only
//!   change together through the snapshot aggregate.

pub mod role;
pub mod snapshot;
