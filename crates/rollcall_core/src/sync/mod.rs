//! Remote synchronization for the registration snapshot.
//!
//! # Responsibility
//! - Mirror the snapshot to and from a shared remote repository branch.
//! - Detect concurrent writers instead of silently overwriting them.
//!
//! # Invariants
//! - The remote branch is the single shared mutable resource; every local
//!   working copy is session-owned and disposable.
//! - Publishing never force-pushes.

pub mod git;
pub mod store;
