//! Use-case services for the registration flow.
//!
//! # Responsibility
//! - Keep validation a pure decision separate from persistence.
//! - Orchestrate the session cycle behind one stable entry point.
//!
//! # Invariants
//! - Services never bypass the snapshot aggregate's mutation path.
//! - Exactly one status line is produced per submission.

pub mod registration;
pub mod validator;
