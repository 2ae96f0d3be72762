//! Core domain logic for the reading-group role registration system.
//! This crate is the single source of truth for capacity and roster
//! invariants.

pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sync;

pub use config::{load_catalog, load_event, ConfigError, EventInfo};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::role::{Role, RoleCatalog, RoleName, RoleValidationError};
pub use model::snapshot::{
    OccupancyLedger, ParticipantRecord, RegistrationSnapshot, SnapshotError,
};
pub use repo::snapshot_repo::{
    FileSnapshotRepository, RepoError, RepoResult, SnapshotRepository,
};
pub use service::registration::{
    confirmation_message, RegistrationOutcome, RegistrationService, SessionContext, SessionError,
};
pub use service::validator::{
    is_email_shaped, selectable_roles, validate, Rejection, NO_SELECTION,
};
pub use sync::store::{SyncError, SyncedStore, PUBLISH_COMMIT_MESSAGE};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
