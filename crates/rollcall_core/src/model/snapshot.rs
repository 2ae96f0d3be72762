//! Registration snapshot aggregate.
//!
//! # Responsibility
//! - Hold the occupancy ledger and the participant roster as one unit.
//! - Apply accepted registrations to both projections atomically.
//!
//! # Invariants
//! - `ledger[role] <= catalog[role].max_players` after every mutation.
//! - At most one roster record per email.
//! - `ledger[role] == taken_by_default + roster rows for role`, always.
//! - The roster is append-only; occupancy never shrinks.

use crate::model::role::{RoleCatalog, RoleName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One accepted registration row.
///
/// The email is the record identity and is matched exactly
/// (case-sensitive); the name may be empty free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParticipantRecord {
    pub name: String,
    pub email: String,
    pub role: RoleName,
}

/// Current occupant count per role.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OccupancyLedger {
    counts: BTreeMap<RoleName, u32>,
}

impl OccupancyLedger {
    /// Seeds one row per catalog role with its default occupancy.
    pub fn from_catalog(catalog: &RoleCatalog) -> Self {
        let counts = catalog
            .iter()
            .map(|role| (role.name.clone(), role.taken_by_default))
            .collect();
        Self { counts }
    }

    /// Builds a ledger from already-persisted counts.
    pub fn from_counts(counts: BTreeMap<RoleName, u32>) -> Self {
        Self { counts }
    }

    pub fn count(&self, role: &str) -> Option<u32> {
        self.counts.get(role).copied()
    }

    /// Iterates `(role, count)` rows in deterministic name order.
    pub fn iter(&self) -> impl Iterator<Item = (&RoleName, u32)> {
        self.counts.iter().map(|(name, count)| (name, *count))
    }

    fn increment(&mut self, role: &str) -> Option<u32> {
        let count = self.counts.get_mut(role)?;
        *count += 1;
        Some(*count)
    }
}

/// Aggregate errors raised at the mutation/consistency boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    UnknownRole(RoleName),
    RoleFull { role: RoleName, max_players: u32 },
    DuplicateEmail(String),
    Drift { role: RoleName, count: u32, expected: u32 },
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownRole(role) => write!(f, "role `{role}` is not in the catalog"),
            Self::RoleFull { role, max_players } => {
                write!(f, "role `{role}` already has all {max_players} seats taken")
            }
            Self::DuplicateEmail(email) => {
                write!(f, "email `{email}` already has a registration")
            }
            Self::Drift {
                role,
                count,
                expected,
            } => write!(
                f,
                "ledger count {count} for role `{role}` does not match roster-derived {expected}"
            ),
        }
    }
}

impl Error for SnapshotError {}

/// The persisted pair (ledger, roster) treated as one aggregate.
///
/// Mutation happens only through [`RegistrationSnapshot::commit`], which
/// updates both projections in one call so neither half can be written
/// without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationSnapshot {
    ledger: OccupancyLedger,
    roster: Vec<ParticipantRecord>,
}

impl RegistrationSnapshot {
    /// First-run snapshot: catalog-seeded ledger, empty roster.
    pub fn from_catalog(catalog: &RoleCatalog) -> Self {
        Self {
            ledger: OccupancyLedger::from_catalog(catalog),
            roster: Vec::new(),
        }
    }

    /// Rebuilds a snapshot from persisted parts.
    ///
    /// Callers must verify consistency against the catalog afterwards;
    /// this constructor does not.
    pub fn from_parts(ledger: OccupancyLedger, roster: Vec<ParticipantRecord>) -> Self {
        Self { ledger, roster }
    }

    pub fn ledger(&self) -> &OccupancyLedger {
        &self.ledger
    }

    pub fn roster(&self) -> &[ParticipantRecord] {
        &self.roster
    }

    /// Finds an existing registration by exact email match.
    pub fn find_by_email(&self, email: &str) -> Option<&ParticipantRecord> {
        self.roster.iter().find(|record| record.email == email)
    }

    /// Applies one accepted registration to both projections.
    ///
    /// # Invariants
    /// - Appends exactly one roster row and increments exactly one count.
    /// - Re-enforces capacity and uniqueness even though the validator has
    ///   already accepted the candidate; a stale snapshot must not push a
    ///   role past capacity.
    pub fn commit(
        &mut self,
        candidate: ParticipantRecord,
        catalog: &RoleCatalog,
    ) -> Result<(), SnapshotError> {
        let role = catalog
            .get(&candidate.role)
            .ok_or_else(|| SnapshotError::UnknownRole(candidate.role.clone()))?;

        let count = self
            .ledger
            .count(&candidate.role)
            .ok_or_else(|| SnapshotError::UnknownRole(candidate.role.clone()))?;
        if count >= role.max_players {
            return Err(SnapshotError::RoleFull {
                role: role.name.clone(),
                max_players: role.max_players,
            });
        }

        if self.find_by_email(&candidate.email).is_some() {
            return Err(SnapshotError::DuplicateEmail(candidate.email));
        }

        self.ledger.increment(&candidate.role);
        self.roster.push(candidate);
        Ok(())
    }

    /// Cross-checks the ledger against the roster-derived counts.
    ///
    /// For every catalog role the persisted count must equal
    /// `taken_by_default` plus the number of roster rows naming that role.
    pub fn consistent_with(&self, catalog: &RoleCatalog) -> Result<(), SnapshotError> {
        for role in catalog.iter() {
            let count = self
                .ledger
                .count(&role.name)
                .ok_or_else(|| SnapshotError::UnknownRole(role.name.clone()))?;
            let registered = self
                .roster
                .iter()
                .filter(|record| record.role == role.name)
                .count() as u32;
            let expected = role.taken_by_default + registered;
            if count != expected {
                return Err(SnapshotError::Drift {
                    role: role.name.clone(),
                    count,
                    expected,
                });
            }
        }
        Ok(())
    }
}
