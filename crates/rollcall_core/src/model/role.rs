//! Role catalog domain model.
//!
//! # Responsibility
//! - Define the capacity-bounded role record loaded from configuration.
//! - Provide a deterministic, read-only catalog for one event session.
//!
//! # Invariants
//! - `max_players` is strictly positive.
//! - `taken_by_default` never exceeds `max_players`.
//! - The catalog never changes for the lifetime of a session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Unique key identifying a role within one event.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type RoleName = String;

/// A named, capacity-bounded slot participants can claim.
///
/// Emoji, color and description are carried for the presentation layer and
/// never interpreted by core logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique role name, e.g. `Mediator`.
    pub name: RoleName,
    /// Display emoji shown next to the role.
    pub emoji: String,
    /// Short human-facing description of the role duties.
    pub description: String,
    /// Display color (hex string) for the occupancy chart.
    pub color: String,
    /// Maximum number of occupants, strictly positive.
    pub max_players: u32,
    /// Seed occupancy on first run, e.g. a chair role pre-filled with 1.
    pub taken_by_default: u32,
}

impl Role {
    /// Validates structural role invariants.
    pub fn validate(&self) -> Result<(), RoleValidationError> {
        if self.name.trim().is_empty() {
            return Err(RoleValidationError::EmptyName);
        }
        if self.max_players == 0 {
            return Err(RoleValidationError::ZeroCapacity(self.name.clone()));
        }
        if self.taken_by_default > self.max_players {
            return Err(RoleValidationError::DefaultExceedsCapacity {
                role: self.name.clone(),
                taken_by_default: self.taken_by_default,
                max_players: self.max_players,
            });
        }
        Ok(())
    }
}

/// Structural validation errors for role records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleValidationError {
    EmptyName,
    ZeroCapacity(RoleName),
    DefaultExceedsCapacity {
        role: RoleName,
        taken_by_default: u32,
        max_players: u32,
    },
    DuplicateName(RoleName),
}

impl Display for RoleValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "role name must not be empty"),
            Self::ZeroCapacity(role) => {
                write!(f, "role `{role}` must allow at least one player")
            }
            Self::DefaultExceedsCapacity {
                role,
                taken_by_default,
                max_players,
            } => write!(
                f,
                "role `{role}` seeds {taken_by_default} occupants but only allows {max_players}"
            ),
            Self::DuplicateName(role) => write!(f, "role `{role}` is declared twice"),
        }
    }
}

impl Error for RoleValidationError {}

/// Read-only mapping of role name to role record.
///
/// Iteration order is deterministic (sorted by name), so everything derived
/// from the catalog (ledger rows, option lists) serializes identically
/// across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleCatalog {
    roles: BTreeMap<RoleName, Role>,
}

impl RoleCatalog {
    /// Builds a catalog from validated role records.
    pub fn from_roles(roles: Vec<Role>) -> Result<Self, RoleValidationError> {
        let mut map = BTreeMap::new();
        for role in roles {
            role.validate()?;
            let name = role.name.clone();
            if map.insert(name.clone(), role).is_some() {
                return Err(RoleValidationError::DuplicateName(name));
            }
        }
        Ok(Self { roles: map })
    }

    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Iterates roles in deterministic name order.
    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }
}

#[cfg(test)]
mod tests {
    use super::{Role, RoleCatalog, RoleValidationError};

    fn role(name: &str, max_players: u32, taken_by_default: u32) -> Role {
        Role {
            name: name.to_string(),
            emoji: "🧪".to_string(),
            description: "test role".to_string(),
            color: "#ffadad".to_string(),
            max_players,
            taken_by_default,
        }
    }

    #[test]
    fn validates_well_formed_role() {
        assert!(role("Mediator", 1, 1).validate().is_ok());
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = role("Mediator", 0, 0).validate().unwrap_err();
        assert_eq!(err, RoleValidationError::ZeroCapacity("Mediator".into()));
    }

    #[test]
    fn rejects_default_above_capacity() {
        let err = role("Mediator", 1, 2).validate().unwrap_err();
        assert!(matches!(
            err,
            RoleValidationError::DefaultExceedsCapacity { .. }
        ));
    }

    #[test]
    fn rejects_blank_name() {
        let err = role("   ", 1, 0).validate().unwrap_err();
        assert_eq!(err, RoleValidationError::EmptyName);
    }

    #[test]
    fn catalog_rejects_duplicate_names() {
        let err = RoleCatalog::from_roles(vec![role("Developer", 3, 0), role("Developer", 2, 0)])
            .unwrap_err();
        assert_eq!(err, RoleValidationError::DuplicateName("Developer".into()));
    }

    #[test]
    fn catalog_iterates_in_name_order() {
        let catalog = RoleCatalog::from_roles(vec![
            role("Mediator", 1, 1),
            role("Archaeologist", 3, 0),
            role("Developer", 3, 0),
        ])
        .expect("catalog should build");

        let names: Vec<&str> = catalog.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Archaeologist", "Developer", "Mediator"]);
    }
}
