//! Registration validation rules.
//!
//! # Responsibility
//! - Decide whether a candidate submission may be accepted, without
//!   mutating anything.
//! - Build the selectable-role option list for the presentation layer.
//!
//! # Invariants
//! - Checks run in a fixed order and short-circuit on the first failure,
//!   so the user always sees the most specific message.
//! - Capacity is re-checked here even though full roles are excluded from
//!   the option list; the option list may be stale relative to the remote.

use crate::model::role::{Role, RoleCatalog};
use crate::model::snapshot::{OccupancyLedger, ParticipantRecord, RegistrationSnapshot};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Sentinel option shown before the user picks a role.
pub const NO_SELECTION: &str = "--Select--";

/// Local part, domain and a 2-3 letter TLD; matched against the whole
/// input.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,3}$").expect("valid email regex")
});

/// One rejection reason; `Display` renders the user-facing status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NoRoleSelected,
    InvalidEmail,
    AlreadyRegistered { existing_role: String },
    UnknownRole { role: String },
    RoleFull { role: String },
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRoleSelected => write!(f, "Please select a role"),
            Self::InvalidEmail => write!(f, "⚠️ Please provide a valid email"),
            Self::AlreadyRegistered { existing_role } => {
                write!(f, "⛔️ You have already chosen your role of {existing_role}")
            }
            Self::UnknownRole { role } => write!(f, "⚠️ Unknown role: {role}"),
            Self::RoleFull { role } => write!(f, "⛔️ All {role} seats are taken"),
        }
    }
}

impl Error for Rejection {}

/// Returns whether the text matches the accepted email shape.
pub fn is_email_shaped(text: &str) -> bool {
    EMAIL_RE.is_match(text)
}

/// Roles still open for selection, in catalog order.
pub fn selectable_roles<'a>(catalog: &'a RoleCatalog, ledger: &OccupancyLedger) -> Vec<&'a Role> {
    catalog
        .iter()
        .filter(|role| {
            ledger
                .count(&role.name)
                .is_some_and(|count| count < role.max_players)
        })
        .collect()
}

/// Decides whether a candidate submission is acceptable.
///
/// Pure decision: the caller performs the commit on acceptance. Checks in
/// order: no selection, email shape, duplicate email, unknown role,
/// capacity.
pub fn validate(
    candidate: &ParticipantRecord,
    snapshot: &RegistrationSnapshot,
    catalog: &RoleCatalog,
) -> Result<(), Rejection> {
    if candidate.role == NO_SELECTION {
        return Err(Rejection::NoRoleSelected);
    }

    if !is_email_shaped(&candidate.email) {
        return Err(Rejection::InvalidEmail);
    }

    if let Some(existing) = snapshot.find_by_email(&candidate.email) {
        return Err(Rejection::AlreadyRegistered {
            existing_role: existing.role.clone(),
        });
    }

    let Some(role) = catalog.get(&candidate.role) else {
        return Err(Rejection::UnknownRole {
            role: candidate.role.clone(),
        });
    };

    let occupied = snapshot.ledger().count(&role.name).unwrap_or(role.max_players);
    if occupied >= role.max_players {
        return Err(Rejection::RoleFull {
            role: role.name.clone(),
        });
    }

    Ok(())
}
