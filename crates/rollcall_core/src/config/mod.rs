//! Configuration loading for the role catalog and event metadata.
//!
//! # Responsibility
//! - Deserialize the role catalog and event description from JSON files.
//! - Reject malformed entries at the deserialization boundary.
//!
//! # Invariants
//! - A single malformed entry fails the whole catalog load.
//! - Unknown fields are rejected, not silently tolerated.
//! - Loaded configuration is read-only for the session.

use crate::model::role::{Role, RoleCatalog, RoleValidationError};
use log::{error, info};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Startup-fatal configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    InvalidRole(RoleValidationError),
    EmptyCatalog(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::InvalidRole(err) => write!(f, "{err}"),
            Self::EmptyCatalog(path) => {
                write!(f, "catalog `{}` declares no roles", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidRole(err) => Some(err),
            Self::EmptyCatalog(_) => None,
        }
    }
}

impl From<RoleValidationError> for ConfigError {
    fn from(value: RoleValidationError) -> Self {
        Self::InvalidRole(value)
    }
}

/// Event metadata displayed verbatim by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventInfo {
    pub date: String,
    pub paper: String,
    pub paper_link: String,
    pub meet_up_link: String,
}

/// On-disk shape of one catalog entry; the role name is the mapping key.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RoleEntry {
    emoji: String,
    description: String,
    color: String,
    max_players: u32,
    taken_by_default: u32,
}

/// Loads and validates the role catalog from a JSON mapping file.
///
/// # Errors
/// - `Read`/`Parse` when the file is missing, unreadable or not a JSON
///   mapping of role name to entry.
/// - `InvalidRole` when any entry has a non-positive capacity or seeds
///   more occupants than it allows.
/// - `EmptyCatalog` when the mapping has no entries.
pub fn load_catalog(path: impl AsRef<Path>) -> ConfigResult<RoleCatalog> {
    let path = path.as_ref();
    let entries: BTreeMap<String, RoleEntry> = read_json(path)?;
    if entries.is_empty() {
        error!(
            "event=catalog_load module=config status=error path={} error_code=empty_catalog",
            path.display()
        );
        return Err(ConfigError::EmptyCatalog(path.to_path_buf()));
    }

    let roles = entries
        .into_iter()
        .map(|(name, entry)| Role {
            name,
            emoji: entry.emoji,
            description: entry.description,
            color: entry.color,
            max_players: entry.max_players,
            taken_by_default: entry.taken_by_default,
        })
        .collect();

    match RoleCatalog::from_roles(roles) {
        Ok(catalog) => {
            info!(
                "event=catalog_load module=config status=ok path={} roles={}",
                path.display(),
                catalog.len()
            );
            Ok(catalog)
        }
        Err(err) => {
            error!(
                "event=catalog_load module=config status=error path={} error={err}",
                path.display()
            );
            Err(err.into())
        }
    }
}

/// Loads the event metadata file.
pub fn load_event(path: impl AsRef<Path>) -> ConfigResult<EventInfo> {
    let path = path.as_ref();
    let event: EventInfo = read_json(path)?;
    info!(
        "event=event_load module=config status=ok path={}",
        path.display()
    );
    Ok(event)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> ConfigResult<T> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
