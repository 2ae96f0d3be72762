//! Snapshot repository contract and tabular-file implementation.
//!
//! # Responsibility
//! - Read and write the ledger and roster files as one aggregate.
//! - Validate persisted rows against the catalog on every load.
//!
//! # Invariants
//! - Both files are absent (first run) or both are present; a half-present
//!   pair is invalid data.
//! - Serialization is deterministic, so re-reading an unchanged remote
//!   yields byte-identical files.

use crate::model::role::RoleCatalog;
use crate::model::snapshot::{
    OccupancyLedger, ParticipantRecord, RegistrationSnapshot, SnapshotError,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LEDGER_FILE: &str = "ledger.json";
const ROSTER_FILE: &str = "participants.json";

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence errors for snapshot load/save operations.
#[derive(Debug)]
pub enum RepoError {
    Io { path: PathBuf, source: std::io::Error },
    Malformed { path: PathBuf, source: serde_json::Error },
    HalfPresentPair { present: PathBuf, missing: PathBuf },
    InvalidData(String),
    Inconsistent(SnapshotError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "snapshot io failure at `{}`: {source}", path.display())
            }
            Self::Malformed { path, source } => {
                write!(f, "malformed snapshot file `{}`: {source}", path.display())
            }
            Self::HalfPresentPair { present, missing } => write!(
                f,
                "`{}` exists but `{}` is missing; the pair must be written together",
                present.display(),
                missing.display()
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted snapshot: {message}"),
            Self::Inconsistent(err) => write!(f, "inconsistent persisted snapshot: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Malformed { source, .. } => Some(source),
            Self::Inconsistent(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SnapshotError> for RepoError {
    fn from(value: SnapshotError) -> Self {
        Self::Inconsistent(value)
    }
}

/// One row of the tabular ledger file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LedgerRow {
    role: String,
    participants: u32,
}

/// Load/save contract for the registration snapshot aggregate.
pub trait SnapshotRepository {
    /// Loads the snapshot, seeding from catalog defaults on first run.
    fn load(&self, catalog: &RoleCatalog) -> RepoResult<RegistrationSnapshot>;
    /// Persists both projections in one call.
    fn save(&self, snapshot: &RegistrationSnapshot) -> RepoResult<()>;
}

/// Tabular-JSON snapshot repository over a working-tree data directory.
pub struct FileSnapshotRepository {
    data_dir: PathBuf,
}

impl FileSnapshotRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE)
    }

    pub fn roster_path(&self) -> PathBuf {
        self.data_dir.join(ROSTER_FILE)
    }

    fn read_ledger(&self, catalog: &RoleCatalog) -> RepoResult<OccupancyLedger> {
        let rows: Vec<LedgerRow> = read_json_rows(&self.ledger_path())?;
        let mut counts = BTreeMap::new();
        for row in rows {
            let role = catalog.get(&row.role).ok_or_else(|| {
                RepoError::InvalidData(format!("ledger row names unknown role `{}`", row.role))
            })?;
            if row.participants > role.max_players {
                return Err(RepoError::InvalidData(format!(
                    "ledger row for `{}` holds {} participants over capacity {}",
                    row.role, row.participants, role.max_players
                )));
            }
            if counts.insert(row.role.clone(), row.participants).is_some() {
                return Err(RepoError::InvalidData(format!(
                    "ledger row for `{}` appears twice",
                    row.role
                )));
            }
        }
        Ok(OccupancyLedger::from_counts(counts))
    }

    fn read_roster(&self, catalog: &RoleCatalog) -> RepoResult<Vec<ParticipantRecord>> {
        let records: Vec<ParticipantRecord> = read_json_rows(&self.roster_path())?;
        let mut seen = BTreeSet::new();
        for record in &records {
            if !catalog.contains(&record.role) {
                return Err(RepoError::InvalidData(format!(
                    "roster row for `{}` names unknown role `{}`",
                    record.email, record.role
                )));
            }
            if !seen.insert(record.email.as_str()) {
                return Err(RepoError::InvalidData(format!(
                    "roster holds more than one row for email `{}`",
                    record.email
                )));
            }
        }
        Ok(records)
    }
}

impl SnapshotRepository for FileSnapshotRepository {
    fn load(&self, catalog: &RoleCatalog) -> RepoResult<RegistrationSnapshot> {
        let ledger_path = self.ledger_path();
        let roster_path = self.roster_path();

        match (ledger_path.exists(), roster_path.exists()) {
            (false, false) => {
                info!(
                    "event=snapshot_load module=repo status=seeded dir={}",
                    self.data_dir.display()
                );
                return Ok(RegistrationSnapshot::from_catalog(catalog));
            }
            (true, false) => {
                return Err(RepoError::HalfPresentPair {
                    present: ledger_path,
                    missing: roster_path,
                });
            }
            (false, true) => {
                return Err(RepoError::HalfPresentPair {
                    present: roster_path,
                    missing: ledger_path,
                });
            }
            (true, true) => {}
        }

        let ledger = self.read_ledger(catalog)?;
        let roster = self.read_roster(catalog)?;
        let snapshot = RegistrationSnapshot::from_parts(ledger, roster);
        snapshot.consistent_with(catalog)?;

        info!(
            "event=snapshot_load module=repo status=ok dir={} registrations={}",
            self.data_dir.display(),
            snapshot.roster().len()
        );
        Ok(snapshot)
    }

    fn save(&self, snapshot: &RegistrationSnapshot) -> RepoResult<()> {
        std::fs::create_dir_all(&self.data_dir).map_err(|source| RepoError::Io {
            path: self.data_dir.clone(),
            source,
        })?;

        let rows: Vec<LedgerRow> = snapshot
            .ledger()
            .iter()
            .map(|(role, participants)| LedgerRow {
                role: role.clone(),
                participants,
            })
            .collect();

        write_json_rows(&self.ledger_path(), &rows)?;
        if let Err(err) = write_json_rows(&self.roster_path(), &snapshot.roster().to_vec()) {
            // The pair is one aggregate; a torn write must not survive a
            // failed second half.
            warn!(
                "event=snapshot_save module=repo status=error dir={} error={err}",
                self.data_dir.display()
            );
            let _ = std::fs::remove_file(self.ledger_path());
            return Err(err);
        }

        info!(
            "event=snapshot_save module=repo status=ok dir={} registrations={}",
            self.data_dir.display(),
            snapshot.roster().len()
        );
        Ok(())
    }
}

fn read_json_rows<T: serde::de::DeserializeOwned>(path: &Path) -> RepoResult<T> {
    let text = std::fs::read_to_string(path).map_err(|source| RepoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| RepoError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json_rows<T: Serialize>(path: &Path, rows: &T) -> RepoResult<()> {
    let mut text = serde_json::to_string_pretty(rows).map_err(|source| RepoError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;
    text.push('\n');
    std::fs::write(path, text).map_err(|source| RepoError::Io {
        path: path.to_path_buf(),
        source,
    })
}
