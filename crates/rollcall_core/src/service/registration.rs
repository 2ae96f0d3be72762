//! Registration session orchestration.
//!
//! # Responsibility
//! - Run one fetch → validate → commit → publish cycle per submission.
//! - Produce the single user-facing status line for the attempt.
//!
//! # Invariants
//! - Validation happens against the freshest fetched snapshot; a rejected
//!   push triggers re-fetch and re-validation, never an overwrite.
//! - The confirmation message is gated on a successful publish.
//! - All paths and remote coordinates travel in an explicit session
//!   context; nothing is process-global.

use crate::config::{load_catalog, load_event, ConfigError, EventInfo};
use crate::model::role::{Role, RoleCatalog};
use crate::model::snapshot::{ParticipantRecord, RegistrationSnapshot, SnapshotError};
use crate::service::validator::{selectable_roles, validate, Rejection};
use crate::sync::git::authenticated_url;
use crate::sync::store::{SyncError, SyncedStore};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Publish attempts per submission before giving up on a moving remote.
const MAX_PUBLISH_ATTEMPTS: u32 = 3;

/// Everything one session needs, constructed once and passed by reference.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Role catalog JSON file.
    pub catalog_path: PathBuf,
    /// Event metadata JSON file.
    pub event_path: PathBuf,
    /// Directory for the session-owned git working copy.
    pub workdir: PathBuf,
    /// Remote repository URL holding the snapshot branch.
    pub remote_url: String,
    /// Branch carrying the snapshot files.
    pub branch: String,
    /// Path of the snapshot data directory inside the repository.
    pub data_subpath: String,
    /// Optional access token spliced into an https remote URL.
    pub token: Option<String>,
}

/// Session-fatal errors; validation rejections are an outcome, not an error.
#[derive(Debug)]
pub enum SessionError {
    Config(ConfigError),
    Sync(SyncError),
    /// Validator and aggregate disagreed; indicates a logic bug upstream.
    Inconsistent(SnapshotError),
    /// The remote kept moving; every publish attempt was rejected.
    Contention { attempts: u32 },
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Sync(err) => write!(f, "{err}"),
            Self::Inconsistent(err) => write!(f, "inconsistent registration state: {err}"),
            Self::Contention { attempts } => write!(
                f,
                "registration could not be published after {attempts} attempts; \
                 the remote kept moving"
            ),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Sync(err) => Some(err),
            Self::Inconsistent(err) => Some(err),
            Self::Contention { .. } => None,
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<SyncError> for SessionError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

/// Result of one submission: exactly one status line either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Accepted { message: String },
    Rejected(Rejection),
}

impl RegistrationOutcome {
    /// The user-facing status line for this outcome.
    pub fn status_line(&self) -> String {
        match self {
            Self::Accepted { message } => message.clone(),
            Self::Rejected(rejection) => rejection.to_string(),
        }
    }
}

/// One interactive registration session against the synchronized store.
pub struct RegistrationService {
    catalog: RoleCatalog,
    event: EventInfo,
    snapshot: RegistrationSnapshot,
    store: SyncedStore,
}

impl RegistrationService {
    /// Opens a session: loads configuration, fetches the remote snapshot.
    ///
    /// # Errors
    /// - `Config` when catalog or event metadata is missing/malformed.
    /// - `Sync` when the remote cannot be fetched or read.
    pub fn open(ctx: &SessionContext) -> Result<Self, SessionError> {
        let catalog = load_catalog(&ctx.catalog_path)?;
        let event = load_event(&ctx.event_path)?;

        let remote = authenticated_url(&ctx.remote_url, ctx.token.as_deref());
        let mut store = SyncedStore::new(remote, &ctx.branch, &ctx.workdir, &ctx.data_subpath);
        store.fetch()?;
        let snapshot = store.read(&catalog)?;

        Ok(Self {
            catalog,
            event,
            snapshot,
            store,
        })
    }

    pub fn event(&self) -> &EventInfo {
        &self.event
    }

    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    pub fn snapshot(&self) -> &RegistrationSnapshot {
        &self.snapshot
    }

    /// Roles still offered for selection, in catalog order.
    pub fn open_roles(&self) -> Vec<&Role> {
        selectable_roles(&self.catalog, self.snapshot.ledger())
    }

    /// Processes one submission end to end.
    ///
    /// On a rejected non-fast-forward push the session re-fetches, re-runs
    /// validation against the fresh snapshot and retries, up to three
    /// attempts. A session that has published stays published; open a new
    /// session for further submissions.
    pub fn register(
        &mut self,
        candidate: ParticipantRecord,
    ) -> Result<RegistrationOutcome, SessionError> {
        for attempt in 1..=MAX_PUBLISH_ATTEMPTS {
            if let Err(rejection) = validate(&candidate, &self.snapshot, &self.catalog) {
                info!(
                    "event=registration module=service status=rejected reason={} attempt={attempt}",
                    rejection_code(&rejection)
                );
                return Ok(RegistrationOutcome::Rejected(rejection));
            }

            let mut next = self.snapshot.clone();
            next.commit(candidate.clone(), &self.catalog)
                .map_err(SessionError::Inconsistent)?;
            self.store.write(&next)?;

            match self.store.publish() {
                Ok(()) => {
                    let role = self.catalog.get(&candidate.role).ok_or_else(|| {
                        SessionError::Inconsistent(SnapshotError::UnknownRole(
                            candidate.role.clone(),
                        ))
                    })?;
                    info!(
                        "event=registration module=service status=accepted role={} attempt={attempt}",
                        role.name
                    );
                    self.snapshot = next;
                    // TODO: send the confirmation email instead of only
                    // promising one in the status line.
                    return Ok(RegistrationOutcome::Accepted {
                        message: confirmation_message(role),
                    });
                }
                Err(SyncError::PublishRejected(detail)) => {
                    warn!(
                        "event=registration module=service status=retry attempt={attempt} detail={detail}"
                    );
                    self.store.fetch()?;
                    self.snapshot = self.store.read(&self.catalog)?;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(SessionError::Contention {
            attempts: MAX_PUBLISH_ATTEMPTS,
        })
    }
}

/// Builds the post-acceptance confirmation line.
///
/// The indefinite article follows the first character of the role name,
/// as the form renders it.
pub fn confirmation_message(role: &Role) -> String {
    let article = indefinite_article(&role.name);
    format!(
        "We're happy to have you as {article} {} {}! \
         You can find more info on the event in your mailbox 📬",
        role.name, role.emoji
    )
}

fn indefinite_article(role_name: &str) -> &'static str {
    let vowel_initial = role_name
        .chars()
        .next()
        .map(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u'))
        .unwrap_or(false);
    if vowel_initial {
        "an"
    } else {
        "a"
    }
}

fn rejection_code(rejection: &Rejection) -> &'static str {
    match rejection {
        Rejection::NoRoleSelected => "no_role_selected",
        Rejection::InvalidEmail => "invalid_email",
        Rejection::AlreadyRegistered { .. } => "already_registered",
        Rejection::UnknownRole { .. } => "unknown_role",
        Rejection::RoleFull { .. } => "role_full",
    }
}

#[cfg(test)]
mod tests {
    use super::{confirmation_message, indefinite_article};
    use crate::model::role::Role;

    fn role(name: &str, emoji: &str) -> Role {
        Role {
            name: name.to_string(),
            emoji: emoji.to_string(),
            description: String::new(),
            color: "#caffbf".to_string(),
            max_players: 3,
            taken_by_default: 0,
        }
    }

    #[test]
    fn article_follows_first_character() {
        assert_eq!(indefinite_article("Developer"), "a");
        assert_eq!(indefinite_article("Entrepreneur"), "an");
        assert_eq!(indefinite_article("Archaeologist"), "an");
        // Quoted role names start at the quote, not the letter.
        assert_eq!(indefinite_article("'Good' Peer Reviewer"), "a");
    }

    #[test]
    fn confirmation_contains_article_name_and_emoji() {
        let message = confirmation_message(&role("Developer", "💻"));
        assert!(message.contains("as a Developer 💻"));

        let message = confirmation_message(&role("Entrepreneur", "💼"));
        assert!(message.contains("as an Entrepreneur 💼"));
    }
}
