//! One-shot registration session driver.
//!
//! # Responsibility
//! - Stand in for the form UI: print the event header and occupancy,
//!   submit one registration when name/email/role are given.
//! - Keep all rendering out of `rollcall_core`.
//!
//! Usage:
//! ```text
//!     rollcall_cli                  # show event info and open roles
//!     rollcall_cli NAME EMAIL ROLE  # submit one registration
//! ```
//! Remote coordinates come from the environment: `ROLLCALL_REMOTE`,
//! `ROLLCALL_BRANCH`, `ROLLCALL_CATALOG`, `ROLLCALL_EVENT`,
//! `ROLLCALL_WORKDIR`, `ROLLCALL_DATA_DIR`, and optionally
//! `ROLLCALL_GIT_TOKEN` and `ROLLCALL_LOG_DIR`.

use rollcall_core::{
    default_log_level, init_logging, ParticipantRecord, RegistrationService, SessionContext,
};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let ctx = match context_from_env() {
        Ok(ctx) => ctx,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    if let Ok(log_dir) = std::env::var("ROLLCALL_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let mut session = match RegistrationService::open(&ctx) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("failed to open session: {err}");
            return ExitCode::FAILURE;
        }
    };

    let event = session.event();
    println!("🗓  Date: {}", event.date);
    println!("📝 Paper: {} <{}>", event.paper, event.paper_link);
    println!("🔗 Meet-up: {}", event.meet_up_link);
    println!();
    for role in session.catalog().iter() {
        let taken = session.snapshot().ledger().count(&role.name).unwrap_or(0);
        println!(
            "{} {:<24} {:>2}/{}",
            role.emoji, role.name, taken, role.max_players
        );
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [name, email, role] = match args.as_slice() {
        [] => {
            println!();
            let open: Vec<&str> = session
                .open_roles()
                .iter()
                .map(|role| role.name.as_str())
                .collect();
            println!("Open roles: {}", open.join(", "));
            return ExitCode::SUCCESS;
        }
        [name, email, role] => [name.clone(), email.clone(), role.clone()],
        _ => {
            eprintln!("usage: rollcall_cli [NAME EMAIL ROLE]");
            return ExitCode::FAILURE;
        }
    };

    let outcome = session.register(ParticipantRecord { name, email, role });
    match outcome {
        Ok(outcome) => {
            println!();
            println!("{}", outcome.status_line());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("registration failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn context_from_env() -> Result<SessionContext, String> {
    Ok(SessionContext {
        catalog_path: PathBuf::from(require_env("ROLLCALL_CATALOG")?),
        event_path: PathBuf::from(require_env("ROLLCALL_EVENT")?),
        workdir: PathBuf::from(
            std::env::var("ROLLCALL_WORKDIR").unwrap_or_else(|_| {
                std::env::temp_dir()
                    .join("rollcall-session")
                    .to_string_lossy()
                    .into_owned()
            }),
        ),
        remote_url: require_env("ROLLCALL_REMOTE")?,
        branch: std::env::var("ROLLCALL_BRANCH").unwrap_or_else(|_| "main".to_string()),
        data_subpath: std::env::var("ROLLCALL_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
        token: std::env::var("ROLLCALL_GIT_TOKEN").ok(),
    })
}

fn require_env(name: &str) -> Result<String, String> {
    std::env::var(name).map_err(|_| format!("missing required environment variable {name}"))
}
