use rollcall_core::{
    ParticipantRecord, RegistrationOutcome, RegistrationService, Rejection, SessionContext,
};
use std::path::Path;
use std::process::Command;

#[test]
fn accepted_registration_updates_remote_and_confirms() {
    let root = tempfile::tempdir().unwrap();
    let ctx = context(root.path(), "work-a");

    let mut session = RegistrationService::open(&ctx).unwrap();
    assert_eq!(session.snapshot().ledger().count("Developer"), Some(2));

    let outcome = session
        .register(candidate("Ann", "ann@x.com", "Developer"))
        .unwrap();
    let RegistrationOutcome::Accepted { message } = outcome else {
        panic!("expected acceptance, got {outcome:?}");
    };
    assert!(message.contains("as a Developer 💻"));
    assert_eq!(session.snapshot().ledger().count("Developer"), Some(3));

    // A second session observes the published registration.
    let verify = RegistrationService::open(&context(root.path(), "work-b")).unwrap();
    assert_eq!(verify.snapshot().ledger().count("Developer"), Some(3));
    assert_eq!(verify.snapshot().roster().len(), 1);
    assert_eq!(verify.snapshot().roster()[0].email, "ann@x.com");
}

#[test]
fn full_role_is_excluded_from_options_and_rejected_on_submit() {
    let root = tempfile::tempdir().unwrap();
    let ctx = context(root.path(), "work-a");

    let mut session = RegistrationService::open(&ctx).unwrap();
    let open: Vec<&str> = session
        .open_roles()
        .iter()
        .map(|role| role.name.as_str())
        .collect();
    assert!(!open.contains(&"Mediator"));

    let outcome = session
        .register(candidate("Ann", "ann@x.com", "Mediator"))
        .unwrap();
    assert_eq!(
        outcome,
        RegistrationOutcome::Rejected(Rejection::RoleFull {
            role: "Mediator".to_string()
        })
    );
    // Rejections leave the remote untouched.
    let verify = RegistrationService::open(&context(root.path(), "work-b")).unwrap();
    assert!(verify.snapshot().roster().is_empty());
}

#[test]
fn duplicate_email_reports_previously_chosen_role() {
    let root = tempfile::tempdir().unwrap();

    let mut first = RegistrationService::open(&context(root.path(), "work-a")).unwrap();
    first
        .register(candidate("Ann", "ann@x.com", "Developer"))
        .unwrap();

    let mut second = RegistrationService::open(&context(root.path(), "work-b")).unwrap();
    let outcome = second
        .register(candidate("Ann", "ann@x.com", "Journalist"))
        .unwrap();
    assert_eq!(
        outcome,
        RegistrationOutcome::Rejected(Rejection::AlreadyRegistered {
            existing_role: "Developer".to_string()
        })
    );
}

#[test]
fn concurrent_writer_triggers_refetch_and_retry() {
    let root = tempfile::tempdir().unwrap();

    // Both sessions fetch before either publishes.
    let mut session_a = RegistrationService::open(&context(root.path(), "work-a")).unwrap();
    let mut session_b = RegistrationService::open(&context(root.path(), "work-b")).unwrap();

    session_a
        .register(candidate("Ann", "ann@x.com", "Developer"))
        .unwrap();

    // B's first push is rejected; the session re-fetches and retries.
    let outcome = session_b
        .register(candidate("Bob", "bob@x.com", "Journalist"))
        .unwrap();
    assert!(matches!(outcome, RegistrationOutcome::Accepted { .. }));

    let verify = RegistrationService::open(&context(root.path(), "work-c")).unwrap();
    let emails: Vec<&str> = verify
        .snapshot()
        .roster()
        .iter()
        .map(|record| record.email.as_str())
        .collect();
    assert_eq!(emails, vec!["ann@x.com", "bob@x.com"]);
    assert_eq!(verify.snapshot().ledger().count("Developer"), Some(3));
    assert_eq!(verify.snapshot().ledger().count("Journalist"), Some(1));
    verify
        .snapshot()
        .consistent_with(verify.catalog())
        .unwrap();
}

#[test]
fn concurrent_duplicate_email_is_rejected_after_refetch() {
    let root = tempfile::tempdir().unwrap();

    let mut session_a = RegistrationService::open(&context(root.path(), "work-a")).unwrap();
    let mut session_b = RegistrationService::open(&context(root.path(), "work-b")).unwrap();

    session_a
        .register(candidate("Ann", "ann@x.com", "Developer"))
        .unwrap();

    // B validated against a stale snapshot; after the rejected push it
    // re-validates against the fresh one and reports the duplicate.
    let outcome = session_b
        .register(candidate("Ann", "ann@x.com", "Journalist"))
        .unwrap();
    assert_eq!(
        outcome,
        RegistrationOutcome::Rejected(Rejection::AlreadyRegistered {
            existing_role: "Developer".to_string()
        })
    );
}

#[test]
fn no_selection_and_invalid_email_short_circuit() {
    let root = tempfile::tempdir().unwrap();
    let mut session = RegistrationService::open(&context(root.path(), "work-a")).unwrap();

    let outcome = session
        .register(candidate("Ann", "ann@x.com", rollcall_core::NO_SELECTION))
        .unwrap();
    assert_eq!(
        outcome,
        RegistrationOutcome::Rejected(Rejection::NoRoleSelected)
    );

    let outcome = session
        .register(candidate("Ann", "not-an-email", "Developer"))
        .unwrap();
    assert_eq!(outcome, RegistrationOutcome::Rejected(Rejection::InvalidEmail));
}

#[test]
fn event_metadata_is_exposed_for_rendering() {
    let root = tempfile::tempdir().unwrap();
    let session = RegistrationService::open(&context(root.path(), "work-a")).unwrap();

    let event = session.event();
    assert_eq!(event.date, "14th April 2021 18:30 GMT+1");
    assert!(event.paper_link.starts_with("https://"));
}

fn candidate(name: &str, email: &str, role: &str) -> ParticipantRecord {
    ParticipantRecord {
        name: name.to_string(),
        email: email.to_string(),
        role: role.to_string(),
    }
}

/// Builds a complete session context rooted in `root`: catalog and event
/// files, a seeded bare remote, and a per-caller workdir. The remote and
/// config files are created once per `root` and shared by later calls.
fn context(root: &Path, workdir: &str) -> SessionContext {
    let catalog_path = root.join("roles.json");
    if !catalog_path.exists() {
        std::fs::write(
            &catalog_path,
            r##"{
                "Mediator": {
                    "emoji": "⚖️",
                    "description": "Keeps the discussion on track",
                    "color": "#ffadad",
                    "max_players": 1,
                    "taken_by_default": 1
                },
                "Developer": {
                    "emoji": "💻",
                    "description": "Walks through the code",
                    "color": "#a0c4ff",
                    "max_players": 3,
                    "taken_by_default": 2
                },
                "Journalist": {
                    "emoji": "📰",
                    "description": "Summarizes the discussion",
                    "color": "#bdb2ff",
                    "max_players": 3,
                    "taken_by_default": 0
                }
            }"##,
        )
        .unwrap();
    }

    let event_path = root.join("event.json");
    if !event_path.exists() {
        std::fs::write(
            &event_path,
            r#"{
                "date": "14th April 2021 18:30 GMT+1",
                "paper": "Learning Representations by back-propagating errors",
                "paper_link": "https://example.org/backprop.pdf",
                "meet_up_link": "https://example.org/meet"
            }"#,
        )
        .unwrap();
    }

    let remote = root.join("remote.git");
    if !remote.exists() {
        init_seeded_remote(root, &remote);
    }

    SessionContext {
        catalog_path,
        event_path,
        workdir: root.join(workdir),
        remote_url: remote.to_str().unwrap().to_string(),
        branch: "main".to_string(),
        data_subpath: "data".to_string(),
        token: None,
    }
}

fn init_seeded_remote(root: &Path, remote: &Path) {
    git(None, &["init", "--bare", remote.to_str().unwrap()]);
    git(Some(remote), &["symbolic-ref", "HEAD", "refs/heads/main"]);

    let seed = root.join("seed");
    git(
        None,
        &["clone", remote.to_str().unwrap(), seed.to_str().unwrap()],
    );
    std::fs::write(seed.join("README.md"), "reading group registrations\n").unwrap();
    git(Some(&seed), &["add", "--", "README.md"]);
    git(
        Some(&seed),
        &[
            "-c",
            "user.name=seed",
            "-c",
            "user.email=seed@local",
            "commit",
            "-m",
            "seed",
        ],
    );
    git(Some(&seed), &["push", "origin", "HEAD:main"]);
}

fn git(cwd: Option<&Path>, args: &[&str]) {
    let mut command = Command::new("git");
    command.args(args);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    let output = command.output().expect("git should be invocable");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}
