//! `AtScheduler` against stand-in `at`, `atq` and `atrm` scripts.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use profq::config::SchedulerConfig;
use profq::error::SchedulerError;
use profq::{AtScheduler, ExecutionScheduler, Ticket};

const FAKE_AT: &str = r#"#!/bin/sh
echo "$@" > "$(dirname "$0")/at.args"
cat > "$(dirname "$0")/at.stdin"
echo "warning: commands will be executed using /bin/sh" >&2
echo "job 42 at Sat Oct 17 10:00:00 2026" >&2
"#;

const FAKE_AT_REFUSING: &str = r#"#!/bin/sh
cat > /dev/null
echo "at: cannot open lockfile /var/spool/cron/atjobs/.SEQ: Permission denied" >&2
exit 1
"#;

const FAKE_AT_CLOSING_STDIN: &str = r#"#!/bin/sh
exec 0<&-
echo "at: garbled time" >&2
exit 1
"#;

const FAKE_AT_SILENT: &str = r#"#!/bin/sh
cat > /dev/null
exit 0
"#;

const FAKE_ATQ: &str = r#"#!/bin/sh
echo "$@" > "$(dirname "$0")/atq.args"
printf '41\tSat Oct 17 09:59:00 2026 = www-data\n'
printf '42\tSat Oct 17 10:00:00 2026 a www-data\n'
"#;

const FAKE_ATRM: &str = r#"#!/bin/sh
echo "$@" > "$(dirname "$0")/atrm.args"
for id in "$@"; do
    if [ "$id" = "99" ]; then
        echo "Cannot find jobid 99" >&2
    fi
done
exit 0
"#;

const FAKE_SLOW: &str = r#"#!/bin/sh
sleep 5
"#;

struct FakeFacility {
    dir: TempDir,
}

impl FakeFacility {
    fn new() -> Self {
        let facility = Self {
            dir: TempDir::new().unwrap(),
        };
        facility.script("at", FAKE_AT);
        facility.script("atq", FAKE_ATQ);
        facility.script("atrm", FAKE_ATRM);
        facility
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).unwrap()
    }

    fn settings(&self) -> SchedulerConfig {
        SchedulerConfig {
            at_command: self.path("at"),
            atq_command: self.path("atq"),
            atrm_command: self.path("atrm"),
            queue: None,
            timeout_secs: 5,
        }
    }

    fn dir(&self) -> &Path {
        self.dir.path()
    }
}

#[tokio::test]
async fn test_submit_pipes_command_and_parses_ticket() {
    let facility = FakeFacility::new();
    let scheduler = AtScheduler::new(facility.settings());

    let ticket = scheduler
        .submit("/opt/smtp-profile.sh -v -j /jobs/alice /jobs/alice/job_1; rm -f /jobs/alice/job_1")
        .await
        .unwrap();

    assert_eq!(ticket, Ticket::new("42"));
    assert_eq!(facility.read("at.args").trim(), "-M now");
    assert_eq!(
        facility.read("at.stdin"),
        "/opt/smtp-profile.sh -v -j /jobs/alice /jobs/alice/job_1; rm -f /jobs/alice/job_1\n"
    );
}

#[tokio::test]
async fn test_submit_with_queue_letter() {
    let facility = FakeFacility::new();
    let scheduler = AtScheduler::new(SchedulerConfig {
        queue: Some("b".to_string()),
        ..facility.settings()
    });

    scheduler.submit("true").await.unwrap();
    assert_eq!(facility.read("at.args").trim(), "-q b -M now");

    scheduler.list_pending().await.unwrap();
    assert_eq!(facility.read("atq.args").trim(), "-q b");
}

#[tokio::test]
async fn test_refusal_text_is_verbatim() {
    let facility = FakeFacility::new();
    facility.script("at", FAKE_AT_REFUSING);
    let scheduler = AtScheduler::new(facility.settings());

    let err = scheduler.submit("true").await.unwrap_err();
    assert_eq!(
        err,
        SchedulerError::Rejected(
            "at: cannot open lockfile /var/spool/cron/atjobs/.SEQ: Permission denied".to_string()
        )
    );
}

#[tokio::test]
async fn test_early_exit_reports_facility_text() {
    let facility = FakeFacility::new();
    facility.script("at", FAKE_AT_CLOSING_STDIN);
    let scheduler = AtScheduler::new(facility.settings());

    // Larger than a pipe buffer, so the write hits the closed pipe.
    let command = format!("echo {}", "x".repeat(1 << 20));
    let err = scheduler.submit(&command).await.unwrap_err();
    assert_eq!(err, SchedulerError::Rejected("at: garbled time".to_string()));
}

#[tokio::test]
async fn test_missing_acknowledgement_is_unexpected() {
    let facility = FakeFacility::new();
    facility.script("at", FAKE_AT_SILENT);
    let scheduler = AtScheduler::new(facility.settings());

    let result = scheduler.submit("true").await;
    assert!(matches!(result, Err(SchedulerError::UnexpectedOutput(_))));
}

#[tokio::test]
async fn test_list_pending_marks_executing() {
    let facility = FakeFacility::new();
    let scheduler = AtScheduler::new(facility.settings());

    let queue = scheduler.list_pending().await.unwrap();
    assert_eq!(queue.entries.len(), 2);
    assert!(queue.entries[0].executing);
    assert_eq!(queue.cancellable(), vec![Ticket::new("42")]);
    assert!(queue.raw_listing.contains("www-data"));
}

#[tokio::test]
async fn test_cancel_many_uses_one_atrm_call() {
    let facility = FakeFacility::new();
    let scheduler = AtScheduler::new(facility.settings());

    scheduler
        .cancel_many(&[Ticket::new("42"), Ticket::new("43")])
        .await
        .unwrap();
    assert_eq!(facility.read("atrm.args").trim(), "42 43");
}

#[tokio::test]
async fn test_cancel_complaint_is_surfaced() {
    let facility = FakeFacility::new();
    let scheduler = AtScheduler::new(facility.settings());

    let err = scheduler.cancel(&Ticket::new("99")).await.unwrap_err();
    assert_eq!(err.user_message(), "Cannot find jobid 99");
}

#[tokio::test]
async fn test_slow_facility_times_out() {
    let facility = FakeFacility::new();
    facility.script("atq", FAKE_SLOW);
    let scheduler = AtScheduler::new(SchedulerConfig {
        timeout_secs: 1,
        ..facility.settings()
    });

    let result = scheduler.list_pending().await;
    assert_eq!(result, Err(SchedulerError::Timeout { secs: 1 }));
    assert!(facility.dir().exists());
}
