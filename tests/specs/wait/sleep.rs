//! Sleep condition specs
//!
//! Verify timer waits hold until their deadline and resume afterwards,
//! both under forced sweeps and under the background sweep loop.

use crate::prelude::*;

#[test]
fn sleep_holds_until_the_deadline() {
    let temp = Project::empty();
    temp.quiet_watchdog();
    let daemon = temp.daemon();

    let sleeper = process();
    daemon.park(
        sleeper,
        WaitCondition::Sleep(
            SleepCondition::until(Utc::now() + chrono::Duration::hours(1))
                .with_reason("nightly window"),
        ),
    );

    let summary = daemon.sweep();
    assert_eq!(summary.visited, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.resumed, 0);
    assert_eq!(daemon.status().records_waiting, 1);
}

#[test]
fn sleep_resumes_once_the_deadline_passes() {
    let temp = Project::empty();
    temp.quiet_watchdog();
    let daemon = temp.daemon();

    let sleeper = process();
    daemon.park(
        sleeper,
        WaitCondition::Sleep(
            SleepCondition::until(Utc::now() + chrono::Duration::milliseconds(200))
                .with_resume_event("timer:fired"),
        ),
    );

    let resumed = wait_for(SPEC_WAIT_MAX_MS, || daemon.sweep().resumed >= 1);
    assert!(resumed, "sweep should resume the sleeper after the deadline");

    let names = temp.audit_names();
    assert!(names.contains(&"condition:cleared".to_string()));
    assert!(names.contains(&"record:disarmed".to_string()));
    assert!(names.contains(&"process:resumed".to_string()));
    assert_eq!(daemon.status().records_waiting, 0);
}

#[test]
fn background_loop_resumes_without_a_forced_sweep() {
    let temp = Project::empty();
    temp.file(
        ".bittern/config.toml",
        "[watchdog]\npoll_interval = \"100ms\"\n",
    );
    let daemon = temp.daemon();

    let sleeper = process();
    daemon.park(
        sleeper,
        WaitCondition::Sleep(SleepCondition::until(
            Utc::now() + chrono::Duration::milliseconds(200),
        )),
    );

    let resumed = wait_for(SPEC_WAIT_MAX_MS, || {
        temp.audit_names().contains(&"process:resumed".to_string())
    });
    assert!(resumed, "background sweeps should resume the sleeper");
    assert_eq!(daemon.status().records_waiting, 0);
}

#[test]
fn clearing_a_condition_cancels_the_wait() {
    let temp = Project::empty();
    temp.quiet_watchdog();
    let daemon = temp.daemon();

    let sleeper = process();
    daemon.park(
        sleeper,
        WaitCondition::Sleep(SleepCondition::until(
            Utc::now() + chrono::Duration::milliseconds(100),
        )),
    );
    daemon.set_condition(sleeper, None);

    std::thread::sleep(std::time::Duration::from_millis(150));
    let summary = daemon.sweep();
    assert_eq!(summary.resumed, 0);
    assert!(!temp.audit_names().contains(&"process:resumed".to_string()));
}

#[test]
fn waiting_records_survive_a_restart() {
    let temp = Project::empty();
    temp.quiet_watchdog();
    let sleeper = process();

    {
        let daemon = temp.daemon();
        daemon.park(
            sleeper,
            WaitCondition::Sleep(
                SleepCondition::until(Utc::now() + chrono::Duration::milliseconds(300))
                    .with_resume_event("timer:fired"),
            ),
        );
        daemon.shutdown();
    }

    let daemon = temp.daemon();
    assert_eq!(daemon.status().records_waiting, 1);

    let resumed = wait_for(SPEC_WAIT_MAX_MS, || daemon.sweep().resumed >= 1);
    assert!(resumed, "replayed record should resume after restart");
}
