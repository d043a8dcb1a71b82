//! Lock condition specs
//!
//! Verify scoped locks admit one holder at a time and pass to the next
//! waiter when the holder reaches a final status.

use crate::prelude::*;

#[test]
fn lock_passes_from_holder_to_rival_on_release() {
    let temp = Project::empty();
    temp.quiet_watchdog();
    let daemon = temp.daemon();

    let org = Uuid::new_v4();
    let project_id = Uuid::new_v4();
    let first = process();
    let second = process();

    daemon.park(
        first,
        WaitCondition::Lock(LockCondition::project(
            first.instance_id,
            org,
            project_id,
            "deploy",
        )),
    );
    daemon.park(
        second,
        WaitCondition::Lock(LockCondition::project(
            second.instance_id,
            org,
            project_id,
            "deploy",
        )),
    );

    // First sweep: one contender acquires, the other records the holder.
    let summary = daemon.sweep();
    assert_eq!(summary.visited, 2);
    assert_eq!(summary.resumed, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(daemon.status().locks_held, 1);

    // The rival stays parked while the lock is held.
    let summary = daemon.sweep();
    assert_eq!(summary.resumed, 0);
    assert_eq!(daemon.status().records_waiting, 1);

    // Holder finishing releases the lock; the rival acquires on the next sweep.
    daemon.report(first, ProcessStatus::Finished);
    let summary = daemon.sweep();
    assert_eq!(summary.resumed, 1);
    assert_eq!(daemon.status().records_waiting, 0);

    let names = temp.audit_names();
    let acquired = names.iter().filter(|n| *n == "lock:acquired").count();
    let released = names.iter().filter(|n| *n == "lock:released").count();
    assert_eq!(acquired, 2);
    assert_eq!(released, 1);
}

#[test]
fn locks_in_different_scopes_do_not_contend() {
    let temp = Project::empty();
    temp.quiet_watchdog();
    let daemon = temp.daemon();

    let org = Uuid::new_v4();
    let first = process();
    let second = process();

    daemon.park(
        first,
        WaitCondition::Lock(LockCondition::project(
            first.instance_id,
            org,
            Uuid::new_v4(),
            "deploy",
        )),
    );
    daemon.park(
        second,
        WaitCondition::Lock(LockCondition::project(
            second.instance_id,
            org,
            Uuid::new_v4(),
            "deploy",
        )),
    );

    let summary = daemon.sweep();
    assert_eq!(summary.resumed, 2);
    assert_eq!(daemon.status().locks_held, 2);
}

#[test]
fn releasing_on_failure_also_frees_the_lock() {
    let temp = Project::empty();
    temp.quiet_watchdog();
    let daemon = temp.daemon();

    let org = Uuid::new_v4();
    let holder = process();

    daemon.park(
        holder,
        WaitCondition::Lock(LockCondition::org(holder.instance_id, org, "migrate")),
    );
    assert_eq!(daemon.sweep().resumed, 1);
    assert_eq!(daemon.status().locks_held, 1);

    daemon.report(holder, ProcessStatus::Failed);
    assert_eq!(daemon.status().locks_held, 0);
    assert!(temp.audit_names().contains(&"lock:released".to_string()));
}
