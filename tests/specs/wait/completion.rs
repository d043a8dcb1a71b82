//! Completion condition specs
//!
//! Verify waits over child processes narrow as children finish and resume
//! once the required set is done.

use crate::prelude::*;

#[test]
fn all_mode_resumes_after_every_child_finishes() {
    let temp = Project::empty();
    temp.quiet_watchdog();
    let daemon = temp.daemon();

    let parent = process();
    let child_a = process();
    let child_b = process();

    daemon.report(parent, ProcessStatus::Running);
    daemon.park(
        parent,
        WaitCondition::Completion(
            CompletionCondition::all([child_a.instance_id, child_b.instance_id])
                .with_resume_event("children:done"),
        ),
    );

    // Nothing has finished yet.
    let summary = daemon.sweep();
    assert_eq!(summary.visited, 1);
    assert_eq!(summary.unchanged, 1);

    // First child finishing narrows the awaited set.
    daemon.report(child_a, ProcessStatus::Finished);
    let summary = daemon.sweep();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.resumed, 0);

    // Second child finishing completes the wait.
    daemon.report(child_b, ProcessStatus::Finished);
    let summary = daemon.sweep();
    assert_eq!(summary.resumed, 1);

    let names = temp.audit_names();
    assert!(names.contains(&"condition:updated".to_string()));
    assert!(names.contains(&"condition:cleared".to_string()));
    assert!(names.contains(&"process:resumed".to_string()));
    assert_eq!(daemon.status().records_waiting, 0);
}

#[test]
fn one_of_mode_resumes_on_the_first_final_child() {
    let temp = Project::empty();
    temp.quiet_watchdog();
    let daemon = temp.daemon();

    let parent = process();
    let child_a = process();
    let child_b = process();

    daemon.park(
        parent,
        WaitCondition::Completion(
            CompletionCondition::one_of([child_a.instance_id, child_b.instance_id])
                .with_resume_event("first:done"),
        ),
    );

    daemon.report(child_a, ProcessStatus::Failed);
    let summary = daemon.sweep();
    assert_eq!(summary.resumed, 1);
    assert_eq!(daemon.status().records_waiting, 0);
}

#[test]
fn children_finished_before_parking_enqueue_the_parent() {
    let temp = Project::empty();
    temp.quiet_watchdog();
    let daemon = temp.daemon();

    let parent = process();
    let child = process();

    daemon.report(child, ProcessStatus::Finished);
    daemon.park(
        parent,
        WaitCondition::Completion(CompletionCondition::all([child.instance_id])),
    );

    // Without a resume event the sweep marks the parent runnable itself.
    let summary = daemon.sweep();
    assert_eq!(summary.enqueued, 1);
    assert_eq!(summary.resumed, 0);

    assert!(temp.audit_names().contains(&"process:enqueued".to_string()));
    assert_eq!(daemon.status().records_waiting, 0);
}
