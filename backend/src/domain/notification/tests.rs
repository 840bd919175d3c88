//! State machine tests for overdue notification records.

use super::*;
use chrono::{Duration, TimeZone};
use rstest::{fixture, rstest};

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0)
        .single()
        .expect("valid time")
}

#[fixture]
fn policy() -> RetryPolicy {
    RetryPolicy::default()
}

#[fixture]
fn pending(now: DateTime<Utc>) -> OverdueNotification {
    OverdueNotification::new(LoanId::random(), PatronId::random(), now)
}

fn failed_times(
    mut record: OverdueNotification,
    times: u32,
    now: DateTime<Utc>,
    policy: &RetryPolicy,
) -> OverdueNotification {
    for attempt in 0..times {
        if attempt > 0 {
            let due = record.next_retry_at().expect("failed records carry retry time");
            record.reset_for_retry(due, policy).expect("eligible for retry");
        }
        record
            .mark_failed("smtp unavailable", now, policy)
            .expect("pending records can fail");
    }
    record
}

#[rstest]
fn new_records_start_pending(pending: OverdueNotification, now: DateTime<Utc>) {
    assert_eq!(pending.status(), NotificationStatus::Pending);
    assert_eq!(pending.created_at(), now);
    assert_eq!(pending.retry_count(), 0);
    assert!(pending.sent_at().is_none());
    assert!(pending.error_message().is_none());
    assert!(pending.next_retry_at().is_none());
}

#[rstest]
fn mark_sent_sets_timestamp_and_is_terminal(mut pending: OverdueNotification, now: DateTime<Utc>) {
    let sent_at = now + Duration::seconds(3);
    pending.mark_sent(sent_at).expect("pending can be sent");

    assert_eq!(pending.status(), NotificationStatus::Sent);
    assert_eq!(pending.sent_at(), Some(sent_at));

    let err = pending.mark_sent(sent_at).expect_err("second send is a fault");
    assert_eq!(err, NotificationTransitionError::AlreadySent { id: pending.id() });
}

#[rstest]
fn sent_records_cannot_fail(
    mut pending: OverdueNotification,
    now: DateTime<Utc>,
    policy: RetryPolicy,
) {
    pending.mark_sent(now).expect("send");
    let err = pending
        .mark_failed("late bounce", now, &policy)
        .expect_err("sent is terminal");
    assert!(matches!(err, NotificationTransitionError::AlreadySent { .. }));
    assert_eq!(pending.retry_count(), 0);
}

#[rstest]
fn mark_failed_schedules_first_backoff(
    mut pending: OverdueNotification,
    now: DateTime<Utc>,
    policy: RetryPolicy,
) {
    pending
        .mark_failed("Email service returned false", now, &policy)
        .expect("pending can fail");

    assert_eq!(pending.status(), NotificationStatus::Failed);
    assert_eq!(pending.retry_count(), 1);
    assert_eq!(pending.error_message(), Some("Email service returned false"));
    assert_eq!(pending.next_retry_at(), Some(now + Duration::minutes(1)));
}

#[rstest]
fn blank_failure_reasons_are_replaced(
    mut pending: OverdueNotification,
    now: DateTime<Utc>,
    policy: RetryPolicy,
) {
    pending.mark_failed("  ", now, &policy).expect("fail");
    assert_eq!(pending.error_message(), Some(FALLBACK_FAILURE_REASON));
}

#[rstest]
fn failed_records_cannot_be_marked_again_without_reset(
    pending: OverdueNotification,
    now: DateTime<Utc>,
    policy: RetryPolicy,
) {
    let mut record = failed_times(pending, 1, now, &policy);
    let err = record
        .mark_failed("again", now, &policy)
        .expect_err("must reset first");
    assert_eq!(
        err,
        NotificationTransitionError::NotPending {
            id: record.id(),
            status: NotificationStatus::Failed,
        }
    );
    assert!(record.mark_sent(now).is_err());
}

#[rstest]
#[case::first(1, 1)]
#[case::second(2, 2)]
#[case::third(3, 4)]
#[case::fifth(5, 16)]
#[case::sixth(6, 60)]
fn backoff_follows_policy(
    pending: OverdueNotification,
    now: DateTime<Utc>,
    policy: RetryPolicy,
    #[case] failures: u32,
    #[case] minutes: i64,
) {
    let record = failed_times(pending, failures, now, &policy);
    assert_eq!(record.retry_count(), failures);
    assert_eq!(record.next_retry_at(), Some(now + Duration::minutes(minutes)));
}

#[rstest]
fn retry_waits_for_backoff_window(
    pending: OverdueNotification,
    now: DateTime<Utc>,
    policy: RetryPolicy,
) {
    let record = failed_times(pending, 1, now, &policy);
    let due = now + Duration::minutes(1);

    assert_eq!(
        record.retry_ineligibility(now, &policy),
        Some(RetryIneligibility::Scheduled(due))
    );
    assert!(!record.is_retry_eligible(due - Duration::seconds(1), &policy));
    assert!(record.is_retry_eligible(due, &policy));
}

#[rstest]
fn reset_keeps_retry_count_and_clears_failure(
    pending: OverdueNotification,
    now: DateTime<Utc>,
    policy: RetryPolicy,
) {
    let mut record = failed_times(pending, 2, now, &policy);
    let due = record.next_retry_at().expect("retry time");

    record.reset_for_retry(due, &policy).expect("eligible");

    assert_eq!(record.status(), NotificationStatus::Pending);
    assert_eq!(record.retry_count(), 2);
    assert!(record.error_message().is_none());
    assert!(record.next_retry_at().is_none());
}

#[rstest]
fn exhausted_records_never_become_eligible(
    pending: OverdueNotification,
    now: DateTime<Utc>,
    policy: RetryPolicy,
) {
    let mut record = failed_times(pending, policy.max_attempts, now, &policy);
    let far_future = now + Duration::days(365);

    assert_eq!(
        record.retry_ineligibility(far_future, &policy),
        Some(RetryIneligibility::Exhausted {
            retry_count: 10,
            max_attempts: 10,
        })
    );
    let err = record
        .reset_for_retry(far_future, &policy)
        .expect_err("budget spent");
    assert!(matches!(
        err,
        NotificationTransitionError::NotRetryEligible { .. }
    ));
    assert_eq!(record.status(), NotificationStatus::Failed);
}

#[rstest]
fn pending_and_sent_are_not_retry_eligible(
    mut pending: OverdueNotification,
    now: DateTime<Utc>,
    policy: RetryPolicy,
) {
    assert_eq!(
        pending.retry_ineligibility(now, &policy),
        Some(RetryIneligibility::NotFailed(NotificationStatus::Pending))
    );
    pending.mark_sent(now).expect("send");
    assert!(!pending.is_retry_eligible(now + Duration::days(1), &policy));
}

#[rstest]
fn snapshot_round_trips_through_rehydrate(
    pending: OverdueNotification,
    now: DateTime<Utc>,
    policy: RetryPolicy,
) {
    let record = failed_times(pending, 3, now, &policy);
    let restored = OverdueNotification::rehydrate(record.snapshot()).expect("valid snapshot");
    assert_eq!(restored, record);
}

#[rstest]
fn rehydrate_rejects_sent_without_timestamp(pending: OverdueNotification) {
    let mut snapshot = pending.snapshot();
    snapshot.status = NotificationStatus::Sent;
    assert_eq!(
        OverdueNotification::rehydrate(snapshot),
        Err(NotificationSnapshotError::SentWithoutTimestamp { id: pending.id() })
    );
}

#[rstest]
fn rehydrate_rejects_sent_with_retry_state(pending: OverdueNotification, now: DateTime<Utc>) {
    let mut snapshot = pending.snapshot();
    snapshot.status = NotificationStatus::Sent;
    snapshot.sent_at = Some(now);
    snapshot.error_message = Some("stale".to_owned());
    assert!(matches!(
        OverdueNotification::rehydrate(snapshot),
        Err(NotificationSnapshotError::SentWithRetryState { .. })
    ));
}

#[rstest]
fn rehydrate_rejects_failed_without_retry_time(pending: OverdueNotification) {
    let mut snapshot = pending.snapshot();
    snapshot.status = NotificationStatus::Failed;
    snapshot.error_message = Some("smtp".to_owned());
    assert!(matches!(
        OverdueNotification::rehydrate(snapshot),
        Err(NotificationSnapshotError::FailedWithoutRetryState { .. })
    ));
}

#[rstest]
fn rehydrate_rejects_pending_with_sent_at(pending: OverdueNotification, now: DateTime<Utc>) {
    let mut snapshot = pending.snapshot();
    snapshot.sent_at = Some(now);
    assert!(matches!(
        OverdueNotification::rehydrate(snapshot),
        Err(NotificationSnapshotError::UnsentWithTimestamp {
            status: NotificationStatus::Pending,
            ..
        })
    ));
}

#[rstest]
#[case("pending", NotificationStatus::Pending)]
#[case("SENT", NotificationStatus::Sent)]
#[case(" failed ", NotificationStatus::Failed)]
fn status_parses_tags(#[case] raw: &str, #[case] expected: NotificationStatus) {
    assert_eq!(raw.parse::<NotificationStatus>(), Ok(expected));
    assert_eq!(expected.to_string(), expected.as_str());
}

#[rstest]
fn status_rejects_unknown_tags() {
    assert_eq!(
        "queued".parse::<NotificationStatus>(),
        Err(ParseNotificationStatusError("queued".to_owned()))
    );
}
