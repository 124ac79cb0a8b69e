// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbox-to-mirror flows against a real SQLite store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use rentbot_booking::BookingRules;
use rentbot_core::types::NewItem;
use rentbot_core::{
    Booking, BookingStatus, Clock, FixedClock, NewBooking, Store, SyncJob, SyncTaskKind,
    SyncTaskStatus,
};
use rentbot_storage::{Database, SqliteStore};
use rentbot_sync::{SyncWorker, TaskOutcome, WorkerSettings};
use rentbot_test_utils::{MockSink, SinkCall};

struct Fixture {
    store: Arc<dyn Store>,
    sink: Arc<MockSink>,
    clock: Arc<FixedClock>,
    worker: Arc<SyncWorker>,
    _dir: tempfile::TempDir,
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

async fn fixture(max_retries: u32) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("sync.db").to_str().unwrap())
        .await
        .unwrap();
    let store: Arc<dyn Store> = Arc::new(SqliteStore::from_database(db));
    let sink = Arc::new(MockSink::new());
    let clock = Arc::new(FixedClock::new(start_time()));
    let settings = WorkerSettings {
        poll_interval: Duration::from_millis(20),
        batch_size: 10,
        base_delay: Duration::from_secs(2),
        max_retries,
        lease: Duration::from_secs(300),
    };
    let worker = Arc::new(SyncWorker::new(
        store.clone(),
        sink.clone(),
        clock.clone(),
        BookingRules::default(),
        settings,
    ));
    Fixture {
        store,
        sink,
        clock,
        worker,
        _dir: dir,
    }
}

fn snapshot(id: i64, status: BookingStatus) -> Booking {
    Booking {
        id,
        user_id: 1000 + id,
        user_name: "Ivan".into(),
        username: None,
        phone: "79991234567".into(),
        item_id: 1,
        item_name: "Kayak".into(),
        date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
        status,
        comment: None,
        version: 1,
        created_at: start_time(),
        updated_at: start_time(),
    }
}

async fn enqueue(fx: &Fixture, job: SyncJob) -> i64 {
    fx.store
        .enqueue_task(&job, fx.clock.now())
        .await
        .unwrap()
        .expect("task should be enqueued")
}

#[tokio::test]
async fn retry_then_succeed() {
    let fx = fixture(5).await;
    let id = enqueue(
        &fx,
        SyncJob::Upsert {
            booking: snapshot(7, BookingStatus::Pending),
        },
    )
    .await;
    let cancel = CancellationToken::new();

    fx.sink.fail_next(1);
    assert_eq!(
        fx.worker
            .process_batch(SyncTaskKind::Upsert, &cancel)
            .await
            .unwrap(),
        1
    );
    let task = fx.store.get_task(id).await.unwrap().unwrap();
    assert_eq!(task.status, SyncTaskStatus::Retry);
    assert_eq!(task.retry_count, 1);
    assert_eq!(
        task.next_retry_at,
        Some(start_time() + TimeDelta::seconds(2))
    );
    assert!(task.last_error.unwrap().contains("mock sink unavailable"));

    // Not due yet.
    assert_eq!(
        fx.worker
            .process_batch(SyncTaskKind::Upsert, &cancel)
            .await
            .unwrap(),
        0
    );

    fx.clock.advance(TimeDelta::seconds(2));
    fx.worker
        .process_batch(SyncTaskKind::Upsert, &cancel)
        .await
        .unwrap();
    let task = fx.store.get_task(id).await.unwrap().unwrap();
    assert_eq!(task.status, SyncTaskStatus::Completed);
    assert_eq!(fx.sink.calls().await, vec![SinkCall::Upsert(7), SinkCall::Upsert(7)]);
    assert!(fx.sink.rows().await.contains_key(&7));
}

#[tokio::test]
async fn persistent_failure_parks_task_after_max_retries() {
    let fx = fixture(5).await;
    let id = enqueue(
        &fx,
        SyncJob::UpdateStatus {
            booking_id: 3,
            status: BookingStatus::Confirmed,
        },
    )
    .await;
    let cancel = CancellationToken::new();
    fx.sink.fail_next(usize::MAX);

    let mut delays = Vec::new();
    for _ in 0..5 {
        let before = fx.clock.now();
        let task = fx
            .store
            .lease_due_pending_tasks(SyncTaskKind::UpdateStatus, 1, before, Duration::from_secs(300))
            .await
            .unwrap()
            .pop()
            .expect("task should be due");
        match fx.worker.process_task(task, &cancel).await.unwrap() {
            TaskOutcome::Retry { next_at } => {
                delays.push((next_at - before).num_seconds());
                fx.clock.set(next_at);
            }
            TaskOutcome::Failed => break,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(delays, vec![2, 4, 8, 16]);
    let task = fx.store.get_task(id).await.unwrap().unwrap();
    assert_eq!(task.status, SyncTaskStatus::Failed);
    assert_eq!(task.retry_count, 5);
    assert_eq!(fx.store.list_failed().await.unwrap().len(), 1);
    assert_eq!(fx.sink.calls().await.len(), 5);
}

#[tokio::test]
async fn per_booking_order_spans_kinds() {
    let fx = fixture(5).await;
    enqueue(
        &fx,
        SyncJob::Upsert {
            booking: snapshot(9, BookingStatus::Pending),
        },
    )
    .await;
    enqueue(
        &fx,
        SyncJob::UpdateStatus {
            booking_id: 9,
            status: BookingStatus::Confirmed,
        },
    )
    .await;
    let cancel = CancellationToken::new();

    // The status patch waits for the upsert of the same booking.
    assert_eq!(
        fx.worker
            .process_batch(SyncTaskKind::UpdateStatus, &cancel)
            .await
            .unwrap(),
        0
    );
    fx.worker
        .process_batch(SyncTaskKind::Upsert, &cancel)
        .await
        .unwrap();
    fx.worker
        .process_batch(SyncTaskKind::UpdateStatus, &cancel)
        .await
        .unwrap();

    assert_eq!(
        fx.sink.calls().await,
        vec![
            SinkCall::Upsert(9),
            SinkCall::UpdateStatus(9, BookingStatus::Confirmed)
        ]
    );
    assert_eq!(fx.sink.rows().await[&9].status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn schedule_task_rewrites_window() {
    let fx = fixture(5).await;
    let start = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
    enqueue(&fx, SyncJob::SyncSchedule { start, end }).await;
    // Coalesced into the waiting one.
    assert!(
        fx.store
            .enqueue_task(&SyncJob::SyncSchedule { start, end }, fx.clock.now())
            .await
            .unwrap()
            .is_none()
    );

    fx.worker
        .process_batch(SyncTaskKind::SyncSchedule, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        fx.sink.calls().await,
        vec![SinkCall::UpdateSchedule { start, end }]
    );
}

#[tokio::test]
async fn stale_schedule_window_is_recomputed() {
    let fx = fixture(5).await;
    // Enqueued months ago and never processed.
    enqueue(
        &fx,
        SyncJob::SyncSchedule {
            start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
        },
    )
    .await;

    fx.worker
        .process_batch(SyncTaskKind::SyncSchedule, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        fx.sink.calls().await,
        vec![SinkCall::UpdateSchedule {
            start: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
        }]
    );
}

#[tokio::test]
async fn cancelled_batch_returns_tasks_to_pending() {
    let fx = fixture(5).await;
    let id = enqueue(
        &fx,
        SyncJob::Upsert {
            booking: snapshot(4, BookingStatus::Pending),
        },
    )
    .await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    fx.worker
        .process_batch(SyncTaskKind::Upsert, &cancel)
        .await
        .unwrap();
    let task = fx.store.get_task(id).await.unwrap().unwrap();
    assert_eq!(task.status, SyncTaskStatus::Pending);
    assert_eq!(task.retry_count, 0);
    assert!(fx.sink.calls().await.is_empty());
}

#[tokio::test]
async fn start_recovers_leases_and_drains_until_cancelled() {
    let fx = fixture(5).await;
    let id = enqueue(
        &fx,
        SyncJob::Upsert {
            booking: snapshot(11, BookingStatus::Confirmed),
        },
    )
    .await;
    // Simulate a crash mid-task: leased but never finished.
    fx.store
        .lease_due_pending_tasks(
            SyncTaskKind::Upsert,
            10,
            fx.clock.now(),
            Duration::from_secs(300),
        )
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let handles = fx.worker.start(cancel.clone()).await.unwrap();
    assert_eq!(handles.len(), SyncTaskKind::ALL.len());

    let mut completed = false;
    for _ in 0..100 {
        let task = fx.store.get_task(id).await.unwrap().unwrap();
        if task.status == SyncTaskStatus::Completed {
            completed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(completed, "recovered task should complete");

    cancel.cancel();
    for handle in handles {
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop should exit on cancel")
            .unwrap();
    }
}

#[tokio::test]
async fn full_resync_replaces_bookings_and_users() {
    let fx = fixture(5).await;
    fx.worker.full_resync().await.unwrap();
    assert_eq!(
        fx.sink.calls().await,
        vec![SinkCall::ReplaceBookings(0), SinkCall::UpdateUsers(0)]
    );
}

#[tokio::test]
async fn full_resync_does_not_undo_a_concurrent_delivery() {
    let fx = fixture(5).await;
    let now = fx.clock.now();
    let item = fx
        .store
        .create_item(
            &NewItem {
                name: "Kayak".into(),
                description: None,
                total_quantity: 1,
            },
            now,
        )
        .await
        .unwrap();
    let booking = fx
        .store
        .create_booking_with_lock(
            &NewBooking {
                user_id: 1001,
                user_name: "Ivan".into(),
                username: None,
                phone: "79991234567".into(),
                item_id: item.id,
                item_name: item.name.clone(),
                date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
                status: BookingStatus::Pending,
                comment: None,
            },
            now,
        )
        .await
        .unwrap();

    // The resync reads the pending booking, then stalls inside the sink.
    let hold = fx.sink.hold_replacements().await;
    let resync = {
        let worker = fx.worker.clone();
        tokio::spawn(async move { worker.full_resync().await })
    };
    fx.sink.replacement_started().await;

    fx.store
        .update_booking_status_with_version(booking.id, 1, BookingStatus::Confirmed, now)
        .await
        .unwrap();
    let confirmed = fx.store.get_booking(booking.id).await.unwrap().unwrap();
    enqueue(&fx, SyncJob::Upsert { booking: confirmed }).await;
    let delivery = {
        let worker = fx.worker.clone();
        tokio::spawn(async move {
            worker
                .process_batch(SyncTaskKind::Upsert, &CancellationToken::new())
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(hold);
    resync.await.unwrap().unwrap();
    assert_eq!(delivery.await.unwrap().unwrap(), 1);

    let row = &fx.sink.rows().await[&booking.id];
    assert_eq!(row.status, BookingStatus::Confirmed);
    assert_eq!(row.version, 2);
}
