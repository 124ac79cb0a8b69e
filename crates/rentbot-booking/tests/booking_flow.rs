// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking lifecycle against a real SQLite store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

use rentbot_booking::{
    BookingRules, BookingService, ItemService, ManagerBookingRequest, Move, UserService,
};
use rentbot_bus::{DomainEvent, EventBus, EventHandler, EventType};
use rentbot_core::chat::Sender;
use rentbot_core::types::{NewBooking, NewItem};
use rentbot_core::{
    BookingStatus, Clock, FixedClock, Item, RentError, Store, SyncJob, SyncTaskKind,
};
use rentbot_storage::{Database, SqliteStore};

struct Recorder {
    seen: Mutex<Vec<EventType>>,
}

#[async_trait]
impl EventHandler for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), RentError> {
        self.seen.lock().unwrap().push(event.event_type);
        Ok(())
    }
}

struct Fixture {
    store: Arc<dyn Store>,
    clock: Arc<FixedClock>,
    bookings: BookingService,
    items: ItemService,
    recorder: Arc<Recorder>,
    _dir: tempfile::TempDir,
}

fn now() -> DateTime<Utc> {
    // 2025-06-01 12:00 in UTC+3.
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn rules() -> BookingRules {
    BookingRules {
        offset: FixedOffset::east_opt(3 * 3600).unwrap(),
        ..BookingRules::default()
    }
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("flow.db").to_str().unwrap())
        .await
        .unwrap();
    let store: Arc<dyn Store> = Arc::new(SqliteStore::from_database(db));
    let clock = Arc::new(FixedClock::new(now()));
    let bus = Arc::new(EventBus::new());
    let recorder = Arc::new(Recorder {
        seen: Mutex::new(Vec::new()),
    });
    bus.subscribe_all(recorder.clone()).await;
    let clock_dyn: Arc<dyn Clock> = clock.clone();
    Fixture {
        bookings: BookingService::new(store.clone(), bus, clock_dyn.clone(), rules()),
        items: ItemService::new(store.clone(), clock_dyn, rules()),
        store,
        clock,
        recorder,
        _dir: dir,
    }
}

async fn item(f: &Fixture, name: &str, qty: i64) -> Item {
    f.store
        .create_item(
            &NewItem {
                name: name.into(),
                description: None,
                total_quantity: qty,
            },
            now(),
        )
        .await
        .unwrap()
}

fn request(item: &Item, date: NaiveDate) -> NewBooking {
    NewBooking {
        user_id: 1001,
        user_name: "Иван".into(),
        username: Some("ivan".into()),
        phone: "79991234567".into(),
        item_id: item.id,
        item_name: item.name.clone(),
        date,
        status: BookingStatus::Confirmed,
        comment: None,
    }
}

async fn leased(f: &Fixture, kind: SyncTaskKind) -> usize {
    f.store
        .lease_due_pending_tasks(kind, 50, f.clock.now(), Duration::from_secs(30))
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn user_booking_is_pending_and_enqueued() {
    let f = fixture().await;
    let kayak = item(&f, "Kayak", 2).await;

    let booking = f
        .bookings
        .create_booking(request(&kayak, day(2025, 6, 5)))
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.version, 1);
    assert_eq!(booking.phone, "79991234567");
    assert_eq!(
        *f.recorder.seen.lock().unwrap(),
        vec![EventType::BookingCreated]
    );
    assert_eq!(leased(&f, SyncTaskKind::Upsert).await, 1);
    assert_eq!(leased(&f, SyncTaskKind::SyncSchedule).await, 1);
}

#[tokio::test]
async fn full_item_rejects_new_request() {
    let f = fixture().await;
    let sup = item(&f, "SUP", 1).await;
    let date = day(2025, 8, 15);
    let first = f.bookings.create_booking(request(&sup, date)).await.unwrap();
    f.bookings
        .confirm_booking(first.id, first.version, 1)
        .await
        .unwrap();

    let err = f
        .bookings
        .create_booking(request(&sup, date))
        .await
        .unwrap_err();
    assert!(matches!(err, RentError::NotAvailable));
    assert_eq!(f.store.booked_count(sup.id, date).await.unwrap(), 1);
}

#[tokio::test]
async fn past_and_far_dates_are_rejected() {
    let f = fixture().await;
    let kayak = item(&f, "Kayak", 1).await;
    let past = f
        .bookings
        .create_booking(request(&kayak, day(2025, 5, 31)))
        .await;
    assert!(matches!(past, Err(RentError::PastDate)));
    let far = f
        .bookings
        .create_booking(request(&kayak, day(2026, 6, 2)))
        .await;
    assert!(matches!(far, Err(RentError::DateTooFar)));
}

#[tokio::test]
async fn stale_version_loses() {
    let f = fixture().await;
    let kayak = item(&f, "Kayak", 1).await;
    let b = f
        .bookings
        .create_booking(request(&kayak, day(2025, 6, 10)))
        .await
        .unwrap();

    let confirmed = f.bookings.confirm_booking(b.id, 1, 1).await.unwrap();
    assert_eq!(confirmed.version, 2);
    let err = f.bookings.confirm_booking(b.id, 1, 2).await.unwrap_err();
    assert!(matches!(err, RentError::ConcurrentModification));

    let current = f.bookings.get_booking(b.id).await.unwrap();
    assert_eq!(current.status, BookingStatus::Confirmed);
    assert_eq!(current.version, 2);
}

#[tokio::test]
async fn lifecycle_follows_transition_table() {
    let f = fixture().await;
    let kayak = item(&f, "Kayak", 1).await;
    let b = f
        .bookings
        .create_booking(request(&kayak, day(2025, 6, 10)))
        .await
        .unwrap();

    let err = f.bookings.complete_booking(b.id, 1, 1).await.unwrap_err();
    assert!(matches!(err, RentError::InvalidTransition { .. }));

    let b = f.bookings.confirm_booking(b.id, 1, 1).await.unwrap();
    let b = f.bookings.reopen_booking(b.id, b.version, 1).await.unwrap();
    assert_eq!(b.status, BookingStatus::Pending);
    let b = f.bookings.confirm_booking(b.id, b.version, 1).await.unwrap();
    let b = f.bookings.complete_booking(b.id, b.version, 1).await.unwrap();
    assert_eq!(b.status, BookingStatus::Completed);
    assert_eq!(b.version, 5);

    let seen = f.recorder.seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            EventType::BookingCreated,
            EventType::BookingConfirmed,
            EventType::BookingConfirmed,
            EventType::BookingCompleted,
        ]
    );

    // Status tasks wait behind the booking's upsert and then drain one at a time.
    assert_eq!(leased(&f, SyncTaskKind::UpdateStatus).await, 0);
    let upsert = f
        .store
        .lease_due_pending_tasks(SyncTaskKind::Upsert, 10, now(), Duration::from_secs(30))
        .await
        .unwrap();
    f.store.mark_completed(upsert[0].id, now()).await.unwrap();
    let mut statuses = Vec::new();
    loop {
        let batch = f
            .store
            .lease_due_pending_tasks(SyncTaskKind::UpdateStatus, 10, now(), Duration::from_secs(30))
            .await
            .unwrap();
        if batch.is_empty() {
            break;
        }
        assert_eq!(batch.len(), 1);
        statuses.push(batch[0].status_value.clone().unwrap());
        f.store.mark_completed(batch[0].id, now()).await.unwrap();
    }
    assert_eq!(statuses, vec!["confirmed", "pending", "confirmed", "completed"]);
}

#[tokio::test]
async fn rescheduled_keeps_its_slot() {
    let f = fixture().await;
    let kayak = item(&f, "Kayak", 1).await;
    let date = day(2025, 6, 10);
    let b = f
        .bookings
        .create_booking(request(&kayak, date))
        .await
        .unwrap();
    f.bookings.reschedule_booking(b.id, 1, 1).await.unwrap();
    assert!(!f.bookings.check_availability(kayak.id, date).await.unwrap());
}

#[tokio::test]
async fn change_item_respects_target_capacity() {
    let f = fixture().await;
    let kayak = item(&f, "Kayak", 1).await;
    let sup = item(&f, "SUP", 1).await;
    let date = day(2025, 6, 12);

    let mine = f
        .bookings
        .create_booking(request(&kayak, date))
        .await
        .unwrap();
    let other = f.bookings.create_booking(request(&sup, date)).await.unwrap();

    let err = f
        .bookings
        .change_item(mine.id, mine.version, sup.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, RentError::NotAvailable));

    f.bookings
        .reject_booking(other.id, other.version, 1)
        .await
        .unwrap();
    let changed = f
        .bookings
        .change_item(mine.id, mine.version, sup.id, 1)
        .await
        .unwrap();
    assert_eq!(changed.status, BookingStatus::Changed);
    assert_eq!(changed.item_id, sup.id);
    assert_eq!(changed.item_name, "SUP");
    assert_eq!(changed.version, 2);
    assert!(f.bookings.check_availability(kayak.id, date).await.unwrap());
}

#[tokio::test]
async fn manager_range_reports_saturated_dates() {
    let f = fixture().await;
    let boat = item(&f, "Boat", 1).await;
    f.bookings
        .create_booking(request(&boat, day(2025, 7, 2)))
        .await
        .unwrap();

    let req = ManagerBookingRequest {
        manager_id: 42,
        client_name: "John Doe".into(),
        client_phone: "79991234567".into(),
        item_id: boat.id,
        comment: Some("holiday".into()),
    };
    let dates = [day(2025, 7, 1), day(2025, 7, 2), day(2025, 7, 3)];
    let outcome = f
        .bookings
        .create_manager_bookings(&req, &dates)
        .await
        .unwrap();

    let created: Vec<NaiveDate> = outcome.created.iter().map(|b| b.date).collect();
    assert_eq!(created, vec![day(2025, 7, 1), day(2025, 7, 3)]);
    assert!(outcome
        .created
        .iter()
        .all(|b| b.status == BookingStatus::Confirmed && b.comment.as_deref() == Some("holiday")));
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].date, day(2025, 7, 2));
    assert!(matches!(outcome.failed[0].error, RentError::NotAvailable));
}

#[tokio::test]
async fn schedule_counts_active_bookings_per_day() {
    let f = fixture().await;
    let kayak = item(&f, "Kayak", 2).await;
    let date = day(2025, 6, 3);
    let b = f
        .bookings
        .create_booking(request(&kayak, date))
        .await
        .unwrap();
    f.bookings.create_booking(request(&kayak, date)).await.unwrap();
    f.bookings.reject_booking(b.id, b.version, 1).await.unwrap();

    let schedule = f
        .bookings
        .item_schedule(kayak.id, day(2025, 6, 2), 3)
        .await
        .unwrap();
    assert_eq!(schedule.len(), 3);
    assert_eq!(schedule[1].booked, 1);
    assert_eq!(schedule[1].free(), 1);
    assert_eq!(schedule[0].booked, 0);
}

#[tokio::test]
async fn reorder_is_clamped_and_last_write_wins() {
    let f = fixture().await;
    item(&f, "Kayak", 1).await;
    f.items.reorder_item("kayak", 7).await.unwrap();
    let x = f.items.reorder_item("kayak", -3).await.unwrap();
    assert_eq!(x.sort_order, 1);
}

#[tokio::test]
async fn move_swaps_with_neighbour() {
    let f = fixture().await;
    item(&f, "A", 1).await;
    item(&f, "B", 1).await;
    item(&f, "C", 1).await;
    f.items.move_item("C", Move::Up).await.unwrap();
    let names: Vec<String> = f
        .items
        .list_items()
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names, vec!["A", "C", "B"]);
    // Already first: no change.
    f.items.move_item("A", Move::Up).await.unwrap();
    assert_eq!(f.items.list_items().await.unwrap()[0].name, "A");
}

#[tokio::test]
async fn capacity_decrease_below_load_is_rejected() {
    let f = fixture().await;
    let kayak = item(&f, "Kayak", 2).await;
    let date = day(2025, 6, 20);
    f.bookings.create_booking(request(&kayak, date)).await.unwrap();
    f.bookings.create_booking(request(&kayak, date)).await.unwrap();

    let err = f.items.update_quantity("Kayak", 1).await.unwrap_err();
    assert!(matches!(err, RentError::Validation(_)));
    assert_eq!(
        f.items.update_quantity("Kayak", 3).await.unwrap().total_quantity,
        3
    );
    assert!(matches!(
        f.items.update_quantity("Kayak", 0).await,
        Err(RentError::Validation(_))
    ));
}

#[tokio::test]
async fn deactivated_item_cannot_be_booked() {
    let f = fixture().await;
    let kayak = item(&f, "Kayak", 2).await;
    f.items.deactivate_item("Kayak").await.unwrap();
    let err = f
        .bookings
        .create_booking(request(&kayak, day(2025, 6, 20)))
        .await
        .unwrap_err();
    assert!(matches!(err, RentError::NotFound { .. }));
}

#[tokio::test]
async fn user_flags_come_from_configuration() {
    let f = fixture().await;
    let clock: Arc<dyn Clock> = f.clock.clone();
    let users = UserService::new(f.store.clone(), clock, &[42], &[13]);
    let sender = |id| Sender {
        id,
        username: None,
        first_name: "Test".into(),
        last_name: String::new(),
        language_code: Some("ru".into()),
    };

    assert!(users.save_user(&sender(42)).await.unwrap().is_manager);
    let banned = users.save_user(&sender(13)).await.unwrap();
    assert!(banned.is_blacklisted && !banned.is_manager);

    assert_eq!(
        users.update_phone(42, "8 (999) 123-45-67").await.unwrap(),
        "79991234567"
    );
    assert!(users.update_phone(42, "123").await.is_err());
    assert_eq!(users.manager_ids(), vec![42]);
}

#[tokio::test]
async fn outbox_jobs_carry_the_snapshot() {
    let f = fixture().await;
    let kayak = item(&f, "Kayak", 1).await;
    let b = f
        .bookings
        .create_booking(request(&kayak, day(2025, 6, 5)))
        .await
        .unwrap();
    let tasks = f
        .store
        .lease_due_pending_tasks(SyncTaskKind::Upsert, 10, now(), Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(tasks[0].job().unwrap(), SyncJob::Upsert { booking: b });
}
