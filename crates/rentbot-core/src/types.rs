// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store, services, and adapters.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role of an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Store,
    Sink,
    Observability,
}

// --- Items ---

/// A rentable resource with a finite per-day capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Units available per day. Always at least 1.
    pub total_quantity: i64,
    pub sort_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new catalogue entry. `sort_order` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub description: Option<String>,
    pub total_quantity: i64,
}

/// Partial update of an item. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub total_quantity: Option<i64>,
}

// --- Users ---

/// A chat participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Identifier issued by the messaging platform.
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    /// Advisory; membership is resolved from configuration.
    pub is_manager: bool,
    /// Advisory; membership is resolved from configuration.
    pub is_blacklisted: bool,
    pub language_code: Option<String>,
    pub last_activity: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Given and family name joined, falling back to the handle.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string();
        if !full.is_empty() {
            return full;
        }
        self.username
            .as_ref()
            .map(|u| format!("@{u}"))
            .unwrap_or_else(|| self.telegram_id.to_string())
    }
}

/// Profile data observed on an incoming update, used for upserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub language_code: Option<String>,
    pub is_manager: bool,
    pub is_blacklisted: bool,
}

// --- Bookings ---

/// Lifecycle status of a booking.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Changed,
    Rescheduled,
    Canceled,
    Completed,
}

impl BookingStatus {
    /// Statuses that occupy a unit of capacity.
    pub const ACTIVE: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Changed,
        BookingStatus::Rescheduled,
    ];

    /// Statuses that trigger a day-before reminder.
    pub const REMINDABLE: [BookingStatus; 2] = [BookingStatus::Confirmed, BookingStatus::Changed];

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Canceled | BookingStatus::Completed)
    }

    /// Whether the lifecycle permits moving from `self` to `to`.
    pub fn can_transition_to(self, to: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed)
                | (Pending, Canceled)
                | (Pending, Changed)
                | (Pending, Rescheduled)
                | (Confirmed, Completed)
                | (Confirmed, Pending)
                | (Confirmed, Changed)
                | (Confirmed, Rescheduled)
                | (Changed, Confirmed)
                | (Changed, Canceled)
        )
    }

    /// SQL `IN (...)` list of the active statuses.
    pub fn active_sql_list() -> String {
        Self::ACTIVE
            .iter()
            .map(|s| format!("'{s}'"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A reservation of one unit of an item for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    /// Platform identifier of the owning chat.
    pub user_id: i64,
    pub user_name: String,
    pub username: Option<String>,
    /// Normalised digits, e.g. `79991234567`.
    pub phone: String,
    pub item_id: i64,
    pub item_name: String,
    pub date: NaiveDate,
    pub status: BookingStatus,
    pub comment: Option<String>,
    /// Starts at 1 and increases on every mutation.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a booking about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub user_id: i64,
    pub user_name: String,
    pub username: Option<String>,
    pub phone: String,
    pub item_id: i64,
    pub item_name: String,
    pub date: NaiveDate,
    pub status: BookingStatus,
    pub comment: Option<String>,
}

/// A booking read together with the availability of another item on its date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingWithAvailability {
    pub booking: Booking,
    pub available: bool,
}

/// Bookings grouped per calendar day.
pub type DailyBookings = BTreeMap<NaiveDate, Vec<Booking>>;

/// Payload attached to booking domain events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingEvent {
    pub booking: Booking,
    /// Platform id of whoever triggered the change.
    pub actor_id: Option<i64>,
    /// Set on item changes.
    pub previous_item_id: Option<i64>,
}

// --- Outbox ---

/// Kind of synchronisation the mirror has to perform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncTaskKind {
    Upsert,
    UpdateStatus,
    SyncSchedule,
}

impl SyncTaskKind {
    pub const ALL: [SyncTaskKind; 3] = [
        SyncTaskKind::Upsert,
        SyncTaskKind::UpdateStatus,
        SyncTaskKind::SyncSchedule,
    ];
}

/// Processing state of an outbox row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncTaskStatus {
    Pending,
    /// Leased by a worker; reverts to pending if the lease expires.
    Processing,
    Retry,
    Completed,
    Failed,
}

/// The work described by an outbox row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncJob {
    Upsert { booking: Booking },
    UpdateStatus { booking_id: i64, status: BookingStatus },
    SyncSchedule { start: NaiveDate, end: NaiveDate },
}

/// Schedule window serialised into the payload column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SyncJob {
    pub fn kind(&self) -> SyncTaskKind {
        match self {
            SyncJob::Upsert { .. } => SyncTaskKind::Upsert,
            SyncJob::UpdateStatus { .. } => SyncTaskKind::UpdateStatus,
            SyncJob::SyncSchedule { .. } => SyncTaskKind::SyncSchedule,
        }
    }

    pub fn booking_id(&self) -> Option<i64> {
        match self {
            SyncJob::Upsert { booking } => Some(booking.id),
            SyncJob::UpdateStatus { booking_id, .. } => Some(*booking_id),
            SyncJob::SyncSchedule { .. } => None,
        }
    }

    /// Serialised payload and status columns for this job.
    pub fn columns(&self) -> Result<(Option<String>, Option<String>), serde_json::Error> {
        match self {
            SyncJob::Upsert { booking } => Ok((Some(serde_json::to_string(booking)?), None)),
            SyncJob::UpdateStatus { status, .. } => Ok((None, Some(status.to_string()))),
            SyncJob::SyncSchedule { start, end } => Ok((
                Some(serde_json::to_string(&ScheduleWindow {
                    start: *start,
                    end: *end,
                })?),
                None,
            )),
        }
    }
}

/// A persisted outbox row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTask {
    pub id: i64,
    pub kind: SyncTaskKind,
    pub booking_id: Option<i64>,
    /// Booking snapshot or schedule window as JSON.
    pub payload: Option<String>,
    pub status_value: Option<String>,
    pub status: SyncTaskStatus,
    pub retry_count: i64,
    pub last_error: Option<String>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl SyncTask {
    /// Decode the row back into the job it describes.
    pub fn job(&self) -> Result<SyncJob, String> {
        match self.kind {
            SyncTaskKind::Upsert => {
                let raw = self
                    .payload
                    .as_deref()
                    .ok_or_else(|| format!("task {} has no booking snapshot", self.id))?;
                let booking: Booking = serde_json::from_str(raw)
                    .map_err(|e| format!("task {} snapshot is corrupt: {e}", self.id))?;
                Ok(SyncJob::Upsert { booking })
            }
            SyncTaskKind::UpdateStatus => {
                let booking_id = self
                    .booking_id
                    .ok_or_else(|| format!("task {} has no booking id", self.id))?;
                let status = self
                    .status_value
                    .as_deref()
                    .ok_or_else(|| format!("task {} has no status", self.id))?
                    .parse::<BookingStatus>()
                    .map_err(|e| format!("task {} status is invalid: {e}", self.id))?;
                Ok(SyncJob::UpdateStatus { booking_id, status })
            }
            SyncTaskKind::SyncSchedule => {
                let raw = self
                    .payload
                    .as_deref()
                    .ok_or_else(|| format!("task {} has no schedule window", self.id))?;
                let window: ScheduleWindow = serde_json::from_str(raw)
                    .map_err(|e| format!("task {} window is corrupt: {e}", self.id))?;
                Ok(SyncJob::SyncSchedule {
                    start: window.start,
                    end: window.end,
                })
            }
        }
    }
}

// --- Conversation ---

/// Persisted conversational scratch for one user.
///
/// `data` is an open key/value map on disk; typed access goes through the
/// conversation crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    pub user_id: i64,
    pub step: String,
    pub data: BTreeMap<String, serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

/// Counts used by the manager statistics view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingStats {
    pub by_status: BTreeMap<BookingStatus, i64>,
    pub total_users: i64,
    pub active_users: i64,
    pub failed_sync_tasks: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_booking() -> Booking {
        let ts = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Booking {
            id: 7,
            user_id: 1001,
            user_name: "Ivan".into(),
            username: Some("ivan".into()),
            phone: "79991234567".into(),
            item_id: 1,
            item_name: "Kayak".into(),
            date: NaiveDate::from_ymd_opt(2026, 6, 5).unwrap(),
            status: BookingStatus::Pending,
            comment: None,
            version: 1,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn booking_status_string_forms() {
        assert_eq!(BookingStatus::Rescheduled.to_string(), "rescheduled");
        assert_eq!(
            BookingStatus::from_str("changed").unwrap(),
            BookingStatus::Changed
        );
        assert!(BookingStatus::from_str("unknown").is_err());
    }

    #[test]
    fn active_set_matches_capacity_rules() {
        assert!(BookingStatus::Pending.is_active());
        assert!(BookingStatus::Rescheduled.is_active());
        assert!(!BookingStatus::Canceled.is_active());
        assert!(!BookingStatus::Completed.is_active());
        assert_eq!(
            BookingStatus::active_sql_list(),
            "'pending', 'confirmed', 'changed', 'rescheduled'"
        );
    }

    #[test]
    fn transition_table() {
        use BookingStatus::*;
        let allowed = [
            (Pending, Confirmed),
            (Pending, Canceled),
            (Pending, Changed),
            (Pending, Rescheduled),
            (Confirmed, Completed),
            (Confirmed, Pending),
            (Confirmed, Changed),
            (Confirmed, Rescheduled),
            (Changed, Confirmed),
            (Changed, Canceled),
        ];
        let all = [Pending, Confirmed, Changed, Rescheduled, Canceled, Completed];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for to in BookingStatus::ACTIVE {
            assert!(!BookingStatus::Canceled.can_transition_to(to));
            assert!(!BookingStatus::Completed.can_transition_to(to));
        }
    }

    #[test]
    fn sync_job_columns_decode_back() {
        let booking = sample_booking();
        let job = SyncJob::Upsert {
            booking: booking.clone(),
        };
        let (payload, status) = job.columns().unwrap();
        let task = SyncTask {
            id: 1,
            kind: job.kind(),
            booking_id: job.booking_id(),
            payload,
            status_value: status,
            status: SyncTaskStatus::Pending,
            retry_count: 0,
            last_error: None,
            next_retry_at: None,
            created_at: booking.created_at,
            processed_at: None,
        };
        assert_eq!(task.job().unwrap(), job);
    }

    #[test]
    fn update_status_task_without_status_is_rejected() {
        let task = SyncTask {
            id: 3,
            kind: SyncTaskKind::UpdateStatus,
            booking_id: Some(9),
            payload: None,
            status_value: None,
            status: SyncTaskStatus::Pending,
            retry_count: 0,
            last_error: None,
            next_retry_at: None,
            created_at: Utc::now(),
            processed_at: None,
        };
        assert!(task.job().unwrap_err().contains("no status"));
    }

    #[test]
    fn display_name_falls_back_to_handle() {
        let now = Utc::now();
        let user = User {
            id: 1,
            telegram_id: 55,
            username: Some("skipper".into()),
            first_name: String::new(),
            last_name: String::new(),
            phone: None,
            is_manager: false,
            is_blacklisted: false,
            language_code: None,
            last_activity: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(user.display_name(), "@skipper");
    }
}
