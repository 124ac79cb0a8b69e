// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CSV files standing in for the spreadsheet mirror.
//!
//! Three sheets live in the mirror directory: `bookings.csv` (one row per
//! booking id), `users.csv`, and `schedule.csv` (day x item occupancy).
//! Every write replaces the file through a temporary sibling and a rename,
//! so readers never see a half-written sheet.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use rentbot_core::types::{AdapterType, DailyBookings, HealthStatus};
use rentbot_core::{Booking, BookingStatus, Item, MirrorSink, PluginAdapter, RentError, User};

pub const BOOKINGS_FILE: &str = "bookings.csv";
pub const USERS_FILE: &str = "users.csv";
pub const SCHEDULE_FILE: &str = "schedule.csv";

/// One line of `bookings.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRow {
    pub id: i64,
    pub date: String,
    pub item: String,
    pub user_name: String,
    pub username: String,
    pub phone: String,
    pub status: String,
    pub comment: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Booking> for BookingRow {
    fn from(b: &Booking) -> Self {
        Self {
            id: b.id,
            date: b.date.format("%Y-%m-%d").to_string(),
            item: b.item_name.clone(),
            user_name: b.user_name.clone(),
            username: b.username.clone().unwrap_or_default(),
            phone: b.phone.clone(),
            status: b.status.to_string(),
            comment: b.comment.clone().unwrap_or_default(),
            version: b.version,
            created_at: b.created_at.to_rfc3339(),
            updated_at: b.updated_at.to_rfc3339(),
        }
    }
}

/// One line of `users.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub telegram_id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub is_manager: bool,
    pub is_blacklisted: bool,
    pub last_activity: String,
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            telegram_id: u.telegram_id,
            username: u.username.clone().unwrap_or_default(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            phone: u.phone.clone().unwrap_or_default(),
            is_manager: u.is_manager,
            is_blacklisted: u.is_blacklisted,
            last_activity: u
                .last_activity
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
        }
    }
}

/// Idempotent mirror writing CSV sheets into a directory.
pub struct CsvMirror {
    dir: PathBuf,
    // Serialises read-modify-write cycles on the bookings sheet.
    write_lock: Mutex<()>,
}

impl CsvMirror {
    /// Creates the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, RentError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| sink_error("create mirror dir", e))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Current contents of the bookings sheet.
    pub async fn booking_rows(&self) -> Result<Vec<BookingRow>, RentError> {
        let path = self.dir.join(BOOKINGS_FILE);
        blocking(move || read_rows(&path)).await
    }

    pub async fn user_rows(&self) -> Result<Vec<UserRow>, RentError> {
        let path = self.dir.join(USERS_FILE);
        blocking(move || read_rows(&path)).await
    }

    /// Raw schedule grid, header first.
    pub async fn schedule_grid(&self) -> Result<Vec<Vec<String>>, RentError> {
        let path = self.dir.join(SCHEDULE_FILE);
        blocking(move || {
            if !path.exists() {
                return Ok(Vec::new());
            }
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .from_path(&path)
                .map_err(|e| sink_error("open schedule", e))?;
            reader
                .records()
                .map(|r| {
                    r.map(|rec| rec.iter().map(str::to_string).collect())
                        .map_err(|e| sink_error("read schedule", e))
                })
                .collect()
        })
        .await
    }

    async fn modify_bookings<F>(&self, change: F) -> Result<(), RentError>
    where
        F: FnOnce(&mut Vec<BookingRow>) -> Result<(), RentError> + Send + 'static,
    {
        let _guard = self.write_lock.lock().await;
        let path = self.dir.join(BOOKINGS_FILE);
        blocking(move || {
            let mut rows: Vec<BookingRow> = read_rows(&path)?;
            change(&mut rows)?;
            rows.sort_by_key(|r| r.id);
            write_rows(&path, &rows)
        })
        .await
    }
}

#[async_trait]
impl PluginAdapter for CsvMirror {
    fn name(&self) -> &str {
        "csv-mirror"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sink
    }

    async fn health_check(&self) -> Result<HealthStatus, RentError> {
        if self.dir.is_dir() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy(format!(
                "mirror directory {} is missing",
                self.dir.display()
            )))
        }
    }

    async fn shutdown(&self) -> Result<(), RentError> {
        Ok(())
    }
}

#[async_trait]
impl MirrorSink for CsvMirror {
    async fn upsert_booking(&self, booking: &Booking) -> Result<(), RentError> {
        let row = BookingRow::from(booking);
        debug!(booking_id = row.id, "csv mirror: upsert booking");
        self.modify_bookings(move |rows| {
            match rows.iter_mut().find(|r| r.id == row.id) {
                Some(existing) => *existing = row,
                None => rows.push(row),
            }
            Ok(())
        })
        .await
    }

    async fn update_booking_status(
        &self,
        booking_id: i64,
        status: BookingStatus,
    ) -> Result<(), RentError> {
        debug!(booking_id, status = %status, "csv mirror: update status");
        self.modify_bookings(move |rows| {
            let row = rows
                .iter_mut()
                .find(|r| r.id == booking_id)
                .ok_or_else(|| {
                    RentError::remote_sink(format!("booking {booking_id} is not in the mirror"))
                })?;
            row.status = status.to_string();
            Ok(())
        })
        .await
    }

    async fn replace_bookings(&self, bookings: &[Booking]) -> Result<(), RentError> {
        let rows: Vec<BookingRow> = bookings.iter().map(BookingRow::from).collect();
        self.modify_bookings(move |current| {
            *current = rows;
            Ok(())
        })
        .await
    }

    async fn update_users(&self, users: &[User]) -> Result<(), RentError> {
        let rows: Vec<UserRow> = users.iter().map(UserRow::from).collect();
        let path = self.dir.join(USERS_FILE);
        blocking(move || write_rows(&path, &rows)).await
    }

    async fn update_schedule(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        daily: &DailyBookings,
        items: &[Item],
    ) -> Result<(), RentError> {
        let grid = schedule_grid(start, end, daily, items);
        let path = self.dir.join(SCHEDULE_FILE);
        blocking(move || {
            write_atomic(&path, |file| {
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(file);
                for line in &grid {
                    writer
                        .write_record(line)
                        .map_err(|e| sink_error("write schedule", e))?;
                }
                writer.flush().map_err(|e| sink_error("flush schedule", e))
            })
        })
        .await
    }
}

/// Header row `date, <item names...>`, then one row per day with
/// `booked/capacity` per item, counting ACTIVE bookings only.
pub fn schedule_grid(
    start: NaiveDate,
    end: NaiveDate,
    daily: &DailyBookings,
    items: &[Item],
) -> Vec<Vec<String>> {
    let mut grid = Vec::new();
    let mut header = vec!["date".to_string()];
    header.extend(items.iter().map(|i| i.name.clone()));
    grid.push(header);

    let mut day = start;
    while day <= end {
        let bookings = daily.get(&day).map(Vec::as_slice).unwrap_or_default();
        let mut line = vec![day.format("%Y-%m-%d").to_string()];
        for item in items {
            let booked = bookings
                .iter()
                .filter(|b| b.item_id == item.id && b.status.is_active())
                .count();
            line.push(format!("{booked}/{}", item.total_quantity));
        }
        grid.push(line);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    grid
}

async fn blocking<T, F>(f: F) -> Result<T, RentError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, RentError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RentError::Internal(format!("mirror write task failed: {e}")))?
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, RentError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| sink_error("open sheet", e))?;
    reader
        .deserialize()
        .map(|r| r.map_err(|e| sink_error("read sheet", e)))
        .collect()
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), RentError> {
    write_atomic(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| sink_error("write sheet", e))?;
        }
        writer.flush().map_err(|e| sink_error("flush sheet", e))
    })
}

fn write_atomic<F>(path: &Path, write: F) -> Result<(), RentError>
where
    F: FnOnce(&mut fs::File) -> Result<(), RentError>,
{
    let tmp = path.with_extension("csv.tmp");
    let mut file = fs::File::create(&tmp).map_err(|e| sink_error("create temp sheet", e))?;
    write(&mut file)?;
    file.sync_all().map_err(|e| sink_error("sync temp sheet", e))?;
    fs::rename(&tmp, path).map_err(|e| sink_error("replace sheet", e))
}

fn sink_error(context: &str, e: impl std::error::Error + Send + Sync + 'static) -> RentError {
    RentError::RemoteSink {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}
