// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CSV exports sent to managers as documents.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use rentbot_booking::helpers::{format_date, format_phone};
use rentbot_core::{Booking, RentError, User};

#[derive(Serialize)]
struct BookingExportRow<'a> {
    id: i64,
    date: String,
    item: &'a str,
    client: &'a str,
    username: &'a str,
    phone: String,
    status: String,
    comment: &'a str,
    created_at: String,
}

impl<'a> From<&'a Booking> for BookingExportRow<'a> {
    fn from(b: &'a Booking) -> Self {
        Self {
            id: b.id,
            date: format_date(b.date),
            item: &b.item_name,
            client: &b.user_name,
            username: b.username.as_deref().unwrap_or_default(),
            phone: format_phone(&b.phone),
            status: b.status.to_string(),
            comment: b.comment.as_deref().unwrap_or_default(),
            created_at: b.created_at.format("%d.%m.%Y %H:%M").to_string(),
        }
    }
}

#[derive(Serialize)]
struct UserExportRow<'a> {
    telegram_id: i64,
    name: String,
    username: &'a str,
    phone: String,
    is_manager: bool,
    last_activity: String,
    created_at: String,
}

impl<'a> From<&'a User> for UserExportRow<'a> {
    fn from(u: &'a User) -> Self {
        Self {
            telegram_id: u.telegram_id,
            name: u.display_name(),
            username: u.username.as_deref().unwrap_or_default(),
            phone: u.phone.as_deref().map(format_phone).unwrap_or_default(),
            is_manager: u.is_manager,
            last_activity: u
                .last_activity
                .map(|t| t.format("%d.%m.%Y %H:%M").to_string())
                .unwrap_or_default(),
            created_at: u.created_at.format("%d.%m.%Y %H:%M").to_string(),
        }
    }
}

const BOOKING_HEADERS: [&str; 9] = [
    "ID", "Date", "Item", "Client", "Username", "Phone", "Status", "Comment", "Created",
];

const USER_HEADERS: [&str; 7] = [
    "Telegram ID",
    "Name",
    "Username",
    "Phone",
    "Manager",
    "Last activity",
    "First seen",
];

/// Writes timestamped CSV files into the exports directory.
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Exports every booking; returns the written file.
    pub async fn export_bookings(
        &self,
        bookings: &[Booking],
        now: DateTime<Utc>,
    ) -> Result<PathBuf, RentError> {
        let contents = to_csv(&BOOKING_HEADERS, bookings.iter().map(BookingExportRow::from))?;
        self.write(self.file_name("bookings", now), contents, bookings.len())
            .await
    }

    pub async fn export_users(
        &self,
        users: &[User],
        now: DateTime<Utc>,
    ) -> Result<PathBuf, RentError> {
        let contents = to_csv(&USER_HEADERS, users.iter().map(UserExportRow::from))?;
        self.write(self.file_name("users", now), contents, users.len())
            .await
    }

    fn file_name(&self, kind: &str, now: DateTime<Utc>) -> PathBuf {
        self.dir
            .join(format!("{kind}_{}.csv", now.format("%Y%m%d_%H%M%S")))
    }

    async fn write(
        &self,
        path: PathBuf,
        contents: Vec<u8>,
        rows: usize,
    ) -> Result<PathBuf, RentError> {
        let dir = self.dir.clone();
        let written = tokio::task::spawn_blocking(move || -> Result<PathBuf, RentError> {
            std::fs::create_dir_all(&dir).map_err(|e| export_error("create exports dir", e))?;
            std::fs::write(&path, contents).map_err(|e| export_error("write export", e))?;
            Ok(path)
        })
        .await
        .map_err(|e| RentError::Internal(format!("export task failed: {e}")))??;
        info!(path = %written.display(), rows, "export written");
        Ok(written)
    }
}

fn to_csv<T: Serialize>(
    headers: &[&str],
    rows: impl Iterator<Item = T>,
) -> Result<Vec<u8>, RentError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(headers)
        .map_err(|e| export_error("write header", e))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| export_error("serialise row", e))?;
    }
    writer
        .into_inner()
        .map_err(|e| RentError::Internal(format!("export buffer: {e}")))
}

fn export_error(context: &str, e: impl std::error::Error + Send + Sync + 'static) -> RentError {
    RentError::Internal(format!("{context}: {e}"))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};
    use rentbot_core::BookingStatus;

    use super::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()
    }

    fn booking(id: i64) -> Booking {
        Booking {
            id,
            user_id: 1,
            user_name: "Ivan, Jr.".into(),
            username: Some("ivan".into()),
            phone: "79991234567".into(),
            item_id: 1,
            item_name: "Kayak".into(),
            date: NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
            status: BookingStatus::Confirmed,
            comment: None,
            version: 2,
            created_at: at(),
            updated_at: at(),
        }
    }

    #[tokio::test]
    async fn bookings_export_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path().join("exports"));
        let path = exporter
            .export_bookings(&[booking(1), booking(2)], at())
            .await
            .unwrap();
        assert!(path.ends_with("bookings_20250601_093000.csv"));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "ID");
        assert_eq!(&headers[5], "Phone");
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][3], "Ivan, Jr.");
        assert_eq!(&rows[0][5], "+7 (999) 123-45-67");
        assert_eq!(&rows[1][6], "confirmed");
    }

    #[tokio::test]
    async fn empty_users_export_is_just_a_header() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = CsvExporter::new(dir.path());
        let path = exporter.export_users(&[], at()).await.unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.starts_with("Telegram ID,Name"));
    }
}
