// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `rentbot migrate`: bring the database schema up to date and exit.

use rentbot_config::RentbotConfig;
use rentbot_core::{RentError, Store};
use rentbot_storage::SqliteStore;

pub async fn run_migrate(config: &RentbotConfig) -> Result<(), RentError> {
    let store = SqliteStore::new(config.storage.clone());
    store.initialize().await?;
    store.close().await?;
    println!(
        "rentbot: database at {} is up to date",
        config.storage.database_path
    );
    Ok(())
}
