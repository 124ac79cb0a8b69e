// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `rentbot serve` command implementation.
//!
//! Wires storage, the chat channel, the booking services and the
//! background loops together, then runs the update loop until a shutdown
//! signal arrives or the channel closes.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use rentbot_booking::{BookingRules, BookingService, ItemService, UserService};
use rentbot_bot::{
    CsvExporter, GaugeRefresher, MetricsObserver, NotificationHandler, Orchestrator,
    OrchestratorSettings, ReminderScheduler, UpdateRunner,
};
use rentbot_bus::EventBus;
use rentbot_config::RentbotConfig;
use rentbot_conversation::ConversationManager;
use rentbot_core::{ChatChannel, Clock, PluginAdapter, RentError, Store, SystemClock};
use rentbot_prometheus::PrometheusAdapter;
use rentbot_storage::SqliteStore;
use rentbot_sync::{SyncWorker, WorkerSettings};
use rentbot_telegram::TelegramChannel;

use crate::shutdown;

/// How long background loops get to stop after the update loop exits.
const BACKGROUND_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the bot until interrupted.
pub async fn run_serve(config: RentbotConfig) -> Result<(), RentError> {
    init_tracing(&config.bot.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        managers = config.managers.len(),
        "starting rentbot"
    );

    // Kept alive for the lifetime of the process; the recorder is global.
    let _prometheus = if config.prometheus.enabled {
        match PrometheusAdapter::new() {
            Ok(adapter) => Some(adapter),
            Err(e) => {
                warn!(error = %e, "metrics disabled");
                None
            }
        }
    } else {
        None
    };

    let sqlite = SqliteStore::new(config.storage.clone());
    sqlite.initialize().await?;
    let store: Arc<dyn Store> = Arc::new(sqlite);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let rules = BookingRules::from_config(&config)?;

    let mut telegram = TelegramChannel::new(&config.telegram, config.bot.update_queue_size)?;
    telegram.connect().await?;
    let channel: Arc<dyn ChatChannel> = Arc::new(telegram);

    let bus = Arc::new(EventBus::new());
    bus.subscribe_all(Arc::new(NotificationHandler::new(
        channel.clone(),
        config.managers.clone(),
    )))
    .await;
    bus.subscribe_all(Arc::new(MetricsObserver)).await;

    let bookings = Arc::new(BookingService::new(
        store.clone(),
        bus.clone(),
        clock.clone(),
        rules.clone(),
    ));
    let users = Arc::new(UserService::new(
        store.clone(),
        clock.clone(),
        &config.managers,
        &config.blacklist,
    ));
    let items = Arc::new(ItemService::new(store.clone(), clock.clone(), rules.clone()));
    let conversations = Arc::new(ConversationManager::from_config(
        store.clone(),
        clock.clone(),
        &config.bot,
    ));

    let orchestrator = Arc::new(Orchestrator::new(
        channel.clone(),
        bookings.clone(),
        users,
        items,
        conversations,
        CsvExporter::new(&config.exports.path),
        clock.clone(),
        OrchestratorSettings::from_config(&config),
    ));

    let cancel = shutdown::install_signal_handler();
    let mut background = Vec::new();

    if config.sync.enabled {
        let sink = rentbot_sync::sink_from_config(&config.sync)?;
        let worker = Arc::new(SyncWorker::new(
            store.clone(),
            sink,
            clock.clone(),
            rules,
            WorkerSettings::from_config(&config.sync),
        ));
        background.extend(worker.start(cancel.clone()).await?);
        let resync = worker.clone();
        background.push(tokio::spawn(async move {
            if let Err(e) = resync.full_resync().await {
                warn!(error = %e, "initial mirror resync failed");
            }
        }));
    } else {
        info!("mirror sync disabled");
    }

    let reminders =
        ReminderScheduler::from_config(bookings.clone(), channel.clone(), clock, &config.bot)?;
    let reminder_cancel = cancel.clone();
    background.push(tokio::spawn(async move {
        reminders.run(reminder_cancel).await;
    }));

    let gauges = GaugeRefresher::new(bookings);
    let gauge_cancel = cancel.clone();
    background.push(tokio::spawn(async move {
        gauges.run(gauge_cancel).await;
    }));

    let monitor_cancel = cancel.clone();
    background.push(tokio::spawn(async move {
        memory_monitor(monitor_cancel).await;
    }));

    let runner = UpdateRunner::new(channel.clone(), orchestrator, config.bot.update_timeout());
    runner.run(cancel.clone()).await;

    // The runner also stops when the channel closes; make sure the rest follows.
    cancel.cancel();
    shutdown::join_background(background, BACKGROUND_STOP_TIMEOUT).await;

    if let Err(e) = channel.shutdown().await {
        warn!(error = %e, "chat channel shutdown failed");
    }
    store.close().await?;

    info!("rentbot stopped");
    Ok(())
}

/// Publishes allocator statistics as gauges.
#[cfg(not(target_env = "msvc"))]
async fn memory_monitor(cancel: CancellationToken) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Stats are cached until the epoch advances.
                let _ = tikv_jemalloc_ctl::epoch::advance();
                let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
                let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
                rentbot_prometheus::set_memory_heap(allocated as f64);
                rentbot_prometheus::set_memory_resident(resident as f64);
            }
            _ = cancel.cancelled() => {
                break;
            }
        }
    }
}

#[cfg(target_env = "msvc")]
async fn memory_monitor(cancel: CancellationToken) {
    cancel.cancelled().await;
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rentbot={log_level},warn")));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
