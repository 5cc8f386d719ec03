//! Periodic removal of expired tickets.

use std::time::Duration;

use tokio::{select, sync::watch, task::JoinHandle, time::sleep};
use tracing::{debug, info, warn};

use crate::{config::CleanerConfig, manager::CentralTicketService};

/// Background task calling [`CentralTicketService::clean_expired`] on an
/// interval.
///
/// The first sweep runs after the configured start delay. The task stops
/// when [`shutdown`](Self::shutdown) is called or the cleaner is dropped.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use casticket::{
///     CentralTicketService, SystemClock, TicketConfig, cleaner::RegistryCleaner,
///     registry::MemoryTicketRegistry,
/// };
///
/// #[tokio::main]
/// async fn main() {
///     let config = TicketConfig::default();
///     let tickets =
///         CentralTicketService::from_config(&config, Arc::new(MemoryTicketRegistry::new()), Arc::new(SystemClock));
///     let cleaner = RegistryCleaner::spawn(tickets, &config.cleaner);
///     // ... serve requests ...
///     cleaner.shutdown();
/// }
/// ```
#[derive(Debug)]
pub struct RegistryCleaner {
    shutdown_tx: watch::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl RegistryCleaner {
    /// Starts the cleaner. A disabled configuration starts nothing.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(service: CentralTicketService, config: &CleanerConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let handle = if config.enabled {
            let (interval, start_delay) = (config.interval, config.start_delay);
            info!(?interval, ?start_delay, "starting expired ticket cleaner");
            Some(tokio::spawn(run(service, interval, start_delay, shutdown_rx)))
        } else {
            debug!("expired ticket cleaner disabled");
            None
        };
        Self { shutdown_tx, handle }
    }

    /// `true` while the background task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Signals the background task to stop after its current sweep.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Signals the task to stop and waits for it to exit.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "expired ticket cleaner task failed");
            }
        }
    }
}

impl Drop for RegistryCleaner {
    fn drop(&mut self) {
        // The receiver is gone once the task has exited.
        let _ = self.shutdown_tx.send(());
    }
}

async fn run(
    service: CentralTicketService,
    interval: Duration,
    start_delay: Duration,
    mut shutdown_rx: watch::Receiver<()>,
) {
    select! {
        _ = sleep(start_delay) => {}
        _ = shutdown_rx.changed() => return,
    }

    loop {
        match service.clean_expired().await {
            Ok(0) => {},
            Ok(removed) => info!(removed, "removed expired tickets"),
            Err(err) => warn!(error = %err, "expired ticket sweep failed"),
        }

        select! {
            _ = sleep(interval) => {}
            _ = shutdown_rx.changed() => return,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::{
        authentication::Service,
        testutil::{TestHarness, make_authentication},
        ticket::TicketState,
    };

    fn config() -> CleanerConfig {
        CleanerConfig { enabled: true, interval: Duration::from_secs(120), start_delay: Duration::from_secs(20) }
    }

    #[tokio::test(start_paused = true)]
    async fn sweeps_after_start_delay() {
        let h = TestHarness::new();
        let tgt = h.service.create_ticket_granting_ticket(make_authentication("alice")).await.unwrap();
        h.service.create_service_ticket(tgt.id(), Service::new("https://app.example.org"), false).await.unwrap();
        h.clock.advance(Duration::from_secs(11));

        let cleaner = RegistryCleaner::spawn(h.service.clone(), &config());
        assert!(cleaner.is_running());

        sleep(Duration::from_secs(10)).await;
        assert_eq!(h.registry.len(), 2, "nothing happens before the start delay");

        sleep(Duration::from_secs(11)).await;
        assert_eq!(h.registry.len(), 1, "expired service ticket swept");

        cleaner.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn sweeps_repeat_on_interval() {
        let h = TestHarness::new();
        let cleaner = RegistryCleaner::spawn(h.service.clone(), &config());
        sleep(Duration::from_secs(21)).await;

        h.service.create_ticket_granting_ticket(make_authentication("alice")).await.unwrap();
        h.clock.advance(Duration::from_secs(9 * 60 * 60));
        assert_eq!(h.registry.len(), 1);

        sleep(Duration::from_secs(121)).await;
        assert!(h.registry.is_empty(), "second sweep removes the expired session");

        cleaner.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_task() {
        let h = TestHarness::new();
        let cleaner = RegistryCleaner::spawn(h.service.clone(), &config());
        cleaner.shutdown();
        sleep(Duration::from_millis(1)).await;
        assert!(!cleaner.is_running());
    }

    #[tokio::test]
    async fn disabled_cleaner_does_not_run() {
        let h = TestHarness::new();
        let disabled = CleanerConfig { enabled: false, ..config() };
        let cleaner = RegistryCleaner::spawn(h.service.clone(), &disabled);
        assert!(!cleaner.is_running());
        cleaner.stop().await;
    }
}
