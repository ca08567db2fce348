//! # Background Synchronization
//!
//! Wires the repository, reconciler, and background processor into a
//! running service:
//!
//! - `SyncCoordinator` - owns the event loop and the periodic schedules
//! - `BackgroundProcessor` - sends unsynced items, with retry and backoff
//! - `Reconciler` - merges the server snapshot into the repository
//!
//! The coordinator reacts to repository change events (capture, manual
//! retry, adoption) and also wakes on a timer so that items whose backoff
//! window just elapsed get picked up without a new mutation.

pub mod processor;
pub mod reconcile;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::client::RemoteClient;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::model::ProcessingStatus;
use crate::repository::{InspectionRepository, RepositoryEvent};

pub use processor::{backoff_delay, has_sendable_items, wants_send, BackgroundProcessor};
pub use reconcile::Reconciler;

/// Read-only aggregate of where sync currently stands, for display
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatus {
    /// Items waiting for a send
    pub pending: usize,
    /// Items currently marked processing
    pub processing: usize,
    /// Items acknowledged by the server
    pub completed: usize,
    /// Items parked until a manual retry
    pub failed: usize,
    /// Items claimed by an active sweep
    pub in_flight: usize,
    /// Whether a sweep is sending right now
    pub busy: bool,
    /// When the last successful reconcile pass finished
    pub last_reconcile: Option<DateTime<Utc>>,
}

/// Runs reconciliation and item processing in the background
pub struct SyncCoordinator {
    repo: Arc<InspectionRepository>,
    processor: Arc<BackgroundProcessor>,
    reconciler: Arc<Reconciler>,
    config: SyncConfig,
    is_running: Arc<AtomicBool>,
    last_reconcile: Arc<RwLock<Option<DateTime<Utc>>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncCoordinator {
    pub fn new(
        repo: Arc<InspectionRepository>,
        client: Arc<dyn RemoteClient>,
        config: SyncConfig,
    ) -> Self {
        let processor = Arc::new(BackgroundProcessor::new(
            Arc::clone(&repo),
            Arc::clone(&client),
            config.clone(),
        ));
        let reconciler = Arc::new(Reconciler::new(Arc::clone(&repo), client));

        Self {
            repo,
            processor,
            reconciler,
            config,
            is_running: Arc::new(AtomicBool::new(false)),
            last_reconcile: Arc::new(RwLock::new(None)),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the event loop and the interval loop. Call after the
    /// repository has loaded its durable snapshot; the first reconcile
    /// pass runs right away.
    pub async fn start(&self) {
        if self.is_running.swap(true, Ordering::SeqCst) {
            tracing::warn!("background sync already running");
            return;
        }
        tracing::info!("starting background sync");

        let mut handles = self.handles.lock().await;
        handles.push(self.spawn_event_loop());
        handles.push(self.spawn_interval_loop());
    }

    /// Abort the background tasks
    pub async fn stop(&self) {
        if !self.is_running.swap(false, Ordering::SeqCst) {
            return;
        }
        tracing::info!("stopping background sync");
        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// One reconcile pass, on demand
    pub async fn reconcile_now(&self) -> Result<(), SyncError> {
        self.reconciler.run().await?;
        *self.last_reconcile.write().await = Some(Utc::now());
        Ok(())
    }

    /// One processor sweep, on demand. Returns the number of items sent.
    pub async fn sweep_now(&self) -> usize {
        self.processor.tick().await
    }

    /// Manual retry: reset a failed item and sweep immediately
    pub async fn retry_item(&self, item_id: &str) -> Result<(), SyncError> {
        self.repo.retry_item(item_id).await?;
        self.processor.tick().await;
        Ok(())
    }

    /// Aggregate item counts across all inspections
    pub async fn status(&self) -> SyncStatus {
        let snapshot = self.repo.snapshot().await;
        let mut status = SyncStatus::default();
        for inspection in snapshot.values() {
            for item in inspection.items.values() {
                match item.processing_status {
                    ProcessingStatus::Pending => status.pending += 1,
                    ProcessingStatus::Processing => status.processing += 1,
                    ProcessingStatus::Completed => status.completed += 1,
                    ProcessingStatus::Failed => status.failed += 1,
                }
            }
        }
        status.in_flight = self.processor.in_flight_count().await;
        status.busy = status.in_flight > 0;
        status.last_reconcile = *self.last_reconcile.read().await;
        status
    }

    /// React to repository mutations: any event that can make an item
    /// eligible triggers a sweep, after the pure predicate agrees
    fn spawn_event_loop(&self) -> JoinHandle<()> {
        let repo = Arc::clone(&self.repo);
        let processor = Arc::clone(&self.processor);
        let is_running = Arc::clone(&self.is_running);
        let mut events = self.repo.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if !is_running.load(Ordering::SeqCst) {
                            break;
                        }
                        if !wakes_processor(&event) {
                            continue;
                        }
                        let Some(inspection) = repo.current_inspection().await else {
                            continue;
                        };
                        if has_sendable_items(&inspection, Utc::now()) {
                            processor.tick().await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("sync event loop lagged, {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("sync event loop exited");
        })
    }

    /// Periodic work: reconcile on its own cadence, and sweep often enough
    /// that elapsed backoff windows are picked up without a new event
    fn spawn_interval_loop(&self) -> JoinHandle<()> {
        let processor = Arc::clone(&self.processor);
        let reconciler = Arc::clone(&self.reconciler);
        let last_reconcile = Arc::clone(&self.last_reconcile);
        // interval() panics on a zero period.
        let sweep_every = self.config.backoff_base().max(Duration::from_millis(250));
        let reconcile_every = self.config.reconcile_interval().max(Duration::from_millis(250));

        tokio::spawn(async move {
            let mut sweep = tokio::time::interval(sweep_every);
            let mut reconcile = tokio::time::interval(reconcile_every);
            loop {
                tokio::select! {
                    _ = reconcile.tick() => {
                        match reconciler.run().await {
                            Ok(()) => {
                                *last_reconcile.write().await = Some(Utc::now());
                            }
                            Err(e) => {
                                tracing::warn!("reconcile pass abandoned: {}", e);
                            }
                        }
                    }
                    _ = sweep.tick() => {
                        processor.tick().await;
                    }
                }
            }
        })
    }
}

fn wakes_processor(event: &RepositoryEvent) -> bool {
    matches!(
        event,
        RepositoryEvent::ItemAdded { .. }
            | RepositoryEvent::ItemStatusChanged {
                status: ProcessingStatus::Pending,
                ..
            }
            | RepositoryEvent::InspectionAdopted { .. }
            | RepositoryEvent::CurrentInspectionChanged { .. }
            | RepositoryEvent::SnapshotReplaced
    )
}
