//! Background autosave for orders being edited.
//!
//! Each editing session gets its own tokio task. Changes to the editor state
//! restart a short debounce; once it elapses the session saves on a fixed
//! interval, but only when the content actually changed since the last save
//! and no other save is still running.
//!
//! # Module Structure
//!
//! - [`policy`] - Timing and retry configuration
//! - [`worker`] - The per-session state machine
//!
//! Dropping or disposing the session stops its timers at once. A save that
//! is already running is left to finish, but its result is thrown away: no
//! status change and no notification reach a disposed session.

pub mod policy;
mod worker;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::models::Product;
use crate::order_calculator::Selection;
use crate::storage::CatalogStore;

pub use policy::{AutosaveConfig, RetryPolicy};

/// Everything the editor holds that affects the saved order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorState {
    /// Set when an already stored order is being edited
    pub order_id: Option<String>,
    pub provider_id: String,
    pub selection: Selection,
    pub products: Vec<Product>,
}

impl EditorState {
    pub fn content_hash(&self) -> String {
        content_hash(&self.provider_id, &self.selection)
    }

    fn has_content(&self) -> bool {
        !self.provider_id.trim().is_empty() && !self.selection.is_empty()
    }
}

/// Transient notifications for the editing UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AutosaveEvent {
    Saved {
        order_id: String,
        saved_at: DateTime<Utc>,
    },
    Failed {
        message: String,
    },
}

/// Last successful autosave of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSnapshot {
    pub order_id: String,
    pub hash: String,
    pub saved_at: DateTime<Utc>,
}

/// Change-detection key: provider id followed by `id:quantity` pairs sorted
/// by product id.
pub fn content_hash(provider_id: &str, selection: &Selection) -> String {
    let mut pairs: Vec<(&String, &f64)> = selection.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    let body = pairs
        .iter()
        .map(|(id, quantity)| format!("{id}:{quantity}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("{provider_id}|{body}")
}

#[derive(Debug, Default)]
pub(crate) struct SessionShared {
    alive: AtomicBool,
    saving: AtomicBool,
    last_saved: Mutex<Option<SavedSnapshot>>,
}

/// Read-only view of a session, usable after the session is gone
#[derive(Debug, Clone)]
pub struct AutosaveStatus {
    shared: Arc<SessionShared>,
}

impl AutosaveStatus {
    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    /// `true` while a save is running; always `false` once disposed
    pub fn is_saving(&self) -> bool {
        self.shared.saving.load(Ordering::SeqCst)
    }

    pub fn last_saved(&self) -> Option<SavedSnapshot> {
        self.shared
            .last_saved
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(None)
    }
}

/// Starts autosave sessions against a store.
pub struct AutosaveCoordinator;

impl AutosaveCoordinator {
    /// Spawns the background task for one editing session.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<dyn CatalogStore>, config: AutosaveConfig) -> AutosaveSession {
        debug!("Starting autosave session with {config:?}");
        let shared = Arc::new(SessionShared {
            alive: AtomicBool::new(true),
            ..Default::default()
        });
        let (state_tx, state_rx) = watch::channel(None);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let worker =
            worker::SessionWorker::new(store, config, Arc::clone(&shared), state_rx, events_tx);
        let task = tokio::spawn(worker.run());
        info!("Autosave session started");

        AutosaveSession {
            state_tx,
            events_rx,
            shared,
            task,
        }
    }
}

/// Handle owned by the editor for as long as it is open
pub struct AutosaveSession {
    state_tx: watch::Sender<Option<EditorState>>,
    events_rx: mpsc::UnboundedReceiver<AutosaveEvent>,
    shared: Arc<SessionShared>,
    task: JoinHandle<()>,
}

impl AutosaveSession {
    /// Reports a change to provider, selection or product list.
    pub fn update(&self, state: EditorState) {
        debug!("Editor state changed: {}", state.content_hash());
        self.state_tx.send_replace(Some(state));
    }

    /// Waits for the next notification.
    pub async fn next_event(&mut self) -> Option<AutosaveEvent> {
        self.events_rx.recv().await
    }

    /// Returns a pending notification without waiting.
    pub fn try_next_event(&mut self) -> Option<AutosaveEvent> {
        self.events_rx.try_recv().ok()
    }

    pub fn status(&self) -> AutosaveStatus {
        AutosaveStatus {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Ends the session; same as dropping it.
    pub fn dispose(self) {}
}

impl Drop for AutosaveSession {
    fn drop(&mut self) {
        self.shared.alive.store(false, Ordering::SeqCst);
        self.shared.saving.store(false, Ordering::SeqCst);
        self.task.abort();
        info!("Autosave session disposed");
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
