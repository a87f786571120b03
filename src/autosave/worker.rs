//! Per-session autosave loop.
//!
//! Phases: `Idle` until the first edit, `Armed` while the debounce runs,
//! `Scheduled` between interval ticks. Saves run on their own task and report
//! back over a channel so the loop never blocks on the store. A save task that
//! panics still reports back, as a failure.

use anyhow::anyhow;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

use super::{AutosaveConfig, AutosaveEvent, EditorState, SavedSnapshot, SessionShared};
use crate::order_calculator::create_order;
use crate::storage::CatalogStore;

const MIN_TICK: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Armed(Instant),
    Scheduled(Instant),
}

impl Phase {
    fn deadline(self) -> Option<Instant> {
        match self {
            Phase::Idle => None,
            Phase::Armed(at) | Phase::Scheduled(at) => Some(at),
        }
    }
}

struct SaveOutcome {
    hash: String,
    result: anyhow::Result<String>,
}

pub(super) struct SessionWorker {
    store: Arc<dyn CatalogStore>,
    config: AutosaveConfig,
    shared: Arc<SessionShared>,
    state_rx: watch::Receiver<Option<EditorState>>,
    events_tx: mpsc::UnboundedSender<AutosaveEvent>,
    order_id: Option<String>,
    last_hash: Option<String>,
    failures: u32,
}

impl SessionWorker {
    pub(super) fn new(
        store: Arc<dyn CatalogStore>,
        config: AutosaveConfig,
        shared: Arc<SessionShared>,
        state_rx: watch::Receiver<Option<EditorState>>,
        events_tx: mpsc::UnboundedSender<AutosaveEvent>,
    ) -> Self {
        Self {
            store,
            config,
            shared,
            state_rx,
            events_tx,
            order_id: None,
            last_hash: None,
            failures: 0,
        }
    }

    pub(super) async fn run(mut self) {
        if !self.config.enabled {
            info!("Autosave disabled, session will not save");
            return;
        }

        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<SaveOutcome>();
        let mut phase = Phase::Idle;

        loop {
            let deadline = phase.deadline();

            tokio::select! {
                changed = self.state_rx.changed() => {
                    if changed.is_err() {
                        debug!("Editor closed, stopping autosave loop");
                        break;
                    }
                    self.failures = 0;
                    phase = Phase::Armed(Instant::now() + self.config.debounce());
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Phase::Scheduled(_) = phase {
                        self.tick(&done_tx);
                    }
                    phase = Phase::Scheduled(Instant::now() + self.interval());
                }
                Some(outcome) = done_rx.recv() => {
                    phase = self.finish(outcome, phase);
                }
            }

            if !self.is_alive() {
                debug!("Session disposed, stopping autosave loop");
                break;
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    fn interval(&self) -> Duration {
        self.config.interval().max(MIN_TICK)
    }

    fn tick(&mut self, done_tx: &mpsc::UnboundedSender<SaveOutcome>) {
        if !self.is_alive() {
            return;
        }
        if self.shared.saving.load(Ordering::SeqCst) {
            debug!("Previous save still running, skipping tick");
            return;
        }

        let Some(state) = self.state_rx.borrow().clone() else {
            return;
        };
        if !state.has_content() {
            debug!("Nothing to save yet");
            return;
        }

        let hash = state.content_hash();
        if self.last_hash.as_deref() == Some(hash.as_str()) {
            debug!("No changes since last save");
            return;
        }

        let existing_id = self.order_id.clone().or_else(|| state.order_id.clone());
        debug!("Autosaving order {existing_id:?} ({hash})");
        self.shared.saving.store(true, Ordering::SeqCst);

        let store = Arc::clone(&self.store);
        let done_tx = done_tx.clone();
        tokio::spawn(async move {
            let task = tokio::spawn(async move {
                save(store.as_ref(), &state, existing_id.as_deref()).await
            });
            let result = task
                .await
                .unwrap_or_else(|e| Err(anyhow!("Autosave task ended abnormally: {e}")));
            // receiver is gone once the session is disposed
            let _ = done_tx.send(SaveOutcome { hash, result });
        });
    }

    fn finish(&mut self, outcome: SaveOutcome, phase: Phase) -> Phase {
        if !self.is_alive() {
            debug!("Discarding save result of a disposed session");
            return phase;
        }
        self.shared.saving.store(false, Ordering::SeqCst);

        match outcome.result {
            Ok(order_id) => {
                let saved_at = Utc::now();
                info!("Autosaved order {order_id}");
                self.failures = 0;
                self.order_id = Some(order_id.clone());
                self.last_hash = Some(outcome.hash.clone());
                if let Ok(mut last) = self.shared.last_saved.lock() {
                    *last = Some(SavedSnapshot {
                        order_id: order_id.clone(),
                        hash: outcome.hash,
                        saved_at,
                    });
                }
                self.emit(AutosaveEvent::Saved { order_id, saved_at });
                phase
            }
            Err(err) => {
                self.failures += 1;
                error!("Autosave failed ({} in a row): {err:#}", self.failures);
                self.emit(AutosaveEvent::Failed {
                    message: format!("{err:#}"),
                });

                if self.config.retry.exhausted(self.failures) {
                    warn!(
                        "Autosave paused after {} failures until the next edit",
                        self.failures
                    );
                    Phase::Idle
                } else if let Phase::Scheduled(_) = phase {
                    Phase::Scheduled(Instant::now() + self.config.retry_delay(self.failures))
                } else {
                    phase
                }
            }
        }
    }

    fn emit(&self, event: AutosaveEvent) {
        if self.events_tx.send(event).is_err() {
            debug!("No listener for autosave events");
        }
    }
}

async fn save(
    store: &dyn CatalogStore,
    state: &EditorState,
    existing_id: Option<&str>,
) -> anyhow::Result<String> {
    let mut order = create_order(&state.provider_id, &state.selection, &state.products)?;
    order.id = existing_id.map(str::to_string);
    store.save_order(&order, existing_id).await
}
