//! Spot view-model.
//!
//! Owns the observable [`SpotState`] and is its only writer: the `watch` sender never
//! leaves this module, presentation code only gets receivers and snapshots.
//!
//! Every intent runs as its own Tokio task and is never coalesced with others. Writes
//! never patch `spots` locally; a successful create or update triggers a full reload.
//! Fetches carry a monotonic ticket so a slow, older response cannot overwrite the
//! result of a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::{SpotState, StudySpot};
use crate::repository::SpotRepository;

/// Observable state holder for the spot list screen.
#[derive(Clone)]
pub struct SpotViewModel {
    inner: Arc<Inner>,
}

struct Inner {
    repo: SpotRepository,
    state: watch::Sender<SpotState>,
    fetch_tickets: AtomicU64,
}

/// Marks one operation as running for as long as it is alive.
struct InFlight {
    inner: Arc<Inner>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.inner.state.send_modify(|state| {
            state.in_flight = state.in_flight.saturating_sub(1);
            state.is_loading = state.in_flight > 0;
        });
    }
}

impl SpotViewModel {
    /// Create the view-model and start the initial fetch.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(repo: SpotRepository) -> Self {
        let (state, _) = watch::channel(SpotState::default());
        let view_model = Self {
            inner: Arc::new(Inner {
                repo,
                state,
                fetch_tickets: AtomicU64::new(0),
            }),
        };

        tracing::debug!("Fetching spots on start-up");
        view_model.fetch_spots();
        view_model
    }

    pub fn subscribe(&self) -> watch::Receiver<SpotState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> SpotState {
        self.inner.state.borrow().clone()
    }

    /// Wait until no operation is in flight and return the state at that point.
    pub async fn settled(&self) -> SpotState {
        let mut receiver = self.subscribe();
        let state = match receiver.wait_for(|state| !state.is_loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        };
        state
    }

    /// Reload the spot list from the store.
    pub fn fetch_spots(&self) -> JoinHandle<()> {
        let (guard, ticket) = self.inner.begin_fetch();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.fetch(ticket).await;
            drop(guard);
        })
    }

    /// Create a spot with status Empty, then reload on success.
    pub fn create_spot(&self, name: impl Into<String>) -> JoinHandle<()> {
        let name = name.into();
        let guard = self.inner.begin_write();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            match inner.repo.try_create_spot(&name).await {
                Ok(_) => {
                    tracing::debug!("Created study spot {}, reloading", name);
                    inner.refresh().await;
                }
                Err(e) => {
                    tracing::error!("Failed to create study spot {}: {}", name, e);
                    inner.set_error(format!("Failed to create new study spot: {}", e.message()));
                }
            }
            drop(guard);
        })
    }

    /// Set the status of spot `id`, then reload on success.
    pub fn update_status(&self, id: impl Into<String>, status: impl Into<String>) -> JoinHandle<()> {
        let id = id.into();
        let status = status.into();
        let guard = self.inner.begin_write();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            match inner.repo.try_update_status(&id, &status).await {
                Ok(()) => {
                    tracing::debug!("Updated study spot {}, reloading", id);
                    inner.refresh().await;
                }
                Err(e) => {
                    tracing::error!("Failed to update spot status: {} to {}: {}", id, status, e);
                    inner.set_error(format!("Failed to update spot status: {}", e.message()));
                }
            }
            drop(guard);
        })
    }

    /// Dismiss the current error. Leaves `spots` and `is_loading` untouched.
    pub fn clear_error(&self) {
        self.inner.state.send_if_modified(|state| state.error_message.take().is_some());
    }
}

impl Inner {
    fn begin_write(self: &Arc<Self>) -> InFlight {
        self.state.send_modify(|state| {
            state.in_flight += 1;
            state.is_loading = true;
        });
        InFlight {
            inner: self.clone(),
        }
    }

    fn begin_fetch(self: &Arc<Self>) -> (InFlight, u64) {
        let ticket = self.fetch_tickets.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            state.in_flight += 1;
            state.is_loading = true;
            state.error_message = None;
        });
        (
            InFlight {
                inner: self.clone(),
            },
            ticket,
        )
    }

    async fn refresh(self: &Arc<Self>) {
        let (guard, ticket) = self.begin_fetch();
        self.fetch(ticket).await;
        drop(guard);
    }

    async fn fetch(&self, ticket: u64) {
        if !self.repo.ensure_identity().await {
            tracing::warn!("Anonymous sign-in failed, fetching without identity");
        }

        match self.repo.try_list_spots().await {
            Ok(spots) => {
                if spots.is_empty() {
                    tracing::warn!("Received empty list of study spots");
                }
                self.apply_spots(ticket, spots);
            }
            Err(e) => {
                tracing::error!("Failed to load study spots: {}", e);
                let message = format!("Failed to load study spots: {}", e.message());
                let latest = self.fetch_tickets.load(Ordering::SeqCst);
                let reported = self.state.send_if_modified(|state| {
                    // A newer fetch has started or landed; its outcome owns the error slot
                    if ticket < latest || ticket < state.applied_fetch {
                        return false;
                    }
                    state.error_message = Some(message);
                    state.error_fetch = ticket;
                    true
                });
                if !reported {
                    tracing::debug!("Discarded failure of stale fetch #{}", ticket);
                }
            }
        }
    }

    fn apply_spots(&self, ticket: u64, spots: Vec<StudySpot>) {
        let count = spots.len();
        let applied = self.state.send_if_modified(|state| {
            if ticket < state.applied_fetch {
                return false;
            }
            state.spots = spots;
            state.applied_fetch = ticket;
            if state.error_message.is_some() && state.error_fetch < ticket {
                state.error_message = None;
            }
            true
        });

        if applied {
            tracing::debug!("Applied fetch #{} with {} study spots", ticket, count);
        } else {
            tracing::debug!("Discarded stale fetch #{}", ticket);
        }
    }

    /// Report a write failure. Only a fetch dispatched after this point clears it.
    fn set_error(&self, message: String) {
        let latest = self.fetch_tickets.load(Ordering::SeqCst);
        self.state.send_modify(|state| {
            state.error_message = Some(message);
            state.error_fetch = latest;
        });
    }
}
