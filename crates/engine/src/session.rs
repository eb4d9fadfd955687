// crates/engine/src/session.rs

//! DraftSession: runs the state machine against a ContentStore.
//!
//! One session owns one draft. Explicit operations (`initialize`, `next`,
//! `save_draft`, `publish`) preempt autosave and then serialize on a
//! single-writer gate, so at most one store write is in flight per draft.
//! `update_field` and `back` never touch the store and return immediately.

use domain::setting::AutosaveSettings;
use domain::{ContentType, DraftError, Fields, StepValidator};
use serde_json::Value as Json;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use store::{ContentId, ContentStore};

use crate::autosave::Autosave;
use crate::machine::{Action, DraftState, DraftStateMachine, Effect, PersistRequest, Transition};

// ─────────────────────────────────────────────────────────────────────────────
// Shared between the session and its autosave task
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) struct Shared {
    state: parking_lot::Mutex<DraftState>,
    pub(crate) machine: DraftStateMachine,
    pub(crate) store: Arc<dyn ContentStore>,
    /// Held for the whole duration of any store write.
    pub(crate) gate: tokio::sync::Mutex<()>,
    epoch: AtomicU64,
    closed: AtomicBool,
}

impl Shared {
    pub(crate) fn dispatch(&self, action: Action) -> Vec<Effect> {
        let mut guard = self.state.lock();
        let current = std::mem::take(&mut *guard);
        let Transition { state, effects } = self.machine.reduce(current, action);
        *guard = state;
        effects
    }

    pub(crate) fn snapshot(&self) -> DraftState {
        self.state.lock().clone()
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Run one persistence request and turn its outcome into an action.
    async fn execute(&self, request: PersistRequest) -> Action {
        match request {
            PersistRequest::Create(record) => match self.store.create(record).await {
                Ok(id) => {
                    tracing::debug!(%id, "draft created");
                    Action::Created { id }
                }
                Err(err) => {
                    tracing::error!(error = %err, "creating draft failed");
                    Action::InitializeFailed(DraftError::initialization(err))
                }
            },
            PersistRequest::Update { id, patch } => match self.store.update(&id, patch).await {
                Ok(()) => {
                    tracing::debug!(%id, "draft persisted");
                    Action::Persisted
                }
                Err(err) => {
                    tracing::error!(%id, error = %err, "persisting draft failed");
                    Action::PersistFailed(DraftError::persistence(err))
                }
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

pub struct DraftSession {
    shared: Arc<Shared>,
    autosave: Autosave,
}

impl std::fmt::Debug for DraftSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftSession")
            .field("state", &self.shared.snapshot())
            .finish_non_exhaustive()
    }
}

impl DraftSession {
    /// Create an empty session. Spawns the autosave task when enabled, so
    /// this must run inside a tokio runtime in that case.
    pub fn new(
        store: Arc<dyn ContentStore>,
        validator: StepValidator,
        autosave: &AutosaveSettings,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: parking_lot::Mutex::new(DraftState::default()),
            machine: DraftStateMachine::new(validator),
            store,
            gate: tokio::sync::Mutex::new(()),
            epoch: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });
        let autosave = Autosave::spawn(shared.clone(), autosave);
        Self { shared, autosave }
    }

    /// Observable state snapshot.
    pub fn state(&self) -> DraftState {
        self.shared.snapshot()
    }

    #[tracing::instrument(skip_all, fields(user_id = %user_id, kind = %kind))]
    pub async fn initialize(
        &self,
        user_id: &str,
        kind: ContentType,
    ) -> Result<ContentId, DraftError> {
        self.explicit(Action::Initialize {
            user_id: user_id.to_string(),
            kind,
        })
        .await?;
        self.state().id.ok_or(DraftError::NotInitialized)
    }

    /// Continue editing a stored draft.
    #[tracing::instrument(skip_all, fields(%id))]
    pub async fn resume(&self, id: &ContentId) -> Result<(), DraftError> {
        self.ensure_open()?;
        let _gate = self.shared.gate.lock().await;
        let record = self
            .shared
            .store
            .find_by_id(id)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "loading draft failed");
                DraftError::persistence(err)
            })?
            .ok_or_else(|| DraftError::NotFound(id.to_string()))?;
        self.drive(Action::Resumed(record)).await
    }

    /// Set one field (or a dotted path inside one). Never writes directly;
    /// autosave picks the change up after the debounce window.
    pub fn update_field(&self, key: &str, value: Json) -> Result<(), DraftError> {
        self.ensure_open()?;
        let effects = self.shared.dispatch(Action::UpdateField {
            key: key.to_string(),
            value,
        });
        self.control(effects).0.map_or(Ok(()), Err)
    }

    #[tracing::instrument(skip_all)]
    pub async fn next(&self, data: Fields) -> Result<(), DraftError> {
        self.explicit(Action::Next(data)).await
    }

    pub fn back(&self) -> Result<(), DraftError> {
        self.ensure_open()?;
        let effects = self.shared.dispatch(Action::Back);
        self.control(effects).0.map_or(Ok(()), Err)
    }

    #[tracing::instrument(skip_all)]
    pub async fn save_draft(&self) -> Result<(), DraftError> {
        self.explicit(Action::SaveDraft).await
    }

    #[tracing::instrument(skip_all)]
    pub async fn publish(&self) -> Result<(), DraftError> {
        self.explicit(Action::Publish).await
    }

    /// End the session. Pending autosave is cancelled; later calls fail
    /// with `Closed`.
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        self.autosave.stop().await;
        tracing::debug!("draft session closed");
    }

    fn ensure_open(&self) -> Result<(), DraftError> {
        if self.shared.is_closed() {
            Err(DraftError::Closed)
        } else {
            Ok(())
        }
    }

    async fn explicit(&self, action: Action) -> Result<(), DraftError> {
        self.ensure_open()?;
        // invalidate any timer that already fired and is queued on the gate
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        self.autosave.cancel();

        let _gate = self.shared.gate.lock().await;
        self.ensure_open()?;
        self.drive(action).await
    }

    /// Reduce `action` and execute its effects until none are left.
    /// Callers hold the gate.
    async fn drive(&self, action: Action) -> Result<(), DraftError> {
        let mut effects = self.shared.dispatch(action);
        loop {
            let (rejected, request) = self.control(effects);
            if let Some(err) = rejected {
                return Err(err);
            }
            let Some(request) = request else {
                return Ok(());
            };
            let follow = self.shared.execute(request).await;
            if self.shared.is_closed() {
                return Err(DraftError::Closed);
            }
            effects = self.shared.dispatch(follow);
        }
    }

    /// Apply timer effects; hand back the rejection and persist request.
    fn control(&self, effects: Vec<Effect>) -> (Option<DraftError>, Option<PersistRequest>) {
        let mut rejected = None;
        let mut request = None;
        for effect in effects {
            match effect {
                Effect::CancelAutosave => self.autosave.cancel(),
                Effect::ScheduleAutosave => self.autosave.touch(self.shared.epoch()),
                Effect::Persist(req) => request = Some(req),
                Effect::Reject(err) => rejected = Some(err),
            }
        }
        (rejected, request)
    }
}

impl Drop for DraftSession {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
    }
}
