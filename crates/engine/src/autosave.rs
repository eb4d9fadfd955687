// crates/engine/src/autosave.rs

//! AutosavePersister: debounced, best-effort background writes.
//!
//! A single task owns one restartable deadline. Every field change sends a
//! `Touch`; explicit transitions send `Cancel` and bump the session epoch so
//! a timer that already fired (and is waiting for the write gate) drops its
//! write instead of racing the transition.

use domain::setting::AutosaveSettings;
use domain::Fingerprint;
use std::sync::Arc;
use std::time::Duration;
use store::{NewRecord, RecordPatch};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::machine::Action;
use crate::session::Shared;

/// Messages for the autosave task.
#[derive(Debug)]
enum Apply {
    /// (Re)arm the timer for `deadline`, tagged with the session epoch.
    Touch { epoch: u64, deadline: Instant },
    Cancel,
    Stop,
}

/// Outcome of one timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fired {
    Written,
    Skipped(&'static str),
    Failed,
}

pub(crate) struct Autosave {
    tx: Option<mpsc::UnboundedSender<Apply>>,
    debounce: Duration,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl Autosave {
    /// Start the autosave task. Must be called inside a tokio runtime
    /// unless autosave is disabled.
    pub(crate) fn spawn(shared: Arc<Shared>, settings: &AutosaveSettings) -> Self {
        let debounce = Duration::from_millis(settings.debounce_ms);
        if !settings.enabled {
            tracing::debug!("autosave disabled");
            return Self {
                tx: None,
                debounce,
                task: parking_lot::Mutex::new(None),
            };
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(shared, rx));
        Self {
            tx: Some(tx),
            debounce,
            task: parking_lot::Mutex::new(Some(task)),
        }
    }

    pub(crate) fn touch(&self, epoch: u64) {
        self.send(Apply::Touch {
            epoch,
            deadline: Instant::now() + self.debounce,
        });
    }

    pub(crate) fn cancel(&self) {
        self.send(Apply::Cancel);
    }

    /// Stop the task and wait for it. A write already dispatched completes.
    pub(crate) async fn stop(&self) {
        self.send(Apply::Stop);
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    fn send(&self, msg: Apply) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(msg);
        }
    }
}

impl Drop for Autosave {
    fn drop(&mut self) {
        // Best-effort shutdown if stop() wasn't called
        self.send(Apply::Stop);
    }
}

async fn run(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<Apply>) {
    let mut armed: Option<(Instant, u64)> = None;

    loop {
        let wake = armed.map(|(at, _)| at);
        tokio::select! {
            biased;

            msg = rx.recv() => match msg {
                Some(Apply::Touch { epoch, deadline }) => armed = Some((deadline, epoch)),
                Some(Apply::Cancel) => armed = None,
                Some(Apply::Stop) | None => break,
            },
            _ = sleep_until_opt(wake) => {
                let Some((_, epoch)) = armed.take() else { continue };
                match fire(&shared, epoch).await {
                    Fired::Skipped(reason) => tracing::debug!(reason, "autosave skipped"),
                    Fired::Written | Fired::Failed => {}
                }
            }
        }
    }
    tracing::debug!("autosave task stopped");
}

async fn sleep_until_opt(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

/// Runs under the write gate, so a pending `initialize` (which holds the
/// gate for its whole create) is always settled before the snapshot.
#[tracing::instrument(skip_all, fields(epoch = epoch))]
async fn fire(shared: &Shared, epoch: u64) -> Fired {
    let _gate = shared.gate.lock().await;

    if shared.is_closed() {
        return Fired::Skipped("closed");
    }
    if shared.epoch() != epoch {
        return Fired::Skipped("stale");
    }

    let state = shared.snapshot();
    let (Some(kind), Some(user_id)) = (state.kind, state.user_id.clone()) else {
        return Fired::Skipped("uninitialized");
    };
    if state.is_published() {
        return Fired::Skipped("published");
    }
    if !state.is_dirty {
        return Fired::Skipped("clean");
    }

    let report = shared.machine.validator().check_shape(kind, &state.fields);
    if !report.is_valid() {
        tracing::debug!(%report, "fields fail shape check");
        return Fired::Skipped("shape");
    }

    let fingerprint = Fingerprint::of(&state.fields);
    if state.last_persisted_fingerprint.as_ref() == Some(&fingerprint) {
        return Fired::Skipped("unchanged");
    }

    let result = match state.id.clone() {
        Some(id) => shared
            .store
            .update(&id, RecordPatch::fields(state.fields))
            .await
            .map(|()| None),
        None => {
            let mut record = NewRecord::draft(user_id, kind).with_fields(state.fields);
            record.step = state.step;
            shared.store.create(record).await.map(Some)
        }
    };

    match result {
        Ok(created) => {
            if shared.is_closed() {
                tracing::debug!("session closed during autosave; result dropped");
                return Fired::Skipped("closed");
            }
            tracing::debug!(fingerprint = %fingerprint, "autosaved");
            shared.dispatch(Action::Autosaved {
                created,
                fingerprint,
            });
            Fired::Written
        }
        Err(err) => {
            tracing::warn!(error = %err, "autosave failed");
            Fired::Failed
        }
    }
}
