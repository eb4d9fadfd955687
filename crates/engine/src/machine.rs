// crates/engine/src/machine.rs

//! DraftStateMachine: the wizard as a plain reducer.
//!
//! `reduce(state, action)` never performs I/O. It returns the next state and
//! a list of [`Effect`]s for the caller to run (store writes, autosave timer
//! control, rejections). Results of those effects come back as actions
//! (`Created`, `Persisted`, `PersistFailed`, `Autosaved`).

use chrono::{DateTime, Utc};
use domain::fields::{self, root_key, Fields};
use domain::validate;
use domain::{max_steps, ContentType, DraftError, Fingerprint, Status, StepValidator};
use serde::Serialize;
use serde_json::{Map, Value as Json};
use store::{ContentId, ContentRecord, NewRecord, RecordPatch};

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Editing,
    Submitting,
    Published,
}

/// Last user-facing error, optionally tied to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNote {
    pub field: Option<String>,
    pub message: String,
}

impl ErrorNote {
    fn from_error(err: &DraftError) -> Self {
        let field = match err {
            DraftError::Validation(report) => report.first().map(|e| e.field.clone()),
            _ => None,
        };
        Self {
            field,
            message: err.user_message(),
        }
    }
}

/// What an in-flight explicit write will do once it succeeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Initialize,
    Next { to_step: u8 },
    SaveDraft,
    Publish { at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingWrite {
    pub intent: Intent,
    /// Fingerprint of the fields carried by the write.
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftState {
    pub id: Option<ContentId>,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ContentType>,
    pub step: u8,
    pub fields: Fields,
    pub status: Status,
    pub is_dirty: bool,
    pub phase: Phase,
    pub initializing: bool,
    pub error: Option<ErrorNote>,
    pub last_persisted_fingerprint: Option<Fingerprint>,
    pub publish_date: Option<DateTime<Utc>>,
    pub pending: Option<PendingWrite>,
}

impl Default for DraftState {
    fn default() -> Self {
        Self {
            id: None,
            user_id: None,
            kind: None,
            step: 1,
            fields: Fields::new(),
            status: Status::Draft,
            is_dirty: false,
            phase: Phase::Editing,
            initializing: false,
            error: None,
            last_persisted_fingerprint: None,
            publish_date: None,
            pending: None,
        }
    }
}

impl DraftState {
    pub fn is_submitting(&self) -> bool {
        self.phase == Phase::Submitting
    }

    pub fn is_published(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn max_steps(&self) -> Option<u8> {
        self.kind.map(max_steps)
    }

    fn fields_fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.fields)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions and effects
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum Action {
    Initialize { user_id: String, kind: ContentType },
    Created { id: ContentId },
    InitializeFailed(DraftError),
    Resumed(ContentRecord),
    /// `key` may be a dotted path such as `validityPeriod.start`.
    UpdateField { key: String, value: Json },
    Next(Fields),
    Back,
    SaveDraft,
    Publish,
    Persisted,
    PersistFailed(DraftError),
    Autosaved {
        created: Option<ContentId>,
        fingerprint: Fingerprint,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PersistRequest {
    Create(NewRecord),
    Update { id: ContentId, patch: RecordPatch },
}

#[derive(Debug)]
pub enum Effect {
    CancelAutosave,
    ScheduleAutosave,
    Persist(PersistRequest),
    Reject(DraftError),
}

#[derive(Debug)]
pub struct Transition {
    pub state: DraftState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn new(state: DraftState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }

    fn stay(state: DraftState) -> Self {
        Self::new(state, Vec::new())
    }

    fn reject(mut state: DraftState, err: DraftError) -> Self {
        if matches!(
            err,
            DraftError::Validation(_)
                | DraftError::Persistence(_)
                | DraftError::Initialization(_)
                | DraftError::NotInitialized
        ) {
            state.error = Some(ErrorNote::from_error(&err));
        }
        Self::new(state, vec![Effect::Reject(err)])
    }

    /// Explicit operations cancel the autosave timer up front. When one is
    /// refused without writing, unsaved input goes back to autosave.
    fn rearm_after_rejection(&mut self) {
        let scheduled = self
            .effects
            .iter()
            .any(|e| matches!(e, Effect::ScheduleAutosave));
        if self.rejection().is_some()
            && self.persist_request().is_none()
            && !scheduled
            && self.state.is_dirty
            && !self.state.is_published()
        {
            self.effects.push(Effect::ScheduleAutosave);
        }
    }

    pub fn rejection(&self) -> Option<&DraftError> {
        self.effects.iter().find_map(|e| match e {
            Effect::Reject(err) => Some(err),
            _ => None,
        })
    }

    pub fn persist_request(&self) -> Option<&PersistRequest> {
        self.effects.iter().find_map(|e| match e {
            Effect::Persist(req) => Some(req),
            _ => None,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reducer
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct DraftStateMachine {
    validator: StepValidator,
}

impl DraftStateMachine {
    pub fn new(validator: StepValidator) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &StepValidator {
        &self.validator
    }

    pub fn reduce(&self, state: DraftState, action: Action) -> Transition {
        let explicit = matches!(
            action,
            Action::Initialize { .. } | Action::Next(_) | Action::SaveDraft | Action::Publish
        );
        let mut t = self.apply(state, action);
        if explicit {
            t.rearm_after_rejection();
        }
        t
    }

    fn apply(&self, state: DraftState, action: Action) -> Transition {
        match action {
            Action::Initialize { user_id, kind } => initialize(state, user_id, kind),
            Action::Created { id } => created(state, id),
            Action::InitializeFailed(err) => {
                let mut state = state;
                state.pending = None;
                state.initializing = false;
                state.phase = Phase::Editing;
                Transition::reject(state, err)
            }
            Action::Resumed(record) => resumed(state, record),
            Action::UpdateField { key, value } => update_field(state, key, value),
            Action::Next(data) => self.next(state, data),
            Action::Back => back(state),
            Action::SaveDraft => save_draft(state),
            Action::Publish => self.publish(state),
            Action::Persisted => persisted(state),
            Action::PersistFailed(err) => {
                let mut state = state;
                state.pending = None;
                state.phase = Phase::Editing;
                Transition::reject(state, err)
            }
            Action::Autosaved {
                created,
                fingerprint,
            } => autosaved(state, created, fingerprint),
        }
    }

    fn next(&self, mut state: DraftState, data: Fields) -> Transition {
        let kind = match guard(&state, true) {
            Ok(kind) => kind,
            Err(err) => return Transition::reject(state, err),
        };
        if let Err(err) = admit(kind, &data) {
            return Transition::reject(state, err);
        }

        let before = state.fields_fingerprint();
        fields::merge(&mut state.fields, data);
        if state.fields_fingerprint() != before {
            state.is_dirty = true;
        }

        let report = self.validator.validate_step(kind, state.step, &state.fields);
        if !report.is_valid() {
            // merged input stays in memory for autosave
            return Transition::reject(state, DraftError::Validation(report));
        }
        let Some(id) = state.id.clone() else {
            return Transition::reject(state, DraftError::NotInitialized);
        };

        let to_step = (state.step + 1).min(max_steps(kind));
        let patch = RecordPatch::fields(state.fields.clone()).with_step(to_step);
        begin_write(state, Intent::Next { to_step }, id, patch)
    }

    fn publish(&self, state: DraftState) -> Transition {
        let kind = match guard(&state, true) {
            Ok(kind) => kind,
            Err(err) => return Transition::reject(state, err),
        };
        let Some(id) = state.id.clone() else {
            return Transition::reject(state, DraftError::NotInitialized);
        };

        let report = self.validator.validate_all(kind, &state.fields);
        if !report.is_valid() {
            return Transition::reject(state, DraftError::Validation(report));
        }

        let at = self.validator.now();
        let patch = RecordPatch::fields(state.fields.clone())
            .with_step(state.step)
            .with_status(Status::Published)
            .with_publish_date(at);
        begin_write(state, Intent::Publish { at }, id, patch)
    }
}

/// Common preconditions. Returns the draft's content type.
fn guard(state: &DraftState, explicit: bool) -> Result<ContentType, DraftError> {
    let kind = state.kind.ok_or(DraftError::NotInitialized)?;
    if state.status.is_terminal() {
        return Err(DraftError::AlreadyPublished);
    }
    if explicit && state.is_submitting() {
        return Err(DraftError::Busy);
    }
    Ok(kind)
}

/// Incoming field data must fit the type's field shapes. Anything admitted
/// here also passes the autosave shape check after merging.
fn admit(kind: ContentType, patch: &Fields) -> Result<(), DraftError> {
    let report = validate::check_shape(kind, patch);
    if report.is_valid() {
        Ok(())
    } else {
        Err(DraftError::Validation(report))
    }
}

fn begin_write(
    mut state: DraftState,
    intent: Intent,
    id: ContentId,
    patch: RecordPatch,
) -> Transition {
    state.error = None;
    state.phase = Phase::Submitting;
    state.pending = Some(PendingWrite {
        intent,
        fingerprint: state.fields_fingerprint(),
    });
    Transition::new(
        state,
        vec![
            Effect::CancelAutosave,
            Effect::Persist(PersistRequest::Update { id, patch }),
        ],
    )
}

/// Record a successful explicit write. Fields typed while it was in flight
/// keep the draft dirty and re-arm autosave.
fn settle_write(mut state: DraftState, written: Fingerprint) -> Transition {
    state.is_dirty = state.fields_fingerprint() != written;
    state.last_persisted_fingerprint = Some(written);
    state.error = None;
    let effects = if state.is_dirty && !state.is_published() {
        vec![Effect::ScheduleAutosave]
    } else {
        Vec::new()
    };
    Transition::new(state, effects)
}

fn initialize(mut state: DraftState, user_id: String, kind: ContentType) -> Transition {
    if state.id.is_some() || state.initializing {
        return Transition::reject(state, DraftError::AlreadyInitialized);
    }
    if let Some(existing) = state.kind {
        if existing != kind {
            return Transition::reject(state, DraftError::AlreadyInitialized);
        }
    }

    state.user_id = Some(user_id.clone());
    state.kind = Some(kind);
    state.initializing = true;
    state.phase = Phase::Submitting;
    state.error = None;
    state.pending = Some(PendingWrite {
        intent: Intent::Initialize,
        fingerprint: state.fields_fingerprint(),
    });

    let mut record = NewRecord::draft(user_id, kind).with_fields(state.fields.clone());
    record.step = state.step;
    Transition::new(state, vec![Effect::Persist(PersistRequest::Create(record))])
}

fn created(mut state: DraftState, id: ContentId) -> Transition {
    let written = state
        .pending
        .take()
        .map(|p| p.fingerprint)
        .unwrap_or_else(|| Fingerprint::of(&Fields::new()));
    state.id = Some(id);
    state.initializing = false;
    state.phase = Phase::Editing;
    settle_write(state, written)
}

fn resumed(state: DraftState, record: ContentRecord) -> Transition {
    if state.kind.is_some() {
        return Transition::reject(state, DraftError::AlreadyInitialized);
    }
    if record.status.is_terminal() {
        return Transition::reject(state, DraftError::AlreadyPublished);
    }

    let fingerprint = Fingerprint::of(&record.fields);
    let resumed = DraftState {
        id: Some(record.id),
        user_id: Some(record.user_id),
        kind: Some(record.kind),
        step: record.step.clamp(1, max_steps(record.kind)),
        fields: record.fields,
        status: record.status,
        last_persisted_fingerprint: Some(fingerprint),
        publish_date: record.publish_date,
        ..DraftState::default()
    };
    Transition::stay(resumed)
}

fn update_field(mut state: DraftState, key: String, value: Json) -> Transition {
    let kind = match guard(&state, false) {
        Ok(kind) => kind,
        Err(err) => return Transition::reject(state, err),
    };
    let root = root_key(&key).to_string();

    // `a.b.c = v` becomes `a: {b: {c: v}}` and merges like a step patch
    let path: Vec<&str> = key.split('.').skip(1).collect();
    let nested = path.into_iter().rev().fold(value, |acc, part| {
        let mut obj = Map::new();
        obj.insert(part.to_string(), acc);
        Json::Object(obj)
    });
    let mut patch = Fields::new();
    patch.insert(root.clone(), nested);
    if let Err(err) = admit(kind, &patch) {
        return Transition::reject(state, err);
    }
    fields::merge(&mut state.fields, patch);
    state.is_dirty = true;

    if state
        .error
        .as_ref()
        .is_some_and(|note| note.field.as_deref() == Some(root.as_str()))
    {
        state.error = None;
    }
    Transition::new(state, vec![Effect::ScheduleAutosave])
}

fn back(mut state: DraftState) -> Transition {
    if let Err(err) = guard(&state, true) {
        return Transition::reject(state, err);
    }
    state.step = state.step.saturating_sub(1).max(1);
    state.error = None;
    Transition::stay(state)
}

fn save_draft(state: DraftState) -> Transition {
    if let Err(err) = guard(&state, true) {
        return Transition::reject(state, err);
    }
    let Some(id) = state.id.clone() else {
        return Transition::reject(state, DraftError::NotInitialized);
    };
    let patch = RecordPatch::fields(state.fields.clone())
        .with_step(state.step)
        .with_status(Status::Draft);
    begin_write(state, Intent::SaveDraft, id, patch)
}

fn persisted(mut state: DraftState) -> Transition {
    let Some(pending) = state.pending.take() else {
        tracing::debug!("persisted without a pending write");
        return Transition::stay(state);
    };
    state.phase = Phase::Editing;
    match pending.intent {
        Intent::Next { to_step } => state.step = to_step,
        Intent::Publish { at } => {
            state.status = Status::Published;
            state.publish_date = Some(at);
            state.phase = Phase::Published;
        }
        Intent::Initialize => state.initializing = false,
        Intent::SaveDraft => {}
    }
    settle_write(state, pending.fingerprint)
}

fn autosaved(
    mut state: DraftState,
    created: Option<ContentId>,
    fingerprint: Fingerprint,
) -> Transition {
    if state.is_published() {
        return Transition::stay(state);
    }
    if state.id.is_none() {
        state.id = created;
    }
    state.last_persisted_fingerprint = Some(fingerprint);
    Transition::stay(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use domain::FixedClock;
    use serde_json::json;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    fn machine() -> DraftStateMachine {
        DraftStateMachine::new(StepValidator::new(Arc::new(FixedClock(now()))))
    }

    fn obj(v: Json) -> Fields {
        v.as_object().cloned().unwrap()
    }

    fn step1() -> Fields {
        obj(json!({
            "title": "Back to School",
            "promotionType": "discount",
            "location": "store",
            "validityPeriod": {"start": "2030-08-01", "end": "2030-09-01"}
        }))
    }

    /// A promotion draft with an id, on step 1.
    fn ready() -> DraftState {
        let m = machine();
        let t = m.reduce(
            DraftState::default(),
            Action::Initialize {
                user_id: "u1".into(),
                kind: ContentType::Promotion,
            },
        );
        m.reduce(t.state, Action::Created { id: "p1".into() }).state
    }

    #[test]
    fn initialize_requests_a_create() {
        let t = machine().reduce(
            DraftState::default(),
            Action::Initialize {
                user_id: "u1".into(),
                kind: ContentType::Job,
            },
        );
        assert!(t.state.initializing);
        assert!(t.state.is_submitting());
        match t.persist_request() {
            Some(PersistRequest::Create(rec)) => {
                assert_eq!(rec.user_id, "u1");
                assert_eq!(rec.kind, ContentType::Job);
                assert_eq!(rec.status, Status::Draft);
                assert_eq!(rec.step, 1);
                assert!(rec.fields.is_empty());
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn created_assigns_id_and_returns_to_editing() {
        let state = ready();
        assert_eq!(state.id, Some(ContentId::new("p1")));
        assert!(!state.initializing);
        assert_eq!(state.phase, Phase::Editing);
        assert!(!state.is_dirty);
        assert!(state.pending.is_none());
    }

    #[test]
    fn second_initialize_is_rejected() {
        let t = machine().reduce(
            ready(),
            Action::Initialize {
                user_id: "u1".into(),
                kind: ContentType::Promotion,
            },
        );
        assert!(matches!(t.rejection(), Some(DraftError::AlreadyInitialized)));
    }

    #[test]
    fn failed_initialize_can_be_retried() {
        let m = machine();
        let t = m.reduce(
            DraftState::default(),
            Action::Initialize {
                user_id: "u1".into(),
                kind: ContentType::Event,
            },
        );
        let t = m.reduce(
            t.state,
            Action::InitializeFailed(DraftError::initialization("offline")),
        );
        assert!(matches!(t.rejection(), Some(DraftError::Initialization(_))));
        assert!(!t.state.initializing);
        assert!(t.state.error.is_some());

        let t = m.reduce(
            t.state,
            Action::Initialize {
                user_id: "u1".into(),
                kind: ContentType::Event,
            },
        );
        assert!(t.rejection().is_none());
        assert!(matches!(t.persist_request(), Some(PersistRequest::Create(_))));
    }

    #[test]
    fn retry_with_another_type_is_already_initialized() {
        let m = machine();
        let t = m.reduce(
            DraftState::default(),
            Action::Initialize {
                user_id: "u1".into(),
                kind: ContentType::Event,
            },
        );
        let t = m.reduce(
            t.state,
            Action::InitializeFailed(DraftError::initialization("offline")),
        );
        let t = m.reduce(
            t.state,
            Action::Initialize {
                user_id: "u1".into(),
                kind: ContentType::Job,
            },
        );
        assert!(matches!(t.rejection(), Some(DraftError::AlreadyInitialized)));
        assert_eq!(t.state.kind, Some(ContentType::Event));
    }

    #[test]
    fn update_field_merges_marks_dirty_and_schedules_autosave() {
        let t = machine().reduce(
            ready(),
            Action::UpdateField {
                key: "title".into(),
                value: json!("Back to School"),
            },
        );
        assert_eq!(t.state.fields["title"], "Back to School");
        assert!(t.state.is_dirty);
        assert!(matches!(t.effects.as_slice(), [Effect::ScheduleAutosave]));
    }

    #[test]
    fn dotted_update_merges_into_nested_object() {
        let m = machine();
        let mut state = ready();
        state.fields = obj(json!({"validityPeriod": {"start": "2030-08-01"}}));
        let t = m.reduce(
            state,
            Action::UpdateField {
                key: "validityPeriod.end".into(),
                value: json!("2030-09-01"),
            },
        );
        assert_eq!(
            t.state.fields["validityPeriod"],
            json!({"start": "2030-08-01", "end": "2030-09-01"})
        );
    }

    #[test]
    fn update_field_clears_only_its_own_error() {
        let m = machine();
        let t = m.reduce(ready(), Action::Next(Fields::new()));
        assert_eq!(
            t.state.error.as_ref().and_then(|n| n.field.as_deref()),
            Some("title")
        );

        let t = m.reduce(
            t.state,
            Action::UpdateField {
                key: "location".into(),
                value: json!("online"),
            },
        );
        assert!(t.state.error.is_some());

        let t = m.reduce(
            t.state,
            Action::UpdateField {
                key: "title".into(),
                value: json!("Sale"),
            },
        );
        assert!(t.state.error.is_none());
    }

    #[test]
    fn reserved_keys_cannot_be_set() {
        let t = machine().reduce(
            ready(),
            Action::UpdateField {
                key: "status".into(),
                value: json!("published"),
            },
        );
        assert!(matches!(t.rejection(), Some(DraftError::Validation(r)) if r.get("status").is_some()));
        assert!(!t.state.fields.contains_key("status"));
    }

    #[test]
    fn next_refuses_the_record_step_key() {
        let mut data = step1();
        data.insert("step".into(), json!(9));
        let t = machine().reduce(ready(), Action::Next(data));
        assert!(matches!(t.rejection(), Some(DraftError::Validation(r)) if r.get("step").is_some()));
        assert!(t.persist_request().is_none());
        assert!(!t.state.fields.contains_key("step"));
        assert!(!t.state.fields.contains_key("title"));
    }

    #[test]
    fn fields_of_another_type_never_enter_the_draft() {
        let m = machine();
        let mut data = step1();
        data.insert("venue".into(), json!("Hall 1"));
        let t = m.reduce(ready(), Action::Next(data));
        assert!(matches!(t.rejection(), Some(DraftError::Validation(r)) if r.get("venue").is_some()));
        assert!(t.state.fields.is_empty());

        let t = m.reduce(
            t.state,
            Action::UpdateField {
                key: "venue".into(),
                value: json!("Hall 1"),
            },
        );
        assert!(t.rejection().is_some());
        assert!(!t.state.fields.contains_key("venue"));

        // a dotted path into a text field is a shape error too
        let t = m.reduce(
            t.state,
            Action::UpdateField {
                key: "title.main".into(),
                value: json!("Sale"),
            },
        );
        assert!(matches!(t.rejection(), Some(DraftError::Validation(r)) if r.get("title").is_some()));
        assert!(validate::check_shape(ContentType::Promotion, &t.state.fields).is_valid());
    }

    #[test]
    fn refused_explicit_action_hands_dirty_input_back_to_autosave() {
        let m = machine();
        let t = m.reduce(
            ready(),
            Action::UpdateField {
                key: "title".into(),
                value: json!("Sale"),
            },
        );
        let t = m.reduce(t.state, Action::Publish);
        assert!(matches!(t.rejection(), Some(DraftError::Validation(_))));
        assert!(t
            .effects
            .iter()
            .any(|e| matches!(e, Effect::ScheduleAutosave)));

        // nothing unsaved, nothing to hand back
        let t = m.reduce(ready(), Action::Publish);
        assert!(t.rejection().is_some());
        assert!(!t
            .effects
            .iter()
            .any(|e| matches!(e, Effect::ScheduleAutosave)));
    }

    #[test]
    fn invalid_next_keeps_step_and_issues_no_write() {
        let mut data = step1();
        data.insert("title".into(), json!(""));
        let t = machine().reduce(ready(), Action::Next(data));

        assert_eq!(t.state.step, 1);
        assert!(t.persist_request().is_none());
        match t.rejection() {
            Some(DraftError::Validation(report)) => assert!(report.get("title").is_some()),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(t.state.error.as_ref().unwrap().message, "Title is required");
        // input is still kept in memory
        assert_eq!(t.state.fields["promotionType"], "discount");
    }

    #[test]
    fn valid_next_cancels_autosave_and_writes_advanced_step() {
        let m = machine();
        let t = m.reduce(ready(), Action::Next(step1()));

        assert!(matches!(t.effects.first(), Some(Effect::CancelAutosave)));
        match t.persist_request() {
            Some(PersistRequest::Update { id, patch }) => {
                assert_eq!(id.as_str(), "p1");
                assert_eq!(patch.step, Some(2));
                assert_eq!(patch.status, None);
                assert_eq!(patch.fields.as_ref().unwrap()["title"], "Back to School");
            }
            other => panic!("unexpected request {other:?}"),
        }
        // step only moves once the write lands
        assert_eq!(t.state.step, 1);
        assert!(t.state.is_submitting());

        let t = m.reduce(t.state, Action::Persisted);
        assert_eq!(t.state.step, 2);
        assert!(!t.state.is_dirty);
        assert_eq!(t.state.phase, Phase::Editing);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn typing_during_write_keeps_draft_dirty() {
        let m = machine();
        let t = m.reduce(ready(), Action::Next(step1()));
        let t = m.reduce(
            t.state,
            Action::UpdateField {
                key: "description".into(),
                value: json!("Everything 20% off"),
            },
        );
        let t = m.reduce(t.state, Action::Persisted);
        assert_eq!(t.state.step, 2);
        assert!(t.state.is_dirty);
        assert!(matches!(t.effects.as_slice(), [Effect::ScheduleAutosave]));
    }

    #[test]
    fn explicit_actions_while_submitting_are_busy() {
        let m = machine();
        let t = m.reduce(ready(), Action::Next(step1()));
        for action in [Action::Back, Action::SaveDraft, Action::Publish] {
            let r = m.reduce(t.state.clone(), action);
            assert!(matches!(r.rejection(), Some(DraftError::Busy)));
        }
    }

    #[test]
    fn merge_preserves_keys_from_earlier_steps() {
        let m = machine();
        let t = m.reduce(ready(), Action::Next(step1()));
        let t = m.reduce(t.state, Action::Persisted);
        let t = m.reduce(
            t.state,
            Action::Next(obj(json!({
                "targetAudience": ["students"],
                "validityPeriod": {"end": "2030-09-15"}
            }))),
        );
        let fields = &t.state.fields;
        assert_eq!(fields["title"], "Back to School");
        assert_eq!(fields["validityPeriod"]["start"], "2030-08-01");
        assert_eq!(fields["validityPeriod"]["end"], "2030-09-15");
    }

    #[test]
    fn back_floors_at_one_and_clears_error() {
        let m = machine();
        let mut state = ready();
        state.step = 2;
        state.error = Some(ErrorNote {
            field: None,
            message: "x".into(),
        });
        let t = m.reduce(state, Action::Back);
        assert_eq!(t.state.step, 1);
        assert!(t.state.error.is_none());
        let t = m.reduce(t.state, Action::Back);
        assert_eq!(t.state.step, 1);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn save_draft_without_id_is_not_initialized() {
        let t = machine().reduce(
            DraftState {
                kind: Some(ContentType::Job),
                ..DraftState::default()
            },
            Action::SaveDraft,
        );
        assert!(matches!(t.rejection(), Some(DraftError::NotInitialized)));
        assert!(t.persist_request().is_none());
    }

    #[test]
    fn save_draft_writes_draft_status() {
        let t = machine().reduce(ready(), Action::SaveDraft);
        match t.persist_request() {
            Some(PersistRequest::Update { patch, .. }) => {
                assert_eq!(patch.status, Some(Status::Draft));
                assert_eq!(patch.step, Some(1));
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn persist_failure_keeps_dirty_fields_and_step() {
        let m = machine();
        let t = m.reduce(ready(), Action::Next(step1()));
        let t = m.reduce(t.state, Action::PersistFailed(DraftError::persistence("503")));
        assert_eq!(t.state.step, 1);
        assert!(t.state.is_dirty);
        assert_eq!(t.state.fields["title"], "Back to School");
        assert_eq!(t.state.phase, Phase::Editing);
        assert_eq!(
            t.state.error.as_ref().unwrap().message,
            "We couldn't save your changes. Please try again."
        );
    }

    #[test]
    fn publish_with_empty_audience_is_rejected() {
        let mut state = ready();
        state.fields = step1();
        state.fields.insert("targetAudience".into(), json!([]));
        state.fields.insert("description".into(), json!("Everything 20% off"));

        let t = machine().reduce(state, Action::Publish);
        assert!(matches!(t.rejection(), Some(DraftError::Validation(r)) if r.get("targetAudience").is_some()));
        assert_eq!(t.state.status, Status::Draft);
        assert!(t.persist_request().is_none());
    }

    #[test]
    fn publish_is_one_way() {
        let m = machine();
        let mut state = ready();
        state.fields = step1();
        state.fields.insert("targetAudience".into(), json!(["students"]));
        state.fields.insert("description".into(), json!("Everything 20% off"));

        let t = m.reduce(state, Action::Publish);
        match t.persist_request() {
            Some(PersistRequest::Update { patch, .. }) => {
                assert_eq!(patch.status, Some(Status::Published));
                assert_eq!(patch.publish_date, Some(now()));
            }
            other => panic!("unexpected request {other:?}"),
        }
        let t = m.reduce(t.state, Action::Persisted);
        assert_eq!(t.state.status, Status::Published);
        assert_eq!(t.state.phase, Phase::Published);
        assert_eq!(t.state.publish_date, Some(now()));

        for action in [
            Action::Back,
            Action::SaveDraft,
            Action::Publish,
            Action::Next(step1()),
            Action::UpdateField {
                key: "title".into(),
                value: json!("x"),
            },
        ] {
            let r = m.reduce(t.state.clone(), action);
            assert!(matches!(r.rejection(), Some(DraftError::AlreadyPublished)));
            assert_eq!(r.state.status, Status::Published);
        }
    }

    #[test]
    fn autosaved_records_fingerprint_but_stays_dirty() {
        let m = machine();
        let t = m.reduce(
            ready(),
            Action::UpdateField {
                key: "title".into(),
                value: json!("Sale"),
            },
        );
        let fp = Fingerprint::of(&t.state.fields);
        let t = m.reduce(
            t.state,
            Action::Autosaved {
                created: None,
                fingerprint: fp.clone(),
            },
        );
        assert!(t.state.is_dirty);
        assert_eq!(t.state.last_persisted_fingerprint, Some(fp));
    }

    #[test]
    fn resume_rebuilds_state_from_record() {
        let mut rec = ContentRecord::from_new(
            ContentId::new("j9"),
            NewRecord::draft("u2", ContentType::Job).with_fields(obj(json!({"title": "Cook"}))),
            now(),
        );
        rec.step = 3;
        let t = machine().reduce(DraftState::default(), Action::Resumed(rec.clone()));
        assert_eq!(t.state.id, Some(ContentId::new("j9")));
        assert_eq!(t.state.kind, Some(ContentType::Job));
        assert_eq!(t.state.step, 3);
        assert_eq!(t.state.fields["title"], "Cook");
        assert!(!t.state.is_dirty);

        rec.status = Status::Published;
        let t = machine().reduce(DraftState::default(), Action::Resumed(rec));
        assert!(matches!(t.rejection(), Some(DraftError::AlreadyPublished)));
    }

    #[test]
    fn operations_before_initialize_are_rejected() {
        let t = machine().reduce(
            DraftState::default(),
            Action::UpdateField {
                key: "title".into(),
                value: json!("x"),
            },
        );
        assert!(matches!(t.rejection(), Some(DraftError::NotInitialized)));
    }
}
