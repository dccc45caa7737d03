use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::instrument::InstrumentType;
use crate::services::{AggregateQuery, StudentDirectory};
use crate::severity::SeverityLevel;

/// Cumulative scoping constraints inherited down the drill path, plus the
/// orthogonal reporting date window. All fields are additive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl FilterSet {
    /// Overlays `other` on top of `self`; only fields the incoming set
    /// provides are overwritten.
    pub fn merge(&self, other: &FilterSet) -> FilterSet {
        FilterSet {
            program: other.program.clone().or_else(|| self.program.clone()),
            year_level: other.year_level.clone().or_else(|| self.year_level.clone()),
            gender: other.gender.clone().or_else(|| self.gender.clone()),
            start_date: other.start_date.or(self.start_date),
            end_date: other.end_date.or(self.end_date),
        }
    }

    /// Just the reporting window, with every drill-path field stripped.
    pub fn date_only(&self) -> FilterSet {
        FilterSet {
            program: None,
            year_level: None,
            gender: None,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// One aggregation bucket as charted: label, count, optional share, color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRow {
    pub label: String,
    pub value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    pub color: String,
}

/// Row of the terminal student list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: Uuid,
    pub display_name: String,
    pub program: String,
    pub year_level: String,
    pub gender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_severity: Option<SeverityLevel>,
}

/// The aggregation axes of the drill path, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelKind {
    Overview,
    Program,
    Year,
    Gender,
    Students,
}

impl LevelKind {
    /// The level one drill step deeper, `None` at the end of the path.
    pub fn next(self) -> Option<LevelKind> {
        match self {
            LevelKind::Overview => Some(LevelKind::Program),
            LevelKind::Program => Some(LevelKind::Year),
            LevelKind::Year => Some(LevelKind::Gender),
            LevelKind::Gender => Some(LevelKind::Students),
            LevelKind::Students => None,
        }
    }
}

/// One layer of the navigation stack. The accumulated filter is stored next
/// to the rows it produced, so back-navigation restores both exactly as
/// displayed rather than reconstructing the filter by deleting keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrilldownLevel {
    pub kind: LevelKind,
    pub title: String,
    pub rows: Vec<AggregateRow>,
    pub accumulated_filter: FilterSet,
}

/// Charts need each bucket's share; the legacy aggregation endpoints are
/// inconsistent about sending it, so fill it in from the level total when
/// absent.
fn normalize_percentages(mut rows: Vec<AggregateRow>) -> Vec<AggregateRow> {
    let total: i64 = rows.iter().map(|r| r.value).sum();
    if total <= 0 {
        return rows;
    }
    for row in &mut rows {
        if row.percentage.is_none() {
            row.percentage = Some(100.0 * row.value as f64 / total as f64);
        }
    }
    rows
}

#[derive(Debug, Default)]
struct EngineState {
    stack: Vec<DrilldownLevel>,
    students: Option<Vec<StudentSummary>>,
    base_filter: FilterSet,
    loading: bool,
    applied_seq: u64,
    disposed: bool,
}

enum Step {
    Push { kind: LevelKind, filter: FilterSet, title: String },
    Terminal { filter: FilterSet },
}

/// Navigates the program → year → gender → student-list aggregation
/// hierarchy for one instrument.
///
/// Each analytics view owns exactly one engine and discards it on teardown;
/// nothing is shared across views. State sits behind a mutex whose critical
/// sections never span an await: every operation snapshots under the lock,
/// fetches unlocked, then re-locks to apply. Each outgoing request carries a
/// monotonically increasing sequence number and a response is applied only
/// if it is newer than the last applied one, so when fetches overlap the one
/// that lands last in wall-clock time wins.
pub struct InsightsEngine<C: ?Sized> {
    client: Arc<C>,
    instrument: InstrumentType,
    seq: AtomicU64,
    state: Mutex<EngineState>,
}

impl<C> InsightsEngine<C>
where
    C: AggregateQuery + StudentDirectory + ?Sized,
{
    pub fn new(client: Arc<C>, instrument: InstrumentType) -> Self {
        Self {
            client,
            instrument,
            seq: AtomicU64::new(0),
            state: Mutex::new(EngineState::default()),
        }
    }

    pub fn instrument(&self) -> InstrumentType {
        self.instrument
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn disposed_error() -> EngineError {
        EngineError::Navigation {
            message: "view was torn down".to_string(),
        }
    }

    /// Applies a finished fetch only while the view is alive and no newer
    /// response has already been applied; anything else is dropped on the
    /// floor. The loading flag stays up if a newer request is still out.
    fn try_apply(&self, seq: u64, apply: impl FnOnce(&mut EngineState)) -> bool {
        let mut state = self.lock_state();
        if state.disposed {
            tracing::debug!(seq, "response arrived after teardown; ignored");
            return false;
        }
        if seq <= state.applied_seq {
            tracing::debug!(seq, newest = state.applied_seq, "stale response discarded");
            return false;
        }
        state.applied_seq = seq;
        state.loading = seq < self.seq.load(Ordering::SeqCst);
        apply(&mut state);
        true
    }

    /// A failed fetch rolls back the loading flag and nothing else: the last
    /// successfully displayed level stays on screen.
    fn finish_failed(&self, seq: u64) {
        let mut state = self.lock_state();
        if state.disposed {
            return;
        }
        if seq == self.seq.load(Ordering::SeqCst) {
            state.loading = false;
        }
    }

    /// Loads the top-level distribution under a date-only filter and resets
    /// the stack to that single overview level.
    pub async fn fetch_insights(&self, filters: FilterSet) -> Result<(), EngineError> {
        let base = filters.date_only();
        let seq = {
            let mut state = self.lock_state();
            if state.disposed {
                return Err(Self::disposed_error());
            }
            state.loading = true;
            self.next_seq()
        };

        let rows = match self.client.query(self.instrument, &base).await {
            Ok(rows) => normalize_percentages(rows),
            Err(e) => {
                self.finish_failed(seq);
                return Err(EngineError::Fetch(e));
            }
        };

        let title = self.instrument.display_name().to_string();
        self.try_apply(seq, move |state| {
            state.base_filter = base.clone();
            state.students = None;
            state.stack = vec![DrilldownLevel {
                kind: LevelKind::Overview,
                title,
                rows,
                accumulated_filter: base,
            }];
        });
        Ok(())
    }

    /// One step deeper. The selected row label becomes the next scoping
    /// filter; the gender level is the last sliceable axis, so drilling from
    /// it fetches the student list under the fully accumulated filter
    /// instead of pushing new rows.
    pub async fn drill_down(&self, selected_label: &str) -> Result<(), EngineError> {
        let (seq, base_stack, step) = {
            let mut state = self.lock_state();
            if state.disposed {
                return Err(Self::disposed_error());
            }
            let Some(current) = state.stack.last() else {
                return Err(EngineError::Navigation {
                    message: "no overview loaded; fetch insights first".to_string(),
                });
            };
            let Some(next_kind) = current.kind.next() else {
                return Err(EngineError::Navigation {
                    message: "the student list is the end of the drill path".to_string(),
                });
            };
            let mut filter = current.accumulated_filter.clone();
            let step = match next_kind {
                LevelKind::Program => {
                    filter.program = Some(selected_label.to_string());
                    Step::Push {
                        kind: next_kind,
                        filter,
                        title: selected_label.to_string(),
                    }
                }
                LevelKind::Year => {
                    filter.year_level = Some(selected_label.to_string());
                    Step::Push {
                        kind: next_kind,
                        filter,
                        title: selected_label.to_string(),
                    }
                }
                LevelKind::Gender => {
                    filter.gender = Some(selected_label.to_string());
                    Step::Push {
                        kind: next_kind,
                        filter,
                        title: selected_label.to_string(),
                    }
                }
                // Program, year and gender are already accumulated.
                LevelKind::Students => Step::Terminal { filter },
                LevelKind::Overview => {
                    return Err(EngineError::Navigation {
                        message: "cannot drill into the overview".to_string(),
                    })
                }
            };
            state.loading = true;
            (self.next_seq(), state.stack.clone(), step)
        };

        match step {
            Step::Push { kind, filter, title } => {
                let rows = match self.client.query(self.instrument, &filter).await {
                    Ok(rows) => normalize_percentages(rows),
                    Err(e) => {
                        self.finish_failed(seq);
                        return Err(EngineError::Fetch(e));
                    }
                };
                self.try_apply(seq, move |state| {
                    state.stack = base_stack;
                    state.students = None;
                    state.stack.push(DrilldownLevel {
                        kind,
                        title,
                        rows,
                        accumulated_filter: filter,
                    });
                });
            }
            Step::Terminal { filter } => {
                let students = match self.client.query_students(self.instrument, &filter).await {
                    Ok(students) => students,
                    Err(e) => {
                        self.finish_failed(seq);
                        return Err(EngineError::Fetch(e));
                    }
                };
                self.try_apply(seq, move |state| {
                    state.stack = base_stack;
                    state.stack.push(DrilldownLevel {
                        kind: LevelKind::Students,
                        title: "Students".to_string(),
                        rows: Vec::new(),
                        accumulated_filter: filter,
                    });
                    state.students = Some(students);
                });
            }
        }
        Ok(())
    }

    /// Pops the current level and re-displays the one beneath it from its
    /// stored rows and stored accumulated filter; nothing is refetched and
    /// nothing from the popped level leaks into the restored one. Popping
    /// the bottom overview is a no-op. Returns whether a level was popped.
    pub fn navigate_back(&self) -> bool {
        let mut state = self.lock_state();
        if state.disposed || state.stack.len() <= 1 {
            return false;
        }
        if let Some(popped) = state.stack.pop() {
            if popped.kind == LevelKind::Students {
                state.students = None;
            }
        }
        true
    }

    /// Applies an orthogonal filter change (typically the reporting date
    /// window) and hard-resets the drill position. Every drilled level was
    /// aggregated under the old window, so the whole stack is rebuilt from a
    /// fresh overview rather than re-derived.
    pub async fn update_filters(&self, new_filters: FilterSet) -> Result<(), EngineError> {
        let merged = {
            let state = self.lock_state();
            if state.disposed {
                return Err(Self::disposed_error());
            }
            state.base_filter.merge(&new_filters).date_only()
        };
        self.fetch_insights(merged).await
    }

    /// Tears the engine down. Any fetch still in flight resolves into the
    /// void: late responses are discarded without touching state.
    pub fn dispose(&self) {
        let mut state = self.lock_state();
        state.disposed = true;
        state.loading = false;
    }

    pub fn current_level(&self) -> Option<DrilldownLevel> {
        self.lock_state().stack.last().cloned()
    }

    /// False exactly when the student list is on display (or nothing is).
    pub fn can_drill_down(&self) -> bool {
        self.lock_state()
            .stack
            .last()
            .map(|level| level.kind.next().is_some())
            .unwrap_or(false)
    }

    pub fn stack_depth(&self) -> usize {
        self.lock_state().stack.len()
    }

    pub fn is_loading(&self) -> bool {
        self.lock_state().loading
    }

    pub fn students(&self) -> Option<Vec<StudentSummary>> {
        self.lock_state().students.clone()
    }

    pub fn base_filter(&self) -> FilterSet {
        self.lock_state().base_filter.clone()
    }
}
