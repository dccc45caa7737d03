//! Logical services the core consumes, and in-memory stand-ins for them.
//!
//! The core is agnostic to transport, serialization and retry policy; each
//! interface here is an opaque async boundary the host application
//! implements over its REST client. The fake implementation at the bottom is
//! used by the integration tests and by host-side storybook/demo wiring: it
//! scripts one response per filter, counts calls, and can delay or fail
//! individual requests so interleavings are reproducible.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::branching::ResponseMap;
use crate::cooldown::{status_for, CooldownStatus};
use crate::drilldown::{AggregateRow, FilterSet, StudentSummary};
use crate::instrument::InstrumentType;
use crate::scoring;
use crate::severity::{self, SeverityLevel};

/// Failure surfaced by any platform service, in the same code/message shape
/// the rest of the client maps onto user-facing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct ServiceError {
    pub code: String,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(e: anyhow::Error) -> Self {
        ServiceError::new("service_failed", e.to_string())
    }
}

/// Result of an accepted submission, echoed back by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub score: i64,
    pub severity: SeverityLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<CooldownStatus>,
}

/// Why the platform refused a submission. A cooldown rejection is kept
/// distinct from generic failures and carries the server's authoritative
/// view of the retake window.
#[derive(Debug, Clone, Error)]
pub enum SubmitRejection {
    #[error("retake not yet available")]
    CooldownActive(CooldownStatus),
    #[error(transparent)]
    Failed(ServiceError),
}

/// Aggregated count buckets scoped by an accumulated filter. Called by the
/// analytics overview and by every non-terminal drill step.
#[async_trait]
pub trait AggregateQuery: Send + Sync {
    async fn query(
        &self,
        instrument: InstrumentType,
        filter: &FilterSet,
    ) -> Result<Vec<AggregateRow>, ServiceError>;
}

/// Terminal student-list lookup for a fully scoped drill path.
#[async_trait]
pub trait StudentDirectory: Send + Sync {
    async fn query_students(
        &self,
        instrument: InstrumentType,
        filter: &FilterSet,
    ) -> Result<Vec<StudentSummary>, ServiceError>;
}

/// Read side of the retake window: when did this user last submit?
#[async_trait]
pub trait CooldownQuery: Send + Sync {
    async fn last_submission(
        &self,
        user_id: Uuid,
        instrument: InstrumentType,
    ) -> Result<Option<DateTime<Utc>>, ServiceError>;
}

/// Write side: hand a completed response map to the platform.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(
        &self,
        user_id: Uuid,
        instrument: InstrumentType,
        responses: &ResponseMap,
    ) -> Result<SubmissionReceipt, SubmitRejection>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn filter_key(instrument: InstrumentType, filter: &FilterSet) -> String {
    let filter = serde_json::to_string(filter).unwrap_or_default();
    format!("{}:{}", instrument.as_str(), filter)
}

/// Scriptable in-memory platform used by the integration tests.
#[derive(Default)]
pub struct FakePlatform {
    rows: Mutex<HashMap<String, Vec<AggregateRow>>>,
    students: Mutex<HashMap<String, Vec<StudentSummary>>>,
    delays: Mutex<HashMap<String, Duration>>,
    failures: Mutex<HashMap<String, ServiceError>>,
    query_calls: Mutex<HashMap<String, usize>>,
    last_submissions: Mutex<HashMap<(Uuid, InstrumentType), DateTime<Utc>>>,
    cooldown_failures: Mutex<HashMap<InstrumentType, ServiceError>>,
    cooldown_calls: Mutex<HashMap<InstrumentType, usize>>,
    submit_outcome: Mutex<Option<Result<SubmissionReceipt, SubmitRejection>>>,
    submit_calls: AtomicUsize,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages the aggregation rows returned for one instrument + filter.
    pub fn stage_rows(&self, instrument: InstrumentType, filter: &FilterSet, rows: Vec<AggregateRow>) {
        lock(&self.rows).insert(filter_key(instrument, filter), rows);
    }

    /// Stages the student list returned for one instrument + filter.
    pub fn stage_students(
        &self,
        instrument: InstrumentType,
        filter: &FilterSet,
        students: Vec<StudentSummary>,
    ) {
        lock(&self.students).insert(filter_key(instrument, filter), students);
    }

    /// Delays the response for one instrument + filter, so a test can decide
    /// which of two in-flight requests lands last.
    pub fn stage_delay(&self, instrument: InstrumentType, filter: &FilterSet, delay: Duration) {
        lock(&self.delays).insert(filter_key(instrument, filter), delay);
    }

    /// Fails the query for one instrument + filter.
    pub fn stage_failure(&self, instrument: InstrumentType, filter: &FilterSet, code: &str) {
        lock(&self.failures).insert(
            filter_key(instrument, filter),
            ServiceError::new(code, "staged failure"),
        );
    }

    /// Records a prior submission so cooldown checks and retake rejections
    /// have something to compute against.
    pub fn record_submission(&self, user_id: Uuid, instrument: InstrumentType, at: DateTime<Utc>) {
        lock(&self.last_submissions).insert((user_id, instrument), at);
    }

    /// Fails the cooldown lookup for one instrument.
    pub fn stage_cooldown_failure(&self, instrument: InstrumentType, code: &str) {
        lock(&self.cooldown_failures)
            .insert(instrument, ServiceError::new(code, "staged failure"));
    }

    /// Overrides the next submission outcome entirely.
    pub fn stage_submit_outcome(&self, outcome: Result<SubmissionReceipt, SubmitRejection>) {
        *lock(&self.submit_outcome) = Some(outcome);
    }

    pub fn query_calls(&self, instrument: InstrumentType, filter: &FilterSet) -> usize {
        lock(&self.query_calls)
            .get(&filter_key(instrument, filter))
            .copied()
            .unwrap_or(0)
    }

    pub fn cooldown_calls(&self, instrument: InstrumentType) -> usize {
        lock(&self.cooldown_calls)
            .get(&instrument)
            .copied()
            .unwrap_or(0)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    async fn pace(&self, key: &str) -> Result<(), ServiceError> {
        let delay = lock(&self.delays).get(key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(e) = lock(&self.failures).get(key).cloned() {
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl AggregateQuery for FakePlatform {
    async fn query(
        &self,
        instrument: InstrumentType,
        filter: &FilterSet,
    ) -> Result<Vec<AggregateRow>, ServiceError> {
        let key = filter_key(instrument, filter);
        *lock(&self.query_calls).entry(key.clone()).or_insert(0) += 1;
        self.pace(&key).await?;
        Ok(lock(&self.rows).get(&key).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl StudentDirectory for FakePlatform {
    async fn query_students(
        &self,
        instrument: InstrumentType,
        filter: &FilterSet,
    ) -> Result<Vec<StudentSummary>, ServiceError> {
        let key = filter_key(instrument, filter);
        *lock(&self.query_calls).entry(key.clone()).or_insert(0) += 1;
        self.pace(&key).await?;
        Ok(lock(&self.students).get(&key).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl CooldownQuery for FakePlatform {
    async fn last_submission(
        &self,
        user_id: Uuid,
        instrument: InstrumentType,
    ) -> Result<Option<DateTime<Utc>>, ServiceError> {
        *lock(&self.cooldown_calls).entry(instrument).or_insert(0) += 1;
        if let Some(e) = lock(&self.cooldown_failures).get(&instrument).cloned() {
            return Err(e);
        }
        Ok(lock(&self.last_submissions)
            .get(&(user_id, instrument))
            .copied())
    }
}

#[async_trait]
impl SubmissionGateway for FakePlatform {
    async fn submit(
        &self,
        user_id: Uuid,
        instrument: InstrumentType,
        responses: &ResponseMap,
    ) -> Result<SubmissionReceipt, SubmitRejection> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(outcome) = lock(&self.submit_outcome).take() {
            return outcome;
        }

        let now = Utc::now();
        if let Some(interval) = instrument.definition().cooldown_days {
            let last = lock(&self.last_submissions)
                .get(&(user_id, instrument))
                .copied();
            let status = status_for(last, interval, now);
            if status.is_active {
                return Err(SubmitRejection::CooldownActive(status));
            }
        }

        let score = scoring::compute_score(instrument, responses);
        lock(&self.last_submissions).insert((user_id, instrument), now);
        Ok(SubmissionReceipt {
            score,
            severity: severity::classify(instrument, score),
            cooldown: instrument
                .definition()
                .cooldown_days
                .map(|interval| status_for(Some(now), interval, now)),
        })
    }
}
