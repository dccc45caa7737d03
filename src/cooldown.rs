use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::instrument::InstrumentType;
use crate::services::CooldownQuery;

/// Retake eligibility for one user and instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownStatus {
    pub is_active: bool,
    pub last_submission: Option<DateTime<Utc>>,
    pub next_available_date: Option<DateTime<Utc>>,
    pub days_remaining: i64,
}

impl CooldownStatus {
    /// Open window: nothing on record, retake allowed now.
    pub fn inactive() -> Self {
        Self {
            is_active: false,
            last_submission: None,
            next_available_date: None,
            days_remaining: 0,
        }
    }
}

const SECS_PER_DAY: i64 = 86_400;

/// Derives the full status from a last-submission timestamp and an interval
/// in days. `days_remaining` rounds partial days up, so "19.2 days left"
/// reads as 20, and clamps at zero once the window has passed.
pub fn status_for(
    last: Option<DateTime<Utc>>,
    interval_days: i64,
    now: DateTime<Utc>,
) -> CooldownStatus {
    let Some(last) = last else {
        return CooldownStatus::inactive();
    };
    let next = last + Duration::days(interval_days);
    let remaining = next - now;
    let is_active = remaining > Duration::zero();
    let days_remaining = if is_active {
        (remaining.num_seconds() + SECS_PER_DAY - 1) / SECS_PER_DAY
    } else {
        0
    };
    CooldownStatus {
        is_active,
        last_submission: Some(last),
        next_available_date: Some(next),
        days_remaining,
    }
}

/// Computes retake eligibility client-side: the service only supplies the
/// last-submission timestamp, and the instrument policy table owns the
/// arithmetic.
pub struct CooldownGate<Q: ?Sized> {
    service: Arc<Q>,
}

impl<Q: CooldownQuery + ?Sized> CooldownGate<Q> {
    pub fn new(service: Arc<Q>) -> Self {
        Self { service }
    }

    /// Eligibility for one instrument. The safety and diagnostic tools have
    /// no retake policy and never touch the service.
    pub async fn check(
        &self,
        user_id: Uuid,
        instrument: InstrumentType,
    ) -> Result<CooldownStatus, EngineError> {
        let Some(interval) = instrument.definition().cooldown_days else {
            return Ok(CooldownStatus::inactive());
        };
        let last = self
            .service
            .last_submission(user_id, instrument)
            .await
            .map_err(EngineError::Fetch)?;
        Ok(status_for(last, interval, Utc::now()))
    }

    /// The dashboard shows all three screeners at once, so their windows are
    /// fetched concurrently. Each branch settles on its own; one failure
    /// cannot blank the other two cards.
    pub async fn check_screeners(&self, user_id: Uuid) -> ScreenerCooldowns {
        let (anxiety, depression, stress) = tokio::join!(
            self.check(user_id, InstrumentType::Anxiety),
            self.check(user_id, InstrumentType::Depression),
            self.check(user_id, InstrumentType::Stress),
        );
        if let Err(e) = &anxiety {
            tracing::warn!(code = e.code(), "anxiety cooldown fetch failed");
        }
        if let Err(e) = &depression {
            tracing::warn!(code = e.code(), "depression cooldown fetch failed");
        }
        if let Err(e) = &stress {
            tracing::warn!(code = e.code(), "stress cooldown fetch failed");
        }
        ScreenerCooldowns {
            anxiety,
            depression,
            stress,
        }
    }
}

/// Per-branch outcomes of the dashboard cooldown batch.
#[derive(Debug)]
pub struct ScreenerCooldowns {
    pub anxiety: Result<CooldownStatus, EngineError>,
    pub depression: Result<CooldownStatus, EngineError>,
    pub stress: Result<CooldownStatus, EngineError>,
}
