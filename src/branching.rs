use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::EngineError;
use crate::instrument::{InstrumentType, Requirement};
use crate::scoring;
use crate::services::{SubmissionGateway, SubmissionReceipt, SubmitRejection};
use crate::severity::{self, SeverityLevel};

/// Raw answers keyed by zero-based question index. Keys exist only for
/// questions the respondent has actually answered; the map is the entire
/// questionnaire state, and visibility is always recomputed from it.
pub type ResponseMap = BTreeMap<usize, i64>;

fn requirement_met(requires: Requirement, responses: &ResponseMap) -> bool {
    match requires {
        Requirement::AnyPositive { start, end } => {
            responses.range(start..end).any(|(_, value)| *value > 0)
        }
        Requirement::Equals { index, value } => responses.get(&index) == Some(&value),
    }
}

/// Whether `index` is currently on screen given the answers so far.
pub fn is_visible(instrument: InstrumentType, responses: &ResponseMap, index: usize) -> bool {
    if index >= instrument.definition().item_count {
        return false;
    }
    instrument
        .prerequisites()
        .iter()
        .filter(|rule| rule.item == index)
        .all(|rule| requirement_met(rule.requires, responses))
}

/// All currently visible question indices, in order.
pub fn visible_items(instrument: InstrumentType, responses: &ResponseMap) -> Vec<usize> {
    (0..instrument.definition().item_count)
        .filter(|index| is_visible(instrument, responses, *index))
        .collect()
}

/// Visible items that have no answer yet.
pub fn missing_items(instrument: InstrumentType, responses: &ResponseMap) -> Vec<usize> {
    visible_items(instrument, responses)
        .into_iter()
        .filter(|index| !responses.contains_key(index))
        .collect()
}

/// Answered items that are no longer visible. The cascade keeps this empty
/// after every mutation; completion checks recompute it anyway instead of
/// trusting that.
pub fn stray_items(instrument: InstrumentType, responses: &ResponseMap) -> Vec<usize> {
    responses
        .keys()
        .copied()
        .filter(|index| !is_visible(instrument, responses, *index))
        .collect()
}

/// A map is complete when every visible item is answered and nothing
/// invisible still holds an answer.
pub fn is_complete(instrument: InstrumentType, responses: &ResponseMap) -> bool {
    missing_items(instrument, responses).is_empty() && stray_items(instrument, responses).is_empty()
}

/// Deletes answers whose prerequisite no longer holds, repeating until the
/// map is stable: retracting one answer can strip visibility from another
/// further down the chain. Returns the removed indices.
pub fn cascade_clear(instrument: InstrumentType, responses: &mut ResponseMap) -> Vec<usize> {
    let mut removed = Vec::new();
    loop {
        let stray = stray_items(instrument, responses);
        if stray.is_empty() {
            break;
        }
        for index in stray {
            responses.remove(&index);
            removed.push(index);
        }
    }
    removed
}

/// Live feedback for the current response map, shown before submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorePreview {
    pub score: i64,
    pub severity: SeverityLevel,
}

/// Drives one questionnaire attempt for one student and instrument.
///
/// The response map is the only state. Every mutation goes through
/// [`answer`](Self::answer) or [`retract`](Self::retract) so the cascade
/// keeps dependent answers consistent with their prerequisites, and
/// [`submit`](Self::submit) refuses to touch the network while the map is
/// incomplete.
pub struct QuestionnaireSession<G: ?Sized> {
    gateway: Arc<G>,
    user_id: Uuid,
    instrument: InstrumentType,
    responses: ResponseMap,
}

impl<G: SubmissionGateway + ?Sized> QuestionnaireSession<G> {
    pub fn new(gateway: Arc<G>, user_id: Uuid, instrument: InstrumentType) -> Self {
        Self {
            gateway,
            user_id,
            instrument,
            responses: ResponseMap::new(),
        }
    }

    pub fn instrument(&self) -> InstrumentType {
        self.instrument
    }

    pub fn responses(&self) -> &ResponseMap {
        &self.responses
    }

    pub fn visible_items(&self) -> Vec<usize> {
        visible_items(self.instrument, &self.responses)
    }

    pub fn is_complete(&self) -> bool {
        is_complete(self.instrument, &self.responses)
    }

    /// Records an answer and runs the cascade. Returns the indices of any
    /// dependent answers that were cleared by this change.
    pub fn answer(&mut self, index: usize, value: i64) -> Result<Vec<usize>, EngineError> {
        if !is_visible(self.instrument, &self.responses, index) {
            return Err(EngineError::InvalidAnswer {
                index,
                message: "question is not currently visible".to_string(),
            });
        }
        let (lo, hi) = self.instrument.value_range(index);
        if value < lo || value > hi {
            return Err(EngineError::InvalidAnswer {
                index,
                message: format!("value must be between {} and {}", lo, hi),
            });
        }
        self.responses.insert(index, value);
        let removed = cascade_clear(self.instrument, &mut self.responses);
        if !removed.is_empty() {
            tracing::debug!(
                instrument = %self.instrument,
                item = index,
                cleared = ?removed,
                "cascade cleared dependent answers"
            );
        }
        Ok(removed)
    }

    /// Removes an answer and runs the cascade over whatever depended on it.
    pub fn retract(&mut self, index: usize) -> Vec<usize> {
        self.responses.remove(&index);
        cascade_clear(self.instrument, &mut self.responses)
    }

    /// Score and severity for the map as it stands.
    pub fn preview(&self) -> ScorePreview {
        let score = scoring::compute_score(self.instrument, &self.responses);
        ScorePreview {
            score,
            severity: severity::classify(self.instrument, score),
        }
    }

    /// Hands the completed map to the platform. An incomplete map is
    /// rejected here, before any network call; a cooldown rejection from the
    /// gateway carries the server's authoritative window and overrides
    /// anything cached locally. The map is discarded once accepted.
    pub async fn submit(&mut self) -> Result<SubmissionReceipt, EngineError> {
        let missing = missing_items(self.instrument, &self.responses);
        let stray = stray_items(self.instrument, &self.responses);
        if !missing.is_empty() || !stray.is_empty() {
            return Err(EngineError::Incomplete { missing, stray });
        }
        match self
            .gateway
            .submit(self.user_id, self.instrument, &self.responses)
            .await
        {
            Ok(receipt) => {
                self.responses.clear();
                Ok(receipt)
            }
            Err(SubmitRejection::CooldownActive(status)) => {
                tracing::debug!(instrument = %self.instrument, "submission inside cooldown window");
                Err(EngineError::CooldownActive(status))
            }
            Err(SubmitRejection::Failed(e)) => Err(EngineError::Fetch(e)),
        }
    }
}
