use thiserror::Error;

use crate::cooldown::CooldownStatus;
use crate::services::ServiceError;

/// Everything the engines can surface to the presentation layer.
///
/// Scoring, classification and branching are pure and cannot fail; every
/// failure here originates at the service boundary or from a rejected local
/// mutation. Each variant exposes a stable machine [`code`](Self::code) next
/// to its display message, matching the error envelope the rest of the
/// client maps onto toasts and banners. Nothing in the core panics or
/// escapes the engine boundary untyped.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A query against the platform backend failed. The owning engine has
    /// already rolled back to the last successfully displayed state.
    #[error("{0}")]
    Fetch(ServiceError),

    /// The server refused a retake inside the cooldown window. The carried
    /// status is authoritative and overrides anything cached locally.
    #[error("retake available in {} day(s)", .0.days_remaining)]
    CooldownActive(CooldownStatus),

    /// Submission was attempted before every visible question was answered
    /// (or while a stale answer lingered on an invisible one).
    #[error("questionnaire has unanswered or stale items")]
    Incomplete {
        missing: Vec<usize>,
        stray: Vec<usize>,
    },

    /// An answer was rejected before it touched the response map.
    #[error("invalid answer for item {index}: {message}")]
    InvalidAnswer { index: usize, message: String },

    /// A drill or back-navigation request the current level cannot satisfy.
    #[error("navigation not possible: {message}")]
    Navigation { message: String },
}

impl EngineError {
    /// Stable machine code for the UI layer.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Fetch(_) => "fetch_failed",
            EngineError::CooldownActive(_) => "cooldown_active",
            EngineError::Incomplete { .. } => "incomplete_responses",
            EngineError::InvalidAnswer { .. } => "bad_answer",
            EngineError::Navigation { .. } => "bad_navigation",
        }
    }
}

impl From<ServiceError> for EngineError {
    fn from(e: ServiceError) -> Self {
        EngineError::Fetch(e)
    }
}
