//! Client-resident core of the MindCheck guidance platform.
//!
//! The host application is thin glue over a REST backend; everything with
//! real semantics lives here: questionnaire scoring and conditional
//! branching, severity classification, retake cooldown gating, and the
//! hierarchical drill-down analytics navigation. Transport, persistence and
//! presentation stay on the other side of the service traits in
//! [`services`].

pub mod branching;
pub mod cooldown;
pub mod drilldown;
pub mod error;
pub mod instrument;
pub mod scoring;
pub mod services;
pub mod severity;

pub use branching::{QuestionnaireSession, ResponseMap, ScorePreview};
pub use cooldown::{CooldownGate, CooldownStatus, ScreenerCooldowns};
pub use drilldown::{
    AggregateRow, DrilldownLevel, FilterSet, InsightsEngine, LevelKind, StudentSummary,
};
pub use error::EngineError;
pub use instrument::InstrumentType;
pub use services::{
    AggregateQuery, CooldownQuery, ServiceError, StudentDirectory, SubmissionGateway,
    SubmissionReceipt, SubmitRejection,
};
pub use severity::SeverityLevel;
