use serde::{Deserialize, Serialize};

use crate::instrument::InstrumentType;

/// Ordinal interpretation bucket for a computed score.
///
/// The first five cover the anxiety/depression screeners, low/high extend
/// the stress and risk scales, and the last three are the checklist's
/// descriptive concern tiers. Ordering within one instrument's table is what
/// matters; the enum itself is a shared vocabulary across the scoring and
/// analytics views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeverityLevel {
    Minimal,
    Mild,
    Moderate,
    ModeratelySevere,
    Severe,
    Low,
    High,
    Manageable,
    ModerateConcern,
    HighConcern,
}

impl SeverityLevel {
    pub fn label(self) -> &'static str {
        match self {
            SeverityLevel::Minimal => "Minimal",
            SeverityLevel::Mild => "Mild",
            SeverityLevel::Moderate => "Moderate",
            SeverityLevel::ModeratelySevere => "Moderately Severe",
            SeverityLevel::Severe => "Severe",
            SeverityLevel::Low => "Low",
            SeverityLevel::High => "High",
            SeverityLevel::Manageable => "Manageable",
            SeverityLevel::ModerateConcern => "Moderate Concern",
            SeverityLevel::HighConcern => "High Concern",
        }
    }

    /// Chart color used wherever this level is rendered as a bucket.
    pub fn color(self) -> &'static str {
        match self {
            SeverityLevel::Minimal | SeverityLevel::Low | SeverityLevel::Manageable => "#4CAF50",
            SeverityLevel::Mild => "#FFC107",
            SeverityLevel::Moderate | SeverityLevel::ModerateConcern => "#FF9800",
            SeverityLevel::ModeratelySevere => "#F4511E",
            SeverityLevel::Severe | SeverityLevel::High | SeverityLevel::HighConcern => "#D32F2F",
        }
    }

    /// One-line interpretation shown next to a result.
    pub fn guidance(self) -> &'static str {
        match self {
            SeverityLevel::Minimal => "No action needed; rescreen on the usual schedule.",
            SeverityLevel::Mild => "Watchful waiting; offer self-help resources.",
            SeverityLevel::Moderate => "Recommend a counseling session.",
            SeverityLevel::ModeratelySevere => "Schedule a counseling session promptly.",
            SeverityLevel::Severe => "Prioritize for immediate follow-up.",
            SeverityLevel::Low => "Within the typical range.",
            SeverityLevel::High => "Flag for counselor review.",
            SeverityLevel::Manageable => "Concerns are within a manageable range.",
            SeverityLevel::ModerateConcern => "Several problem areas; suggest a check-in.",
            SeverityLevel::HighConcern => "Broad problem areas; schedule a consultation.",
        }
    }
}

/// Per-instrument threshold table as ordered (inclusive upper bound, level)
/// pairs. Bounds ascend strictly and cover the full score range with no
/// gaps, so a plain first-match walk is total.
pub fn thresholds(instrument: InstrumentType) -> &'static [(i64, SeverityLevel)] {
    match instrument {
        InstrumentType::Anxiety => &[
            (4, SeverityLevel::Minimal),
            (9, SeverityLevel::Mild),
            (14, SeverityLevel::Moderate),
            (21, SeverityLevel::Severe),
        ],
        InstrumentType::Depression => &[
            (4, SeverityLevel::Minimal),
            (9, SeverityLevel::Mild),
            (14, SeverityLevel::Moderate),
            (19, SeverityLevel::ModeratelySevere),
            (27, SeverityLevel::Severe),
        ],
        InstrumentType::Stress => &[
            (13, SeverityLevel::Low),
            (26, SeverityLevel::Moderate),
            (40, SeverityLevel::High),
        ],
        InstrumentType::Suicide => &[
            (1, SeverityLevel::Low),
            (3, SeverityLevel::Moderate),
            (8, SeverityLevel::High),
        ],
        InstrumentType::Checklist => &[
            (5, SeverityLevel::Manageable),
            (10, SeverityLevel::ModerateConcern),
            (16, SeverityLevel::HighConcern),
        ],
    }
}

/// First band whose upper bound covers the score wins; boundary values are
/// exact cut points. A score above the table ceiling folds into the top
/// band.
pub fn classify(instrument: InstrumentType, score: i64) -> SeverityLevel {
    let table = thresholds(instrument);
    table
        .iter()
        .find(|(upper, _)| score <= *upper)
        .map(|(_, level)| *level)
        .unwrap_or(table[table.len() - 1].1)
}
