use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of screening instruments the platform administers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentType {
    Anxiety,
    Depression,
    Stress,
    Suicide,
    Checklist,
}

impl InstrumentType {
    pub const ALL: [InstrumentType; 5] = [
        InstrumentType::Anxiety,
        InstrumentType::Depression,
        InstrumentType::Stress,
        InstrumentType::Suicide,
        InstrumentType::Checklist,
    ];

    /// The three screeners shown together on the student dashboard; the
    /// cooldown batch covers exactly these.
    pub const SCREENERS: [InstrumentType; 3] = [
        InstrumentType::Anxiety,
        InstrumentType::Depression,
        InstrumentType::Stress,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InstrumentType::Anxiety => "anxiety",
            InstrumentType::Depression => "depression",
            InstrumentType::Stress => "stress",
            InstrumentType::Suicide => "suicide",
            InstrumentType::Checklist => "checklist",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            InstrumentType::Anxiety => "Anxiety (GAD-7)",
            InstrumentType::Depression => "Depression (PHQ-9)",
            InstrumentType::Stress => "Perceived Stress (PSS-10)",
            InstrumentType::Suicide => "Suicide Risk Screen",
            InstrumentType::Checklist => "Problem Checklist",
        }
    }

    pub fn definition(self) -> &'static InstrumentDefinition {
        match self {
            InstrumentType::Anxiety => &ANXIETY,
            InstrumentType::Depression => &DEPRESSION,
            InstrumentType::Stress => &STRESS,
            InstrumentType::Suicide => &SUICIDE,
            InstrumentType::Checklist => &CHECKLIST,
        }
    }

    /// Inclusive value bounds for one item. Most instruments use a single
    /// scale; the risk screen mixes yes/no items with an ordinal timeframe.
    pub fn value_range(self, index: usize) -> (i64, i64) {
        match (self, index) {
            (InstrumentType::Suicide, 6) => (0, 2),
            (InstrumentType::Suicide, _) => (0, 1),
            (InstrumentType::Stress, _) => (0, 4),
            (InstrumentType::Checklist, _) => (0, 1),
            (InstrumentType::Anxiety, _) | (InstrumentType::Depression, _) => (0, 3),
        }
    }

    /// Prerequisite table driving conditional visibility. An item listed
    /// here is on screen only while its requirement holds against the
    /// current response map; items not listed are always visible.
    pub fn prerequisites(self) -> &'static [PrereqRule] {
        match self {
            InstrumentType::Anxiety => &ANXIETY_PREREQS,
            InstrumentType::Depression => &DEPRESSION_PREREQS,
            InstrumentType::Stress | InstrumentType::Checklist => &[],
            InstrumentType::Suicide => &SUICIDE_PREREQS,
        }
    }
}

static ANXIETY: InstrumentDefinition = InstrumentDefinition {
    item_count: 8,
    scored_items: (0, 7),
    reversed_items: &[],
    cooldown_days: Some(14),
    max_score: 21,
};

static DEPRESSION: InstrumentDefinition = InstrumentDefinition {
    item_count: 10,
    scored_items: (0, 9),
    reversed_items: &[],
    cooldown_days: Some(14),
    max_score: 27,
};

static STRESS: InstrumentDefinition = InstrumentDefinition {
    item_count: 10,
    scored_items: (0, 10),
    reversed_items: &[3, 4, 6, 7],
    cooldown_days: Some(30),
    max_score: 40,
};

static SUICIDE: InstrumentDefinition = InstrumentDefinition {
    item_count: 7,
    scored_items: (0, 7),
    reversed_items: &[],
    cooldown_days: None,
    max_score: 8,
};

static CHECKLIST: InstrumentDefinition = InstrumentDefinition {
    item_count: 16,
    scored_items: (0, 16),
    reversed_items: &[],
    cooldown_days: None,
    max_score: 16,
};

// Anxiety/depression: the difficulty follow-up appears once any base item
// is positive. Suicide: items 2-5 hang off an affirmative item 1, and the
// timeframe item hangs off preparatory behavior.
static ANXIETY_PREREQS: [PrereqRule; 1] = [PrereqRule {
    item: 7,
    requires: Requirement::AnyPositive { start: 0, end: 7 },
}];

static DEPRESSION_PREREQS: [PrereqRule; 1] = [PrereqRule {
    item: 9,
    requires: Requirement::AnyPositive { start: 0, end: 9 },
}];

static SUICIDE_PREREQS: [PrereqRule; 5] = [
    PrereqRule {
        item: 2,
        requires: Requirement::Equals { index: 1, value: 1 },
    },
    PrereqRule {
        item: 3,
        requires: Requirement::Equals { index: 1, value: 1 },
    },
    PrereqRule {
        item: 4,
        requires: Requirement::Equals { index: 1, value: 1 },
    },
    PrereqRule {
        item: 5,
        requires: Requirement::Equals { index: 1, value: 1 },
    },
    PrereqRule {
        item: 6,
        requires: Requirement::Equals { index: 5, value: 1 },
    },
];

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static shape of one instrument: item layout, scoring adjustments and
/// retake policy.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentDefinition {
    /// Total items, conditional follow-ups included.
    pub item_count: usize,
    /// Half-open index range of the items that contribute to the score.
    pub scored_items: (usize, usize),
    /// Items whose contribution is reversed (positively worded).
    pub reversed_items: &'static [usize],
    /// Minimum days between submissions; `None` means retake anytime.
    pub cooldown_days: Option<i64>,
    /// Highest reachable score.
    pub max_score: i64,
}

/// How a conditional item earns its place on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any item in `[start, end)` holds a value above zero.
    AnyPositive { start: usize, end: usize },
    /// A specific item holds a specific value.
    Equals { index: usize, value: i64 },
}

/// One row of the prerequisite table.
#[derive(Debug, Clone, Copy)]
pub struct PrereqRule {
    pub item: usize,
    pub requires: Requirement,
}
