
use std::sync::Arc;

use uuid::Uuid;

use mindcheck_core::services::FakePlatform;
use mindcheck_core::{EngineError, InstrumentType, QuestionnaireSession};

fn session(instrument: InstrumentType) -> QuestionnaireSession<FakePlatform> {
    QuestionnaireSession::new(Arc::new(FakePlatform::new()), Uuid::new_v4(), instrument)
}

#[test]
fn retracting_active_thoughts_clears_every_follow_up() {
    let mut s = session(InstrumentType::Suicide);
    for (index, value) in [(0, 1), (1, 1), (2, 1), (3, 1), (4, 1), (5, 1), (6, 1)] {
        s.answer(index, value).expect("answer in order");
    }
    assert!(s.is_complete());

    let mut removed = s.answer(1, 0).expect("flip item 1 to no");
    removed.sort_unstable();
    assert_eq!(removed, vec![2, 3, 4, 5, 6]);

    let remaining: Vec<usize> = s.responses().keys().copied().collect();
    assert_eq!(remaining, vec![0, 1]);
    assert!(
        s.is_complete(),
        "the closed path is complete with just items 0 and 1"
    );
}

#[test]
fn clearing_preparatory_behavior_takes_the_timeframe_with_it() {
    let mut s = session(InstrumentType::Suicide);
    for (index, value) in [(0, 1), (1, 1), (2, 0), (3, 0), (4, 0), (5, 1), (6, 2)] {
        s.answer(index, value).expect("answer in order");
    }
    let removed = s.answer(5, 0).expect("retract preparatory behavior");
    assert_eq!(removed, vec![6]);
    assert!(s.is_complete());
}

#[test]
fn difficulty_item_is_cleared_when_the_last_positive_base_drops() {
    for instrument in [InstrumentType::Anxiety, InstrumentType::Depression] {
        let mut s = session(instrument);
        s.answer(0, 2).expect("positive base item");
        let follow_up = instrument.definition().item_count - 1;
        s.answer(follow_up, 2).expect("difficulty follow-up");

        let removed = s.answer(0, 0).expect("base back to zero");
        assert_eq!(removed, vec![follow_up], "{} follow-up must clear", instrument);
        assert!(!s.responses().contains_key(&follow_up));
    }
}

#[test]
fn difficulty_item_survives_while_another_base_is_positive() {
    let mut s = session(InstrumentType::Anxiety);
    s.answer(0, 2).expect("first base");
    s.answer(3, 1).expect("second base");
    s.answer(7, 2).expect("difficulty follow-up");

    let removed = s.answer(0, 0).expect("first base back to zero");
    assert!(removed.is_empty());
    assert_eq!(s.responses().get(&7), Some(&2));
}

#[test]
fn answers_to_invisible_items_are_rejected() {
    let mut s = session(InstrumentType::Suicide);
    s.answer(0, 0).expect("item 0");
    s.answer(1, 0).expect("item 1 = no");

    let err = s.answer(2, 1).expect_err("item 2 is not visible");
    assert_eq!(err.code(), "bad_answer");
    assert!(matches!(err, EngineError::InvalidAnswer { index: 2, .. }));
}

#[test]
fn out_of_range_values_are_rejected() {
    let mut s = session(InstrumentType::Anxiety);
    let err = s.answer(0, 4).expect_err("GAD-7 items top out at 3");
    assert_eq!(err.code(), "bad_answer");
    assert!(s.responses().is_empty());
}

#[test]
fn retract_cascades_like_any_other_mutation() {
    let mut s = session(InstrumentType::Anxiety);
    s.answer(2, 1).expect("only positive base");
    s.answer(7, 3).expect("difficulty follow-up");

    let removed = s.retract(2);
    assert_eq!(removed, vec![7]);
    assert!(s.responses().is_empty());
}

#[test]
fn stress_and_checklist_have_no_conditional_items() {
    let mut s = session(InstrumentType::Stress);
    assert_eq!(s.visible_items(), (0..10).collect::<Vec<_>>());
    for index in 0..10 {
        s.answer(index, 2).expect("every stress item is visible");
    }
    assert!(s.is_complete());

    let mut c = session(InstrumentType::Checklist);
    assert_eq!(c.visible_items(), (0..16).collect::<Vec<_>>());
    for index in 0..16 {
        c.answer(index, (index % 2 == 0) as i64).expect("every category is visible");
    }
    assert!(c.is_complete());
}
