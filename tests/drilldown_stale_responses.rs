
use std::sync::Arc;
use std::time::Duration;

use mindcheck_core::{FilterSet, InsightsEngine, InstrumentType, LevelKind};
use test_support::{program_filter, row, staged_platform};

#[tokio::test]
async fn the_response_that_lands_last_wins() {
    let platform = staged_platform(InstrumentType::Anxiety);
    platform.stage_rows(
        InstrumentType::Anxiety,
        &program_filter("BSED"),
        vec![row("1st Year", 7, "#1E88E5")],
    );
    // The first drill is slow; the second resolves while it is in flight.
    platform.stage_delay(
        InstrumentType::Anxiety,
        &program_filter("BSIT"),
        Duration::from_millis(80),
    );

    let engine = Arc::new(InsightsEngine::new(platform, InstrumentType::Anxiety));
    engine
        .fetch_insights(FilterSet::default())
        .await
        .expect("overview fetch");

    let slow = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.drill_down("BSIT").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let fast = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.drill_down("BSED").await })
    };

    fast.await.expect("join").expect("fast drill");
    slow.await.expect("join").expect("slow drill resolves harmlessly");

    assert_eq!(engine.stack_depth(), 2, "only the newest level is applied");
    let level = engine.current_level().expect("program level");
    assert_eq!(level.kind, LevelKind::Program);
    assert_eq!(level.accumulated_filter.program.as_deref(), Some("BSED"));
    assert!(!engine.is_loading());
}

#[tokio::test]
async fn an_older_response_cannot_stack_on_top_of_a_newer_one() {
    let platform = staged_platform(InstrumentType::Anxiety);
    platform.stage_rows(
        InstrumentType::Anxiety,
        &program_filter("BSED"),
        vec![row("1st Year", 7, "#1E88E5")],
    );
    // Both drills are issued from the overview before either lands; the
    // first applies early and the second must replace it, not append to it.
    platform.stage_delay(
        InstrumentType::Anxiety,
        &program_filter("BSIT"),
        Duration::from_millis(20),
    );
    platform.stage_delay(
        InstrumentType::Anxiety,
        &program_filter("BSED"),
        Duration::from_millis(60),
    );

    let engine = Arc::new(InsightsEngine::new(platform, InstrumentType::Anxiety));
    engine
        .fetch_insights(FilterSet::default())
        .await
        .expect("overview fetch");

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.drill_down("BSIT").await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.drill_down("BSED").await })
    };

    first.await.expect("join").expect("first drill");
    second.await.expect("join").expect("second drill");

    assert_eq!(engine.stack_depth(), 2, "the stale base level is replaced, not grown");
    let level = engine.current_level().expect("program level");
    assert_eq!(level.accumulated_filter.program.as_deref(), Some("BSED"));
}

#[tokio::test]
async fn a_disposed_view_ignores_late_responses() {
    let platform = staged_platform(InstrumentType::Anxiety);
    platform.stage_delay(
        InstrumentType::Anxiety,
        &FilterSet::default(),
        Duration::from_millis(50),
    );

    let engine = Arc::new(InsightsEngine::new(platform, InstrumentType::Anxiety));
    let pending = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.fetch_insights(FilterSet::default()).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    engine.dispose();

    pending.await.expect("join").expect("fetch resolves into the void");
    assert_eq!(engine.stack_depth(), 0, "nothing was applied after teardown");
    assert!(engine.current_level().is_none());
    assert!(!engine.is_loading());

    let err = engine
        .fetch_insights(FilterSet::default())
        .await
        .expect_err("a disposed engine refuses new work");
    assert_eq!(err.code(), "bad_navigation");
}

#[tokio::test]
async fn a_stale_failure_does_not_clear_a_newer_loading_state() {
    let platform = staged_platform(InstrumentType::Anxiety);
    platform.stage_failure(InstrumentType::Anxiety, &program_filter("BSED"), "backend_down");
    platform.stage_delay(
        InstrumentType::Anxiety,
        &program_filter("BSED"),
        Duration::from_millis(30),
    );
    platform.stage_delay(
        InstrumentType::Anxiety,
        &program_filter("BSIT"),
        Duration::from_millis(60),
    );

    let engine = Arc::new(InsightsEngine::new(platform, InstrumentType::Anxiety));
    engine
        .fetch_insights(FilterSet::default())
        .await
        .expect("overview fetch");

    // The failing drill is issued first; a newer, slower drill is already in
    // flight by the time the failure lands.
    let failing = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.drill_down("BSED").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let slow = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.drill_down("BSIT").await })
    };

    failing.await.expect("join").expect_err("staged failure surfaces");
    assert!(
        engine.is_loading(),
        "the newer request is still in flight and keeps the flag up"
    );

    slow.await.expect("join").expect("slow drill");
    assert!(!engine.is_loading());
    let level = engine.current_level().expect("program level");
    assert_eq!(level.accumulated_filter.program.as_deref(), Some("BSIT"));
}
