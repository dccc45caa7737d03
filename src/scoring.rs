use crate::branching::{visible_items, ResponseMap};
use crate::instrument::InstrumentType;

fn clamped(instrument: InstrumentType, index: usize, value: i64) -> i64 {
    let (lo, hi) = instrument.value_range(index);
    value.clamp(lo, hi)
}

/// Computes the instrument score for a raw response map.
///
/// Pure and total: extraneous keys are ignored, missing scored items
/// contribute zero, and out-of-range values are clamped to the item's scale.
/// The conditional follow-up items (anxiety item 7, depression item 9) are
/// never part of the sum. The risk screen sums only the items currently
/// visible under its prerequisite table; the checklist is a flag count, not
/// a weighted sum.
pub fn compute_score(instrument: InstrumentType, responses: &ResponseMap) -> i64 {
    let def = instrument.definition();
    let (start, end) = def.scored_items;
    match instrument {
        InstrumentType::Checklist => (start..end)
            .filter(|i| responses.get(i).copied().unwrap_or(0) > 0)
            .count() as i64,
        InstrumentType::Suicide => visible_items(instrument, responses)
            .into_iter()
            .filter_map(|i| responses.get(&i).map(|v| clamped(instrument, i, *v)))
            .sum(),
        _ => (start..end)
            .filter_map(|i| {
                let value = clamped(instrument, i, *responses.get(&i)?);
                Some(if def.reversed_items.contains(&i) {
                    let (_, hi) = instrument.value_range(i);
                    hi - value
                } else {
                    value
                })
            })
            .sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(usize, i64)]) -> ResponseMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn gad7_is_the_sum_of_the_seven_base_items() {
        let responses = map(&[(0, 3), (1, 2), (2, 1), (3, 0), (4, 3), (5, 2), (6, 1)]);
        assert_eq!(compute_score(InstrumentType::Anxiety, &responses), 12);
    }

    #[test]
    fn gad7_difficulty_item_never_contributes() {
        let mut responses = map(&[(0, 1), (1, 1), (2, 1), (3, 1), (4, 1), (5, 1), (6, 1)]);
        assert_eq!(compute_score(InstrumentType::Anxiety, &responses), 7);
        responses.insert(7, 3);
        assert_eq!(compute_score(InstrumentType::Anxiety, &responses), 7);
    }

    #[test]
    fn gad7_extremes_hit_the_published_range() {
        assert_eq!(compute_score(InstrumentType::Anxiety, &ResponseMap::new()), 0);
        let ceiling = map(&[(0, 3), (1, 3), (2, 3), (3, 3), (4, 3), (5, 3), (6, 3)]);
        assert_eq!(compute_score(InstrumentType::Anxiety, &ceiling), 21);
    }

    #[test]
    fn phq9_includes_the_self_harm_item_in_the_sum() {
        let without = map(&[(0, 2), (1, 2), (2, 2), (3, 2), (4, 2), (5, 2), (6, 2), (7, 2)]);
        let with: ResponseMap = {
            let mut m = without.clone();
            m.insert(8, 3);
            m
        };
        assert_eq!(compute_score(InstrumentType::Depression, &without), 16);
        assert_eq!(compute_score(InstrumentType::Depression, &with), 19);
    }

    #[test]
    fn pss10_reverses_the_positively_worded_items() {
        // Item 3 is reverse scored: answering 0 contributes 4, answering 4
        // contributes 0. Item 0 is direct.
        assert_eq!(compute_score(InstrumentType::Stress, &map(&[(3, 0)])), 4);
        assert_eq!(compute_score(InstrumentType::Stress, &map(&[(3, 4)])), 0);
        assert_eq!(compute_score(InstrumentType::Stress, &map(&[(0, 4)])), 4);

        let reversed_only = map(&[(3, 0), (4, 0), (6, 0), (7, 0)]);
        assert_eq!(compute_score(InstrumentType::Stress, &reversed_only), 16);
    }

    #[test]
    fn pss10_midpoint_is_symmetric_under_reversal() {
        // 4 - 2 = 2, so an all-twos sheet scores 20 no matter which items
        // the reversal table names.
        let responses: ResponseMap = (0..10).map(|i| (i, 2)).collect();
        assert_eq!(compute_score(InstrumentType::Stress, &responses), 20);
    }

    #[test]
    fn suicide_score_counts_only_visible_answers() {
        // Item 1 answered "no": the follow-ups are invisible, so a stale
        // answer on item 2 cannot leak into the score.
        let responses = map(&[(0, 1), (1, 0), (2, 1)]);
        assert_eq!(compute_score(InstrumentType::Suicide, &responses), 1);

        let full = map(&[(0, 1), (1, 1), (2, 1), (3, 1), (4, 1), (5, 1), (6, 2)]);
        assert_eq!(compute_score(InstrumentType::Suicide, &full), 8);
    }

    #[test]
    fn checklist_is_a_count_not_a_sum() {
        let responses = map(&[(0, 1), (1, 0), (2, 1), (5, 1), (9, 0)]);
        assert_eq!(compute_score(InstrumentType::Checklist, &responses), 3);
    }

    #[test]
    fn extraneous_keys_are_ignored() {
        let responses = map(&[(0, 3), (40, 3), (99, 3)]);
        assert_eq!(compute_score(InstrumentType::Anxiety, &responses), 3);
    }

    #[test]
    fn out_of_range_values_are_clamped_to_the_scale() {
        let responses = map(&[(0, 9), (1, -2)]);
        assert_eq!(compute_score(InstrumentType::Anxiety, &responses), 3);
    }
}
