//! Per-date positive rate aggregation
//!
//! Folds the per-state daily records selected by a `StateFilter` into one
//! `AggregatePoint` per date, summing new positives and new tests across the
//! matching states.

use chrono::NaiveDate;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::data::StateDailyRecord;

/// Input token meaning "every state combined"
pub const ALL_STATES_TOKEN: &str = "US";

/// Which records take part in an aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateFilter {
    /// Records of every state
    AllStates,
    /// Records of one state, by upper-case two-letter code
    State(String),
}

impl StateFilter {
    /// Parses operator input; `US` (any case) selects all states
    ///
    /// Returns `None` for blank input.
    pub fn parse(input: &str) -> Option<Self> {
        let code = input.trim().to_uppercase();
        if code.is_empty() {
            None
        } else if code == ALL_STATES_TOKEN {
            Some(StateFilter::AllStates)
        } else {
            Some(StateFilter::State(code))
        }
    }

    /// Whether a record for `state` is selected
    pub fn matches(&self, state: Option<&str>) -> bool {
        match self {
            StateFilter::AllStates => true,
            StateFilter::State(code) => state == Some(code.as_str()),
        }
    }
}

/// Combined statistics for one date
///
/// The rate is derived from the two totals whenever a point is built, so it can
/// never drift from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatePoint {
    date: NaiveDate,
    positive_increment: i64,
    test_increment: i64,
    positive_rate: f64,
}

impl AggregatePoint {
    pub fn new(date: NaiveDate, positive_increment: i64, test_increment: i64) -> Self {
        Self {
            date,
            positive_increment,
            test_increment,
            positive_rate: positive_rate(positive_increment, test_increment),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn positive_increment(&self) -> i64 {
        self.positive_increment
    }

    pub fn test_increment(&self) -> i64 {
        self.test_increment
    }

    /// Positive rate in percent
    pub fn positive_rate(&self) -> f64 {
        self.positive_rate
    }

    /// Returns the sum of two points for the same date
    ///
    /// Points for different dates are not combined; `self` is returned as is.
    /// Totals saturate at the `i64` bounds.
    pub fn merge(&self, other: &AggregatePoint) -> AggregatePoint {
        if self.date != other.date {
            return *self;
        }
        AggregatePoint::new(
            self.date,
            self.positive_increment.saturating_add(other.positive_increment),
            self.test_increment.saturating_add(other.test_increment),
        )
    }
}

/// `positive / tests` as a percentage, or 0 when there were no tests
pub fn positive_rate(positive_increment: i64, test_increment: i64) -> f64 {
    if test_increment == 0 {
        0.0
    } else {
        positive_increment as f64 / test_increment as f64 * 100.0
    }
}

/// Builds one point per date from the records matching `filter`
///
/// Records lacking a date, a positive increase, or a test increase are skipped.
/// The order of the returned points is unspecified.
pub fn aggregate(records: &[StateDailyRecord], filter: &StateFilter) -> Vec<AggregatePoint> {
    let mut by_date: HashMap<NaiveDate, AggregatePoint> = HashMap::new();

    for record in records {
        if !filter.matches(record.state.as_deref()) {
            continue;
        }
        let Some((date, positive, tests)) = record.daily_increments() else {
            continue;
        };

        let candidate = AggregatePoint::new(date, positive, tests);
        match by_date.entry(date) {
            Entry::Occupied(mut slot) => {
                let merged = slot.get().merge(&candidate);
                slot.insert(merged);
            }
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
        }
    }

    by_date.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(date: Option<NaiveDate>, state: &str, positive: Option<i64>, tests: Option<i64>) -> StateDailyRecord {
        StateDailyRecord {
            date,
            state: Some(state.to_string()),
            positive_increase: positive,
            total_test_results_increase: tests,
            ..Default::default()
        }
    }

    fn ca_ny() -> Vec<StateDailyRecord> {
        vec![
            record(Some(day(2020, 1, 1)), "CA", Some(100), Some(1000)),
            record(Some(day(2020, 1, 1)), "NY", Some(50), Some(500)),
        ]
    }

    fn sorted(mut points: Vec<AggregatePoint>) -> Vec<AggregatePoint> {
        points.sort_by_key(|p| p.date());
        points
    }

    #[test]
    fn test_all_states_sums_same_date() {
        let points = aggregate(&ca_ny(), &StateFilter::AllStates);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].date(), day(2020, 1, 1));
        assert_eq!(points[0].positive_increment(), 150);
        assert_eq!(points[0].test_increment(), 1500);
        assert!((points[0].positive_rate() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_state_filter() {
        let points = aggregate(&ca_ny(), &StateFilter::State("CA".to_string()));

        assert_eq!(points, vec![AggregatePoint::new(day(2020, 1, 1), 100, 1000)]);
        assert!((points[0].positive_rate() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_state_yields_nothing() {
        assert!(aggregate(&ca_ny(), &StateFilter::State("TX".to_string())).is_empty());
    }

    #[test]
    fn test_missing_test_increase_is_excluded() {
        let records = vec![record(Some(day(2020, 1, 1)), "CA", Some(100), None)];

        assert!(aggregate(&records, &StateFilter::AllStates).is_empty());
        assert!(aggregate(&records, &StateFilter::State("CA".to_string())).is_empty());
    }

    #[test]
    fn test_missing_date_is_excluded_for_every_filter() {
        let mut records = ca_ny();
        records.push(record(None, "CA", Some(7), Some(70)));

        let cases = [
            (StateFilter::AllStates, 150),
            (StateFilter::State("CA".to_string()), 100),
        ];
        for (filter, expected) in cases {
            let total: i64 = aggregate(&records, &filter)
                .iter()
                .map(|p| p.positive_increment())
                .sum();
            assert_eq!(total, expected, "Undated record leaked into {:?}", filter);
        }
    }

    #[test]
    fn test_missing_positive_increase_is_excluded() {
        let mut records = ca_ny();
        records.push(record(Some(day(2020, 1, 1)), "TX", None, Some(9000)));

        let points = aggregate(&records, &StateFilter::AllStates);

        assert_eq!(points[0].test_increment(), 1500);
    }

    #[test]
    fn test_zero_tests_gives_zero_rate() {
        let records = vec![record(Some(day(2020, 3, 1)), "WY", Some(0), Some(0))];

        let points = aggregate(&records, &StateFilter::AllStates);

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].positive_rate(), 0.0);
    }

    #[test]
    fn test_one_point_per_distinct_date() {
        let records = vec![
            record(Some(day(2020, 4, 2)), "CA", Some(3), Some(30)),
            record(Some(day(2020, 4, 1)), "CA", Some(1), Some(10)),
            record(Some(day(2020, 4, 2)), "NY", Some(5), Some(20)),
            record(Some(day(2020, 4, 3)), "NY", Some(2), Some(8)),
        ];

        let points = sorted(aggregate(&records, &StateFilter::AllStates));

        let dates: Vec<_> = points.iter().map(|p| p.date()).collect();
        assert_eq!(dates, vec![day(2020, 4, 1), day(2020, 4, 2), day(2020, 4, 3)]);
        assert_eq!(points[1].positive_increment(), 8);
        assert_eq!(points[1].test_increment(), 50);
    }

    #[test]
    fn test_record_order_does_not_change_totals() {
        let mut records = vec![
            record(Some(day(2020, 5, 1)), "CA", Some(11), Some(101)),
            record(Some(day(2020, 5, 1)), "NY", Some(22), Some(202)),
            record(Some(day(2020, 5, 1)), "TX", Some(33), Some(303)),
            record(Some(day(2020, 5, 2)), "TX", Some(4), Some(40)),
        ];
        let forward = sorted(aggregate(&records, &StateFilter::AllStates));
        records.reverse();
        let backward = sorted(aggregate(&records, &StateFilter::AllStates));

        assert_eq!(forward, backward);
        assert_eq!(forward[0].positive_increment(), 66);
        assert_eq!(forward[0].test_increment(), 606);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let records = ca_ny();
        let first = sorted(aggregate(&records, &StateFilter::AllStates));
        let second = sorted(aggregate(&records, &StateFilter::AllStates));
        assert_eq!(first, second);
    }

    #[test]
    fn test_merge_recomputes_rate() {
        let a = AggregatePoint::new(day(2020, 1, 1), 1, 4);
        let b = AggregatePoint::new(day(2020, 1, 1), 1, 16);

        let merged = a.merge(&b);

        assert_eq!(merged.positive_increment(), 2);
        assert_eq!(merged.test_increment(), 20);
        assert!((merged.positive_rate() - 10.0).abs() < 1e-9);
        // inputs are untouched
        assert!((a.positive_rate() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_huge_increments_saturate() {
        let records = vec![
            record(Some(day(2020, 1, 1)), "CA", Some(i64::MAX), Some(i64::MAX)),
            record(Some(day(2020, 1, 1)), "NY", Some(i64::MAX), Some(i64::MAX)),
            record(Some(day(2020, 1, 1)), "TX", Some(i64::MIN), Some(1)),
            record(Some(day(2020, 1, 1)), "WA", Some(i64::MIN), Some(1)),
        ];

        let points = aggregate(&records[..2], &StateFilter::AllStates);
        assert_eq!(points[0].positive_increment(), i64::MAX);
        assert_eq!(points[0].test_increment(), i64::MAX);
        assert!((points[0].positive_rate() - 100.0).abs() < 1e-9);

        let points = aggregate(&records[2..], &StateFilter::AllStates);
        assert_eq!(points[0].positive_increment(), i64::MIN);
        assert_eq!(points[0].test_increment(), 2);
    }

    #[test]
    fn test_merge_different_dates_is_noop() {
        let a = AggregatePoint::new(day(2020, 1, 1), 1, 4);
        let b = AggregatePoint::new(day(2020, 1, 2), 9, 9);
        assert_eq!(a.merge(&b), a);
    }

    #[test]
    fn test_state_filter_parse() {
        assert_eq!(StateFilter::parse("US"), Some(StateFilter::AllStates));
        assert_eq!(StateFilter::parse(" us "), Some(StateFilter::AllStates));
        assert_eq!(StateFilter::parse("ca"), Some(StateFilter::State("CA".to_string())));
        assert_eq!(StateFilter::parse("   "), None);
    }

    #[test]
    fn test_all_states_matches_missing_state() {
        assert!(StateFilter::AllStates.matches(None));
        assert!(!StateFilter::State("CA".to_string()).matches(None));
    }
}
