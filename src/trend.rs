use thiserror::Error;

use crate::models::{BestGoal, DataPoint, DataSeries, TrendColor, TrendDirection, TrendSummary};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("data points are not valid json: {0}")]
    Malformed(String),

    #[error("data points must be a json list")]
    NotAList,

    #[error("data points list is empty")]
    EmptySeries,

    #[error("entry {index} is not a key/value mapping")]
    EntryNotMapping { index: usize },

    #[error("entry {index} has {keys} keys, expected exactly one")]
    EntryKeyCount { index: usize, keys: usize },

    #[error("entry {index} ({label}) does not hold an integer value")]
    NonIntegerValue { index: usize, label: String },

    #[error("trend needs at least two data points, found {len}")]
    TooShortForTrend { len: usize },
}

/// Parses stored data points, e.g. `[{"March_2008": 123}, {"April_2008": 456}]`.
pub fn parse_series(raw: &str) -> Result<DataSeries, ValidationError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|err| ValidationError::Malformed(err.to_string()))?;
    let entries = value.as_array().ok_or(ValidationError::NotAList)?;

    let mut points = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let mapping = entry
            .as_object()
            .ok_or(ValidationError::EntryNotMapping { index })?;
        if mapping.len() != 1 {
            return Err(ValidationError::EntryKeyCount {
                index,
                keys: mapping.len(),
            });
        }
        let Some((label, value)) = mapping.iter().next() else {
            return Err(ValidationError::EntryKeyCount { index, keys: 0 });
        };
        let value = value.as_i64().ok_or_else(|| ValidationError::NonIntegerValue {
            index,
            label: label.clone(),
        })?;
        points.push(DataPoint {
            label: label.clone(),
            value,
        });
    }

    DataSeries::from_points(points).ok_or(ValidationError::EmptySeries)
}

pub fn compute_summary(
    series: &DataSeries,
    best_goal: BestGoal,
) -> Result<TrendSummary, ValidationError> {
    let baseline_value = series.first().value;
    let best_value = best_value(series, best_goal);
    let current_value = series.last().value;
    let trend_direction = trend_direction(series)?;
    let trend_color = trend_color(trend_direction, best_goal);

    Ok(TrendSummary {
        baseline_value,
        best_value,
        current_value,
        trend_direction,
        trend_color,
    })
}

/// Parses and summarizes in one step.
pub fn summarize(raw: &str, best_goal: BestGoal) -> Result<TrendSummary, ValidationError> {
    let series = parse_series(raw)?;
    compute_summary(&series, best_goal)
}

pub fn best_value(series: &DataSeries, best_goal: BestGoal) -> i64 {
    let initial = series.first().value;
    let (mut high, mut low) = (initial, initial);

    for point in series.points() {
        if point.value > high {
            high = point.value;
        }
        if point.value < low {
            low = point.value;
        }
    }

    match best_goal {
        BestGoal::Higher => high,
        BestGoal::Lower => low,
    }
}

/// Compares the last point with the one before it.
pub fn trend_direction(series: &DataSeries) -> Result<TrendDirection, ValidationError> {
    if series.len() < 2 {
        return Err(ValidationError::TooShortForTrend { len: series.len() });
    }
    let points = series.points();
    let current = points[points.len() - 1].value;
    let previous = points[points.len() - 2].value;

    Ok(match current.cmp(&previous) {
        std::cmp::Ordering::Greater => TrendDirection::Up,
        std::cmp::Ordering::Equal => TrendDirection::Flat,
        std::cmp::Ordering::Less => TrendDirection::Down,
    })
}

pub fn trend_color(direction: TrendDirection, best_goal: BestGoal) -> TrendColor {
    if direction == TrendDirection::Flat {
        TrendColor::NotApplicable
    } else if direction.code() == best_goal.code() {
        TrendColor::Good
    } else {
        TrendColor::Bad
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[i64]) -> DataSeries {
        let points = values
            .iter()
            .enumerate()
            .map(|(idx, value)| DataPoint {
                label: format!("month_{idx}"),
                value: *value,
            })
            .collect();
        DataSeries::from_points(points).expect("non-empty sample")
    }

    #[test]
    fn summarizes_quarter_with_falling_trend() {
        let summary = summarize(r#"[{"Jan":10},{"Feb":20},{"Mar":15}]"#, BestGoal::Higher)
            .expect("valid series");
        assert_eq!(summary.baseline_value, 10);
        assert_eq!(summary.current_value, 15);
        assert_eq!(summary.best_value, 20);
        assert_eq!(summary.trend_direction, TrendDirection::Down);
        assert_eq!(summary.trend_color, TrendColor::Bad);
    }

    #[test]
    fn falling_trend_is_good_when_lower_is_better() {
        let summary = compute_summary(&series(&[10, 20, 15]), BestGoal::Lower).unwrap();
        assert_eq!(summary.best_value, 10);
        assert_eq!(summary.trend_direction, TrendDirection::Down);
        assert_eq!(summary.trend_color, TrendColor::Good);
    }

    #[test]
    fn rising_trend_matches_higher_goal() {
        let summary = compute_summary(&series(&[5, 3, 8]), BestGoal::Higher).unwrap();
        assert_eq!(summary.trend_direction, TrendDirection::Up);
        assert_eq!(summary.trend_color, TrendColor::Good);

        let summary = compute_summary(&series(&[5, 3, 8]), BestGoal::Lower).unwrap();
        assert_eq!(summary.trend_color, TrendColor::Bad);
        assert_eq!(summary.best_value, 3);
    }

    #[test]
    fn flat_trend_is_never_colored() {
        for goal in [BestGoal::Higher, BestGoal::Lower] {
            let summary = compute_summary(&series(&[1, 7, 7]), goal).unwrap();
            assert_eq!(summary.trend_direction, TrendDirection::Flat);
            assert_eq!(summary.trend_color, TrendColor::NotApplicable);
        }
    }

    #[test]
    fn trend_only_looks_at_last_two_points() {
        let summary = compute_summary(&series(&[100, 1, 2]), BestGoal::Higher).unwrap();
        assert_eq!(summary.trend_direction, TrendDirection::Up);
        assert_eq!(summary.baseline_value, 100);
        assert_eq!(summary.best_value, 100);
    }

    #[test]
    fn best_value_handles_repeated_extremes_and_negatives() {
        let sample = series(&[-4, 9, -12, 9, -12, 0]);
        assert_eq!(best_value(&sample, BestGoal::Higher), 9);
        assert_eq!(best_value(&sample, BestGoal::Lower), -12);
    }

    #[test]
    fn single_point_cannot_produce_a_trend() {
        let err = summarize(r#"[{"Jan":10}]"#, BestGoal::Higher).unwrap_err();
        assert_eq!(err, ValidationError::TooShortForTrend { len: 1 });
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            parse_series("not json"),
            Err(ValidationError::Malformed(_))
        ));
        assert_eq!(parse_series(r#"{"Jan":1}"#), Err(ValidationError::NotAList));
        assert_eq!(parse_series("[]"), Err(ValidationError::EmptySeries));
        assert_eq!(
            parse_series(r#"[{"Jan":1}, 4]"#),
            Err(ValidationError::EntryNotMapping { index: 1 })
        );
        assert_eq!(
            parse_series(r#"[{"Jan":1,"Feb":2}]"#),
            Err(ValidationError::EntryKeyCount { index: 0, keys: 2 })
        );
        assert_eq!(
            parse_series(r#"[{}]"#),
            Err(ValidationError::EntryKeyCount { index: 0, keys: 0 })
        );
        assert_eq!(
            parse_series(r#"[{"Jan":1},{"Feb":"two"}]"#),
            Err(ValidationError::NonIntegerValue {
                index: 1,
                label: "Feb".to_string()
            })
        );
        assert!(matches!(
            parse_series(r#"[{"Jan":1.5}]"#),
            Err(ValidationError::NonIntegerValue { .. })
        ));
    }

    #[test]
    fn parse_keeps_order_and_labels() {
        let parsed = parse_series(r#"[ {"March_2008": 123}, {"April_2008": 456} ]"#).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.first().label, "March_2008");
        assert_eq!(parsed.last().value, 456);
        assert_eq!(parsed.to_json(), r#"[{"March_2008":123},{"April_2008":456}]"#);
    }
}
