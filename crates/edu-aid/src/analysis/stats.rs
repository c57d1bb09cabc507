//! Descriptive statistics over the class dataset.
//!
//! Each numeric field is summarized independently over the students where
//! it is present. Correlations pair fields over students where both are
//! present; trends regress values against row index; outliers use the
//! standard 1.5 IQR Tukey fence.

use super::error::AnalysisError;
use super::types::{
    Field, FieldSummary, Outlier, OutlierKind, Quartiles, StatisticsSummary, StudentRecord, Trend,
    TrendDirection,
};
use std::collections::BTreeMap;

/// Minimum paired points for a correlation to be reported.
const MIN_CORRELATION_POINTS: usize = 2;

/// A field needs more than this many values before outlier fencing applies.
const MIN_OUTLIER_POINTS: usize = 4;

/// A field needs more than this many values before a trend is fitted.
const MIN_TREND_POINTS: usize = 2;

/// Computes the full statistics summary for a dataset.
///
/// Fails with `EmptyDataset` on empty input; statistics over zero rows are
/// undefined, not zero.
pub fn analyze(records: &[StudentRecord]) -> Result<StatisticsSummary, AnalysisError> {
    if records.is_empty() {
        return Err(AnalysisError::EmptyDataset);
    }

    let mut fields = BTreeMap::new();
    let mut trends = BTreeMap::new();
    let mut outliers = Vec::new();

    for field in Field::ALL {
        let valued: Vec<(&str, f64)> = records
            .iter()
            .filter_map(|r| r.field(field).map(|v| (r.identifier.as_str(), v)))
            .collect();
        let values: Vec<f64> = valued.iter().map(|(_, v)| *v).collect();

        if let Some(summary) = summarize_field(&values) {
            if values.len() > MIN_OUTLIER_POINTS {
                outliers.extend(fence_outliers(field, &valued, &summary.quartiles));
            }
            fields.insert(field.as_str().to_string(), summary);
        }

        if values.len() > MIN_TREND_POINTS {
            trends.insert(field.as_str().to_string(), fit_trend(&values));
        }
    }

    Ok(StatisticsSummary {
        fields,
        correlations: correlations(records),
        trends,
        outliers,
    })
}

fn summarize_field(values: &[f64]) -> Option<FieldSummary> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
    let min = sorted[0];
    let max = sorted[count - 1];
    let quartiles = Quartiles {
        q1: percentile(&sorted, 0.25),
        q2: percentile(&sorted, 0.50),
        q3: percentile(&sorted, 0.75),
    };

    Some(FieldSummary {
        count,
        mean,
        median: quartiles.q2,
        mode: mode(&sorted),
        std_dev: variance.sqrt(),
        variance,
        min,
        max,
        range: max - min,
        quartiles,
    })
}

/// Percentile with linear interpolation over a sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = rank - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

/// Most frequent value; ties resolve to the smallest value.
fn mode(sorted: &[f64]) -> f64 {
    let mut best = sorted[0];
    let mut best_run = 0usize;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i > best_run {
            best_run = j - i;
            best = sorted[i];
        }
        i = j;
    }
    best
}

/// Pairwise Pearson sample correlation over students where both fields are
/// present. Pairs with fewer than two points, or with no variance on either
/// side, are omitted rather than zeroed.
fn correlations(records: &[StudentRecord]) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();

    for (i, a) in Field::ALL.iter().enumerate() {
        for b in &Field::ALL[i + 1..] {
            let pairs: Vec<(f64, f64)> = records
                .iter()
                .filter_map(|r| Some((r.field(*a)?, r.field(*b)?)))
                .collect();
            if pairs.len() < MIN_CORRELATION_POINTS {
                continue;
            }

            if let Some(r) = pearson(&pairs) {
                out.insert(format!("{a}_{b}"), r);
            }
        }
    }

    out
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 {
        return None;
    }
    Some(cov / denom)
}

/// Ordinary least-squares fit of value against row index (not time).
fn fit_trend(values: &[f64]) -> Trend {
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }

    let slope = if den == 0.0 { 0.0 } else { num / den };
    let direction = if slope > 0.0 {
        TrendDirection::Increasing
    } else if slope < 0.0 {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    Trend {
        slope,
        intercept: mean_y - slope * mean_x,
        direction,
    }
}

fn fence_outliers(field: Field, valued: &[(&str, f64)], quartiles: &Quartiles) -> Vec<Outlier> {
    let iqr = quartiles.q3 - quartiles.q1;
    let low_fence = quartiles.q1 - 1.5 * iqr;
    let high_fence = quartiles.q3 + 1.5 * iqr;

    valued
        .iter()
        .filter_map(|(student, value)| {
            let kind = if *value < low_fence {
                OutlierKind::Low
            } else if *value > high_fence {
                OutlierKind::High
            } else {
                return None;
            };
            Some(Outlier {
                student: student.to_string(),
                field,
                value: *value,
                kind,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, grade: Option<f64>, attendance: Option<f64>) -> StudentRecord {
        let mut r = StudentRecord::new(id);
        r.grade = grade;
        r.attendance = attendance;
        r
    }

    fn graded(scores: &[f64]) -> Vec<StudentRecord> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| record(&format!("S{i}"), Some(*s), None))
            .collect()
    }

    #[test]
    fn test_empty_dataset_is_an_error() {
        assert!(matches!(analyze(&[]), Err(AnalysisError::EmptyDataset)));
    }

    #[test]
    fn test_mean_within_min_max_and_quartiles_ordered() {
        let records = graded(&[55.0, 61.0, 72.0, 80.0, 93.0]);
        let summary = analyze(&records).unwrap();
        let grade = &summary.fields["grade"];

        assert!(grade.mean >= grade.min && grade.mean <= grade.max);
        assert!(grade.quartiles.q1 <= grade.quartiles.q2);
        assert!(grade.quartiles.q2 <= grade.quartiles.q3);
        assert_eq!(grade.count, 5);
        assert_eq!(grade.range, 38.0);
    }

    #[test]
    fn test_median_of_even_count() {
        let records = graded(&[1.0, 2.0, 3.0, 4.0]);
        let summary = analyze(&records).unwrap();
        assert_eq!(summary.fields["grade"].median, 2.5);
    }

    #[test]
    fn test_mode_picks_most_frequent() {
        let records = graded(&[70.0, 70.0, 80.0, 90.0]);
        let summary = analyze(&records).unwrap();
        assert_eq!(summary.fields["grade"].mode, 70.0);
    }

    #[test]
    fn test_population_std_dev() {
        let records = graded(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let summary = analyze(&records).unwrap();
        assert!((summary.fields["grade"].std_dev - 2.0).abs() < 1e-9);
        assert!((summary.fields["grade"].variance - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_student_has_no_outliers() {
        let records = graded(&[88.0]);
        let summary = analyze(&records).unwrap();
        assert!(summary.outliers.is_empty());
    }

    #[test]
    fn test_extreme_value_flagged_high() {
        let records = graded(&[50.0, 52.0, 51.0, 53.0, 50.0, 51.0, 99.0]);
        let summary = analyze(&records).unwrap();
        let outlier = summary
            .outliers
            .iter()
            .find(|o| o.value == 99.0)
            .expect("99 should be fenced");
        assert_eq!(outlier.kind, OutlierKind::High);
        assert_eq!(outlier.field, Field::Grade);
    }

    #[test]
    fn test_correlation_requires_two_paired_points() {
        // Only one student has both fields, so the pair is omitted.
        let records = vec![
            record("A", Some(80.0), Some(90.0)),
            record("B", Some(70.0), None),
        ];
        let summary = analyze(&records).unwrap();
        assert!(!summary.correlations.contains_key("grade_attendance"));
    }

    #[test]
    fn test_perfect_positive_correlation() {
        let records = vec![
            record("A", Some(60.0), Some(60.0)),
            record("B", Some(70.0), Some(70.0)),
            record("C", Some(80.0), Some(80.0)),
        ];
        let summary = analyze(&records).unwrap();
        let r = summary.correlations["grade_attendance"];
        assert!((r - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_field_correlation_omitted() {
        let records = vec![
            record("A", Some(70.0), Some(80.0)),
            record("B", Some(70.0), Some(90.0)),
        ];
        let summary = analyze(&records).unwrap();
        assert!(!summary.correlations.contains_key("grade_attendance"));
    }

    #[test]
    fn test_trend_needs_more_than_two_values() {
        let records = graded(&[60.0, 70.0]);
        let summary = analyze(&records).unwrap();
        assert!(!summary.trends.contains_key("grade"));

        let records = graded(&[60.0, 70.0, 80.0]);
        let summary = analyze(&records).unwrap();
        let trend = &summary.trends["grade"];
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert!((trend.slope - 10.0).abs() < 1e-9);
        assert!((trend.intercept - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_trend_is_stable() {
        let records = graded(&[75.0, 75.0, 75.0, 75.0]);
        let summary = analyze(&records).unwrap();
        assert_eq!(summary.trends["grade"].direction, TrendDirection::Stable);
    }

    #[test]
    fn test_missing_field_excluded_from_count() {
        let records = vec![
            record("A", Some(80.0), None),
            record("B", None, Some(95.0)),
        ];
        let summary = analyze(&records).unwrap();
        assert_eq!(summary.fields["grade"].count, 1);
        assert_eq!(summary.fields["attendance"].count, 1);
        assert!(!summary.fields.contains_key("quiz"));
    }
}
