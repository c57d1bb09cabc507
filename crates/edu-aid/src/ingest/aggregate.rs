//! Per-student subject score aggregation.
//!
//! Scans each row for term-score columns across two naming eras (nine
//! current SS1-SS3 term columns plus three legacy single-term ones),
//! averages the valid values, and keys the result by (student, subject).

use super::normalize::{coerce_numeric, student_identifier, subject_name};
use super::RawRow;
use crate::analysis::types::SubjectAverages;
use std::collections::BTreeMap;
use tracing::debug;

/// Current-era term score columns, in scan order.
const TERM_SCORE_COLUMNS: [&str; 9] = [
    "ss1_1st", "ss1_2nd", "ss1_3rd", "ss2_1st", "ss2_2nd", "ss2_3rd", "ss3_1st", "ss3_2nd",
    "ss3_3rd",
];

/// Legacy single-score columns still seen in older exports.
const LEGACY_SCORE_COLUMNS: [&str; 3] = ["1st_term", "2nd_term", "3rd_term"];

/// Groups rows by student and subject, averaging term scores.
///
/// Only rows with both an identifier and a subject contribute. The average
/// covers valid, non-negative numbers only and is rounded to one decimal; a
/// (student, subject) pair with zero valid scores is omitted rather than
/// stored as zero. When the same pair appears in multiple rows the later
/// row's average overwrites the earlier one.
pub fn aggregate(rows: &[RawRow]) -> SubjectAverages {
    let mut averages: SubjectAverages = BTreeMap::new();

    for row in rows {
        let (identifier, subject) = match (student_identifier(row), subject_name(row)) {
            (Some(id), Some(subject)) => (id, subject),
            _ => continue,
        };

        let scores = term_scores(row);
        if scores.is_empty() {
            debug!(student = %identifier, subject = %subject, "No valid term scores, skipping pair");
            continue;
        }

        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let rounded = (mean * 10.0).round() / 10.0;
        averages.entry(identifier).or_default().insert(subject, rounded);
    }

    averages
}

/// Collects valid term scores from a row, scanning current columns first
/// and legacy ones last. A column matches with or without a "_term" suffix.
fn term_scores(row: &RawRow) -> Vec<f64> {
    let cells: BTreeMap<String, &str> = row.normalized_columns().collect();

    TERM_SCORE_COLUMNS
        .iter()
        .chain(LEGACY_SCORE_COLUMNS.iter())
        .filter_map(|name| {
            let suffixed = format!("{name}_term");
            cells
                .get(*name)
                .or_else(|| cells.get(suffixed.as_str()))
                .and_then(|cell| coerce_numeric(cell))
        })
        .filter(|score| score.is_finite() && *score >= 0.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        let mut row = RawRow::new();
        for (k, v) in pairs {
            row.push(*k, *v);
        }
        row
    }

    #[test]
    fn test_scenario_a_two_subjects() {
        let rows = vec![
            row(&[
                ("id", "S1"),
                ("subject", "Mathematics"),
                ("SS1_1st", "80"),
                ("SS1_2nd", "90"),
            ]),
            row(&[
                ("id", "S1"),
                ("subject", "Physics"),
                ("SS1_1st", "75"),
                ("SS1_2nd", "65"),
            ]),
        ];

        let averages = aggregate(&rows);
        let s1 = averages.get("S1").unwrap();
        assert_eq!(s1.get("Mathematics"), Some(&85.0));
        assert_eq!(s1.get("Physics"), Some(&70.0));
    }

    #[test]
    fn test_idempotent_over_same_rows() {
        let rows = vec![row(&[
            ("name", "Ada"),
            ("subject", "Biology"),
            ("SS2_1st", "71"),
            ("SS2_3rd", "74"),
        ])];

        assert_eq!(aggregate(&rows), aggregate(&rows));
    }

    #[test]
    fn test_negative_and_invalid_scores_excluded() {
        let rows = vec![row(&[
            ("name", "Ada"),
            ("subject", "Chemistry"),
            ("SS1_1st", "-20"),
            ("SS1_2nd", "abs"),
            ("SS1_3rd", "60"),
        ])];

        let averages = aggregate(&rows);
        assert_eq!(averages["Ada"]["Chemistry"], 60.0);
    }

    #[test]
    fn test_pair_with_no_valid_scores_is_omitted() {
        let rows = vec![row(&[
            ("name", "Ada"),
            ("subject", "Economics"),
            ("SS1_1st", "n/a"),
        ])];

        let averages = aggregate(&rows);
        assert!(averages.get("Ada").is_none());
    }

    #[test]
    fn test_duplicate_pair_last_write_wins() {
        let rows = vec![
            row(&[("name", "Ada"), ("subject", "Physics"), ("SS1_1st", "50")]),
            row(&[("name", "Ada"), ("subject", "Physics"), ("SS1_1st", "90")]),
        ];

        let averages = aggregate(&rows);
        assert_eq!(averages["Ada"]["Physics"], 90.0);
    }

    #[test]
    fn test_legacy_columns_and_term_suffix() {
        let rows = vec![row(&[
            ("name", "Obi"),
            ("subject", "Government"),
            ("SS1_1st_Term", "68"),
            ("1st_Term", "72"),
        ])];

        let averages = aggregate(&rows);
        assert_eq!(averages["Obi"]["Government"], 70.0);
    }

    #[test]
    fn test_rounding_to_one_decimal() {
        let rows = vec![row(&[
            ("name", "Ada"),
            ("subject", "English"),
            ("SS1_1st", "70"),
            ("SS1_2nd", "71"),
            ("SS1_3rd", "71"),
        ])];

        let averages = aggregate(&rows);
        assert_eq!(averages["Ada"]["English"], 70.7);
    }
}
