//! Performance band classification.
//!
//! Each student gets an overall score from a fixed weighted sum over
//! whichever fields are present (weights renormalized to the present
//! subset), then falls into exactly one band. Bucket rules are ordered and
//! exclusive; the first match wins.

use super::types::{ClusterMember, Field, PerformanceClusters, StudentRecord};

/// Attendance assumed when the column is absent, for threshold checks only.
/// The weighted score itself never substitutes a value for a missing field.
const DEFAULT_ATTENDANCE: f64 = 100.0;

/// Partitions students into performance bands. Empty input yields all-empty
/// clusters; there are no other failure modes.
pub fn classify(records: &[StudentRecord]) -> PerformanceClusters {
    let mut clusters = PerformanceClusters::default();

    for record in records {
        // A record with no weighted field cannot pass any score bar, but
        // the defaulted attendance still feeds the ordered rules.
        let score = overall_score(record).unwrap_or(0.0);
        let attendance = record.attendance.unwrap_or(DEFAULT_ATTENDANCE);
        let member = ClusterMember {
            student: record.identifier.clone(),
            overall_score: score,
        };

        if score >= 85.0 && attendance >= 90.0 {
            clusters.high_performers.push(member);
        } else if score >= 70.0 && attendance >= 75.0 {
            clusters.average_performers.push(member);
        } else if score >= 50.0 || attendance >= 60.0 {
            clusters.needs_support.push(member);
        } else {
            clusters.at_risk.push(member);
        }
    }

    clusters
}

/// Weighted overall score over the fields present on the record.
///
/// Missing fields are excluded from both numerator and denominator, which
/// renormalizes the remaining weights. Returns None when no weighted field
/// is present.
pub fn overall_score(record: &StudentRecord) -> Option<f64> {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for field in Field::ALL {
        let weight = field.weight();
        if weight == 0.0 {
            continue;
        }
        if let Some(value) = record.field(field) {
            weighted_sum += value * weight;
            weight_total += weight;
        }
    }

    if weight_total == 0.0 {
        None
    } else {
        Some(weighted_sum / weight_total)
    }
}
