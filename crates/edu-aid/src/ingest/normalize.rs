//! Row normalization against the column synonym table.
//!
//! Column names vary wildly across uploads ("Student_ID", "student id",
//! "Full Name"). Each canonical field has a fixed synonym list; matching is
//! case-insensitive with whitespace collapsed to underscores. Rows that
//! yield no identifier are dropped, never turned into records.

use super::RawRow;
use crate::analysis::types::{Field, StudentRecord};
use regex::Regex;
use std::sync::OnceLock;

/// Columns accepted as a student name, in match order.
const NAME_COLUMNS: &[&str] = &["name", "student_name", "full_name", "fullname", "student"];

/// Columns accepted as a student id when no name resolves.
const ID_COLUMNS: &[&str] = &[
    "id",
    "student_id",
    "studentid",
    "reg_no",
    "matric_no",
    "admission_no",
];

/// Columns accepted as a subject name.
const SUBJECT_COLUMNS: &[&str] = &["subject", "subject_name", "course"];

fn field_synonyms(field: Field) -> &'static [&'static str] {
    match field {
        Field::Grade => &["grade", "score", "total", "average", "final_grade"],
        Field::Attendance => &["attendance", "attendance_rate", "attendance_percentage"],
        Field::Participation => &["participation", "class_participation"],
        Field::Assignment => &["assignment", "assignments", "assignment_score"],
        Field::Exam => &["exam", "exam_score", "examination"],
        Field::Quiz => &["quiz", "quizzes", "quiz_score", "test_score"],
    }
}

/// Coerces arbitrary cell text to a number by stripping everything that is
/// not a digit, dot, or minus sign. Returns None (never an error) for cells
/// that still fail to parse, so "absent" stays distinct from zero.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    static NON_NUMERIC: OnceLock<Regex> = OnceLock::new();
    let re = NON_NUMERIC.get_or_init(|| Regex::new(r"[^0-9.\-]").unwrap());

    let cleaned = re.replace_all(raw, "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Resolves the student identifier for a row: name first, then id.
pub fn student_identifier(row: &RawRow) -> Option<String> {
    row.get_any(NAME_COLUMNS)
        .or_else(|| row.get_any(ID_COLUMNS))
        .map(str::to_string)
}

/// Resolves the subject name for a row, if any.
pub fn subject_name(row: &RawRow) -> Option<String> {
    row.get_any(SUBJECT_COLUMNS).map(str::to_string)
}

/// Maps a raw row to a canonical student record.
///
/// Returns None when neither a name-like nor an id-like column holds a
/// non-empty value; callers must tolerate a materially smaller output set
/// than input row count.
pub fn normalize(row: &RawRow) -> Option<StudentRecord> {
    let identifier = student_identifier(row)?;

    let mut record = StudentRecord::new(identifier);
    for field in Field::ALL {
        let value = row.get_any(field_synonyms(field)).and_then(coerce_numeric);
        record.set_field(field, value);
    }
    Some(record)
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
    fn test_row_without_identifier_is_dropped() {
        let r = row(&[("Subject", "Mathematics"), ("Grade", "80")]);
        assert!(normalize(&r).is_none());
    }

    #[test]
    fn test_name_preferred_over_id() {
        let r = row(&[("Student_ID", "S1"), ("Full Name", "Ada Obi")]);
        let record = normalize(&r).unwrap();
        assert_eq!(record.identifier, "Ada Obi");
    }

    #[test]
    fn test_id_fallback_when_name_empty() {
        let r = row(&[("Name", "  "), ("student id", "S42")]);
        let record = normalize(&r).unwrap();
        assert_eq!(record.identifier, "S42");
    }

    #[test]
    fn test_numeric_coercion_strips_noise() {
        assert_eq!(coerce_numeric("85%"), Some(85.0));
        assert_eq!(coerce_numeric(" 72.5 pts"), Some(72.5));
        assert_eq!(coerce_numeric("-3"), Some(-3.0));
        assert_eq!(coerce_numeric("N/A"), None);
        assert_eq!(coerce_numeric(""), None);
    }

    #[test]
    fn test_non_numeric_fields_stay_none_not_zero() {
        let r = row(&[("Name", "Ada"), ("Grade", "absent"), ("Attendance", "95")]);
        let record = normalize(&r).unwrap();
        assert_eq!(record.grade, None);
        assert_eq!(record.attendance, Some(95.0));
    }

    #[test]
    fn test_synonyms_are_case_and_space_insensitive() {
        let r = row(&[
            ("FULL NAME", "Ada"),
            ("Attendance Rate", "92"),
            ("Exam Score", "61"),
        ]);
        let record = normalize(&r).unwrap();
        assert_eq!(record.attendance, Some(92.0));
        assert_eq!(record.exam, Some(61.0));
        assert_eq!(record.quiz, None);
    }
}
