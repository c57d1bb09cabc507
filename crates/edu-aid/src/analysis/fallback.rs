//! Deterministic rule-based analysis, used whenever the remote insight
//! call fails, is disabled, or returns unusable output.
//!
//! This path cannot fail: it always returns a structurally complete result,
//! degrading gracefully when fields are sparse.

use super::types::{
    AnalysisResult, CourseRecommendation, IndividualInsight, OutlierKind, OverallAssessment,
    Patterns, PerformanceClusters, StatisticsSummary, SubjectAverages, TrendDirection,
};
use crate::config::{CourseCatalog, CourseRule};
use std::collections::BTreeMap;

/// Minimum subject average for the subject to count as a strength.
const STRENGTH_THRESHOLD: f64 = 70.0;

/// How many strengths feed the rule table per student.
const MAX_STRENGTHS: usize = 3;

/// Exact number of recommendations every student receives.
const RECOMMENDATIONS_PER_STUDENT: usize = 3;

/// Confidence reported for rule-based output (the AI path reports higher).
const FALLBACK_CONFIDENCE: f64 = 0.7;

/// Synthesizes a complete analysis from subject averages and class
/// statistics without any external calls.
pub fn synthesize(
    averages: &SubjectAverages,
    statistics: &StatisticsSummary,
    clusters: &PerformanceClusters,
    catalog: &CourseCatalog,
) -> AnalysisResult {
    let individual_insights: Vec<IndividualInsight> = averages
        .iter()
        .map(|(student, subjects)| student_insight(student, subjects, catalog))
        .collect();

    let overall_assessment = assess_class(&individual_insights);
    let patterns = detect_patterns(averages, clusters);
    let insights = class_insights(statistics, &overall_assessment, clusters);
    let recommendations = class_recommendations(&overall_assessment, &patterns, clusters);

    AnalysisResult {
        overall_assessment,
        individual_insights,
        patterns,
        recommendations,
        insights,
        confidence: FALLBACK_CONFIDENCE,
        ai_powered: false,
    }
}

fn student_insight(
    student: &str,
    subjects: &BTreeMap<String, f64>,
    catalog: &CourseCatalog,
) -> IndividualInsight {
    let average = if subjects.is_empty() {
        0.0
    } else {
        let mean = subjects.values().sum::<f64>() / subjects.len() as f64;
        (mean * 10.0).round() / 10.0
    };

    let strengths = top_strengths(subjects);
    let recommendations = recommend_courses(&strengths, catalog);
    let remark = remark_for(average, &strengths);

    IndividualInsight {
        student: student.to_string(),
        average,
        strengths: strengths.iter().map(|(s, _)| s.clone()).collect(),
        recommendations,
        remark,
    }
}

/// Top subjects scoring at or above the strength threshold, best first.
/// Ties break by subject name order, which the sorted averages map fixes.
fn top_strengths(subjects: &BTreeMap<String, f64>) -> Vec<(String, f64)> {
    let mut strengths: Vec<(String, f64)> = subjects
        .iter()
        .filter(|(_, score)| **score >= STRENGTH_THRESHOLD)
        .map(|(s, score)| (s.clone(), *score))
        .collect();
    strengths.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    strengths.truncate(MAX_STRENGTHS);
    strengths
}

/// Applies the ordered rule table to a student's strengths, padding with
/// generic fillers (and truncating) to exactly three recommendations.
fn recommend_courses(
    strengths: &[(String, f64)],
    catalog: &CourseCatalog,
) -> Vec<CourseRecommendation> {
    let mut recommendations: Vec<CourseRecommendation> = catalog
        .rules
        .iter()
        .filter(|rule| rule_matches(rule, strengths))
        .take(RECOMMENDATIONS_PER_STUDENT)
        .map(to_recommendation)
        .collect();

    for filler in &catalog.fillers {
        if recommendations.len() >= RECOMMENDATIONS_PER_STUDENT {
            break;
        }
        if recommendations.iter().any(|r| r.course == filler.course) {
            continue;
        }
        recommendations.push(to_recommendation(filler));
    }

    // Fillers may be exhausted when the configured catalog is thin; repeat
    // the last filler rather than return a short list.
    while recommendations.len() < RECOMMENDATIONS_PER_STUDENT {
        if let Some(last) = catalog.fillers.last().or(catalog.rules.last()) {
            recommendations.push(to_recommendation(last));
        } else {
            break;
        }
    }

    recommendations
}

fn rule_matches(rule: &CourseRule, strengths: &[(String, f64)]) -> bool {
    !rule.requirements.is_empty()
        && rule.requirements.iter().all(|req| {
            strengths
                .iter()
                .any(|(subject, score)| *subject == req.subject && *score >= req.min_score)
        })
}

fn to_recommendation(rule: &CourseRule) -> CourseRecommendation {
    CourseRecommendation {
        course: rule.course.clone(),
        university: rule.universities.join(", "),
        reason: rule.reason.clone(),
        jamb_cutoff: rule.jamb_cutoff.clone(),
        waec_required: rule.waec_required.clone(),
    }
}

fn remark_for(average: f64, strengths: &[(String, f64)]) -> String {
    match (average, strengths.len()) {
        (a, _) if a >= 80.0 => "Outstanding overall performance; keep up the momentum".to_string(),
        (a, n) if a >= 70.0 && n > 0 => format!(
            "Solid performance with clear strength in {}",
            strengths[0].0
        ),
        (a, _) if a >= 50.0 => {
            "Fair performance; focused revision would lift weaker subjects".to_string()
        }
        _ => "Needs close academic support across subjects".to_string(),
    }
}

fn assess_class(insights: &[IndividualInsight]) -> OverallAssessment {
    let total_students = insights.len();
    let class_average = if total_students == 0 {
        0.0
    } else {
        let mean = insights.iter().map(|i| i.average).sum::<f64>() / total_students as f64;
        (mean * 10.0).round() / 10.0
    };

    let class_grade = letter_grade(class_average).to_string();
    let summary = format!(
        "Class of {total_students} students averaging {class_average:.1} ({class_grade})"
    );

    OverallAssessment {
        class_average,
        class_grade,
        total_students,
        summary,
    }
}

/// Fixed letter-grade ladder on the class average.
pub fn letter_grade(average: f64) -> &'static str {
    if average >= 80.0 {
        "A"
    } else if average >= 70.0 {
        "B"
    } else if average >= 60.0 {
        "C"
    } else if average >= 50.0 {
        "D"
    } else {
        "F"
    }
}

fn detect_patterns(averages: &SubjectAverages, clusters: &PerformanceClusters) -> Patterns {
    let mut subject_totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for subjects in averages.values() {
        for (subject, score) in subjects {
            let entry = subject_totals.entry(subject.clone()).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }

    let subject_averages: BTreeMap<String, f64> = subject_totals
        .into_iter()
        .map(|(subject, (total, count))| (subject, ((total / count as f64) * 10.0).round() / 10.0))
        .collect();

    let strongest_subject = subject_averages
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(s, _)| s.clone());
    let weakest_subject = subject_averages
        .iter()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(s, _)| s.clone());

    let mut cluster_sizes = BTreeMap::new();
    cluster_sizes.insert("high_performers".to_string(), clusters.high_performers.len());
    cluster_sizes.insert(
        "average_performers".to_string(),
        clusters.average_performers.len(),
    );
    cluster_sizes.insert("needs_support".to_string(), clusters.needs_support.len());
    cluster_sizes.insert("at_risk".to_string(), clusters.at_risk.len());

    Patterns {
        subject_averages,
        strongest_subject,
        weakest_subject,
        cluster_sizes,
    }
}

fn class_insights(
    statistics: &StatisticsSummary,
    assessment: &OverallAssessment,
    clusters: &PerformanceClusters,
) -> Vec<String> {
    let mut insights = vec![format!(
        "Class average of {:.1} places the cohort at grade {}",
        assessment.class_average, assessment.class_grade
    )];

    if let Some(r) = statistics.correlations.get("grade_attendance") {
        if *r >= 0.7 {
            insights.push(
                "Attendance correlates strongly with grades; protecting attendance should protect results"
                    .to_string(),
            );
        } else if *r <= -0.5 {
            insights.push(
                "Grades run against attendance in this dataset; worth checking data quality"
                    .to_string(),
            );
        }
    }

    for (field, trend) in &statistics.trends {
        match trend.direction {
            TrendDirection::Decreasing if field == "grade" => {
                insights.push("Grades decline across the sheet order; later entries may need attention".to_string());
            }
            TrendDirection::Increasing if field == "grade" => {
                insights.push("Grades improve across the sheet order".to_string());
            }
            _ => {}
        }
    }

    let low_outliers = statistics
        .outliers
        .iter()
        .filter(|o| o.kind == OutlierKind::Low)
        .count();
    if low_outliers > 0 {
        insights.push(format!(
            "{low_outliers} unusually low score(s) detected; these students may need individual follow-up"
        ));
    }

    if !clusters.at_risk.is_empty() {
        insights.push(format!(
            "{} student(s) classified at risk",
            clusters.at_risk.len()
        ));
    }

    insights
}

fn class_recommendations(
    assessment: &OverallAssessment,
    patterns: &Patterns,
    clusters: &PerformanceClusters,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if assessment.class_average < 60.0 {
        recommendations
            .push("Schedule remedial sessions; the class average is below 60".to_string());
    }
    if let Some(weakest) = &patterns.weakest_subject {
        recommendations.push(format!(
            "Prioritize teaching support for {weakest}, the weakest subject on average"
        ));
    }
    if !clusters.at_risk.is_empty() {
        recommendations.push(
            "Arrange guardian meetings for at-risk students before the next term".to_string(),
        );
    }
    if recommendations.is_empty() {
        recommendations
            .push("Maintain current teaching approach; results are on track".to_string());
    }

    recommendations
}
