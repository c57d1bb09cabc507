/// Types for the score analysis pipeline
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The six numeric fields recognized on a student record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Grade,
    Attendance,
    Participation,
    Assignment,
    Exam,
    Quiz,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Grade,
        Field::Attendance,
        Field::Participation,
        Field::Assignment,
        Field::Exam,
        Field::Quiz,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Grade => "grade",
            Field::Attendance => "attendance",
            Field::Participation => "participation",
            Field::Assignment => "assignment",
            Field::Exam => "exam",
            Field::Quiz => "quiz",
        }
    }

    /// Weight used for the overall performance score.
    pub fn weight(&self) -> f64 {
        match self {
            Field::Grade => 0.4,
            Field::Attendance => 0.2,
            Field::Participation => 0.2,
            Field::Assignment => 0.1,
            Field::Exam => 0.1,
            Field::Quiz => 0.0,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical per-student record produced by the row normalizer.
///
/// Every numeric field is optional; absent and zero stay distinguishable
/// through the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub identifier: String,
    pub grade: Option<f64>,
    pub attendance: Option<f64>,
    pub participation: Option<f64>,
    pub assignment: Option<f64>,
    pub exam: Option<f64>,
    pub quiz: Option<f64>,
}

impl StudentRecord {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            grade: None,
            attendance: None,
            participation: None,
            assignment: None,
            exam: None,
            quiz: None,
        }
    }

    pub fn field(&self, field: Field) -> Option<f64> {
        match field {
            Field::Grade => self.grade,
            Field::Attendance => self.attendance,
            Field::Participation => self.participation,
            Field::Assignment => self.assignment,
            Field::Exam => self.exam,
            Field::Quiz => self.quiz,
        }
    }

    pub fn set_field(&mut self, field: Field, value: Option<f64>) {
        let slot = match field {
            Field::Grade => &mut self.grade,
            Field::Attendance => &mut self.attendance,
            Field::Participation => &mut self.participation,
            Field::Assignment => &mut self.assignment,
            Field::Exam => &mut self.exam,
            Field::Quiz => &mut self.quiz,
        };
        *slot = value;
    }
}

/// Per-student subject averages: student identifier -> subject -> mean score.
pub type SubjectAverages = BTreeMap<String, BTreeMap<String, f64>>;

/// Quartile boundaries at p25/p50/p75.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quartiles {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

/// Descriptive statistics for one numeric field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub std_dev: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub quartiles: Quartiles,
}

/// Direction label for a fitted trend line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Ordinary least-squares fit of field value against row index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trend {
    pub slope: f64,
    pub intercept: f64,
    pub direction: TrendDirection,
}

/// Which side of the Tukey fence an outlier fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierKind {
    Low,
    High,
}

/// A single value outside the 1.5 IQR fence for its field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outlier {
    pub student: String,
    pub field: Field,
    pub value: f64,
    pub kind: OutlierKind,
}

/// Class-wide descriptive statistics computed fresh per analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsSummary {
    /// Per-field summaries, keyed by canonical field name.
    pub fields: BTreeMap<String, FieldSummary>,
    /// Pairwise Pearson sample correlations, keyed "fieldA_fieldB".
    pub correlations: BTreeMap<String, f64>,
    /// Linear trend per field with more than two valid values.
    pub trends: BTreeMap<String, Trend>,
    pub outliers: Vec<Outlier>,
}

/// Exclusive partition of students into performance bands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceClusters {
    pub high_performers: Vec<ClusterMember>,
    pub average_performers: Vec<ClusterMember>,
    pub needs_support: Vec<ClusterMember>,
    pub at_risk: Vec<ClusterMember>,
}

impl PerformanceClusters {
    pub fn total_members(&self) -> usize {
        self.high_performers.len()
            + self.average_performers.len()
            + self.needs_support.len()
            + self.at_risk.len()
    }
}

/// One student placed in a cluster, with the score that put them there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterMember {
    pub student: String,
    pub overall_score: f64,
}

/// A course suggestion derived from a student's subject strengths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecommendation {
    pub course: String,
    /// Comma-joined list of suggested universities.
    pub university: String,
    pub reason: String,
    pub jamb_cutoff: String,
    pub waec_required: Vec<String>,
}

/// Per-student narrative produced by either the remote model or the fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndividualInsight {
    pub student: String,
    pub average: f64,
    /// Top subjects scoring 70 or above, strongest first.
    pub strengths: Vec<String>,
    pub recommendations: Vec<CourseRecommendation>,
    pub remark: String,
}

/// Class-level summary attached to every analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallAssessment {
    pub class_average: f64,
    pub class_grade: String,
    pub total_students: usize,
    pub summary: String,
}

/// Cross-cutting patterns observed across the class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Patterns {
    pub subject_averages: BTreeMap<String, f64>,
    pub strongest_subject: Option<String>,
    pub weakest_subject: Option<String>,
    pub cluster_sizes: BTreeMap<String, usize>,
}

/// The aggregate analysis returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub overall_assessment: OverallAssessment,
    pub individual_insights: Vec<IndividualInsight>,
    pub patterns: Patterns,
    pub recommendations: Vec<String>,
    pub insights: Vec<String>,
    pub confidence: f64,
    pub ai_powered: bool,
}

/// Everything stored for one analyzed upload, keyed by session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis: AnalysisResult,
    pub statistics: StatisticsSummary,
    pub clusters: PerformanceClusters,
    pub subject_averages: SubjectAverages,
    pub total_students: usize,
    pub total_subjects: usize,
    /// RFC3339 timestamp of when the analysis ran.
    pub generated_at: String,
}
