/// Score analysis pipeline
pub mod clusters;
pub mod error;
pub mod fallback;
pub mod stats;
pub mod types;

use crate::config::CourseCatalog;
use crate::ingest::{self, RawRow};
use crate::insight::InsightClient;
use chrono::Utc;
use error::AnalysisError;
use std::time::Instant;
use tracing::{info, warn};
use types::{AnalysisReport, StudentRecord};

/// Runs the full pipeline over decoded rows: normalize, aggregate, compute
/// statistics and clusters, then attempt the remote insight path with the
/// rule-based synthesizer as the unconditional safety net.
pub struct Analyzer {
    insight: InsightClient,
    catalog: CourseCatalog,
}

impl Analyzer {
    pub fn new(insight: InsightClient, catalog: CourseCatalog) -> Self {
        Self { insight, catalog }
    }

    /// Analyzes one upload's rows into a complete report.
    ///
    /// Fails only on an empty dataset; remote-service failures degrade to
    /// the fallback and are logged, never propagated.
    pub async fn analyze(&self, rows: &[RawRow]) -> Result<AnalysisReport, AnalysisError> {
        let start = Instant::now();

        let records: Vec<StudentRecord> = rows.iter().filter_map(ingest::normalize).collect();
        if records.len() < rows.len() {
            info!(
                input_rows = rows.len(),
                records = records.len(),
                "Dropped rows without a student identifier"
            );
        }
        if records.is_empty() {
            return Err(AnalysisError::EmptyDataset);
        }

        let averages = ingest::aggregate(rows);
        let statistics = stats::analyze(&records)?;
        let clusters = clusters::classify(&records);

        let analysis = match self.insight.generate(&averages, &statistics).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Remote insight unavailable, using rule-based fallback");
                fallback::synthesize(&averages, &statistics, &clusters, &self.catalog)
            }
        };

        let total_subjects = averages
            .values()
            .flat_map(|subjects| subjects.keys())
            .collect::<std::collections::BTreeSet<_>>()
            .len();

        info!(
            students = records.len(),
            subjects = total_subjects,
            ai_powered = analysis.ai_powered,
            duration_ms = start.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        Ok(AnalysisReport {
            analysis,
            statistics,
            clusters,
            subject_averages: averages,
            total_students: records.len(),
            total_subjects,
            generated_at: Utc::now().to_rfc3339(),
        })
    }
}
