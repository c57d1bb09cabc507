//! HTTP client for the hosted generative model.
//!
//! Outbound is a single text prompt carrying an instruction plus an
//! embedded excerpt of the aggregated data; inbound is free text expected
//! to contain a JSON object, optionally wrapped in markdown code fences.
//! Any failure here is recovered by the deterministic fallback, never
//! surfaced to the caller.

mod error;

pub use error::InsightError;

use crate::analysis::types::{
    AnalysisResult, IndividualInsight, OverallAssessment, Patterns, StatisticsSummary,
    SubjectAverages,
};
use crate::config::InsightConfig;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Confidence assigned to remote results that do not report their own.
const DEFAULT_AI_CONFIDENCE: f64 = 0.9;

/// Cap on students embedded in the prompt excerpt.
const PROMPT_STUDENT_LIMIT: usize = 30;

/// Client for requesting narrative analysis from the remote model.
pub struct InsightClient {
    client: Client,
    config: InsightConfig,
}

impl InsightClient {
    pub fn new(config: InsightConfig) -> Result<Self, InsightError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout())
            .build()
            .map_err(|e| InsightError::Network {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    /// Requests a narrative analysis of the aggregated data.
    ///
    /// Returns the parsed result on success; every failure mode (disabled,
    /// missing key, network, timeout, empty or malformed payload) comes
    /// back as an `InsightError` for the caller to recover from.
    pub async fn generate(
        &self,
        averages: &SubjectAverages,
        statistics: &StatisticsSummary,
    ) -> Result<AnalysisResult, InsightError> {
        if !self.config.enabled {
            return Err(InsightError::Disabled);
        }
        if self.config.api_key.trim().is_empty() {
            return Err(InsightError::MissingApiKey);
        }

        let prompt = build_prompt(averages, statistics);
        let url = self.request_url()?;
        debug!(model = %self.config.model, prompt_len = prompt.len(), "Sending insight request");

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InsightError::BadStatus {
                status: status.as_u16(),
            });
        }

        let payload: GenerateContentResponse =
            response.json().await.map_err(|e| InsightError::MalformedPayload {
                message: e.to_string(),
            })?;

        let text = payload.first_text().ok_or(InsightError::EmptyResponse)?;
        let result = parse_insight_text(&text)?;

        info!(
            students = result.individual_insights.len(),
            confidence = result.confidence,
            "Remote insight parsed successfully"
        );
        Ok(result)
    }

    fn request_url(&self) -> Result<Url, InsightError> {
        let base = Url::parse(&self.config.base_url)?;
        let mut url = base.join(&format!(
            "/v1beta/models/{}:generateContent",
            self.config.model
        ))?;
        url.query_pairs_mut().append_pair("key", &self.config.api_key);
        Ok(url)
    }

    fn classify_request_error(&self, err: reqwest::Error) -> InsightError {
        if err.is_timeout() {
            InsightError::Timeout {
                timeout_secs: self.config.timeout_secs,
            }
        } else {
            InsightError::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Response envelope of the generateContent API; only the text path is
/// relevant here.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<String> {
        self.candidates
            .iter()
            .flat_map(|c| c.content.parts.iter())
            .map(|p| p.text.trim())
            .find(|t| !t.is_empty())
            .map(str::to_string)
    }
}

/// Shape the remote model is instructed to return. Lenient on purpose:
/// missing sections degrade rather than fail.
#[derive(Debug, Deserialize)]
struct RemoteInsight {
    overall_assessment: OverallAssessment,
    #[serde(default)]
    individual_insights: Vec<IndividualInsight>,
    #[serde(default)]
    patterns: Patterns,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    insights: Vec<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

fn build_prompt(averages: &SubjectAverages, statistics: &StatisticsSummary) -> String {
    let excerpt: SubjectAverages = averages
        .iter()
        .take(PROMPT_STUDENT_LIMIT)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    format!(
        "You are an academic advisor for Nigerian senior-secondary students. \
         Analyze the per-student subject averages and class statistics below and \
         respond with a single JSON object with keys: overall_assessment \
         (class_average, class_grade, total_students, summary), \
         individual_insights (student, average, strengths, recommendations \
         with course/university/reason/jamb_cutoff/waec_required, remark), \
         patterns, recommendations, insights, confidence. \
         Respond with JSON only.\n\nSubject averages:\n{}\n\nClass statistics:\n{}",
        serde_json::to_string_pretty(&excerpt).unwrap_or_default(),
        serde_json::to_string_pretty(statistics).unwrap_or_default(),
    )
}

/// Strips markdown code fences and parses the remaining text as a remote
/// insight payload.
fn parse_insight_text(text: &str) -> Result<AnalysisResult, InsightError> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(InsightError::EmptyResponse);
    }

    let parsed: RemoteInsight =
        serde_json::from_str(cleaned).map_err(|e| InsightError::MalformedPayload {
            message: e.to_string(),
        })?;

    Ok(AnalysisResult {
        overall_assessment: parsed.overall_assessment,
        individual_insights: parsed.individual_insights,
        patterns: parsed.patterns,
        recommendations: parsed.recommendations,
        insights: parsed.insights,
        confidence: parsed
            .confidence
            .filter(|c| (0.0..=1.0).contains(c))
            .unwrap_or(DEFAULT_AI_CONFIDENCE),
        ai_powered: true,
    })
}

/// Removes a wrapping markdown code fence (``` or ```json) if present.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string on the opening fence line.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => return trimmed,
    };
    match rest.rfind("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_stats() -> StatisticsSummary {
        StatisticsSummary {
            fields: Default::default(),
            correlations: Default::default(),
            trends: Default::default(),
            outliers: Vec::new(),
        }
    }

    const PAYLOAD: &str = r#"{
        "overall_assessment": {
            "class_average": 71.5,
            "class_grade": "B",
            "total_students": 2,
            "summary": "Solid cohort"
        },
        "individual_insights": [],
        "recommendations": ["Keep it up"],
        "insights": [],
        "confidence": 0.85
    }"#;

    #[test]
    fn test_strip_plain_text_passthrough() {
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_strip_json_fence() {
        let fenced = format!("```json\n{PAYLOAD}\n```");
        let result = parse_insight_text(&fenced).unwrap();
        assert_eq!(result.overall_assessment.class_grade, "B");
        assert!(result.ai_powered);
        assert_eq!(result.confidence, 0.85);
    }

    #[test]
    fn test_strip_bare_fence() {
        let fenced = format!("```\n{PAYLOAD}\n```");
        assert!(parse_insight_text(&fenced).is_ok());
    }

    #[test]
    fn test_malformed_payload_is_error_not_panic() {
        let err = parse_insight_text("not json at all").unwrap_err();
        assert!(matches!(err, InsightError::MalformedPayload { .. }));
    }

    #[test]
    fn test_empty_text_is_empty_response() {
        assert!(matches!(
            parse_insight_text("   "),
            Err(InsightError::EmptyResponse)
        ));
    }

    #[test]
    fn test_out_of_range_confidence_replaced() {
        let payload = PAYLOAD.replace("0.85", "7.0");
        let result = parse_insight_text(&payload).unwrap();
        assert_eq!(result.confidence, DEFAULT_AI_CONFIDENCE);
    }

    #[test]
    fn test_disabled_client_short_circuits() {
        let config = InsightConfig {
            enabled: false,
            ..InsightConfig::default()
        };
        let client = InsightClient::new(config).unwrap();

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let averages = SubjectAverages::new();
        let err = rt
            .block_on(client.generate(&averages, &empty_stats()))
            .unwrap_err();
        assert!(matches!(err, InsightError::Disabled));
    }

    #[test]
    fn test_missing_api_key_detected() {
        let config = InsightConfig {
            enabled: true,
            api_key: String::new(),
            ..InsightConfig::default()
        };
        let client = InsightClient::new(config).unwrap();

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let averages = SubjectAverages::new();
        let err = rt
            .block_on(client.generate(&averages, &empty_stats()))
            .unwrap_err();
        assert!(matches!(err, InsightError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_stalled_remote_classified_as_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept connections but never answer, so the request deadline
        // fires rather than a connect error.
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, _)) => std::mem::forget(socket),
                    Err(_) => break,
                }
            }
        });

        let config = InsightConfig {
            enabled: true,
            api_key: "test-key".to_string(),
            base_url: format!("http://{addr}"),
            timeout_secs: 1,
            ..InsightConfig::default()
        };
        let client = InsightClient::new(config).unwrap();

        let err = client
            .generate(&SubjectAverages::new(), &empty_stats())
            .await
            .unwrap_err();
        assert!(matches!(err, InsightError::Timeout { timeout_secs: 1 }));
        assert!(err.is_transient());
    }
}
