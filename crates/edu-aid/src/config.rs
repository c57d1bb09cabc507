/// Configuration system for the service and the course recommendation catalog
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bind address for the HTTP server.
    pub address: String,
    pub port: u16,
    /// Upload size ceiling in bytes.
    pub max_upload_bytes: usize,
    pub insight: InsightConfig,
    /// Directory of JSON course-rule files; built-in rules apply when unset.
    pub catalog_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_bytes: 10 * 1024 * 1024,
            insight: InsightConfig::default(),
            catalog_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a JSON file, falling back to defaults for
    /// absent keys. The API key can always be overridden from the
    /// environment.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let mut config: AppConfig = serde_json::from_str(&content)?;
        config.insight.apply_env_override();
        Ok(config)
    }

    pub fn from_env() -> Self {
        let mut config = AppConfig::default();
        config.insight.apply_env_override();
        config
    }
}

/// Settings for the remote insight (hosted generative model) client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// When false the remote path is skipped and the fallback always runs.
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    /// Empty unless set in config or via EDU_AID_API_KEY.
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

impl InsightConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn apply_env_override(&mut self) {
        if let Ok(key) = std::env::var("EDU_AID_API_KEY") {
            if !key.trim().is_empty() {
                self.api_key = key;
            }
        }
    }
}

/// One entry in the course recommendation rule table.
///
/// A rule matches when every (subject, minimum) requirement is satisfied by
/// the student's subject strengths. Rules are evaluated in table order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRule {
    pub course: String,
    /// Anchor subject requirements: subject name -> minimum average.
    pub requirements: Vec<SubjectRequirement>,
    pub reason: String,
    pub universities: Vec<String>,
    pub jamb_cutoff: String,
    pub waec_required: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectRequirement {
    pub subject: String,
    pub min_score: f64,
}

/// The ordered rule table plus the generic fillers appended when fewer than
/// three rules match a student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseCatalog {
    pub rules: Vec<CourseRule>,
    pub fillers: Vec<CourseRule>,
}

impl CourseCatalog {
    /// Loads all rule files (*.json) from a directory, in file-name order.
    ///
    /// Each file holds a `CourseCatalog`; later files extend earlier ones.
    /// Returns the built-in catalog when the directory has no rule files.
    pub fn load_from_directory(dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let mut rules = Vec::new();
        let mut fillers = Vec::new();

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        paths.sort();

        for path in &paths {
            let content = fs::read_to_string(path)?;
            let catalog: CourseCatalog = serde_json::from_str(&content)?;
            rules.extend(catalog.rules);
            fillers.extend(catalog.fillers);
        }

        if rules.is_empty() {
            info!("No course rules found in catalog directory, using built-in table");
            return Ok(Self::built_in());
        }

        if fillers.is_empty() {
            fillers = Self::built_in().fillers;
        }

        info!(rules = rules.len(), "Loaded course catalog");
        Ok(CourseCatalog { rules, fillers })
    }

    /// The default rule table, keyed on the anchor subjects.
    pub fn built_in() -> Self {
        fn req(subject: &str, min_score: f64) -> SubjectRequirement {
            SubjectRequirement {
                subject: subject.to_string(),
                min_score,
            }
        }
        fn rule(
            course: &str,
            requirements: Vec<SubjectRequirement>,
            reason: &str,
            universities: &[&str],
            jamb_cutoff: &str,
            waec_required: &[&str],
        ) -> CourseRule {
            CourseRule {
                course: course.to_string(),
                requirements,
                reason: reason.to_string(),
                universities: universities.iter().map(|s| s.to_string()).collect(),
                jamb_cutoff: jamb_cutoff.to_string(),
                waec_required: waec_required.iter().map(|s| s.to_string()).collect(),
            }
        }

        let rules = vec![
            rule(
                "Computer Engineering",
                vec![req("Mathematics", 75.0), req("Physics", 70.0)],
                "Strong mathematics and physics results point to an engineering pathway",
                &["University of Lagos", "Covenant University", "Federal University of Technology Akure"],
                "250-280",
                &["English Language", "Mathematics", "Physics", "Chemistry"],
            ),
            rule(
                "Medicine and Surgery",
                vec![req("Biology", 75.0), req("Chemistry", 70.0)],
                "Excellent biology and chemistry scores support a medical career",
                &["University of Ibadan", "University of Lagos", "Ahmadu Bello University"],
                "280-320",
                &["English Language", "Mathematics", "Biology", "Chemistry", "Physics"],
            ),
            rule(
                "Pharmacy",
                vec![req("Chemistry", 75.0), req("Biology", 70.0)],
                "Chemistry strength with solid biology fits pharmaceutical sciences",
                &["Obafemi Awolowo University", "University of Benin", "University of Nigeria Nsukka"],
                "260-290",
                &["English Language", "Mathematics", "Chemistry", "Biology"],
            ),
            rule(
                "Electrical Engineering",
                vec![req("Physics", 75.0), req("Mathematics", 70.0)],
                "Physics-led profile with dependable mathematics",
                &["University of Lagos", "Ahmadu Bello University", "Federal University of Technology Minna"],
                "240-270",
                &["English Language", "Mathematics", "Physics", "Chemistry"],
            ),
            rule(
                "Economics",
                vec![req("Economics", 75.0), req("Mathematics", 70.0)],
                "Economics aptitude backed by quantitative skill",
                &["University of Ibadan", "University of Lagos", "Babcock University"],
                "230-260",
                &["English Language", "Mathematics", "Economics"],
            ),
            rule(
                "Law",
                vec![req("Government", 75.0), req("Literature", 70.0)],
                "Command of government and literature suits legal studies",
                &["University of Ibadan", "Obafemi Awolowo University", "University of Lagos"],
                "270-300",
                &["English Language", "Literature", "Government"],
            ),
            rule(
                "Mass Communication",
                vec![req("Literature", 75.0), req("English", 70.0)],
                "Strong written expression and literary analysis",
                &["University of Lagos", "Covenant University", "University of Nigeria Nsukka"],
                "220-250",
                &["English Language", "Literature", "Government"],
            ),
            rule(
                "English and Literary Studies",
                vec![req("English", 70.0)],
                "Consistent strength in English language",
                &["University of Ibadan", "University of Nigeria Nsukka", "Ahmadu Bello University"],
                "200-230",
                &["English Language", "Literature"],
            ),
        ];

        let fillers = vec![
            rule(
                "Accounting",
                Vec::new(),
                "Broadly applicable course with steady career prospects",
                &["University of Lagos", "Covenant University", "University of Ibadan"],
                "210-240",
                &["English Language", "Mathematics", "Economics"],
            ),
            rule(
                "Public Administration",
                Vec::new(),
                "Accessible course suited to a wide range of score profiles",
                &["Ahmadu Bello University", "University of Benin", "Obafemi Awolowo University"],
                "180-210",
                &["English Language", "Mathematics", "Government"],
            ),
        ];

        CourseCatalog { rules, fillers }
    }
}

impl Default for CourseCatalog {
    fn default() -> Self {
        Self::built_in()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.insight.timeout_secs, 30);
        assert!(config.catalog_dir.is_none());
    }

    #[test]
    fn test_partial_config_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"port": 9000}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.address, "0.0.0.0");
        assert!(config.insight.enabled);
    }

    #[test]
    fn test_built_in_catalog_shape() {
        let catalog = CourseCatalog::built_in();
        assert!(!catalog.rules.is_empty());
        assert_eq!(catalog.fillers.len(), 2);
        assert_eq!(catalog.fillers[0].course, "Accounting");
        assert_eq!(catalog.rules[0].course, "Computer Engineering");
    }

    #[test]
    fn test_catalog_round_trips_through_json() {
        let catalog = CourseCatalog::built_in();
        let json = serde_json::to_string(&catalog).unwrap();
        let parsed: CourseCatalog = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.rules.len(), catalog.rules.len());
    }
}
