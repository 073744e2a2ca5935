use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall severity label derived from the average host risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLabel {
    Critical,
    High,
    Medium,
    Low,
}

/// Output of the rule-based analysis engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub risk_score: u8,
    pub severity: SeverityLabel,
    pub critical_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub summary: String,
    pub attack_vectors: Vec<String>,
    pub analysis_type: String,
    pub timestamp: DateTime<Utc>,
}

/// Request body for `POST /api/analysis`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub data: String,
    #[serde(default = "default_analysis_type")]
    pub analysis_type: String,
}

fn default_analysis_type() -> String {
    "general".to_string()
}
