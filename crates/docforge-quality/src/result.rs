use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub score: f64,
    pub details: Value,
    pub missing_sections: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationResult {
    pub fn neutral(reason: &str) -> Self {
        Self {
            passed: true,
            score: 0.7,
            details: serde_json::json!({ "note": reason }),
            missing_sections: Vec::new(),
            suggestions: vec![reason.to_string()],
        }
    }
}
