use std::collections::BTreeSet;

use docforge_types::execution::Stage;

use crate::markdown::MarkdownValidator;
use crate::readability::ReadabilityValidator;
use crate::result::ValidationResult;
use crate::stage::StageValidator;
use crate::validator::ContentValidator;

/// Runs `{markdown, readability}` plus the stage-specific validator and
/// combines the three into one result: arithmetic-mean score, conjunctive
/// pass/fail, deduplicated suggestions and missing sections.
pub struct QualityController;

impl QualityController {
    pub fn validate(&self, content: &str, stage: Stage) -> ValidationResult {
        let validators: Vec<Box<dyn ContentValidator>> = vec![
            Box::new(MarkdownValidator),
            Box::new(ReadabilityValidator),
            Box::new(StageValidator::for_stage(stage)),
        ];

        let results: Vec<ValidationResult> = validators.iter().map(|v| v.validate(content)).collect();

        let combined_score = results.iter().map(|r| r.score).sum::<f64>() / results.len() as f64;
        let all_passed = results.iter().all(|r| r.passed);

        let mut details = serde_json::Map::new();
        let mut missing_sections = BTreeSet::new();
        let mut suggestions = BTreeSet::new();
        for (validator, result) in validators.iter().zip(results.iter()) {
            details.insert(format!("{}_validation", validator.name()), result.details.clone());
            missing_sections.extend(result.missing_sections.iter().cloned());
            suggestions.extend(result.suggestions.iter().cloned());
        }

        ValidationResult {
            passed: all_passed,
            score: combined_score,
            details: serde_json::Value::Object(details),
            missing_sections: missing_sections.into_iter().collect(),
            suggestions: suggestions.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_score_is_mean_of_three_validators() {
        let content = "# Overview\n\n## Problem\n\nThe problem statement addresses target audience, \
             success metrics, business model and risk with concrete kpi targets for the user base \
             and clear value.\n\n```rust\nfn main() {}\n```\n\n- item one\n- item two\n"
            .repeat(5);
        let result = QualityController.validate(&content, Stage::Analyst);
        assert!(result.score > 0.0);
    }

    #[test]
    fn thin_content_fails_the_conjunction() {
        let result = QualityController.validate("short", Stage::Planner);
        assert!(!result.passed);
    }
}
