//! Structural Markdown validation: requires a top-level heading, rewards
//! secondary/tertiary structure, lists and fenced code, and runs the
//! content through a real parser to catch gross syntactic breakage rather
//! than relying on substring checks alone.

use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

use crate::result::ValidationResult;
use crate::validator::ContentValidator;

pub struct MarkdownValidator;

impl ContentValidator for MarkdownValidator {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn validate(&self, content: &str) -> ValidationResult {
        let mut has_h1 = false;
        let mut has_h2 = false;
        let mut has_h3 = false;
        let mut has_list = false;
        let mut has_code = false;
        let mut event_count = 0usize;

        for event in Parser::new(content) {
            event_count += 1;
            match event {
                Event::Start(Tag::Heading { level, .. }) => match level {
                    HeadingLevel::H1 => has_h1 = true,
                    HeadingLevel::H2 => has_h2 = true,
                    HeadingLevel::H3 => has_h3 = true,
                    _ => {}
                },
                Event::Start(Tag::List(_)) => has_list = true,
                Event::Start(Tag::CodeBlock(_)) | Event::Code(_) => has_code = true,
                Event::End(TagEnd::Heading(_)) => {}
                _ => {}
            }
        }

        let mut missing_sections = Vec::new();
        let mut suggestions = Vec::new();

        if !has_h1 {
            missing_sections.push("Missing: a top-level heading (# )".to_string());
        }
        if !has_h2 {
            suggestions.push("Consider adding H2 headers (##) for better structure".to_string());
        }
        if !has_h3 {
            suggestions.push("Consider adding H3 headers (###) for detailed structure".to_string());
        }
        if !has_list {
            suggestions.push("Consider adding lists for better readability".to_string());
        }
        if !has_code {
            suggestions.push("Consider adding code examples or technical references".to_string());
        }
        if event_count == 0 && !content.trim().is_empty() {
            suggestions.push("Markdown syntax may have issues".to_string());
        }

        let structure_score = if has_h1 { 1.0 } else { 0.0 };
        let content_score = (content.len() as f64 / 2000.0).min(1.0);
        let mut formatting_bonus = 0.0;
        if has_h2 && has_h3 {
            formatting_bonus += 0.1;
        }
        if has_list {
            formatting_bonus += 0.05;
        }
        if has_code {
            formatting_bonus += 0.05;
        }

        let overall_score = ((structure_score + content_score) / 2.0 + formatting_bonus).min(1.0);

        ValidationResult {
            passed: overall_score >= 0.7,
            score: overall_score,
            details: serde_json::json!({
                "structure_score": structure_score,
                "content_length": content.len(),
                "has_headers": has_h2 || has_h3,
                "has_lists": has_list,
                "has_code": has_code,
            }),
            missing_sections,
            suggestions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_structured_document_passes_with_high_score() {
        let content = "# Title\n\n## Section\n\n### Detail\n\n- item\n\n```rust\nfn x() {}\n```\n".repeat(20);
        let result = MarkdownValidator.validate(&content);
        assert!(result.passed);
        assert!(result.missing_sections.is_empty());
    }

    #[test]
    fn document_without_h1_is_flagged_missing() {
        let result = MarkdownValidator.validate("## Section only\n\nSome text.");
        assert!(!result.missing_sections.is_empty());
    }

    #[test]
    fn empty_content_scores_low() {
        let result = MarkdownValidator.validate("");
        assert!(!result.passed);
    }
}
