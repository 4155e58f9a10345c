//! Flesch-Reading-Ease-derived readability scoring. Never fails the overall
//! validation: on degenerate input (e.g. empty content) it returns a
//! neutral, passing result rather than propagating an error.

use crate::result::ValidationResult;
use crate::validator::ContentValidator;

const TARGET_GRADE_LEVEL: f64 = 12.0;
const MIN_READING_EASE: f64 = 30.0;

pub struct ReadabilityValidator;

struct TextMetrics {
    sentence_count: usize,
    word_count: usize,
    syllable_count: usize,
}

impl ContentValidator for ReadabilityValidator {
    fn name(&self) -> &'static str {
        "readability"
    }

    fn validate(&self, content: &str) -> ValidationResult {
        let metrics = extract_metrics(content);
        if metrics.word_count == 0 || metrics.sentence_count == 0 {
            return ValidationResult::neutral("Readability analysis unavailable");
        }

        let avg_sentence_length = metrics.word_count as f64 / metrics.sentence_count as f64;
        let flesch_ease = 206.835
            - 1.015 * avg_sentence_length
            - 84.6 * (metrics.syllable_count as f64 / metrics.word_count as f64);
        let flesch_grade =
            0.39 * avg_sentence_length + 11.8 * (metrics.syllable_count as f64 / metrics.word_count as f64) - 15.59;

        let mut suggestions = Vec::new();
        if flesch_ease < MIN_READING_EASE {
            suggestions.push("Content may be too complex - consider shorter sentences".to_string());
        }
        if flesch_grade > TARGET_GRADE_LEVEL + 2.0 {
            suggestions.push("Grade level is high - consider simpler vocabulary".to_string());
        }
        if avg_sentence_length > 25.0 {
            suggestions.push("Average sentence length is high - break up long sentences".to_string());
        }

        let ease_score = (flesch_ease / 60.0).clamp(0.0, 1.0);
        let grade_score = (1.0 - (flesch_grade - TARGET_GRADE_LEVEL) / 10.0).max(0.0);
        let length_score = (metrics.word_count as f64 / 1000.0).min(1.0);
        let avg_syllables_per_word = metrics.syllable_count as f64 / metrics.word_count as f64;
        let syllable_score = (1.0 - (avg_syllables_per_word - 1.5) / 2.0).max(0.0);

        let overall_score = (ease_score + grade_score + length_score + syllable_score) / 4.0;

        ValidationResult {
            passed: overall_score >= 0.6,
            score: overall_score,
            details: serde_json::json!({
                "flesch_reading_ease": flesch_ease,
                "flesch_kincaid_grade": flesch_grade,
                "avg_sentence_length": avg_sentence_length,
                "word_count": metrics.word_count,
                "syllable_count": metrics.syllable_count,
            }),
            missing_sections: Vec::new(),
            suggestions,
        }
    }
}

fn extract_metrics(content: &str) -> TextMetrics {
    let sentences: Vec<&str> = content
        .split(|c| c == '.' || c == '!' || c == '?')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut word_count = 0;
    let mut syllable_count = 0;
    for sentence in &sentences {
        for word in sentence.split_whitespace() {
            let word: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
            if word.is_empty() {
                continue;
            }
            word_count += 1;
            syllable_count += count_syllables(&word);
        }
    }

    TextMetrics {
        sentence_count: sentences.len(),
        word_count,
        syllable_count,
    }
}

/// Simplified vowel-group heuristic, not a dictionary lookup.
fn count_syllables(word: &str) -> usize {
    let word = word.to_lowercase();
    let vowels = ['a', 'e', 'i', 'o', 'u', 'y'];

    let mut count = 0;
    let mut previous_was_vowel = false;
    for ch in word.chars() {
        let is_vowel = vowels.contains(&ch);
        if is_vowel && !previous_was_vowel {
            count += 1;
        }
        previous_was_vowel = is_vowel;
    }
    if word.ends_with('e') && count > 1 {
        count -= 1;
    }
    count.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_returns_neutral_passing_result() {
        let result = ReadabilityValidator.validate("");
        assert!(result.passed);
        assert_eq!(result.score, 0.7);
    }

    #[test]
    fn plain_short_sentences_score_reasonably() {
        let content = "The cat sat. The dog ran. Birds fly high. Fish swim fast.".repeat(10);
        let result = ReadabilityValidator.validate(&content);
        assert!(result.score > 0.0);
    }

    #[test]
    fn count_syllables_never_returns_zero() {
        assert_eq!(count_syllables("a"), 1);
        assert_eq!(count_syllables("strength"), 1);
        assert!(count_syllables("beautiful") >= 2);
    }
}
