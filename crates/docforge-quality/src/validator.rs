use crate::result::ValidationResult;

/// A single named check over generated content. Validators are pure
/// computation over the text; none of them perform I/O, so the trait stays
/// synchronous.
pub trait ContentValidator: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, content: &str) -> ValidationResult;
}
