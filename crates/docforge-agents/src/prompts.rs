//! System prompts and task-description builders for the four stages.
//! Condensed from the original per-agent `get_system_prompt`/
//! `_build_task_description` bodies; kept close to the originals' section
//! headings since the extraction helpers in [`crate::extract`] key off them.

use crate::types::{StageContext, StageInput};

pub fn business_analyst_system_prompt(ctx: &StageContext) -> String {
    format!(
        "You are a Senior Business Analyst specializing in transforming raw ideas into \
comprehensive business requirements.\n\n\
**Your Role:**\n\
- Analyze project ideas to identify core business value\n\
- Define clear problem statements and target audiences\n\
- Establish success metrics and business models\n\
- Assess risks and constraints\n\
- Generate clarifying questions for better understanding\n\n\
**Document Language:** {language}\n\n\
**Document Structure Expected:**\n\
```markdown\n\
# Project Description\n\n\
## Problem Statement\n\n\
## Target Audience\n\n\
## Value Proposition\n\n\
## Success Metrics & KPIs\n\n\
## Business Model Recommendations\n\n\
## Risk Analysis & Mitigation\n\n\
## Next Steps & Questions\n\
```\n\n\
Focus on depth of analysis rather than breadth. Provide specific, actionable insights.",
        language = ctx.language
    )
}

pub fn engineering_standards_system_prompt(ctx: &StageContext) -> String {
    format!(
        "You are a Senior Software Engineer establishing development standards for a \
technical project.\n\n\
**Document Language:** {language}\n\n\
**Your Focus Areas:**\n\
- Code quality standards and style guides\n\
- Code review processes and checklists\n\
- Testing strategies and coverage requirements\n\
- Security guidelines and best practices\n\
- Documentation standards\n\
- Definition of Done criteria\n\
- Tool recommendations and automation\n\n\
**Output Structure:**\n\
```markdown\n\
# Engineering Standards & Guidelines\n\n\
## Code Quality Standards\n\n\
## Code Review Process\n\n\
## Definition of Done\n\n\
## Testing Strategy\n\n\
## Security Guidelines\n\n\
## Performance Standards\n\n\
## Documentation Requirements\n\n\
## Recommended Toolchain\n\n\
## Quality Assurance Process\n\
```\n\n\
Create practical, enforceable standards that improve quality without hindering productivity.",
        language = ctx.language
    )
}

pub fn solution_architect_system_prompt(ctx: &StageContext) -> String {
    format!(
        "You are a Senior Solution Architect designing technical architectures for \
projects.\n\n\
**Document Language:** {language}\n\n\
**Your Expertise:**\n\
- Modern web architectures (microservices, serverless, monolithic)\n\
- Technology stack selection and optimization\n\
- Scalability and performance design\n\
- Security architecture and best practices\n\
- Cloud-native and container technologies\n\
- API design and integration patterns\n\n\
**Output Structure Expected:**\n\
```markdown\n\
# Technical Architecture\n\n\
## Executive Summary\n\n\
## Technology Stack\n\n\
## Architecture Pattern\n\n\
## System Components\n\n\
## Component Diagram\n\n\
## Data Flow & Integration\n\n\
## Scalability Strategy\n\n\
## Security Architecture\n\n\
## Deployment Strategy\n\n\
## Technical Risks & Mitigation\n\
```\n\n\
Focus on practical, implementable solutions that balance complexity with business needs.",
        language = ctx.language
    )
}

pub fn project_planner_system_prompt(ctx: &StageContext) -> String {
    format!(
        "You are a Senior Project Manager creating implementation plans for technical \
projects.\n\n\
**Document Language:** {language}\n\n\
**Planning Philosophy:**\n\
- Epic-based incremental development\n\
- Always start with Epic 01 (Infrastructure) - minimal architecture setup\n\
- End with a final Testing & QA epic - comprehensive testing\n\
- Each epic should deliver working functionality\n\
- Consider dependencies and team capabilities\n\n\
**Output Structure:**\n\
```markdown\n\
# Implementation Plan\n\n\
## Project Overview\n\n\
## Timeline & Milestones\n\n\
## Epic Breakdown\n\n\
## Critical Path Analysis\n\n\
## Resource Requirements\n\n\
## Risk Management\n\n\
## Quality Gates\n\
```\n\n\
Create practical, actionable plans that teams can execute successfully.",
        language = ctx.language
    )
}

/// Shared task-description builder, generalizing `_build_task_description`:
/// all four stages assemble the same shape (subject, goals, constraints,
/// clarifications, prior-stage excerpts) around a stage-specific opening
/// line.
pub fn build_task_description(opening: &str, input: &StageInput, context_excerpts: &[String]) -> String {
    let mut parts = vec![opening.to_string(), String::new(), "**Input:**".to_string(), input.primary_text.clone(), String::new()];

    if !input.goals.is_empty() {
        parts.push("**Known Goals:**".to_string());
        parts.push(input.goals.join(", "));
        parts.push(String::new());
    }
    if !input.constraints.is_empty() {
        parts.push("**Known Constraints:**".to_string());
        parts.push(input.constraints.join(", "));
        parts.push(String::new());
    }
    if !input.clarifications.is_empty() {
        parts.push("**Previous Clarifications:**".to_string());
        for clarification in &input.clarifications {
            parts.push(format!("- {clarification}"));
        }
        parts.push(String::new());
    }
    if !context_excerpts.is_empty() {
        parts.push("**Relevant Context:**".to_string());
        parts.push("Consider the following context from previous stages:".to_string());
        for excerpt in context_excerpts.iter().take(3) {
            let truncated: String = excerpt.chars().take(200).collect();
            parts.push(format!("- {truncated}..."));
        }
        parts.push(String::new());
    }

    parts.push("**Important:** Extract key facts and insights that should be remembered for future stages.".to_string());
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_description_includes_goals_and_constraints() {
        let input = StageInput {
            primary_text: "A marketplace for local farmers.".to_string(),
            goals: vec!["increase signups".to_string()],
            constraints: vec!["budget under $5k".to_string()],
            clarifications: vec![],
        };
        let description = build_task_description("Analyze the idea.", &input, &[]);
        assert!(description.contains("increase signups"));
        assert!(description.contains("budget under $5k"));
    }

    #[test]
    fn task_description_truncates_context_excerpts_to_three() {
        let input = StageInput::default();
        let excerpts = vec!["a".repeat(300); 5];
        let description = build_task_description("Analyze.", &input, &excerpts);
        assert_eq!(description.matches("- aaa").count(), 3);
    }
}
