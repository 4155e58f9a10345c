//! Stage agents as data rather than as a trait-object class hierarchy: one
//! `StageCapability` record per [`Stage`], dispatched from a static table by
//! [`StageCapability::for_stage`].

use docforge_types::execution::Stage;

use crate::extract::{extract_key_facts, extract_list_items, extract_section};
use crate::prompts::{
    build_task_description, business_analyst_system_prompt, engineering_standards_system_prompt,
    project_planner_system_prompt, solution_architect_system_prompt,
};
use crate::types::{ParsedOutput, StageContext, StageInput};

pub struct StageCapability {
    pub stage: Stage,
    system_prompt: fn(&StageContext) -> String,
    task_opening: &'static str,
    sections: &'static [(&'static str, &'static [&'static str])],
    list_sections: &'static [(&'static str, &'static [&'static str])],
}

impl StageCapability {
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Analyst => Self {
                stage,
                system_prompt: business_analyst_system_prompt,
                task_opening: "Analyze the following project idea and create a comprehensive business analysis document:",
                sections: &[
                    ("problem_statement", &["Problem Statement", "Problem"]),
                    ("target_audience_analysis", &["Target Audience", "Audience"]),
                ],
                list_sections: &[
                    ("success_metrics", &["Success Metrics", "KPIs", "Metrics"]),
                    ("business_model_suggestions", &["Business Model", "Revenue", "Monetization"]),
                    ("risk_analysis", &["Risk", "Risks"]),
                    ("clarifying_questions", &["Questions", "Clarifying Questions"]),
                ],
            },
            Stage::Standards => Self {
                stage,
                system_prompt: engineering_standards_system_prompt,
                task_opening: "Define engineering standards and guidelines for the following project:",
                sections: &[
                    ("code_quality_standards", &["Code Quality Standards"]),
                    ("security_guidelines", &["Security Guidelines", "Security"]),
                ],
                list_sections: &[
                    ("testing_strategy", &["Testing Strategy", "Testing"]),
                    ("recommended_toolchain", &["Recommended Toolchain", "Toolchain"]),
                ],
            },
            Stage::Architect => Self {
                stage,
                system_prompt: solution_architect_system_prompt,
                task_opening: "Design a technical architecture for the following project:",
                sections: &[
                    ("technology_stack", &["Technology Stack"]),
                    ("architecture_pattern", &["Architecture Pattern"]),
                ],
                list_sections: &[
                    ("system_components", &["System Components", "Components"]),
                    ("technical_risks", &["Technical Risks", "Risks"]),
                ],
            },
            Stage::Planner => Self {
                stage,
                system_prompt: project_planner_system_prompt,
                task_opening: "Create an epic-based implementation plan for the following project:",
                sections: &[
                    ("project_overview", &["Project Overview", "Overview"]),
                    ("critical_path_analysis", &["Critical Path Analysis", "Critical Path"]),
                ],
                list_sections: &[
                    ("epic_breakdown", &["Epic Breakdown", "Epics"]),
                    ("quality_gates", &["Quality Gates"]),
                ],
            },
        }
    }

    pub fn system_prompt(&self, ctx: &StageContext) -> String {
        (self.system_prompt)(ctx)
    }

    pub fn task_description(&self, input: &StageInput, context_excerpts: &[String]) -> String {
        build_task_description(self.task_opening, input, context_excerpts)
    }

    pub fn validator_tag(&self) -> &'static str {
        self.stage.agent_type()
    }

    pub fn parse(&self, raw: &str) -> ParsedOutput {
        let mut sections = std::collections::HashMap::new();
        for (key, names) in self.sections {
            sections.insert((*key).to_string(), extract_section(raw, names));
        }
        let mut list_sections = std::collections::HashMap::new();
        for (key, names) in self.list_sections {
            list_sections.insert((*key).to_string(), extract_list_items(raw, names));
        }
        ParsedOutput {
            content: raw.to_string(),
            sections,
            list_sections,
            key_facts: extract_key_facts(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ctx() -> StageContext {
        StageContext {
            tenant_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            correlation_id: docforge_types::CorrelationId::new(),
            stage: Stage::Analyst,
            language: "en".to_string(),
            user_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn validator_tag_matches_stage_agent_type() {
        for stage in Stage::ORDER {
            assert_eq!(StageCapability::for_stage(stage).validator_tag(), stage.agent_type());
        }
    }

    #[test]
    fn analyst_system_prompt_mentions_language() {
        let prompt = StageCapability::for_stage(Stage::Analyst).system_prompt(&ctx());
        assert!(prompt.contains("**Document Language:** en"));
    }

    #[test]
    fn analyst_parse_extracts_sections_and_lists() {
        let content = "# Project Description\n\n\
## Problem Statement\nOnboarding is too slow.\n\n\
## Target Audience\nSmall teams.\n\n\
## Success Metrics & KPIs\n- Reach 1000 signups in month one\n- Retain 40% after 30 days\n";
        let parsed = StageCapability::for_stage(Stage::Analyst).parse(content);
        assert_eq!(parsed.sections["problem_statement"], "Onboarding is too slow.");
        assert_eq!(parsed.list_sections["success_metrics"].len(), 2);
    }

    #[test]
    fn planner_parse_uses_planner_sections() {
        let content = "## Project Overview\nShip an MVP in 6 weeks.\n\n## Epic Breakdown\n- Epic 01: Infrastructure\n- Epic 02: Core features\n";
        let parsed = StageCapability::for_stage(Stage::Planner).parse(content);
        assert_eq!(parsed.sections["project_overview"], "Ship an MVP in 6 weeks.");
        assert_eq!(parsed.list_sections["epic_breakdown"].len(), 2);
    }
}
