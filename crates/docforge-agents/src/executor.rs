use std::time::Duration;

use docforge_providers::ProviderManager;
use docforge_quality::QualityController;

use crate::capability::StageCapability;
use crate::error::{AgentError, AgentResult};
use crate::types::{ParsedOutput, StageContext, StageInput};

const MIN_INPUT_LEN: usize = 10;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// The parsed document plus the controller's verdict on it, mirroring the
/// original output contract where `validation` and `confidence_score` are
/// attached to the same object the content lives on.
#[derive(Debug, Clone)]
pub struct AgentOutput {
    pub parsed: ParsedOutput,
    pub validation: docforge_quality::ValidationResult,
    pub confidence_score: f64,
    pub processing_time_ms: i64,
}

/// Runs one stage end to end: validate input, compose the prompt, call the
/// provider under a bounded timeout, parse the raw response, and score it.
pub struct AgentExecutor {
    providers: ProviderManager,
    timeout: Duration,
}

impl AgentExecutor {
    pub fn new(providers: ProviderManager) -> Self {
        Self {
            providers,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn execute(
        &self,
        ctx: &StageContext,
        input: &StageInput,
        context_excerpts: &[String],
        provider_id: Option<&str>,
        model_id: Option<&str>,
    ) -> AgentResult<AgentOutput> {
        if input.primary_text.trim().len() < MIN_INPUT_LEN {
            return Err(AgentError::InvalidInput(format!(
                "input must be at least {MIN_INPUT_LEN} characters"
            )));
        }

        let capability = StageCapability::for_stage(ctx.stage);
        let prompt = format!(
            "{}\n\n{}",
            capability.system_prompt(ctx),
            capability.task_description(input, context_excerpts)
        );

        let started = std::time::Instant::now();
        let completion = tokio::time::timeout(self.timeout, self.providers.complete(provider_id, &prompt, model_id))
            .await
            .map_err(|_| AgentError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| AgentError::Provider(e.into()))?;
        let processing_time_ms = started.elapsed().as_millis() as i64;

        let parsed = capability.parse(&completion.text);
        let validation = QualityController.validate(&parsed.content, ctx.stage);

        Ok(AgentOutput {
            confidence_score: validation.score,
            parsed,
            validation,
            processing_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docforge_providers::AppConfig;
    use docforge_types::execution::Stage;
    use uuid::Uuid;

    fn ctx(stage: Stage) -> StageContext {
        StageContext {
            tenant_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            correlation_id: docforge_types::CorrelationId::new(),
            stage,
            language: "en".to_string(),
            user_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn rejects_input_below_minimum_length() {
        let executor = AgentExecutor::new(ProviderManager::new(AppConfig::default()));
        let input = StageInput {
            primary_text: "short".to_string(),
            ..Default::default()
        };
        let err = executor
            .execute(&ctx(Stage::Analyst), &input, &[], None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn runs_against_local_echo_provider_and_produces_a_score() {
        let config = AppConfig {
            allow_local_echo_fallback: true,
            ..AppConfig::default()
        };
        let executor = AgentExecutor::new(ProviderManager::new(config));
        let input = StageInput {
            primary_text: "A marketplace connecting local farmers with nearby restaurants.".to_string(),
            ..Default::default()
        };
        let output = executor
            .execute(&ctx(Stage::Analyst), &input, &[], None, None)
            .await
            .unwrap();
        assert!(output.confidence_score >= 0.0);
        assert!(!output.parsed.content.is_empty());
    }

    #[tokio::test]
    async fn timeout_of_zero_always_fails() {
        let executor = AgentExecutor::new(ProviderManager::new(AppConfig::default())).with_timeout(Duration::from_nanos(1));
        let input = StageInput {
            primary_text: "A marketplace connecting local farmers with nearby restaurants.".to_string(),
            ..Default::default()
        };
        let err = executor
            .execute(&ctx(Stage::Analyst), &input, &[], None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Timeout { .. }));
    }
}
