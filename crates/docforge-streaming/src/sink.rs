use std::sync::Arc;

use docforge_orchestrator::{ProgressEvent, ProgressSink};
use docforge_wire::StreamEvent;

use crate::registry::StreamRegistry;

/// Adapts orchestrator progress events onto the per-project broadcast
/// channels, translating the internal `ProgressEvent` into the public
/// `StreamEvent` wire shape.
pub struct BroadcastProgressSink {
    registry: Arc<StreamRegistry>,
}

impl BroadcastProgressSink {
    pub fn new(registry: Arc<StreamRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait::async_trait]
impl ProgressSink for BroadcastProgressSink {
    async fn emit(&self, event: ProgressEvent) {
        let stream_event = StreamEvent::progress(event.stage.agent_type(), event.fraction, event.message);
        self.registry.publish_for_correlation(event.correlation_id, stream_event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docforge_types::execution::Stage;
    use uuid::Uuid;

    #[tokio::test]
    async fn emit_publishes_a_progress_event_to_the_registered_project() {
        let registry = Arc::new(StreamRegistry::new());
        let tenant_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let correlation_id = docforge_types::CorrelationId::new();
        registry.register_correlation(correlation_id, tenant_id, project_id);
        let mut rx = registry.subscribe(tenant_id, project_id);

        let sink = BroadcastProgressSink::new(registry);
        sink.emit(ProgressEvent {
            correlation_id,
            stage: Stage::Architect,
            fraction: 0.5,
            message: "executing".to_string(),
        })
        .await;

        let received = rx.try_recv().unwrap();
        match received.payload {
            docforge_wire::StreamEventPayload::Progress { stage, progress, .. } => {
                assert_eq!(stage, "solution_architect");
                assert_eq!(progress, 0.5);
            }
            _ => panic!("expected a progress event"),
        }
    }
}
