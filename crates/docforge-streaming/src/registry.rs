use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use uuid::Uuid;

use docforge_types::CorrelationId;
use docforge_wire::StreamEvent;

const CHANNEL_CAPACITY: usize = 256;

/// One `tokio::sync::broadcast` channel per `(tenant_id, project_id)`,
/// created lazily on first subscribe or publish. A correlation id is
/// registered against its project when a workflow run starts so progress
/// events (keyed only by correlation id) can be routed to the right
/// channel without threading tenant/project through every callback.
pub struct StreamRegistry {
    channels: Mutex<HashMap<(Uuid, Uuid), broadcast::Sender<StreamEvent>>>,
    correlations: Mutex<HashMap<CorrelationId, (Uuid, Uuid)>>,
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            correlations: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_correlation(&self, correlation_id: CorrelationId, tenant_id: Uuid, project_id: Uuid) {
        self.correlations.lock().unwrap().insert(correlation_id, (tenant_id, project_id));
    }

    pub fn subscribe(&self, tenant_id: Uuid, project_id: Uuid) -> broadcast::Receiver<StreamEvent> {
        self.sender_for(tenant_id, project_id).subscribe()
    }

    pub fn publish(&self, tenant_id: Uuid, project_id: Uuid, event: StreamEvent) {
        // No receivers is the common case between runs; a send error there is expected, not a bug.
        let _ = self.sender_for(tenant_id, project_id).send(event);
    }

    pub fn publish_for_correlation(&self, correlation_id: CorrelationId, event: StreamEvent) {
        let target = self.correlations.lock().unwrap().get(&correlation_id).copied();
        match target {
            Some((tenant_id, project_id)) => self.publish(tenant_id, project_id, event),
            None => tracing::warn!(%correlation_id, "no project registered for correlation id, dropping event"),
        }
    }

    fn sender_for(&self, tenant_id: Uuid, project_id: Uuid) -> broadcast::Sender<StreamEvent> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry((tenant_id, project_id))
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_on_the_same_project_receive_published_events() {
        let registry = StreamRegistry::new();
        let tenant_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let mut rx = registry.subscribe(tenant_id, project_id);

        registry.publish(tenant_id, project_id, StreamEvent::progress("analyst", 0.5, "executing"));

        let received = rx.try_recv().unwrap();
        assert!(matches!(received.payload, docforge_wire::StreamEventPayload::Progress { .. }));
    }

    #[test]
    fn different_projects_do_not_cross_talk() {
        let registry = StreamRegistry::new();
        let (tenant_a, project_a) = (Uuid::new_v4(), Uuid::new_v4());
        let (tenant_b, project_b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut rx_b = registry.subscribe(tenant_b, project_b);

        registry.publish(tenant_a, project_a, StreamEvent::progress("analyst", 0.1, "starting"));

        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn publish_for_correlation_routes_to_the_registered_project() {
        let registry = StreamRegistry::new();
        let tenant_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let correlation_id = CorrelationId::new();
        registry.register_correlation(correlation_id, tenant_id, project_id);
        let mut rx = registry.subscribe(tenant_id, project_id);

        registry.publish_for_correlation(correlation_id, StreamEvent::progress("planner", 1.0, "completed"));

        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn publish_for_unregistered_correlation_is_a_no_op() {
        let registry = StreamRegistry::new();
        registry.publish_for_correlation(CorrelationId::new(), StreamEvent::progress("analyst", 0.0, "starting"));
    }
}
