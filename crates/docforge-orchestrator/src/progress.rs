use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use docforge_types::execution::Stage;
use docforge_types::CorrelationId;

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgressEvent {
    pub correlation_id: CorrelationId,
    pub stage: Stage,
    pub fraction: f64,
    pub message: String,
}

#[async_trait::async_trait]
pub trait ProgressSink: Send + Sync {
    async fn emit(&self, event: ProgressEvent);
}

/// Fans a stage run's progress events out to every registered sink, one
/// correlation id at a time. Emission for a given correlation id is
/// serialized through a per-id lock so callbacks always see events in the
/// order they were produced, even if a future caller emits from more than
/// one task for the same run.
#[derive(Default)]
pub struct ProgressRegistry {
    locks: Mutex<HashMap<CorrelationId, Arc<Mutex<()>>>>,
    sinks: Mutex<Vec<Arc<dyn ProgressSink>>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, sink: Arc<dyn ProgressSink>) {
        self.sinks.lock().await.push(sink);
    }

    pub async fn emit(&self, correlation_id: CorrelationId, stage: Stage, fraction: f64, message: impl Into<String>) {
        let lock = self.lock_for(correlation_id).await;
        let _guard = lock.lock().await;

        let event = ProgressEvent {
            correlation_id,
            stage,
            fraction,
            message: message.into(),
        };
        let sinks = self.sinks.lock().await.clone();
        for sink in sinks {
            sink.emit(event.clone()).await;
        }
    }

    async fn lock_for(&self, correlation_id: CorrelationId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(correlation_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct RecordingSink {
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl ProgressSink for RecordingSink {
        async fn emit(&self, event: ProgressEvent) {
            self.seen.lock().await.push(event.message);
        }
    }

    #[tokio::test]
    async fn events_for_one_correlation_id_arrive_in_emission_order() {
        let registry = ProgressRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        registry.subscribe(Arc::new(RecordingSink { seen: seen.clone() })).await;

        let correlation_id = CorrelationId::new();
        for i in 0..5 {
            registry.emit(correlation_id, Stage::Analyst, i as f64 / 5.0, format!("step {i}")).await;
        }

        let messages = seen.lock().await.clone();
        assert_eq!(messages, vec!["step 0", "step 1", "step 2", "step 3", "step 4"]);
    }

    #[tokio::test]
    async fn counts_one_emission_per_subscriber() {
        let registry = ProgressRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        struct CountingSink(Arc<AtomicUsize>);
        #[async_trait::async_trait]
        impl ProgressSink for CountingSink {
            async fn emit(&self, _event: ProgressEvent) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        registry.subscribe(Arc::new(CountingSink(count.clone()))).await;
        registry.emit(CorrelationId::new(), Stage::Planner, 1.0, "done").await;
        let _ = Uuid::new_v4();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
