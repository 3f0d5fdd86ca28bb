//! Visit event fan-out.
//!
//! Every visit is written to the stream sink (Kafka) and, when configured, to
//! a secondary queue sink (SQS). Both carry the tenant under
//! [`TENANT_HEADER`](crate::models::TENANT_HEADER) when one is present.

pub mod kafka;
pub mod sqs;

pub use kafka::KafkaSink;
pub use sqs::SqsSink;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{Tenant, VisitEvent};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to serialize visit event")]
    Serialize(#[from] serde_json::Error),
    #[error("publish to {sink} failed")]
    Sink {
        sink: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// A message destination for serialized visit events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Deliver one payload. Returns once the broker client accepted it.
    async fn send(&self, payload: &[u8], tenant: Option<&Tenant>) -> anyhow::Result<()>;
}

pub struct EventPublisher {
    stream: Arc<dyn EventSink>,
    queue: Option<Arc<dyn EventSink>>,
}

impl EventPublisher {
    pub fn new(stream: Arc<dyn EventSink>, queue: Option<Arc<dyn EventSink>>) -> Self {
        Self { stream, queue }
    }

    /// Serialize `event` once and send it to the queue sink (if any), then the stream sink.
    ///
    /// A configured queue sink is a hard dependency: its failure aborts the
    /// publish before the stream sink is attempted.
    pub async fn publish(
        &self,
        event: &VisitEvent,
        tenant: Option<&Tenant>,
    ) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(event)?;

        if let Some(queue) = &self.queue {
            send_to(queue.as_ref(), &payload, tenant).await?;
        }

        send_to(self.stream.as_ref(), &payload, tenant).await
    }
}

async fn send_to(
    sink: &dyn EventSink,
    payload: &[u8],
    tenant: Option<&Tenant>,
) -> Result<(), PublishError> {
    sink.send(payload, tenant)
        .await
        .map_err(|source| PublishError::Sink {
            sink: sink.name(),
            source,
        })?;

    tracing::debug!(sink = sink.name(), "visit event published");
    Ok(())
}
