use anyhow::{Context, Result};
use async_trait::async_trait;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::info;

use super::EventSink;
use crate::models::{Tenant, TENANT_HEADER};

/// How long a record may wait in the local producer queue when it is full.
const QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Kafka stream sink for visit events.
pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
}

impl KafkaSink {
    pub fn new(brokers: &str, topic: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "30000")
            .set("request.timeout.ms", "30000")
            .create()
            .with_context(|| format!("failed to create kafka producer for '{brokers}'"))?;

        info!(brokers = %brokers, topic = %topic, "Kafka producer created");

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }

    /// Wait for in-flight records to be delivered.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        self.producer
            .flush(timeout)
            .context("failed to flush kafka producer")
    }
}

/// Record headers carrying the tenant, if there is one.
pub(crate) fn tenant_headers(tenant: Option<&Tenant>) -> Option<OwnedHeaders> {
    tenant.map(|tenant| {
        OwnedHeaders::new().insert(Header {
            key: TENANT_HEADER,
            value: Some(tenant.as_str()),
        })
    })
}

#[async_trait]
impl EventSink for KafkaSink {
    fn name(&self) -> &'static str {
        "kafka"
    }

    async fn send(&self, payload: &[u8], tenant: Option<&Tenant>) -> Result<()> {
        let mut record = FutureRecord::<(), [u8]>::to(&self.topic).payload(payload);
        if let Some(headers) = tenant_headers(tenant) {
            record = record.headers(headers);
        }

        self.producer
            .send(record, QUEUE_TIMEOUT)
            .await
            .map(|_| ())
            .map_err(|(err, _)| err)
            .with_context(|| format!("failed to write to topic '{}'", self.topic))
    }
}
