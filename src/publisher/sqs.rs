use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::MessageAttributeValue;
use aws_sdk_sqs::Client;
use std::collections::HashMap;
use tracing::{debug, info};

use super::EventSink;
use crate::models::{Tenant, TENANT_HEADER};

/// SQS queue sink for visit events.
pub struct SqsSink {
    client: Client,
    queue_url: String,
}

impl SqsSink {
    /// Load AWS configuration from the environment and resolve the queue URL once.
    pub async fn connect(queue_name: &str) -> Result<Self> {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let client = Client::new(&config);

        let output = client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(e)))
            .with_context(|| format!("unable to get URL of queue '{queue_name}'"))?;

        let queue_url = output
            .queue_url()
            .with_context(|| format!("no URL returned for queue '{queue_name}'"))?
            .to_string();

        info!(queue = %queue_name, url = %queue_url, "SQS queue resolved");

        Ok(Self::new(client, queue_url))
    }

    pub fn new(client: Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }
}

/// Message attributes carrying the tenant as a `String` attribute, if there is one.
pub(crate) fn tenant_attributes(
    tenant: Option<&Tenant>,
) -> Result<Option<HashMap<String, MessageAttributeValue>>> {
    let Some(tenant) = tenant else {
        return Ok(None);
    };

    let value = MessageAttributeValue::builder()
        .data_type("String")
        .string_value(tenant.as_str())
        .build()
        .context("failed to build tenant message attribute")?;

    Ok(Some(HashMap::from([(TENANT_HEADER.to_string(), value)])))
}

#[async_trait]
impl EventSink for SqsSink {
    fn name(&self) -> &'static str {
        "sqs"
    }

    async fn send(&self, payload: &[u8], tenant: Option<&Tenant>) -> Result<()> {
        let body = std::str::from_utf8(payload).context("visit event is not valid UTF-8")?;

        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .set_message_attributes(tenant_attributes(tenant)?)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(e)))
            .context("failed to send SQS message")?;

        debug!(message_id = output.message_id().unwrap_or_default(), "SQS message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_attribute_is_typed_string() {
        let tenant = Tenant::new("acme");
        let attributes = tenant_attributes(tenant.as_ref()).unwrap().unwrap();

        let value = attributes.get(TENANT_HEADER).unwrap();
        assert_eq!(value.data_type(), "String");
        assert_eq!(value.string_value(), Some("acme"));
        assert_eq!(attributes.len(), 1);
    }

    #[test]
    fn test_no_attributes_without_tenant() {
        assert!(tenant_attributes(None).unwrap().is_none());
    }
}
