use std::future::Future;
use std::sync::Arc;
use tokio::time::{self, Instant};
use tracing::{debug, error};

use super::{VisitError, VisitStep};
use crate::counter::{visit_key, CounterStore};
use crate::enrichment::IpInfoLookup;
use crate::models::{CountResponse, Tenant, VisitEvent};
use crate::publisher::EventPublisher;

/// Coordinates the backends involved in recording a single visit.
///
/// All handles are shared across requests and never mutated after
/// construction.
pub struct VisitAggregator {
    counter: Arc<dyn CounterStore>,
    publisher: EventPublisher,
    rpc_info: Arc<dyn IpInfoLookup>,
    http_info: Arc<dyn IpInfoLookup>,
    text: Arc<str>,
}

impl VisitAggregator {
    pub fn new(
        counter: Arc<dyn CounterStore>,
        publisher: EventPublisher,
        rpc_info: Arc<dyn IpInfoLookup>,
        http_info: Arc<dyn IpInfoLookup>,
        text: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            counter,
            publisher,
            rpc_info,
            http_info,
            text: text.into(),
        }
    }

    /// Count, publish and enrich a visit from `client`.
    ///
    /// Steps run strictly in sequence, each bounded by `deadline`. The first
    /// failing step is logged and returned; nothing already done is undone.
    #[tracing::instrument(
        name = "record_visit",
        skip_all,
        fields(client = %client, tenant = tenant.map(Tenant::as_str))
    )]
    pub async fn record_visit(
        &self,
        client: &str,
        tenant: Option<&Tenant>,
        deadline: Instant,
    ) -> Result<CountResponse, VisitError> {
        let result = self.run(client, tenant, deadline).await;

        if let Err(err) = &result {
            error!(step = %err.step(), error = %err.report(), "visit failed");
        }

        result
    }

    async fn run(
        &self,
        client: &str,
        tenant: Option<&Tenant>,
        deadline: Instant,
    ) -> Result<CountResponse, VisitError> {
        let key = visit_key(client);
        let count = within(
            VisitStep::Count,
            deadline,
            self.counter.increment_and_refresh(&key),
        )
        .await?
        .map_err(VisitError::Count)?;
        debug!(count, "visit counted");

        let event = VisitEvent::new(client);
        within(
            VisitStep::Publish,
            deadline,
            self.publisher.publish(&event, tenant),
        )
        .await?
        .map_err(VisitError::Publish)?;
        debug!("visit published");

        let info2 = within(
            VisitStep::RpcEnrichment,
            deadline,
            self.rpc_info.lookup(client, tenant),
        )
        .await?
        .map_err(VisitError::RpcEnrichment)?;
        debug!(info = %info2.info, "gRPC ip info received");

        let info = within(
            VisitStep::HttpEnrichment,
            deadline,
            self.http_info.lookup(client, tenant),
        )
        .await?
        .map_err(VisitError::HttpEnrichment)?;
        debug!(info = %info.info, "HTTP ip info received");

        Ok(CountResponse {
            count,
            info,
            info2,
            text: self.text.to_string(),
        })
    }
}

/// Run one step, dropping it (and cancelling its I/O) once `deadline` passes.
async fn within<F: Future>(
    step: VisitStep,
    deadline: Instant,
    step_future: F,
) -> Result<F::Output, VisitError> {
    time::timeout_at(deadline, step_future)
        .await
        .map_err(|_| VisitError::DeadlineExceeded(step))
}
