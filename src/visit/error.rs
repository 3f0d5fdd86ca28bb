use std::error::Error as _;
use std::fmt;
use thiserror::Error;

use crate::counter::CounterError;
use crate::enrichment::EnrichmentError;
use crate::publisher::PublishError;

/// Backend steps of a visit, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitStep {
    Count,
    Publish,
    RpcEnrichment,
    HttpEnrichment,
}

impl VisitStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStep::Count => "count",
            VisitStep::Publish => "publish",
            VisitStep::RpcEnrichment => "rpc_enrichment",
            VisitStep::HttpEnrichment => "http_enrichment",
        }
    }
}

impl fmt::Display for VisitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one of the visit steps.
///
/// Callers only ever see a generic internal error; the variant and its source
/// are for the service log.
#[derive(Debug, Error)]
pub enum VisitError {
    #[error("visit counter update failed")]
    Count(#[source] CounterError),
    #[error("visit event publish failed")]
    Publish(#[source] PublishError),
    #[error("gRPC ip info lookup failed")]
    RpcEnrichment(#[source] EnrichmentError),
    #[error("HTTP ip info lookup failed")]
    HttpEnrichment(#[source] EnrichmentError),
    #[error("request deadline exceeded during {0}")]
    DeadlineExceeded(VisitStep),
}

impl VisitError {
    pub fn step(&self) -> VisitStep {
        match self {
            VisitError::Count(_) => VisitStep::Count,
            VisitError::Publish(_) => VisitStep::Publish,
            VisitError::RpcEnrichment(_) => VisitStep::RpcEnrichment,
            VisitError::HttpEnrichment(_) => VisitStep::HttpEnrichment,
            VisitError::DeadlineExceeded(step) => *step,
        }
    }

    /// The error and all of its sources, joined with `": "`.
    pub fn report(&self) -> String {
        let mut report = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            report.push_str(": ");
            report.push_str(&err.to_string());
            source = err.source();
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_includes_sources() {
        let err = VisitError::Count(CounterError::Increment(anyhow::anyhow!("connection refused")));

        assert_eq!(err.step(), VisitStep::Count);
        assert_eq!(
            err.report(),
            "visit counter update failed: failed to increment counter: connection refused"
        );
    }

    #[test]
    fn test_report_prints_rpc_status_once() {
        let err = VisitError::RpcEnrichment(EnrichmentError::Rpc(tonic::Status::unavailable(
            "connection refused",
        )));

        let report = err.report();
        assert!(report.starts_with("gRPC ip info lookup failed: ip info RPC failed: "));
        assert_eq!(report.matches("connection refused").count(), 1);
    }

    #[test]
    fn test_deadline_reports_step() {
        let err = VisitError::DeadlineExceeded(VisitStep::HttpEnrichment);

        assert_eq!(err.step(), VisitStep::HttpEnrichment);
        assert_eq!(err.report(), "request deadline exceeded during http_enrichment");
    }
}
