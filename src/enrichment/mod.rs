//! Clients for the IP info services.
//!
//! Two independent deployments answer the same question over different
//! transports; the aggregator queries both and reports both answers.

pub mod grpc;
pub mod http;
pub mod proto;

pub use grpc::GrpcIpInfoClient;
pub use http::HttpIpInfoClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{IpInfo, Tenant};

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("ip info RPC failed")]
    Rpc(#[from] tonic::Status),
    #[error("ip info request failed")]
    Http(#[from] reqwest::Error),
    #[error("ip info service answered with status {0}")]
    UnexpectedStatus(reqwest::StatusCode),
    #[error("failed to decode ip info response")]
    Decode(#[from] serde_json::Error),
    #[error("tenant cannot be encoded for this transport")]
    InvalidTenant,
    #[error("cannot build ip info URL from base '{0}'")]
    InvalidUrl(String),
}

/// Lookup of descriptive information about a client address.
#[async_trait]
pub trait IpInfoLookup: Send + Sync {
    /// Ask the remote service about `ip`, forwarding `tenant` when present.
    ///
    /// Errors are returned as-is; there is no retry and no local fallback label.
    async fn lookup(&self, ip: &str, tenant: Option<&Tenant>) -> Result<IpInfo, EnrichmentError>;
}
