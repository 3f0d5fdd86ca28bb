use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::{Channel, Endpoint};

use super::proto::{IpRequest, IpResponse, GET_IP_INFO_PATH};
use super::{EnrichmentError, IpInfoLookup};
use crate::models::{IpInfo, Tenant, TENANT_HEADER};

/// gRPC client for the IP info service.
///
/// Holds one lazily connected channel; clones of the channel share the
/// underlying HTTP/2 connection.
#[derive(Clone)]
pub struct GrpcIpInfoClient {
    grpc: tonic::client::Grpc<Channel>,
}

impl GrpcIpInfoClient {
    /// Accepts `host:port` (plaintext) or a full `http(s)://` URI.
    pub fn connect_lazy(address: &str) -> Result<Self> {
        let uri = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        };

        let endpoint = Endpoint::from_shared(uri)
            .with_context(|| format!("invalid ip info gRPC address '{address}'"))?
            .connect_timeout(Duration::from_secs(5));

        Ok(Self::new(endpoint.connect_lazy()))
    }

    pub fn new(channel: Channel) -> Self {
        Self {
            grpc: tonic::client::Grpc::new(channel),
        }
    }
}

/// Build the outgoing call, with the tenant as ASCII metadata when present.
pub(crate) fn build_request(
    ip: &str,
    tenant: Option<&Tenant>,
) -> Result<tonic::Request<IpRequest>, EnrichmentError> {
    let mut request = tonic::Request::new(IpRequest { ip: ip.to_string() });

    if let Some(tenant) = tenant {
        let value = AsciiMetadataValue::try_from(tenant.as_str())
            .map_err(|_| EnrichmentError::InvalidTenant)?;
        request.metadata_mut().insert(TENANT_HEADER, value);
    }

    Ok(request)
}

#[async_trait]
impl IpInfoLookup for GrpcIpInfoClient {
    async fn lookup(&self, ip: &str, tenant: Option<&Tenant>) -> Result<IpInfo, EnrichmentError> {
        let request = build_request(ip, tenant)?;

        let mut grpc = self.grpc.clone();
        grpc.ready()
            .await
            .map_err(|e| tonic::Status::unavailable(format!("ip info channel not ready: {e}")))?;

        let response = grpc
            .unary(
                request,
                PathAndQuery::from_static(GET_IP_INFO_PATH),
                ProstCodec::<IpRequest, IpResponse>::default(),
            )
            .await?;

        let IpResponse { ip, info } = response.into_inner();
        Ok(IpInfo { ip, info })
    }
}
