use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;

use super::{EnrichmentError, IpInfoLookup};
use crate::models::{IpInfo, Tenant, TENANT_HEADER};

/// HTTP client for the IP info service (`GET <base>/ip/<ip>`).
#[derive(Clone)]
pub struct HttpIpInfoClient {
    client: Client,
    base: Url,
}

impl HttpIpInfoClient {
    pub fn new(base: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("ip-visit-counter/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("failed to build HTTP client for ip info lookups")?;

        Self::with_client(client, base)
    }

    pub fn with_client(client: Client, base: &str) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("invalid ip info address '{base}'"))?;
        if base.cannot_be_a_base() {
            bail!("ip info address '{base}' cannot be used as a base URL");
        }

        Ok(Self { client, base })
    }

    /// `<base>/ip/<ip>`, with the address percent-encoded as a single path segment.
    fn lookup_url(&self, ip: &str) -> Result<Url, EnrichmentError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| EnrichmentError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .push("ip")
            .push(ip);
        Ok(url)
    }
}

#[async_trait]
impl IpInfoLookup for HttpIpInfoClient {
    async fn lookup(&self, ip: &str, tenant: Option<&Tenant>) -> Result<IpInfo, EnrichmentError> {
        let mut request = self.client.get(self.lookup_url(ip)?);
        if let Some(tenant) = tenant {
            request = request.header(TENANT_HEADER, tenant.as_str());
        }

        let response = request.send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(EnrichmentError::UnexpectedStatus(status));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
