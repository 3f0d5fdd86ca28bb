use serde::{Deserialize, Serialize};

/// Event emitted to the message sinks for every recorded visit.
///
/// Carries no event id: two deliveries of the same visit are indistinguishable,
/// which is fine for at-least-once consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEvent {
    pub ip: String,
}

impl VisitEvent {
    pub fn new(ip: impl Into<String>) -> Self {
        Self { ip: ip.into() }
    }
}

/// Enrichment data about a client address.
///
/// On the wire the label is called `name`, both when decoding the HTTP info
/// service and when rendering the aggregated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpInfo {
    pub ip: String,
    #[serde(rename = "name")]
    pub info: String,
}

/// Body of a successful `GET /count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: i64,
    /// Result of the HTTP lookup.
    pub info: IpInfo,
    /// Result of the gRPC lookup.
    pub info2: IpInfo,
    pub text: String,
}
