//! Messages of the `ipinfo.IpInfoService` gRPC API.

/// Fully qualified path of the unary lookup method.
pub const GET_IP_INFO_PATH: &str = "/ipinfo.IpInfoService/GetIpInfo";

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IpRequest {
    #[prost(string, tag = "1")]
    pub ip: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IpResponse {
    #[prost(string, tag = "1")]
    pub ip: String,
    #[prost(string, tag = "2")]
    pub info: String,
}
