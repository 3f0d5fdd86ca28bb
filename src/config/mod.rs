use anyhow::Context;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    /// File whose content is returned as `text` in every count response
    pub response_file: String,
    pub counter: CounterConfig,
    pub kafka: KafkaConfig,
    /// Secondary queue sink; `None` disables it
    pub sqs: Option<SqsConfig>,
    pub ip_info: IpInfoConfig,
    pub client_ip: ClientIpConfig,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterConfig {
    pub backend: CounterBackend,
    pub redis_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KafkaConfig {
    pub address: String,
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqsConfig {
    pub queue_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpInfoConfig {
    /// Base URL of the HTTP info service
    pub http_address: String,
    /// `host:port` or URI of the gRPC info service
    pub grpc_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedProxyMode {
    /// Use the connection peer address only
    None,
    /// Use Forwarded / X-Forwarded-For with trust validation
    Standard,
    /// Use CF-Connecting-IP
    Cloudflare,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientIpConfig {
    pub trusted_proxy_mode: TrustedProxyMode,
    #[serde(default)]
    pub trusted_proxies: Vec<IpNet>,
    #[serde(default)]
    pub num_trusted_proxies: Option<usize>,
}

impl Default for ClientIpConfig {
    fn default() -> Self {
        Self {
            trusted_proxy_mode: TrustedProxyMode::None,
            trusted_proxies: Vec::new(),
            num_trusted_proxies: None,
        }
    }
}

impl Config {
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from a variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| get(key).with_context(|| format!("{key} must be set"));

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match get("PORT") {
            Some(v) => v.parse::<u16>().with_context(|| format!("invalid PORT '{v}'"))?,
            None => 8080,
        };

        let backend = match get("COUNTERBACKEND").map(|v| v.to_lowercase()).as_deref() {
            None | Some("redis") => CounterBackend::Redis,
            Some("memory") => CounterBackend::Memory,
            Some(other) => {
                anyhow::bail!("unknown COUNTERBACKEND '{other}'. Supported values: redis, memory")
            }
        };
        let redis_address = get("REDISADDRESS").unwrap_or_else(|| "127.0.0.1:6379".to_string());

        let request_timeout_secs = match get("REQUESTTIMEOUTSECS") {
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .with_context(|| format!("invalid REQUESTTIMEOUTSECS '{v}'"))?,
            None => Self::DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let mode = get("TRUSTEDPROXYMODE").map(|v| v.to_lowercase());
        let trusted_proxy_mode = match mode.as_deref() {
            None | Some("none") => TrustedProxyMode::None,
            Some("standard") => TrustedProxyMode::Standard,
            Some("cloudflare") => TrustedProxyMode::Cloudflare,
            Some(other) => {
                tracing::warn!(
                    "Unknown TRUSTEDPROXYMODE '{other}', falling back to 'none'. Supported values: none, standard, cloudflare"
                );
                TrustedProxyMode::None
            }
        };

        let trusted_proxies = get("TRUSTEDPROXIES")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(parse_proxy)
                    .collect::<anyhow::Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let num_trusted_proxies = get("NUMTRUSTEDPROXIES")
            .map(|v| {
                v.parse::<usize>()
                    .with_context(|| format!("invalid NUMTRUSTEDPROXIES '{v}'"))
            })
            .transpose()?;

        Ok(Config {
            server: ServerConfig { host, port },
            response_file: require("RESPONSEFILE")?,
            counter: CounterConfig {
                backend,
                redis_address,
            },
            kafka: KafkaConfig {
                address: require("KAFKAADDRESS")?,
                topic: require("KAFKATOPIC")?,
            },
            sqs: get("SQSQUEUENAME").map(|queue_name| SqsConfig { queue_name }),
            ip_info: IpInfoConfig {
                http_address: require("IPINFOADDRESS")?,
                grpc_address: require("IPINFOGRPCADDRESS")?,
            },
            client_ip: ClientIpConfig {
                trusted_proxy_mode,
                trusted_proxies,
                num_trusted_proxies,
            },
            request_timeout_secs,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// A CIDR, or a bare address meaning a single host.
fn parse_proxy(value: &str) -> anyhow::Result<IpNet> {
    value
        .parse::<IpNet>()
        .or_else(|_| value.parse::<std::net::IpAddr>().map(IpNet::from))
        .with_context(|| format!("invalid trusted proxy '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("RESPONSEFILE", "/etc/ip-visit/response.txt"),
        ("KAFKAADDRESS", "kafka:9092"),
        ("KAFKATOPIC", "visits"),
        ("IPINFOADDRESS", "http://ip-info"),
        ("IPINFOGRPCADDRESS", "ip-info-grpc:50051"),
    ];

    fn with_required(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        REQUIRED.iter().chain(extra.iter()).copied().collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(REQUIRED)).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.counter.backend, CounterBackend::Redis);
        assert_eq!(config.counter.redis_address, "127.0.0.1:6379");
        assert!(config.sqs.is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.client_ip.trusted_proxy_mode, TrustedProxyMode::None);
        assert_eq!(config.kafka.topic, "visits");
    }

    #[test]
    fn test_missing_required_value() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[1..])).unwrap_err();
        assert!(err.to_string().contains("RESPONSEFILE"));
    }

    #[test]
    fn test_empty_queue_name_disables_queue() {
        let vars = with_required(&[("SQSQUEUENAME", "")]);
        let config = Config::from_lookup(lookup_from(&vars)).unwrap();
        assert!(config.sqs.is_none());

        let vars = with_required(&[("SQSQUEUENAME", "ip-visits")]);
        let config = Config::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(config.sqs.unwrap().queue_name, "ip-visits");
    }

    #[test]
    fn test_overrides() {
        let vars = with_required(&[
            ("PORT", "9000"),
            ("COUNTERBACKEND", "Memory"),
            ("REQUESTTIMEOUTSECS", "3"),
            ("TRUSTEDPROXYMODE", "standard"),
            ("TRUSTEDPROXIES", "10.0.0.0/8, 192.168.1.7"),
            ("NUMTRUSTEDPROXIES", "2"),
        ]);
        let config = Config::from_lookup(lookup_from(&vars)).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.counter.backend, CounterBackend::Memory);
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.client_ip.trusted_proxy_mode, TrustedProxyMode::Standard);
        assert_eq!(
            config.client_ip.trusted_proxies,
            vec![
                "10.0.0.0/8".parse::<IpNet>().unwrap(),
                "192.168.1.7/32".parse::<IpNet>().unwrap(),
            ]
        );
        assert_eq!(config.client_ip.num_trusted_proxies, Some(2));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for bad in [
            ("PORT", "eighty"),
            ("COUNTERBACKEND", "etcd"),
            ("REQUESTTIMEOUTSECS", "0"),
            ("TRUSTEDPROXIES", "10.0.0.0/99"),
        ] {
            let vars = with_required(&[bad]);
            assert!(
                Config::from_lookup(lookup_from(&vars)).is_err(),
                "{} = {} should be rejected",
                bad.0,
                bad.1
            );
        }
    }
}
