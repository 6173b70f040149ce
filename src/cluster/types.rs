use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

/// Network identity of a cluster member.
///
/// `ip` is `None` until the host name has been resolved. Two addresses are the same member
/// when their ports agree and either both IPs agree (resolved) or the host names agree
/// (at least one side unresolved). Compare with `matches`, not field equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberAddress {
    pub host: String,
    pub port: u16,
    pub ip: Option<IpAddr>,
}

impl MemberAddress {
    pub fn resolved(addr: SocketAddr) -> Self {
        Self {
            host: addr.ip().to_string(),
            port: addr.port(),
            ip: Some(addr.ip()),
        }
    }

    pub fn unresolved(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ip: None,
        }
    }

    /// Parses `host:port`; literal IPs come back resolved.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Ok(addr) = raw.parse::<SocketAddr>() {
            return Some(Self::resolved(addr));
        }
        let (host, port) = raw.rsplit_once(':')?;
        let port = port.parse().ok()?;
        if host.is_empty() {
            return None;
        }
        Some(Self::unresolved(host, port))
    }

    pub fn is_resolved(&self) -> bool {
        self.ip.is_some()
    }

    pub fn matches(&self, other: &MemberAddress) -> bool {
        if self.port != other.port {
            return false;
        }
        match (self.ip, other.ip) {
            (Some(a), Some(b)) => a == b,
            _ => self.host.eq_ignore_ascii_case(&other.host),
        }
    }

    pub fn http_base(&self) -> String {
        match self.ip {
            Some(ip) => format!("http://{}", SocketAddr::new(ip, self.port)),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

impl fmt::Display for MemberAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The serializable payload of a partitioned job: what to run on the shard owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartitionedCall {
    /// Registered handler kind to invoke on the owner.
    pub kind: String,
    pub payload: serde_json::Value,
}

impl PartitionedCall {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

/// One row of the ownership record.
#[derive(Debug, Clone)]
pub struct OwnerEntry {
    pub owner: MemberAddress,
    pub recorded_at: Instant,
}
