use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Relay fabric configuration supplied by the host node.
///
/// There is no CLI or environment surface here; the host resolves its own
/// configuration and hands the finished struct to [`crate::RelayRuntime`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Node name, unique in the cluster; matches the gossip member name.
    pub node_name: String,
    /// Address the relay server binds and the address advertised for raft.
    pub bind_addr: String,
    /// Port of the inter-node relay listener.
    pub grpc_port: u16,
    /// Port of the replicated-log transport, sent along with join requests.
    pub raft_port: u16,
    /// Deadline for a single unicast relay call.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Capacity of the inbound message channel; producers block when full.
    pub incoming_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            node_name: String::new(),
            bind_addr: "127.0.0.1".to_string(),
            grpc_port: 17_946,
            raft_port: 8_946,
            request_timeout: Duration::from_secs(1),
            incoming_capacity: 256,
        }
    }
}

impl RelayConfig {
    /// Deadline for establishing a peer connection.
    #[must_use]
    pub fn dial_timeout(&self) -> Duration {
        self.request_timeout * 3
    }

    /// Deadline for leader-apply calls, which may cross a leader election.
    #[must_use]
    pub fn apply_timeout(&self) -> Duration {
        self.request_timeout * 10
    }

    /// `host:port` the relay server listens on.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.grpc_port)
    }

    /// `host:port` of the local replicated-log endpoint.
    #[must_use]
    pub fn raft_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.raft_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cluster_conventions() {
        let config = RelayConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.grpc_port, 17_946);
        assert_eq!(config.raft_port, 8_946);
        assert_eq!(config.request_timeout, Duration::from_secs(1));
        assert!(config.incoming_capacity > 0);
    }

    #[test]
    fn compound_deadlines_scale_with_request_timeout() {
        let config = RelayConfig {
            request_timeout: Duration::from_millis(200),
            ..RelayConfig::default()
        };
        assert_eq!(config.dial_timeout(), Duration::from_millis(600));
        assert_eq!(config.apply_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn addr_helpers_join_host_and_port() {
        let config = RelayConfig {
            bind_addr: "10.0.0.4".to_string(),
            grpc_port: 17_946,
            raft_port: 8_946,
            ..RelayConfig::default()
        };
        assert_eq!(config.listen_addr(), "10.0.0.4:17946");
        assert_eq!(config.raft_addr(), "10.0.0.4:8946");
    }
}
