//! Transport keepalive parameters.
//!
//! These constants govern how fast a node detects a silently dead peer and
//! how aggressively long-lived connections are recycled through NAT and idle
//! timeouts. They are applied to the tonic server builder and client
//! endpoint where HTTP/2 exposes the matching knob; timers HTTP/2 does not
//! surface (idle/age GOAWAY, server-side ping-rate minimum) stay part of the
//! policy block as the documented contract between nodes.

use std::time::Duration;

use tonic::transport::{Endpoint, server::Server};

/// Server-side limits on client ping behavior.
#[derive(Debug, Clone)]
pub struct EnforcementPolicy {
    /// Clients pinging more often than this are terminated.
    pub min_ping_interval: Duration,
    /// Allow pings while no RPC is in flight.
    pub permit_without_stream: bool,
}

impl Default for EnforcementPolicy {
    fn default() -> Self {
        Self {
            min_ping_interval: Duration::from_secs(5),
            permit_without_stream: true,
        }
    }
}

/// Server-side connection lifetime and probing parameters.
#[derive(Debug, Clone)]
pub struct ServerKeepalive {
    /// Idle time after which the server sends GOAWAY.
    pub max_connection_idle: Duration,
    /// Hard connection age after which the server sends GOAWAY.
    pub max_connection_age: Duration,
    /// Grace period for in-flight RPCs once GOAWAY is sent.
    pub max_connection_age_grace: Duration,
    /// Idle time before the server probes the client.
    pub interval: Duration,
    /// Wait for the ping ack before the connection is considered dead.
    pub timeout: Duration,
}

impl Default for ServerKeepalive {
    fn default() -> Self {
        Self {
            max_connection_idle: Duration::from_secs(15),
            max_connection_age: Duration::from_secs(30),
            max_connection_age_grace: Duration::from_secs(5),
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(1),
        }
    }
}

impl ServerKeepalive {
    /// Applies the HTTP/2-level subset of the policy to a server builder.
    pub fn configure(&self, server: Server) -> Server {
        server
            .http2_keepalive_interval(Some(self.interval))
            .http2_keepalive_timeout(Some(self.timeout))
            .tcp_keepalive(Some(self.interval))
    }
}

/// Client-side ping parameters for pooled peer connections.
#[derive(Debug, Clone)]
pub struct ClientKeepalive {
    /// Ping cadence while the connection carries no traffic.
    pub interval: Duration,
    /// Wait for the ping ack before the connection is considered dead.
    pub timeout: Duration,
    /// Send pings even without active streams.
    pub permit_without_stream: bool,
}

impl Default for ClientKeepalive {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(1),
            permit_without_stream: true,
        }
    }
}

impl ClientKeepalive {
    /// Applies the policy to an endpoint before dialing.
    #[must_use]
    pub fn configure(&self, endpoint: Endpoint) -> Endpoint {
        endpoint
            .http2_keep_alive_interval(self.interval)
            .keep_alive_timeout(self.timeout)
            .keep_alive_while_idle(self.permit_without_stream)
    }
}
